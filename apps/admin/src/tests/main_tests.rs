use super::*;

use clap::CommandFactory;

#[test]
fn command_line_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn login_credentials_precede_the_subcommand() {
    let cli = Cli::try_parse_from([
        "admin",
        "--email",
        "misty@example.com",
        "--password",
        "staryu",
        "users",
        "create",
        "--name",
        "Brock",
        "--email",
        "brock@example.com",
        "--password",
        "onix",
    ])
    .expect("parse");

    assert_eq!(cli.email.as_deref(), Some("misty@example.com"));
    match cli.command {
        Command::Users {
            action: UserAction::Create { email, password, .. },
        } => {
            assert_eq!(email, "brock@example.com");
            assert_eq!(password, "onix");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn list_flags_parse() {
    let cli = Cli::try_parse_from([
        "admin", "items", "list", "--search", "chu", "--sort", "name", "--desc", "--page", "2",
    ])
    .expect("parse");

    let Command::Items {
        action: ItemAction::List(args),
    } = cli.command
    else {
        panic!("expected items list");
    };
    assert_eq!(args.search.as_deref(), Some("chu"));
    assert_eq!(args.sort.map(SortField::from), Some(SortField::Name));
    assert!(args.desc);
    assert_eq!(args.page, Some(2));
    assert!(!args.all_pages);
}

#[test]
fn delete_requires_an_id() {
    assert!(Cli::try_parse_from(["admin", "items", "delete"]).is_err());

    let cli = Cli::try_parse_from(["admin", "users", "delete", "--id", "4", "--yes"]).expect("parse");
    assert!(matches!(
        cli.command,
        Command::Users {
            action: UserAction::Delete(DeleteArgs { id: 4, yes: true })
        }
    ));
}

#[test]
fn catalog_rows_show_missing_images_as_dash() {
    let item = CatalogItem {
        id: EntityId(25),
        name: "Pikachu".into(),
        image_ref: None,
    };
    let row = item.columns();
    assert!(row.contains("25"));
    assert!(row.contains("Pikachu"));
    assert!(row.trim_end().ends_with('-'));
}
