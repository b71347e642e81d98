mod config;
mod console;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    AlwaysConfirm, Attachment, AuthClient, ConfirmationPrompt, DeleteOutcome, EditableRecord,
    EntityListController, HttpEntityGateway, ListRecord, SessionContext, SortDirection, SortField,
};
use shared::domain::{CatalogItem, EntityId, UserAccount};
use tracing::info;

use crate::{
    config::{load_settings, Settings},
    console::{ConsoleNotifier, StdinPrompt},
};

type Controller<R> = EntityListController<R, HttpEntityGateway<R>>;

#[derive(Parser, Debug)]
#[command(name = "admin", version, about = "Manage catalog items and user accounts")]
struct Cli {
    /// Settings file; `./admin.toml` is read when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and print the session user.
    Login,
    Items {
        #[command(subcommand)]
        action: ItemAction,
    },
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand, Debug)]
enum ItemAction {
    List(ListArgs),
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: PathBuf,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
enum UserAction {
    List(ListArgs),
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    all_pages: bool,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    #[arg(long)]
    id: i64,
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Id,
    Name,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => SortField::Id,
            SortArg::Name => SortField::Name,
        }
    }
}

trait Row: ListRecord {
    fn columns(&self) -> String;
}

impl Row for CatalogItem {
    fn columns(&self) -> String {
        format!(
            "{:>6}  {:<24} {}",
            self.id,
            self.name,
            self.image_ref.as_deref().unwrap_or("-")
        )
    }
}

impl Row for UserAccount {
    fn columns(&self) -> String {
        format!("{:>6}  {:<24} {}", self.id, self.name, self.email)
    }
}

struct App {
    settings: Settings,
    session: SessionContext,
}

impl App {
    fn controller<R: EditableRecord>(&self, confirm_without_asking: bool) -> Controller<R> {
        let prompt: Arc<dyn ConfirmationPrompt> = if confirm_without_asking {
            Arc::new(AlwaysConfirm)
        } else {
            Arc::new(StdinPrompt)
        };
        let gateway = HttpEntityGateway::new(self.settings.api_base_url.clone())
            .with_update_verb(self.settings.update_verb);
        EntityListController::with_config(
            gateway,
            self.session.clone(),
            prompt,
            Arc::new(ConsoleNotifier),
            self.settings.controller_config(),
        )
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let user = AuthClient::new(self.settings.api_base_url.clone())
            .authenticate(&self.session, email, password)
            .await?;
        println!("Signed in as {} <{}> (id {})", user.name, user.email, user.id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config,
        base_url,
        email,
        password,
        command,
    } = Cli::parse();

    let mut settings = load_settings(config.as_deref())?;
    if let Some(base_url) = base_url {
        settings.api_base_url = base_url;
    }
    settings.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    info!(api = %settings.api_base_url, "admin starting");

    let app = App {
        settings,
        session: SessionContext::new(),
    };

    match (email.as_deref(), password.as_deref()) {
        (Some(email), Some(password)) => app.sign_in(email, password).await?,
        (None, None) if matches!(command, Command::Login) => {
            bail!("login needs --email and --password")
        }
        (None, None) => {}
        _ => bail!("--email and --password must be given together"),
    }

    match command {
        Command::Login => Ok(()),
        Command::Items { action } => run_items(&app, action).await,
        Command::Users { action } => run_users(&app, action).await,
    }
}

async fn run_items(app: &App, action: ItemAction) -> Result<()> {
    match action {
        ItemAction::List(args) => list(&app.controller::<CatalogItem>(false), &args).await,
        ItemAction::Create { name, file } => {
            let controller = app.controller::<CatalogItem>(false);
            let attachment = read_attachment(&file).await?;
            controller.open_create().await;
            controller.edit_draft(|draft| draft.name = name).await?;
            controller.attach_file(attachment).await?;
            controller.save().await?;
            Ok(())
        }
        ItemAction::Update { id, name, file } => {
            let controller = app.controller::<CatalogItem>(false);
            stage_by_id(&controller, EntityId(id)).await?;
            if let Some(name) = name {
                controller.edit_draft(|draft| draft.name = name).await?;
            }
            if let Some(file) = file {
                controller.attach_file(read_attachment(&file).await?).await?;
            }
            controller.save().await?;
            Ok(())
        }
        ItemAction::Delete(args) => delete(&app.controller::<CatalogItem>(args.yes), args.id).await,
    }
}

async fn run_users(app: &App, action: UserAction) -> Result<()> {
    match action {
        UserAction::List(args) => list(&app.controller::<UserAccount>(false), &args).await,
        UserAction::Create {
            name,
            email,
            password,
        } => {
            let controller = app.controller::<UserAccount>(false);
            controller.open_create().await;
            controller
                .edit_draft(|draft| {
                    draft.name = name;
                    draft.email = email;
                    draft.password = password;
                })
                .await?;
            controller.save().await?;
            Ok(())
        }
        UserAction::Update {
            id,
            name,
            email,
            password,
        } => {
            let controller = app.controller::<UserAccount>(false);
            stage_by_id(&controller, EntityId(id)).await?;
            controller
                .edit_draft(|draft| {
                    if let Some(name) = name {
                        draft.name = name;
                    }
                    if let Some(email) = email {
                        draft.email = email;
                    }
                    if let Some(password) = password {
                        draft.password = password;
                    }
                })
                .await?;
            controller.save().await?;
            Ok(())
        }
        UserAction::Delete(args) => delete(&app.controller::<UserAccount>(args.yes), args.id).await,
    }
}

async fn read_attachment(path: &std::path::Path) -> Result<Attachment> {
    Attachment::from_path(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))
}

async fn stage_by_id<R: EditableRecord>(controller: &Controller<R>, id: EntityId) -> Result<()> {
    controller.load().await?;
    let Some(index) = controller.reveal(id).await else {
        bail!("no {} with id {id}", R::KIND);
    };
    controller.stage_edit(index).await?;
    Ok(())
}

async fn delete<R: EditableRecord>(controller: &Controller<R>, id: i64) -> Result<()> {
    controller.load().await?;
    match controller.delete(EntityId(id)).await? {
        DeleteOutcome::Deleted => {}
        DeleteOutcome::Declined => println!("Nothing deleted."),
    }
    Ok(())
}

async fn list<R: EditableRecord + Row>(controller: &Controller<R>, args: &ListArgs) -> Result<()> {
    controller.load().await?;

    if let Some(term) = &args.search {
        controller.set_search_term(term.clone()).await;
    }
    if let Some(field) = args.sort.map(SortField::from) {
        if controller.view().await.sort.field != field {
            controller.change_sort_field(field).await;
        }
    }
    if args.desc && controller.view().await.sort.direction == SortDirection::Asc {
        controller.toggle_sort_direction().await;
    }

    if args.all_pages {
        controller.first_page().await;
        loop {
            print_page(controller).await;
            let view = controller.view().await;
            if view.current_page >= view.total_pages {
                break;
            }
            controller.next_page().await;
        }
        return Ok(());
    }

    if let Some(page) = args.page {
        while controller.view().await.current_page < page {
            let before = controller.view().await.current_page;
            controller.next_page().await;
            if controller.view().await.current_page == before {
                break;
            }
        }
    }
    print_page(controller).await;
    Ok(())
}

async fn print_page<R: EditableRecord + Row>(controller: &Controller<R>) {
    let view = controller.view().await;
    println!(
        "{} page {}/{} (sorted by {:?} {:?})",
        R::KIND,
        view.current_page,
        view.total_pages,
        view.sort.field,
        view.sort.direction
    );
    for record in &view.page_window {
        println!("{}", record.columns());
    }
    println!("{}", view.summary);
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
