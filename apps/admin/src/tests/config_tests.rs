use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("admin_settings_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_when_no_file_or_env() {
    let missing = env::temp_dir().join("admin_settings_absent_dir");
    let settings = load_settings_with(None, no_env).expect("defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.page_size, 5);
    assert_eq!(settings.request_timeout(), Duration::from_secs(15));

    let err = load_settings_with(Some(&missing.join("admin.toml")), no_env)
        .expect_err("explicit path must exist");
    assert!(err.to_string().contains("failed to open"));
}

#[test]
fn file_values_override_defaults() {
    let path = temp_config(
        r#"
api_base_url = "https://pokedex.example.com"
page_size = 10
request_timeout_ms = 2500
sort_mode = "page_local"
reconcile_policy = "merge_by_id"
update_verb = "put"
"#,
    );

    let settings = load_settings_with(Some(&path), no_env).expect("load");
    assert_eq!(settings.api_base_url, "https://pokedex.example.com");
    assert_eq!(settings.page_size, 10);
    assert_eq!(settings.request_timeout_ms, 2500);
    assert_eq!(settings.sort_mode, SortMode::PageLocal);
    assert_eq!(settings.reconcile_policy, ReconcilePolicy::MergeById);
    assert_eq!(settings.update_verb, UpdateVerb::Put);
    assert_eq!(settings.log_filter, "info");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn env_overrides_file() {
    let path = temp_config("page_size = 10\nlog_filter = \"warn\"\n");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("ADMIN__PAGE_SIZE", "20"),
        ("ADMIN__API_BASE_URL", "http://10.0.0.2:8000"),
    ]);

    let settings = load_settings_with(Some(&path), |name| vars.get(name).map(|v| v.to_string()))
        .expect("load");
    assert_eq!(settings.page_size, 20);
    assert_eq!(settings.api_base_url, "http://10.0.0.2:8000");
    assert_eq!(settings.log_filter, "warn");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn bad_values_are_reported_with_their_source() {
    let err = load_settings_with(None, |name| {
        (name == "ADMIN__REQUEST_TIMEOUT_MS").then(|| "soon".to_string())
    })
    .expect_err("not a number");
    assert!(format!("{err:#}").contains("ADMIN__REQUEST_TIMEOUT_MS"));

    let path = temp_config("colour = \"blue\"\n");
    let err = load_settings_with(Some(&path), no_env).expect_err("unknown key");
    assert!(format!("{err:#}").contains("unknown setting 'colour'"));
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn validation_rejects_unusable_settings() {
    assert!(Settings::default().validate().is_ok());

    let mut settings = Settings::default();
    settings.api_base_url = "not a url".into();
    assert!(settings.validate().is_err());

    settings.api_base_url = "ftp://files.example.com".into();
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.page_size = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn controller_config_carries_settings() {
    let mut settings = Settings::default();
    settings.apply("reconcile_policy", "merge").expect("apply");
    settings.apply("request_timeout_ms", "750").expect("apply");

    let config = settings.controller_config();
    assert_eq!(config.reconcile, ReconcilePolicy::MergeById);
    assert_eq!(config.request_timeout, Duration::from_millis(750));
    assert_eq!(config.page_size, 5);
    assert_eq!(config.sort_mode, SortMode::SortThenPaginate);
}
