use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use client_core::{ControllerConfig, ReconcilePolicy, SortMode, UpdateVerb};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "admin.toml";
const ENV_PREFIX: &str = "ADMIN__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub page_size: usize,
    pub sort_mode: SortMode,
    pub reconcile_policy: ReconcilePolicy,
    pub update_verb: UpdateVerb,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            request_timeout_ms: 15_000,
            page_size: 5,
            sort_mode: SortMode::SortThenPaginate,
            reconcile_policy: ReconcilePolicy::Refetch,
            update_verb: UpdateVerb::PostWithOverride,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            page_size: self.page_size,
            request_timeout: self.request_timeout(),
            reconcile: self.reconcile_policy,
            sort_mode: self.sort_mode,
        }
    }

    /// Applies one `key = value` pair; keys are the field names.
    pub fn apply(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            "api_base_url" => self.api_base_url = value.to_string(),
            "request_timeout_ms" => {
                self.request_timeout_ms = value
                    .parse()
                    .with_context(|| format!("request_timeout_ms: '{value}' is not a number"))?;
            }
            "page_size" => {
                self.page_size = value
                    .parse()
                    .with_context(|| format!("page_size: '{value}' is not a number"))?;
            }
            "sort_mode" => self.sort_mode = parse_sort_mode(value)?,
            "reconcile_policy" => self.reconcile_policy = parse_reconcile_policy(value)?,
            "update_verb" => self.update_verb = parse_update_verb(value)?,
            "log_filter" => self.log_filter = value.to_string(),
            other => bail!("unknown setting '{other}'"),
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api_base_url '{}'", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_base_url must be http or https, got '{}'", url.scheme());
        }
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be at least 1");
        }
        Ok(())
    }
}

const KEYS: [&str; 7] = [
    "api_base_url",
    "request_timeout_ms",
    "page_size",
    "sort_mode",
    "reconcile_policy",
    "update_verb",
    "log_filter",
];

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Defaults, then the toml file, then `ADMIN__*` variables from `env`.
pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(file) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to read settings from '{}'", file.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open '{}'", file.display()));
        }
    }

    for key in KEYS {
        let name = format!("{ENV_PREFIX}{}", key.to_uppercase());
        if let Some(value) = env(&name) {
            settings
                .apply(key, &value)
                .with_context(|| format!("invalid value in {name}"))?;
        }
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let table: toml::Table = toml::from_str(raw)?;
    for (key, value) in &table {
        let value = match value {
            toml::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        settings.apply(key, &value)?;
    }
    Ok(())
}

fn parse_sort_mode(value: &str) -> anyhow::Result<SortMode> {
    match value.to_ascii_lowercase().as_str() {
        "page_local" | "page-local" => Ok(SortMode::PageLocal),
        "sort_then_paginate" | "sort-then-paginate" => Ok(SortMode::SortThenPaginate),
        other => bail!("unknown sort_mode '{other}'"),
    }
}

fn parse_reconcile_policy(value: &str) -> anyhow::Result<ReconcilePolicy> {
    match value.to_ascii_lowercase().as_str() {
        "refetch" => Ok(ReconcilePolicy::Refetch),
        "merge_by_id" | "merge-by-id" | "merge" => Ok(ReconcilePolicy::MergeById),
        other => bail!("unknown reconcile_policy '{other}'"),
    }
}

fn parse_update_verb(value: &str) -> anyhow::Result<UpdateVerb> {
    match value.to_ascii_lowercase().as_str() {
        "put" => Ok(UpdateVerb::Put),
        "post_with_override" | "post-with-override" | "post" => Ok(UpdateVerb::PostWithOverride),
        other => bail!("unknown update_verb '{other}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
