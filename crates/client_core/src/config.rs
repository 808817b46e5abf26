use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::FallbackPolicy;
use tracing::warn;

use crate::diagnostics::DEFAULT_DIAGNOSTICS_CAPACITY;

pub const CONFIG_FILE_NAME: &str = "miniapp.toml";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_PLACEHOLDER_PHONE: &str = "+10000000000";
pub const DEFAULT_MAIN_BUTTON_TEXT: &str = "Share Phone Number";
pub const FAILURE_ALERT_TEXT: &str = "Failed to get phone number. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub request_timeout: Duration,
    pub fallback_policy: FallbackPolicy,
    pub placeholder_phone: String,
    pub diagnostics_capacity: usize,
    pub alert_on_failure: bool,
    pub main_button_text: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fallback_policy: FallbackPolicy::default(),
            placeholder_phone: DEFAULT_PLACEHOLDER_PHONE.into(),
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            alert_on_failure: false,
            main_button_text: DEFAULT_MAIN_BUTTON_TEXT.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    request_timeout_ms: Option<u64>,
    fallback_policy: Option<String>,
    placeholder_phone: Option<String>,
    diagnostics_capacity: Option<usize>,
    alert_on_failure: Option<bool>,
    main_button_text: Option<String>,
}

/// Defaults, then `miniapp.toml` in the working directory if readable, then
/// `APP__*` environment overrides.
pub fn load_settings() -> CoordinatorConfig {
    let mut settings = CoordinatorConfig::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE_NAME) {
        match parse_file_settings(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(error = %err, "ignoring unreadable {}", CONFIG_FILE_NAME),
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Like [`load_settings`] but the file is explicit and must parse.
pub fn load_settings_from(path: &Path) -> anyhow::Result<CoordinatorConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let file_cfg = parse_file_settings(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;

    let mut settings = CoordinatorConfig::default();
    apply_file_settings(&mut settings, file_cfg);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn parse_file_settings(raw: &str) -> anyhow::Result<FileSettings> {
    Ok(toml::from_str::<FileSettings>(raw)?)
}

fn apply_file_settings(settings: &mut CoordinatorConfig, file_cfg: FileSettings) {
    if let Some(ms) = file_cfg.request_timeout_ms {
        set_timeout(settings, ms);
    }
    if let Some(raw) = file_cfg.fallback_policy {
        set_policy(settings, &raw);
    }
    if let Some(v) = file_cfg.placeholder_phone {
        set_placeholder(settings, v);
    }
    if let Some(v) = file_cfg.diagnostics_capacity {
        set_capacity(settings, v);
    }
    if let Some(v) = file_cfg.alert_on_failure {
        settings.alert_on_failure = v;
    }
    if let Some(v) = file_cfg.main_button_text {
        settings.main_button_text = v;
    }
}

pub fn apply_env_overrides(
    settings: &mut CoordinatorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        match v.trim().parse::<u64>() {
            Ok(ms) => set_timeout(settings, ms),
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_MS"),
        }
    }
    if let Some(v) = lookup("APP__FALLBACK_POLICY") {
        set_policy(settings, &v);
    }
    if let Some(v) = lookup("APP__PLACEHOLDER_PHONE") {
        set_placeholder(settings, v);
    }
    if let Some(v) = lookup("APP__DIAGNOSTICS_CAPACITY") {
        match v.trim().parse::<usize>() {
            Ok(capacity) => set_capacity(settings, capacity),
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__DIAGNOSTICS_CAPACITY"),
        }
    }
    if let Some(v) = lookup("APP__ALERT_ON_FAILURE") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.alert_on_failure = true,
            "0" | "false" | "no" => settings.alert_on_failure = false,
            _ => warn!(value = %v, "ignoring invalid APP__ALERT_ON_FAILURE"),
        }
    }
    if let Some(v) = lookup("APP__MAIN_BUTTON_TEXT") {
        settings.main_button_text = v;
    }
}

fn set_timeout(settings: &mut CoordinatorConfig, ms: u64) {
    if ms == 0 {
        warn!("ignoring zero request timeout");
        return;
    }
    settings.request_timeout = Duration::from_millis(ms);
}

fn set_policy(settings: &mut CoordinatorConfig, raw: &str) {
    match raw.parse::<FallbackPolicy>() {
        Ok(policy) => settings.fallback_policy = policy,
        Err(err) => warn!(error = %err, "keeping fallback policy {:?}", settings.fallback_policy),
    }
}

fn set_placeholder(settings: &mut CoordinatorConfig, phone: String) {
    if phone.trim().is_empty() {
        warn!("ignoring empty placeholder phone");
        return;
    }
    settings.placeholder_phone = phone.trim().to_string();
}

fn set_capacity(settings: &mut CoordinatorConfig, capacity: usize) {
    if capacity == 0 {
        warn!("ignoring zero diagnostics capacity");
        return;
    }
    settings.diagnostics_capacity = capacity;
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
