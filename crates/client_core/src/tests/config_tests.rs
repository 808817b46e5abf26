use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let settings = CoordinatorConfig::default();
    assert_eq!(settings.request_timeout, Duration::from_millis(10_000));
    assert_eq!(settings.fallback_policy, FallbackPolicy::OnUnavailable);
    assert_eq!(settings.placeholder_phone, "+10000000000");
    assert_eq!(settings.diagnostics_capacity, 500);
    assert!(!settings.alert_on_failure);
    assert_eq!(settings.main_button_text, "Share Phone Number");
}

#[test]
fn file_values_override_defaults() {
    let file_cfg = parse_file_settings(
        r#"
request_timeout_ms = 2500
fallback_policy = "on-any-failure"
placeholder_phone = "+19990000000"
diagnostics_capacity = 50
alert_on_failure = true
"#,
    )
    .expect("parse");

    let mut settings = CoordinatorConfig::default();
    apply_file_settings(&mut settings, file_cfg);

    assert_eq!(settings.request_timeout, Duration::from_millis(2500));
    assert_eq!(settings.fallback_policy, FallbackPolicy::OnAnyFailure);
    assert_eq!(settings.placeholder_phone, "+19990000000");
    assert_eq!(settings.diagnostics_capacity, 50);
    assert!(settings.alert_on_failure);
    assert_eq!(settings.main_button_text, DEFAULT_MAIN_BUTTON_TEXT);
}

#[test]
fn environment_wins_over_file() {
    let mut settings = CoordinatorConfig::default();
    apply_file_settings(
        &mut settings,
        parse_file_settings("request_timeout_ms = 2500\nfallback_policy = \"never\"")
            .expect("parse"),
    );
    apply_env_overrides(
        &mut settings,
        lookup(&[
            ("APP__REQUEST_TIMEOUT_MS", "4000"),
            ("APP__FALLBACK_POLICY", "on_timeout"),
            ("APP__ALERT_ON_FAILURE", "yes"),
            ("APP__MAIN_BUTTON_TEXT", "Send my number"),
        ]),
    );

    assert_eq!(settings.request_timeout, Duration::from_millis(4000));
    assert_eq!(settings.fallback_policy, FallbackPolicy::OnTimeout);
    assert!(settings.alert_on_failure);
    assert_eq!(settings.main_button_text, "Send my number");
}

#[test]
fn invalid_values_are_ignored() {
    let mut settings = CoordinatorConfig::default();
    apply_env_overrides(
        &mut settings,
        lookup(&[
            ("APP__REQUEST_TIMEOUT_MS", "soon"),
            ("APP__FALLBACK_POLICY", "sometimes"),
            ("APP__PLACEHOLDER_PHONE", "   "),
            ("APP__DIAGNOSTICS_CAPACITY", "0"),
            ("APP__ALERT_ON_FAILURE", "maybe"),
        ]),
    );
    assert_eq!(settings, CoordinatorConfig::default());
}

#[test]
fn zero_timeout_in_file_is_ignored() {
    let mut settings = CoordinatorConfig::default();
    apply_file_settings(
        &mut settings,
        parse_file_settings("request_timeout_ms = 0").expect("parse"),
    );
    assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
}

#[test]
fn malformed_file_is_an_error() {
    assert!(parse_file_settings("request_timeout_ms = \"fast\"").is_err());
}

#[test]
fn explicit_missing_file_reports_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("miniapp_missing_{suffix}.toml"));

    let err = load_settings_from(&path).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn explicit_file_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("miniapp_config_{suffix}.toml"));
    fs::write(&path, "placeholder_phone = \"+12223334444\"\n").expect("write config");

    let settings = load_settings_from(&path).expect("load");
    assert_eq!(settings.placeholder_phone, "+12223334444");

    fs::remove_file(path).expect("cleanup");
}
