// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Leadflow configuration system.

use leadflow_config::diagnostic::{suggest_key, ConfigError};
use leadflow_config::model::LeadflowConfig;
use leadflow_config::{load_and_validate_str, load_config_from_str};
use leadflow_core::AgentRole;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_leadflow_config() {
    let toml = r#"
[service]
name = "leadflow-test"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9000
bearer_token = "secret"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[distribution]
min_delay_secs = 600
batch_limit = 100
balanced_fallback = true

[presence]
staleness_secs = 60
roles = ["sales"]

[ingest]
enabled = false
drop_dir = "/tmp/drop"
debounce_ms = 500
scan_on_start = false

[board]
key = "k"
token = "t"
confirmed_list = "list-1"

[scheduler]
enabled = false
requeue_schedule = "0 */10 * * * *"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "leadflow-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.bearer_token.as_deref(), Some("secret"));
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.distribution.min_delay_secs, 600);
    assert_eq!(config.distribution.batch_limit, 100);
    assert!(config.distribution.balanced_fallback);
    assert_eq!(config.presence.staleness_secs, 60);
    assert_eq!(config.presence.roles, vec![AgentRole::Sales]);
    assert!(!config.ingest.enabled);
    assert_eq!(config.ingest.drop_dir, "/tmp/drop");
    assert_eq!(config.ingest.debounce_ms, 500);
    assert!(!config.ingest.scan_on_start);
    assert!(config.board.is_configured());
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.requeue_schedule, "0 */10 * * * *");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = "";
    let config = load_config_from_str(toml).expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "leadflow");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8350);
    assert!(config.server.bearer_token.is_none());
    assert!(config.storage.wal_mode);
    assert_eq!(config.distribution.min_delay_secs, 0);
    assert_eq!(config.distribution.batch_limit, 500);
    assert!(!config.distribution.balanced_fallback);
    assert_eq!(config.presence.staleness_secs, 120);
    assert_eq!(
        config.presence.roles,
        vec![AgentRole::Sales, AgentRole::SalesAdmin]
    );
    assert!(config.ingest.enabled);
    assert_eq!(config.ingest.debounce_ms, 2000);
    assert!(config.ingest.scan_on_start);
    assert!(!config.board.is_configured());
    assert!(config.scheduler.enabled);
}

/// Unknown field in a section produces an error via deny_unknown_fields.
#[test]
fn unknown_field_in_server_produces_error() {
    let toml = r#"
[server]
hots = "127.0.0.1"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("hots"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err =
        load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Roles deserialize from snake_case strings.
#[test]
fn roles_deserialize_from_snake_case() {
    let toml = r#"
[presence]
roles = ["sales", "sales_admin", "admin"]
"#;
    let config = load_config_from_str(toml).expect("roles should parse");
    assert_eq!(
        config.presence.roles,
        vec![AgentRole::Sales, AgentRole::SalesAdmin, AgentRole::Admin]
    );
}

/// Unknown role strings are rejected.
#[test]
fn unknown_role_is_rejected() {
    let toml = r#"
[presence]
roles = ["warehouse"]
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Env-var style dotted overrides merge over TOML values.
#[test]
fn dotted_override_beats_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[server]
port = 8350
"#;

    let config: LeadflowConfig = Figment::new()
        .merge(Serialized::defaults(LeadflowConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("server.port", 9999))
        .extract()
        .expect("should merge override");

    assert_eq!(config.server.port, 9999);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: LeadflowConfig = Figment::new()
        .merge(Serialized::defaults(LeadflowConfig::default()))
        .merge(Toml::file("/nonexistent/path/leadflow.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.service.name, "leadflow");
}

// ============================================================================
// Diagnostic tests
// ============================================================================

/// Unknown key "hots" in [server] produces suggestion "did you mean `host`?"
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[server]
hots = "127.0.0.1"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty(), "should have at least one error");

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "hots"
                && suggestion.as_deref() == Some("host")
                && valid_keys.contains("port")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'hots' with suggestion 'host', got: {errors:?}"
    );
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[server]
port = "not_a_number"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("port"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError implements miette::Diagnostic (can be rendered).
#[test]
fn config_error_implements_diagnostic() {
    use miette::Diagnostic;

    let error = ConfigError::UnknownKey {
        key: "hots".to_string(),
        suggestion: Some("host".to_string()),
        valid_keys: "host, port, bearer_token".to_string(),
        span: None,
        src: None,
    };

    let code = error.code();
    assert!(code.is_some(), "should have diagnostic code");

    let help = error.help();
    assert!(help.is_some(), "should have help text");
    let help_str = help.unwrap().to_string();
    assert!(
        help_str.contains("did you mean `host`"),
        "help should contain suggestion, got: {help_str}"
    );
}

/// Validation catches a zero batch limit through the high-level entry point.
#[test]
fn validation_catches_zero_batch_limit() {
    let toml = r#"
[distribution]
batch_limit = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero batch limit should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("batch_limit"))
    });
    assert!(
        has_validation_error,
        "should have validation error for zero batch limit"
    );
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[service]
name = "test"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.name, "test");
}

/// Fuzzy suggestion helper finds near matches only.
#[test]
fn diagnostic_suggest_key_behavior() {
    let valid_keys = &["min_delay_secs", "batch_limit", "balanced_fallback"];
    assert_eq!(
        suggest_key("batch_limt", valid_keys),
        Some("batch_limit".to_string())
    );
    assert!(suggest_key("qqqqq", valid_keys).is_none());
}
