// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cadence configuration system.

use cadence_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_cadence_config() {
    let toml = r#"
[engine]
name = "cadence-test"
log_level = "debug"

[storage]
database_path = "/tmp/cadence-test.db"

[intake]
window_secs = 20
flush_poll_secs = 2
inbound_poll_secs = 10

[generator]
base_url = "http://gen.local:9000"
api_key = "key-123"
timeout_secs = 30
max_retries = 5

[platform]
base_url = "http://bridge.local:9001"
api_token = "tok-456"

[scheduler]
min_delay_minutes = 5
max_delay_minutes = 45
poll_secs = 15

[dispatcher]
max_attempts = 4

[reconciler]
interval_secs = 1800
grace_minutes = 60

[automode]
general = true
ad_flow = false
client_care = true
force_review_first_contact = false

[[scenario.steps]]
name = "goal"
trigger = "(?i)goal"

[[scenario.steps]]
name = "close"
trigger = "(?i)ready"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.engine.name, "cadence-test");
    assert_eq!(config.engine.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/cadence-test.db");
    assert_eq!(config.intake.window_secs, 20);
    assert_eq!(config.generator.base_url, "http://gen.local:9000");
    assert_eq!(config.generator.max_retries, 5);
    assert_eq!(config.platform.api_token, "tok-456");
    assert_eq!(config.scheduler.min_delay_minutes, 5);
    assert_eq!(config.scheduler.max_delay_minutes, 45);
    assert_eq!(config.dispatcher.max_attempts, 4);
    assert_eq!(config.reconciler.grace_minutes, 60);
    assert!(config.automode.general);
    assert!(!config.automode.ad_flow);
    assert!(!config.automode.force_review_first_contact);
    assert_eq!(config.scenario.steps.len(), 2);
    assert_eq!(config.scenario.steps[1].name, "close");
}

/// Empty TOML falls back to compiled defaults everywhere.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.engine.name, "cadence");
    assert_eq!(config.intake.window_secs, 15);
    assert_eq!(config.scheduler.min_delay_minutes, 10);
    assert_eq!(config.scheduler.max_delay_minutes, 90);
    assert_eq!(config.scheduler.poll_secs, 60);
    assert_eq!(config.dispatcher.max_attempts, 3);
    assert_eq!(config.reconciler.interval_secs, 3600);
    // Auto-mode is opt-in; everything starts gated behind human review.
    assert!(!config.automode.general);
    assert!(!config.automode.ad_flow);
    assert!(!config.automode.client_care);
    assert!(config.automode.force_review_first_contact);
    // Default scenario ships a non-empty funnel.
    assert!(!config.scenario.steps.is_empty());
}

/// Unknown field in a section is rejected by deny_unknown_fields.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[scheduler]
min_delay_minuets = 5
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("min_delay_minuets"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// load_and_validate_str surfaces semantic validation failures.
#[test]
fn validation_rejects_inverted_delay_bounds() {
    let toml = r#"
[scheduler]
min_delay_minutes = 60
max_delay_minutes = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("bounds should fail validation");
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("max_delay_minutes"))
    );
}

/// Partial sections keep defaults for unspecified keys.
#[test]
fn partial_section_merges_with_defaults() {
    let toml = r#"
[scheduler]
min_delay_minutes = 20
"#;

    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.scheduler.min_delay_minutes, 20);
    assert_eq!(config.scheduler.max_delay_minutes, 90);
    assert_eq!(config.scheduler.poll_secs, 60);
}
