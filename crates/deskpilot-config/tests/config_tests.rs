// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for config loading and layering.

use deskpilot_config::{load_config_from_str, DeskpilotConfig};

#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    let defaults = DeskpilotConfig::default();
    assert_eq!(config.gateway.port, defaults.gateway.port);
    assert_eq!(config.confidence.high_conf_general, 0.70);
    assert_eq!(config.scheduling.timezone_label, "EST");
}

#[test]
fn partial_section_merges_over_defaults() {
    let config = load_config_from_str(
        r#"
        [gateway]
        port = 9100

        [confidence]
        high_conf_general = 0.8
        "#,
    )
    .unwrap();
    assert_eq!(config.gateway.port, 9100);
    assert_eq!(config.confidence.high_conf_general, 0.8);
    // Untouched keys keep defaults.
    assert_eq!(config.confidence.high_conf_compliance, 0.75);
    assert_eq!(config.gateway.host, "127.0.0.1");
}

#[test]
fn lexicon_overrides_replace_lists() {
    let config = load_config_from_str(
        r#"
        [lexicons]
        abuse_terms = ["grumble"]
        "#,
    )
    .unwrap();
    assert_eq!(config.lexicons.abuse_terms, vec!["grumble".to_string()]);
    // Other lexicons keep their defaults.
    assert!(!config.lexicons.compliance_terms.is_empty());
}

#[test]
fn unknown_keys_are_rejected() {
    let result = load_config_from_str(
        r#"
        [gateway]
        prot = 9100
        "#,
    );
    assert!(result.is_err(), "typo'd keys must fail fast");
}

#[test]
fn secrets_default_to_none() {
    let config = load_config_from_str("").unwrap();
    assert!(config.anthropic.api_key.is_none());
    assert!(config.gateway.user_webhook_secret.is_none());
    assert!(config.workspace.webhook_secret.is_none());
}

#[test]
fn scheduling_timezone_offset_parses() {
    let config = load_config_from_str(
        r#"
        [scheduling]
        timezone_offset_minutes = -480
        timezone_label = "PST"
        "#,
    )
    .unwrap();
    assert_eq!(config.scheduling.timezone_offset_minutes, -480);
    assert_eq!(config.scheduling.timezone_label, "PST");
}
