// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Deskpilot dispatcher.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Every tunable the orchestration pipeline reads
//! lives here; no component holds its own global configuration.

use serde::{Deserialize, Serialize};

/// Top-level Deskpilot configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to production values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskpilotConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Inbound webhook server.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session store backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Retrieval-augmented answering.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Confidence thresholds gating answer-vs-escalate decisions.
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Demo slot generation and booking.
    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// Per-step and per-turn deadlines.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Keyword lexicons used by the classifier and the escalation gates.
    #[serde(default)]
    pub lexicons: LexiconConfig,

    /// Escalation policy knobs.
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Agent-workspace transport.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Outbound user-surface delivery.
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// Calendar provider endpoints.
    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in user-visible system lines.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "deskpilot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inbound webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for `POST /user/events` signatures.
    /// `None` disables verification (local development only).
    #[serde(default)]
    pub user_webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user_webhook_secret: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8700
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "deskpilot.db".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for classification and answer generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// API version header value.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Retrieval-augmented answering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Candidates fetched from the index before diversification.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// Chunks kept after MMR diversification.
    #[serde(default = "default_keep_k")]
    pub keep_k: usize,

    /// MMR relevance/diversity balance.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// Similarity below which a chunk does not count as supporting evidence.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,

    /// Minimum supporting chunks before an answer may exceed the
    /// low-confidence ceiling.
    #[serde(default = "default_min_supporting_chunks")]
    pub min_supporting_chunks: usize,

    /// AI turns to deduplicate new answers against.
    #[serde(default = "default_dedup_turns")]
    pub recent_ai_dedup_turns: usize,

    /// Vector index query endpoint. `None` in test wiring.
    #[serde(default)]
    pub index_url: Option<String>,

    /// Embedding service endpoint. `None` in test wiring.
    #[serde(default)]
    pub embedder_url: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fetch_k: default_fetch_k(),
            keep_k: default_keep_k(),
            mmr_lambda: default_mmr_lambda(),
            similarity_floor: default_similarity_floor(),
            min_supporting_chunks: default_min_supporting_chunks(),
            recent_ai_dedup_turns: default_dedup_turns(),
            index_url: None,
            embedder_url: None,
        }
    }
}

fn default_fetch_k() -> usize {
    20
}

fn default_keep_k() -> usize {
    5
}

fn default_mmr_lambda() -> f32 {
    0.7
}

fn default_similarity_floor() -> f32 {
    0.35
}

fn default_min_supporting_chunks() -> usize {
    2
}

fn default_dedup_turns() -> usize {
    3
}

/// Confidence thresholds gating the information path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceConfig {
    /// Answer threshold for general information queries.
    #[serde(default = "default_high_conf_general")]
    pub high_conf_general: f64,

    /// Answer threshold for compliance-specific queries (SOC2, HIPAA, GDPR,
    /// ISO 27001).
    #[serde(default = "default_high_conf_compliance")]
    pub high_conf_compliance: f64,

    /// Cap applied to enterprise-pricing answers regardless of model
    /// confidence, forcing escalation.
    #[serde(default = "default_med_conf_cap")]
    pub med_conf_cap: f64,

    /// Ceiling reported when retrieval evidence is too thin.
    #[serde(default = "default_low_confidence_ceil")]
    pub low_confidence_ceil: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high_conf_general: default_high_conf_general(),
            high_conf_compliance: default_high_conf_compliance(),
            med_conf_cap: default_med_conf_cap(),
            low_confidence_ceil: default_low_confidence_ceil(),
        }
    }
}

fn default_high_conf_general() -> f64 {
    0.70
}

fn default_high_conf_compliance() -> f64 {
    0.75
}

fn default_med_conf_cap() -> f64 {
    0.65
}

fn default_low_confidence_ceil() -> f64 {
    0.50
}

/// Demo slot generation and booking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulingConfig {
    /// First bookable hour of the organiser's day.
    #[serde(default = "default_business_start_hour")]
    pub business_start_hour: u32,

    /// Hour the organiser's day ends (exclusive).
    #[serde(default = "default_business_end_hour")]
    pub business_end_hour: u32,

    /// Buffer kept free before and after existing events, minutes.
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,

    /// Meeting length, minutes.
    #[serde(default = "default_slot_duration_minutes")]
    pub slot_duration_minutes: i64,

    /// Maximum offers presented per prompt.
    #[serde(default = "default_max_offers")]
    pub max_offers: usize,

    /// Business days to look ahead.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,

    /// Minimum notice before a slot may start, hours.
    #[serde(default = "default_min_advance_hours")]
    pub min_advance_hours: i64,

    /// Organiser timezone as minutes east of UTC (EST is -300).
    #[serde(default = "default_timezone_offset_minutes")]
    pub timezone_offset_minutes: i32,

    /// Label shown next to offered times.
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,

    /// Organiser identity placed on created events.
    #[serde(default)]
    pub organizer_email: Option<String>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            business_start_hour: default_business_start_hour(),
            business_end_hour: default_business_end_hour(),
            buffer_minutes: default_buffer_minutes(),
            slot_duration_minutes: default_slot_duration_minutes(),
            max_offers: default_max_offers(),
            days_ahead: default_days_ahead(),
            min_advance_hours: default_min_advance_hours(),
            timezone_offset_minutes: default_timezone_offset_minutes(),
            timezone_label: default_timezone_label(),
            organizer_email: None,
        }
    }
}

fn default_business_start_hour() -> u32 {
    9
}

fn default_business_end_hour() -> u32 {
    17
}

fn default_buffer_minutes() -> i64 {
    15
}

fn default_slot_duration_minutes() -> i64 {
    30
}

fn default_max_offers() -> usize {
    6
}

fn default_days_ahead() -> u32 {
    5
}

fn default_min_advance_hours() -> i64 {
    2
}

fn default_timezone_offset_minutes() -> i32 {
    -300
}

fn default_timezone_label() -> String {
    "EST".to_string()
}

/// Per-step and per-turn deadlines, seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_secs")]
    pub llm_secs: u64,

    #[serde(default = "default_vector_secs")]
    pub vector_secs: u64,

    #[serde(default = "default_calendar_secs")]
    pub calendar_secs: u64,

    #[serde(default = "default_workspace_secs")]
    pub workspace_secs: u64,

    /// End-to-end deadline for one user turn.
    #[serde(default = "default_turn_secs")]
    pub turn_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_secs: default_llm_secs(),
            vector_secs: default_vector_secs(),
            calendar_secs: default_calendar_secs(),
            workspace_secs: default_workspace_secs(),
            turn_secs: default_turn_secs(),
        }
    }
}

fn default_llm_secs() -> u64 {
    25
}

fn default_vector_secs() -> u64 {
    3
}

fn default_calendar_secs() -> u64 {
    5
}

fn default_workspace_secs() -> u64 {
    5
}

fn default_turn_secs() -> u64 {
    30
}

/// Keyword lexicons feeding the classifier and escalation gates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LexiconConfig {
    /// Compliance frameworks that raise the answer threshold.
    #[serde(default = "default_compliance_terms")]
    pub compliance_terms: Vec<String>,

    /// Phrases that force escalation regardless of confidence.
    #[serde(default = "default_urgency_terms")]
    pub urgency_terms: Vec<String>,

    /// Hostile/abusive vocabulary.
    #[serde(default = "default_abuse_terms")]
    pub abuse_terms: Vec<String>,

    /// Phrases marking enterprise-tier pricing questions.
    #[serde(default = "default_enterprise_pricing_terms")]
    pub enterprise_pricing_terms: Vec<String>,

    /// Explicit requests to reach a human.
    #[serde(default = "default_human_request_terms")]
    pub human_request_terms: Vec<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            compliance_terms: default_compliance_terms(),
            urgency_terms: default_urgency_terms(),
            abuse_terms: default_abuse_terms(),
            enterprise_pricing_terms: default_enterprise_pricing_terms(),
            human_request_terms: default_human_request_terms(),
        }
    }
}

fn default_compliance_terms() -> Vec<String> {
    ["soc2", "soc 2", "hipaa", "gdpr", "iso27001", "iso 27001"]
        .map(String::from)
        .to_vec()
}

fn default_urgency_terms() -> Vec<String> {
    ["urgent", "asap", "immediately", "critical", "emergency", "outage"]
        .map(String::from)
        .to_vec()
}

fn default_abuse_terms() -> Vec<String> {
    [
        "trash", "garbage", "useless", "pathetic", "stupid", "idiotic", "wtf",
        "bullshit", "fuck", "fucking", "worst",
    ]
    .map(String::from)
    .to_vec()
}

fn default_enterprise_pricing_terms() -> Vec<String> {
    [
        "enterprise pricing",
        "enterprise tier",
        "enterprise plan",
        "volume discount",
        "custom quote",
        "procurement",
    ]
    .map(String::from)
    .to_vec()
}

fn default_human_request_terms() -> Vec<String> {
    [
        "speak with a human",
        "talk to a human",
        "talk to a person",
        "speak to someone",
        "connect me with",
        "real person",
        "human agent",
    ]
    .map(String::from)
    .to_vec()
}

/// Escalation policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// User-turn window inside which a second abusive message escalates.
    #[serde(default = "default_abuse_window_turns")]
    pub abuse_window_turns: usize,

    /// Seat count at or above which enterprise-pricing questions escalate
    /// without an answer stub.
    #[serde(default = "default_enterprise_seat_threshold")]
    pub enterprise_seat_threshold: u32,

    /// User/AI exchanges summarised on the ticket card.
    #[serde(default = "default_summary_exchanges")]
    pub summary_exchanges: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            abuse_window_turns: default_abuse_window_turns(),
            enterprise_seat_threshold: default_enterprise_seat_threshold(),
            summary_exchanges: default_summary_exchanges(),
        }
    }
}

fn default_abuse_window_turns() -> usize {
    5
}

fn default_enterprise_seat_threshold() -> u32 {
    200
}

fn default_summary_exchanges() -> usize {
    5
}

/// Agent-workspace transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Workspace API base URL. `None` in test wiring.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Channel tickets are posted into.
    #[serde(default = "default_workspace_channel")]
    pub channel: String,

    /// API token for outbound calls.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Shared secret verifying inbound workspace webhooks.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            channel: default_workspace_channel(),
            api_token: None,
            webhook_secret: None,
        }
    }
}

fn default_workspace_channel() -> String {
    "support-escalations".to_string()
}

/// Outbound user-surface configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Callback URL the dispatcher posts outbound messages to.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// API token for outbound calls.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Calendar provider configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    /// Calendar API base URL. `None` in test wiring.
    #[serde(default)]
    pub base_url: Option<String>,

    /// API token for freebusy and event creation.
    #[serde(default)]
    pub api_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_values() {
        let config = DeskpilotConfig::default();
        assert_eq!(config.confidence.high_conf_general, 0.70);
        assert_eq!(config.confidence.high_conf_compliance, 0.75);
        assert_eq!(config.confidence.med_conf_cap, 0.65);
        assert_eq!(config.confidence.low_confidence_ceil, 0.50);
        assert_eq!(config.scheduling.business_start_hour, 9);
        assert_eq!(config.scheduling.business_end_hour, 17);
        assert_eq!(config.scheduling.buffer_minutes, 15);
        assert_eq!(config.scheduling.slot_duration_minutes, 30);
        assert_eq!(config.scheduling.max_offers, 6);
        assert_eq!(config.timeouts.llm_secs, 25);
        assert_eq!(config.timeouts.turn_secs, 30);
    }

    #[test]
    fn lexicon_defaults_nonempty() {
        let lex = LexiconConfig::default();
        assert!(!lex.compliance_terms.is_empty());
        assert!(!lex.urgency_terms.is_empty());
        assert!(!lex.abuse_terms.is_empty());
        assert!(!lex.enterprise_pricing_terms.is_empty());
        assert!(!lex.human_request_terms.is_empty());
    }
}
