// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cadence outreach engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup with an actionable error message.

use cadence_core::types::{ScenarioConfig, ScenarioStep};
use serde::{Deserialize, Serialize};

/// Top-level Cadence configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Engine identity and logging settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Intake buffer settings.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Draft generator API settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Messaging platform API settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Send-delay scheduling settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Dispatch retry settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Drift reconciliation settings.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Auto-mode category toggles.
    #[serde(default)]
    pub automode: AutoModeConfig,

    /// Ad-response script scenario.
    #[serde(default = "default_scenario")]
    pub scenario: ScenarioConfig,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            storage: StorageConfig::default(),
            intake: IntakeConfig::default(),
            generator: GeneratorConfig::default(),
            platform: PlatformConfig::default(),
            scheduler: SchedulerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            reconciler: ReconcilerConfig::default(),
            automode: AutoModeConfig::default(),
            scenario: default_scenario(),
        }
    }
}

/// Engine identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Display name of this engine instance.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_engine_name() -> String {
    "cadence".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
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
    "cadence.db".to_string()
}

/// Intake buffer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Coalescing window in seconds, measured from the first unconsumed
    /// fragment of a contact's burst.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often the flush loop checks for expired windows, in seconds.
    #[serde(default = "default_flush_poll_secs")]
    pub flush_poll_secs: u64,

    /// How often the platform is polled for new inbound fragments, in seconds.
    #[serde(default = "default_inbound_poll_secs")]
    pub inbound_poll_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            flush_poll_secs: default_flush_poll_secs(),
            inbound_poll_secs: default_inbound_poll_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    15
}

fn default_flush_poll_secs() -> u64 {
    1
}

fn default_inbound_poll_secs() -> u64 {
    5
}

/// Draft generator API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Base URL of the draft generator service.
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token. Empty disables authentication.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,

    /// Bounded retry count for transient failures (429/5xx/timeout).
    #[serde(default = "default_generator_max_retries")]
    pub max_retries: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_base_url(),
            api_key: String::new(),
            timeout_secs: default_generator_timeout_secs(),
            max_retries: default_generator_max_retries(),
        }
    }
}

fn default_generator_base_url() -> String {
    "http://127.0.0.1:8801".to_string()
}

fn default_generator_timeout_secs() -> u64 {
    60
}

fn default_generator_max_retries() -> u32 {
    3
}

/// Messaging platform API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Base URL of the messaging platform bridge.
    #[serde(default = "default_platform_base_url")]
    pub base_url: String,

    /// API token sent as a bearer token. Empty disables authentication.
    #[serde(default)]
    pub api_token: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_platform_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_platform_base_url(),
            api_token: String::new(),
            timeout_secs: default_platform_timeout_secs(),
        }
    }
}

fn default_platform_base_url() -> String {
    "http://127.0.0.1:8802".to_string()
}

fn default_platform_timeout_secs() -> u64 {
    30
}

/// Send-delay scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Minimum human-plausible send delay, in minutes (inclusive).
    #[serde(default = "default_min_delay_minutes")]
    pub min_delay_minutes: i64,

    /// Maximum human-plausible send delay, in minutes (inclusive).
    #[serde(default = "default_max_delay_minutes")]
    pub max_delay_minutes: i64,

    /// How often due sends are polled, in seconds.
    #[serde(default = "default_scheduler_poll_secs")]
    pub poll_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_delay_minutes: default_min_delay_minutes(),
            max_delay_minutes: default_max_delay_minutes(),
            poll_secs: default_scheduler_poll_secs(),
        }
    }
}

fn default_min_delay_minutes() -> i64 {
    10
}

fn default_max_delay_minutes() -> i64 {
    90
}

fn default_scheduler_poll_secs() -> u64 {
    60
}

/// Dispatch retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Delivery attempts before a send is cancelled and surfaced as an error.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> i64 {
    3
}

/// Drift reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Sweep interval in seconds.
    #[serde(default = "default_reconciler_interval_secs")]
    pub interval_secs: u64,

    /// Grace period past `scheduled_at` before a still-scheduled send counts
    /// as drift, in minutes.
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconciler_interval_secs(),
            grace_minutes: default_grace_minutes(),
        }
    }
}

fn default_reconciler_interval_secs() -> u64 {
    3600
}

fn default_grace_minutes() -> i64 {
    30
}

/// Auto-mode category toggles and the first-contact safety rail.
///
/// These are process-wide startup defaults; the live values are held in the
/// engine's toggle store, which the control surface can flip at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoModeConfig {
    /// Allow general conversation replies to skip human review.
    #[serde(default)]
    pub general: bool,

    /// Allow ad-script replies to skip human review.
    #[serde(default)]
    pub ad_flow: bool,

    /// Allow paying-client replies to skip human review.
    #[serde(default)]
    pub client_care: bool,

    /// Force first-time contacts through human review regardless of toggles.
    #[serde(default = "default_force_review_first_contact")]
    pub force_review_first_contact: bool,
}

impl Default for AutoModeConfig {
    fn default() -> Self {
        Self {
            general: false,
            ad_flow: false,
            client_care: false,
            force_review_first_contact: default_force_review_first_contact(),
        }
    }
}

fn default_force_review_first_contact() -> bool {
    true
}

/// Default ad-response script used when no scenario is configured: a short
/// question-led funnel matching the source system's five-step flow.
pub fn default_scenario() -> ScenarioConfig {
    ScenarioConfig {
        steps: vec![
            ScenarioStep {
                name: "goal".to_string(),
                trigger: r"(?i)\b(goal|lose|gain|fit|weight)\b".to_string(),
            },
            ScenarioStep {
                name: "availability".to_string(),
                trigger: r"(?i)\b(week|day|morning|evening|time)\b".to_string(),
            },
            ScenarioStep {
                name: "commitment".to_string(),
                trigger: r"(?i)\b(yes|yeah|sure|ready|ok(ay)?)\b".to_string(),
            },
        ],
    }
}
