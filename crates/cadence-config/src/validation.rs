// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express: delay
//! bounds, non-zero windows, and that the scenario forms a valid transition
//! table (compiling trigger regexes, no duplicate step names).

use thiserror::Error;

use crate::model::CadenceConfig;

/// A configuration validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CadenceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.intake.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "intake.window_secs must be greater than zero".to_string(),
        });
    }

    if config.scheduler.min_delay_minutes < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.min_delay_minutes must be non-negative, got {}",
                config.scheduler.min_delay_minutes
            ),
        });
    }

    if config.scheduler.max_delay_minutes < config.scheduler.min_delay_minutes {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.max_delay_minutes ({}) must be >= scheduler.min_delay_minutes ({})",
                config.scheduler.max_delay_minutes, config.scheduler.min_delay_minutes
            ),
        });
    }

    if config.dispatcher.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatcher.max_attempts must be at least 1, got {}",
                config.dispatcher.max_attempts
            ),
        });
    }

    if config.reconciler.grace_minutes < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "reconciler.grace_minutes must be non-negative, got {}",
                config.reconciler.grace_minutes
            ),
        });
    }

    // Scenario steps must form a usable transition table.
    let mut seen_names = std::collections::HashSet::new();
    for (i, step) in config.scenario.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("scenario.steps[{i}].name must not be empty"),
            });
        }
        if !seen_names.insert(step.name.clone()) {
            errors.push(ConfigError::Validation {
                message: format!("scenario step name `{}` is duplicated", step.name),
            });
        }
        if let Err(e) = regex::Regex::new(&step.trigger) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "scenario.steps[{i}].trigger is not a valid regex: {e}"
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::{ScenarioConfig, ScenarioStep};

    #[test]
    fn default_config_is_valid() {
        let config = CadenceConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn inverted_delay_bounds_are_rejected() {
        let mut config = CadenceConfig::default();
        config.scheduler.min_delay_minutes = 90;
        config.scheduler.max_delay_minutes = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("max_delay_minutes"))
        );
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = CadenceConfig::default();
        config.intake.window_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn bad_scenario_regex_is_rejected() {
        let mut config = CadenceConfig::default();
        config.scenario = ScenarioConfig {
            steps: vec![ScenarioStep {
                name: "broken".to_string(),
                trigger: "(unclosed".to_string(),
            }],
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("not a valid regex"));
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let mut config = CadenceConfig::default();
        config.scenario = ScenarioConfig {
            steps: vec![
                ScenarioStep {
                    name: "goal".to_string(),
                    trigger: "a".to_string(),
                },
                ScenarioStep {
                    name: "goal".to_string(),
                    trigger: "b".to_string(),
                },
            ],
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("duplicated")));
    }

    #[test]
    fn all_errors_are_collected_not_fail_fast() {
        let mut config = CadenceConfig::default();
        config.storage.database_path = "  ".to_string();
        config.intake.window_secs = 0;
        config.dispatcher.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
