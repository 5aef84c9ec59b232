// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and positive
//! distribution limits.

use crate::diagnostic::ConfigError;
use crate::model::LeadflowConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate server.host is not empty and looks like an IP or hostname
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Validate distribution limits
    if config.distribution.batch_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "distribution.batch_limit must be at least 1".to_string(),
        });
    }

    // Validate presence window and roles
    if config.presence.staleness_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "presence.staleness_secs must be at least 1".to_string(),
        });
    }

    if config.presence.roles.is_empty() {
        errors.push(ConfigError::Validation {
            message: "presence.roles must name at least one role".to_string(),
        });
    }

    // Validate ingest settings when enabled
    if config.ingest.enabled && config.ingest.drop_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "ingest.drop_dir must not be empty when ingest is enabled".to_string(),
        });
    }

    // Validate scheduler expression presence (parse happens at startup)
    if config.scheduler.enabled && config.scheduler.requeue_schedule.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "scheduler.requeue_schedule must not be empty when the scheduler is enabled"
                .to_string(),
        });
    }

    // A partially configured board is almost always a deployment mistake.
    let board_parts = [
        config.board.key.is_some(),
        config.board.token.is_some(),
        config.board.confirmed_list.is_some(),
    ];
    let configured = board_parts.iter().filter(|p| **p).count();
    if configured > 0 && configured < board_parts.len() {
        errors.push(ConfigError::Validation {
            message: "board mirroring requires board.key, board.token, and board.confirmed_list \
                      to all be set (or all be absent)"
                .to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = LeadflowConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = LeadflowConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_batch_limit_fails_validation() {
        let mut config = LeadflowConfig::default();
        config.distribution.batch_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("batch_limit"))));
    }

    #[test]
    fn zero_staleness_fails_validation() {
        let mut config = LeadflowConfig::default();
        config.presence.staleness_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("staleness_secs"))));
    }

    #[test]
    fn empty_roles_fails_validation() {
        let mut config = LeadflowConfig::default();
        config.presence.roles.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("roles"))));
    }

    #[test]
    fn partially_configured_board_fails_validation() {
        let mut config = LeadflowConfig::default();
        config.board.key = Some("k".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("board"))));
    }

    #[test]
    fn fully_configured_board_passes() {
        let mut config = LeadflowConfig::default();
        config.board.key = Some("k".to_string());
        config.board.token = Some("t".to_string());
        config.board.confirmed_list = Some("list-1".to_string());
        assert!(validate_config(&config).is_ok());
        assert!(config.board.is_configured());
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = LeadflowConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.distribution.min_delay_secs = 600;
        assert!(validate_config(&config).is_ok());
    }
}
