//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first one.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MonitorConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("proxy.target.host must not be empty")]
    EmptyTargetHost,

    #[error("proxy.target.port must be between 1 and 65535")]
    InvalidTargetPort,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "proxy.bind_address", &config.proxy.bind_address);
    check_address(&mut errors, "dashboard.bind_address", &config.dashboard.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.proxy.target.host.trim().is_empty() {
        errors.push(ValidationError::EmptyTargetHost);
    }
    if config.proxy.target.port == 0 {
        errors.push(ValidationError::InvalidTargetPort);
    }

    let monitoring = &config.monitoring;
    let positive = [
        ("monitoring.latency_window", monitoring.latency_window as u64),
        ("monitoring.recent_endpoints", monitoring.recent_endpoints as u64),
        ("monitoring.max_tracked_endpoints", monitoring.max_tracked_endpoints as u64),
        ("monitoring.snapshot_interval_ms", monitoring.snapshot_interval_ms),
        ("monitoring.event_buffer", monitoring.event_buffer as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MonitorConfig::default();
        config.proxy.bind_address = "not-an-address".into();
        config.monitoring.latency_window = 0;
        config.timeouts.connect_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidAddress {
                    field: "proxy.bind_address",
                    value: "not-an-address".into(),
                },
                ValidationError::Zero { field: "monitoring.latency_window" },
                ValidationError::Zero { field: "timeouts.connect_secs" },
            ]
        );
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = MonitorConfig::default();
        config.observability.metrics_address = "garbage".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
