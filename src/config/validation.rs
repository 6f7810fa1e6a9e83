//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that certificate and key material have a source
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{ProxyConfig, TlsConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An address field does not parse as `ip:port`.
    InvalidAddress { field: &'static str, value: String },
    /// The listener has no `[listener.tls]` section.
    MissingTls,
    /// Neither inline PEM nor a path is set for the named material.
    MissingTlsSource { field: &'static str },
    /// The certificate monitor interval is zero.
    ZeroMonitorInterval,
    /// The admin API is enabled with the placeholder key.
    DefaultAdminKey,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidAddress { field, value } => {
                write!(f, "{} is not a valid socket address: {:?}", field, value)
            }
            ValidationError::MissingTls => write!(f, "listener.tls is required"),
            ValidationError::MissingTlsSource { field } => {
                write!(f, "listener.tls needs either {} or {}_path", field, field)
            }
            ValidationError::ZeroMonitorInterval => {
                write!(f, "tls_monitor.interval_secs must be greater than zero")
            }
            ValidationError::DefaultAdminKey => {
                write!(f, "admin.api_key must be changed when the admin API is enabled")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    match &config.listener.tls {
        Some(tls) => check_tls(&mut errors, tls),
        None => errors.push(ValidationError::MissingTls),
    }

    if config.tls_monitor.enabled && config.tls_monitor.interval_secs == 0 {
        errors.push(ValidationError::ZeroMonitorInterval);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key == crate::config::AdminConfig::default().api_key {
            errors.push(ValidationError::DefaultAdminKey);
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

fn check_tls(errors: &mut Vec<ValidationError>, tls: &TlsConfig) {
    if tls.cert.is_none() && tls.cert_path.is_none() {
        errors.push(ValidationError::MissingTlsSource { field: "cert" });
    }
    if tls.key.is_none() && tls.key_path.is_none() {
        errors.push(ValidationError::MissingTlsSource { field: "key" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: Some("cert.pem".into()),
            key_path: Some("key.pem".into()),
            ..Default::default()
        });
        config
    }

    #[test]
    fn default_with_tls_is_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = valid();
        config.listener.bind_address = "not-an-address".into();
        config.listener.tls = Some(TlsConfig::default());
        config.tls_monitor.interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroMonitorInterval));
        assert!(errors.contains(&ValidationError::MissingTlsSource { field: "cert" }));
        assert!(errors.contains(&ValidationError::MissingTlsSource { field: "key" }));
    }

    #[test]
    fn tls_section_is_required() {
        let mut config = valid();
        config.listener.tls = None;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::MissingTls]);
    }

    #[test]
    fn admin_needs_real_key() {
        let mut config = valid();
        config.admin.enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::DefaultAdminKey]
        );
        config.admin.api_key = "s3cret".into();
        assert!(validate_config(&config).is_ok());
    }
}
