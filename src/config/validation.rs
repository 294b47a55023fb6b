//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the bind address parses
//! - Check TLS cert/key paths come as a pair
//! - Validate value ranges (timeouts > 0, connection limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The listener bind address is not a valid socket address.
    InvalidBindAddress(String),
    /// TLS is configured with an empty certificate or key path.
    IncompleteTls,
    /// max_connections must be at least 1.
    ZeroConnectionLimit,
    /// connect_secs must be at least 1.
    ZeroConnectTimeout,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid bind address: {}", addr)
            }
            ValidationError::IncompleteTls => {
                write!(f, "TLS requires both cert_path and key_path")
            }
            ValidationError::ZeroConnectionLimit => {
                write!(f, "listener.max_connections must be at least 1")
            }
            ValidationError::ZeroConnectTimeout => {
                write!(f, "timeouts.connect_secs must be at least 1")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnectionLimit);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    // Basic credentials over plaintext HTTP are readable by anyone on path.
    if config.auth.enabled() && !config.tls_terminated() {
        tracing::warn!("basic authorization over plain HTTP is unsafe, consider enabling TLS");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
