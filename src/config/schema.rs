//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Proxy authorization settings.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Whether the listener terminates TLS.
    ///
    /// Drives the `proto` field of injected `forwarded` tokens.
    pub fn tls_terminated(&self) -> bool {
        self.listener.tls.is_some()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Proxy authorization configuration.
///
/// Authorization is enabled iff a users file is configured. The file is
/// line-structured; the leading `user:password` token of each line is a
/// valid credential.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Path to the users file. `None` disables authorization.
    pub users_file: Option<String>,
}

impl AuthConfig {
    /// Whether proxy authorization is enabled.
    pub fn enabled(&self) -> bool {
        self.users_file.is_some()
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Destination connection establishment timeout in seconds.
    /// Applies to CONNECT tunnels and outbound forwarding alike.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 10 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_plaintext_and_open() {
        let config = ProxyConfig::default();
        assert!(!config.tls_terminated());
        assert!(!config.auth.enabled());
        assert_eq!(config.timeouts.connect_secs, 10);
    }

    #[test]
    fn minimal_toml_parses() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn tls_section_enables_https_proto() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener.tls]
            cert_path = "cert.pem"
            key_path = "key.pem"
            "#,
        )
        .unwrap();
        assert!(config.tls_terminated());
    }
}
