//! Configuration and credential loading from disk.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ProxyConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load valid `user:password` credentials from a users file.
///
/// The file is line-structured; each line contributes its leading run of
/// `[A-Za-z0-9_:]` characters. Anything after that run (comments, trailing
/// junk) is ignored, and lines without such a run are skipped entirely.
/// The result is a membership set: duplicates collapse, order is irrelevant.
pub fn load_credentials(path: &Path) -> Result<HashSet<String>, std::io::Error> {
    let content = fs::read_to_string(path)?;
    Ok(extract_credentials(&content))
}

/// Extract the credential set from the raw users-file text.
pub fn extract_credentials(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| {
            let token: String = line
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
                .collect();
            if token.is_empty() {
                None
            } else {
                Some(token)
            }
        })
        .collect()
}
