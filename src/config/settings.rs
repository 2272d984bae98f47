use super::ConfigError;
use crate::wizard::state::SetupType;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8660";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub setup_type: SetupType,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            setup_type: SetupType::default(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid(
                "server_url must be non-empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "server_url `{url}` must start with http:// or https://"
            )));
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_non_http_urls() {
        let config = ClientConfig {
            server_url: "ftp://example".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
