//! Configuration management for Docportal
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PortalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Docportal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server location, timeouts and endpoint paths
    #[serde(default)]
    pub server: ServerConfig,
    /// Client-side file selection constraints
    #[serde(default)]
    pub upload: UploadConfig,
    /// Notification behavior
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the document portal service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every request (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Paths of the enumerated endpoints, relative to `base_url`
    #[serde(default)]
    pub endpoints: EndpointPaths,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            endpoints: EndpointPaths::default(),
        }
    }
}

impl ServerConfig {
    /// Per-request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Endpoint paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
    #[serde(default = "default_analysis_path")]
    pub analysis: String,
    #[serde(default = "default_comparison_path")]
    pub comparison: String,
    #[serde(default = "default_qa_turn_path")]
    pub qa_turn: String,
    #[serde(default = "default_qa_session_recover_path")]
    pub qa_session_recover: String,
    #[serde(default = "default_qa_end_path")]
    pub qa_end: String,
    #[serde(default = "default_qa_clear_path")]
    pub qa_clear: String,
}

fn default_analysis_path() -> String {
    "/document_analysis".to_string()
}

fn default_comparison_path() -> String {
    "/document_comparison".to_string()
}

fn default_qa_turn_path() -> String {
    "/document_qa_chat".to_string()
}

fn default_qa_session_recover_path() -> String {
    "/document_qa_chat/session".to_string()
}

fn default_qa_end_path() -> String {
    "/document_qa_chat/end".to_string()
}

fn default_qa_clear_path() -> String {
    "/document_qa_chat/clear".to_string()
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            analysis: default_analysis_path(),
            comparison: default_comparison_path(),
            qa_turn: default_qa_turn_path(),
            qa_session_recover: default_qa_session_recover_path(),
            qa_end: default_qa_end_path(),
            qa_clear: default_qa_clear_path(),
        }
    }
}

impl EndpointPaths {
    fn all(&self) -> [(&'static str, &str); 6] {
        [
            ("analysis", &self.analysis),
            ("comparison", &self.comparison),
            ("qa_turn", &self.qa_turn),
            ("qa_session_recover", &self.qa_session_recover),
            ("qa_end", &self.qa_end),
            ("qa_clear", &self.qa_clear),
        ]
    }
}

/// File selection constraints enforced before any transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of files per request
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single file (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Allowed file extensions, with leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    [".pdf", ".doc", ".docx", ".txt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size_bytes: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Time after which a notification dismisses itself (milliseconds)
    #[serde(default = "default_dismiss_after_ms")]
    pub dismiss_after_ms: u64,
}

fn default_dismiss_after_ms() -> u64 {
    5000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dismiss_after_ms: default_dismiss_after_ms(),
        }
    }
}

impl NotificationConfig {
    /// Auto-dismiss delay as a [`Duration`]
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PortalError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PortalError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("DOCPORTAL_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: DOCPORTAL_BASE_URL");
            self.server.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("DOCPORTAL_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.server.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid DOCPORTAL_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(max_files) = std::env::var("DOCPORTAL_MAX_FILES") {
            if let Ok(value) = max_files.parse() {
                self.upload.max_files = value;
            } else {
                tracing::warn!("Invalid DOCPORTAL_MAX_FILES: {}", max_files);
            }
        }

        if let Ok(max_size) = std::env::var("DOCPORTAL_MAX_FILE_SIZE_BYTES") {
            if let Ok(value) = max_size.parse() {
                self.upload.max_file_size_bytes = value;
            } else {
                tracing::warn!("Invalid DOCPORTAL_MAX_FILE_SIZE_BYTES: {}", max_size);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.server.base_url = base_url.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.server.base_url).map_err(|e| {
            PortalError::Config(format!(
                "Invalid server.base_url {}: {}",
                self.server.base_url, e
            ))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(PortalError::Config(format!(
                "server.base_url must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        if self.server.timeout_seconds == 0 {
            return Err(PortalError::Config(
                "server.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, path) in self.server.endpoints.all() {
            if !path.starts_with('/') {
                return Err(PortalError::Config(format!(
                    "server.endpoints.{} must start with '/', got {}",
                    name, path
                ))
                .into());
            }
        }

        if self.upload.max_files == 0 {
            return Err(
                PortalError::Config("upload.max_files must be greater than 0".to_string()).into(),
            );
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(PortalError::Config(
                "upload.max_file_size_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(PortalError::Config(
                "upload.allowed_extensions cannot be empty".to_string(),
            )
            .into());
        }

        if let Some(ext) = self
            .upload
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(PortalError::Config(format!(
                "upload.allowed_extensions entries must look like '.pdf', got {}",
                ext
            ))
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.server.timeout_seconds, 120);
        assert_eq!(config.upload.max_files, 5);
        assert_eq!(config.upload.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.upload.allowed_extensions,
            vec![".pdf", ".doc", ".docx", ".txt"]
        );
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let mut config = Config::default();
        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.server.base_url = "ftp://files.example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.server.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_endpoint_without_slash() {
        let mut config = Config::default();
        config.server.endpoints.qa_end = "end".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("qa_end"));
    }

    #[test]
    fn test_config_validation_upload_limits() {
        let mut config = Config::default();
        config.upload.max_files = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.max_file_size_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.allowed_extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.allowed_extensions = vec!["pdf".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  base_url: https://portal.example.com
  timeout_seconds: 30
  endpoints:
    qa_turn: /api/qa
upload:
  max_files: 3
notifications:
  dismiss_after_ms: 1500
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.base_url, "https://portal.example.com");
        assert_eq!(config.server.timeout(), Duration::from_secs(30));
        assert_eq!(config.server.endpoints.qa_turn, "/api/qa");
        assert_eq!(config.server.endpoints.qa_end, "/document_qa_chat/end");
        assert_eq!(config.upload.max_files, 3);
        assert_eq!(config.upload.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.notifications.dismiss_after(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/docportal.yaml", &cli).unwrap();
        assert_eq!(config.upload.max_files, 5);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("DOCPORTAL_BASE_URL", "http://10.1.1.1:9000");
        std::env::set_var("DOCPORTAL_TIMEOUT_SECONDS", "15");
        std::env::set_var("DOCPORTAL_MAX_FILES", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("DOCPORTAL_BASE_URL");
        std::env::remove_var("DOCPORTAL_TIMEOUT_SECONDS");
        std::env::remove_var("DOCPORTAL_MAX_FILES");

        assert_eq!(config.server.base_url, "http://10.1.1.1:9000");
        assert_eq!(config.server.timeout_seconds, 15);
        assert_eq!(config.upload.max_files, 5);
    }

    #[test]
    #[serial]
    fn test_cli_base_url_wins_over_env() {
        std::env::set_var("DOCPORTAL_BASE_URL", "http://from-env:1");
        let cli = crate::cli::Cli {
            base_url: Some("http://from-cli:2".to_string()),
            ..crate::cli::Cli::default()
        };
        let config = Config::load("/nonexistent/docportal.yaml", &cli).unwrap();
        std::env::remove_var("DOCPORTAL_BASE_URL");

        assert_eq!(config.server.base_url, "http://from-cli:2");
    }
}
