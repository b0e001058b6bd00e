//! Configuration module for studio-drive.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::media::CleanupPolicy;
use crate::{Result, StudioError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins. Empty means any origin without credentials.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Rate limit for all drive API endpoints (requests per minute, per IP).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
    /// Whether to serve Swagger UI at `/swagger-ui`.
    #[serde(default = "default_swagger")]
    pub swagger: bool,
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_api_rate_limit() -> u32 {
    300
}

fn default_swagger() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            api_rate_limit: default_api_rate_limit(),
            swagger: default_swagger(),
        }
    }
}

/// Which storage provider implementation backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveBackend {
    /// Google Drive v3 REST API.
    Google,
    /// Process-local in-memory tree (development and tests).
    Memory,
}

/// Storage provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Provider implementation.
    #[serde(default = "default_backend")]
    pub backend: DriveBackend,
    /// Base URL for metadata calls.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base URL for media upload calls.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
    /// Parent folder under which project folders are created.
    #[serde(default)]
    pub root_folder_id: String,
    /// Bearer token obtained from the service-account exchange.
    #[serde(default)]
    pub access_token: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> DriveBackend {
    DriveBackend::Google
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_request_timeout() -> u64 {
    600
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            root_folder_id: String::new(),
            access_token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Upload limits for the server guard and the client queue.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Upload requests allowed per caller in a sliding one-minute window.
    #[serde(default = "default_upload_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Maximum transfers in flight per upload queue.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// How long a completed task stays visible, in milliseconds.
    #[serde(default = "default_completed_grace")]
    pub completed_grace_ms: u64,
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 * 1024 // 5GB
}

fn default_upload_rate_limit() -> u32 {
    10
}

fn default_max_concurrent() -> usize {
    3
}

fn default_completed_grace() -> u64 {
    2000
}

impl UploadsConfig {
    /// Grace period as a duration.
    pub fn completed_grace(&self) -> Duration {
        Duration::from_millis(self.completed_grace_ms)
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            rate_limit_per_minute: default_upload_rate_limit(),
            max_concurrent: default_max_concurrent(),
            completed_grace_ms: default_completed_grace(),
        }
    }
}

/// File listing cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a listing entry in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl CacheConfig {
    /// TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Folder provisioning configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfig {
    /// What to do with folders created before a provisioning failure.
    #[serde(default)]
    pub cleanup: CleanupPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Storage provider configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Upload limits.
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// Listing cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Folder provisioning.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StudioError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StudioError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STUDIO_DRIVE_ROOT_FOLDER_ID`: parent folder for project folders
    /// - `STUDIO_DRIVE_ACCESS_TOKEN`: provider bearer token
    /// - `MAX_FILE_SIZE`: maximum upload size in bytes
    /// - `UPLOAD_RATE_LIMIT`: upload requests per minute
    /// - `FRONTEND_URL`: single allowed CORS origin
    /// - `PORT`: listen port
    ///
    /// Empty or unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_non_empty("STUDIO_DRIVE_ROOT_FOLDER_ID") {
            self.drive.root_folder_id = v;
        }
        if let Some(v) = env_non_empty("STUDIO_DRIVE_ACCESS_TOKEN") {
            self.drive.access_token = v;
        }
        if let Some(v) = env_non_empty("MAX_FILE_SIZE").and_then(|v| v.parse().ok()) {
            self.uploads.max_file_size_bytes = v;
        }
        if let Some(v) = env_non_empty("UPLOAD_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.uploads.rate_limit_per_minute = v;
        }
        if let Some(v) = env_non_empty("FRONTEND_URL") {
            self.web.cors_origins = vec![v];
        }
        if let Some(v) = env_non_empty("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = v;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the Google backend is selected without a root folder or token
    /// - any upload limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.drive.backend == DriveBackend::Google {
            if self.drive.root_folder_id.is_empty() {
                return Err(StudioError::Config(
                    "drive.root_folder_id is not set. \
                     Set it in config.toml or via STUDIO_DRIVE_ROOT_FOLDER_ID."
                        .to_string(),
                ));
            }
            if self.drive.access_token.is_empty() {
                return Err(StudioError::Config(
                    "drive.access_token is not set. \
                     Set it in config.toml or via STUDIO_DRIVE_ACCESS_TOKEN."
                        .to_string(),
                ));
            }
        }
        if self.uploads.max_file_size_bytes == 0 {
            return Err(StudioError::Config(
                "uploads.max_file_size_bytes must be positive".to_string(),
            ));
        }
        if self.uploads.rate_limit_per_minute == 0 {
            return Err(StudioError::Config(
                "uploads.rate_limit_per_minute must be positive".to_string(),
            ));
        }
        if self.uploads.max_concurrent == 0 {
            return Err(StudioError::Config(
                "uploads.max_concurrent must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);

        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.api_rate_limit, 300);
        assert!(config.web.swagger);

        assert_eq!(config.drive.backend, DriveBackend::Google);
        assert_eq!(config.drive.api_base, "https://www.googleapis.com/drive/v3");
        assert_eq!(
            config.drive.upload_base,
            "https://www.googleapis.com/upload/drive/v3"
        );
        assert!(config.drive.root_folder_id.is_empty());

        assert_eq!(config.uploads.max_file_size_bytes, 5_368_709_120);
        assert_eq!(config.uploads.rate_limit_per_minute, 10);
        assert_eq!(config.uploads.max_concurrent, 3);
        assert_eq!(config.uploads.completed_grace(), Duration::from_secs(2));

        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.provisioning.cleanup, CleanupPolicy::Keep);

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[web]
cors_origins = ["https://studio.example.com"]
api_rate_limit = 50
swagger = false

[drive]
backend = "memory"
api_base = "http://localhost:9000/drive/v3"
upload_base = "http://localhost:9000/upload/drive/v3"
root_folder_id = "root-123"
access_token = "token"
request_timeout_secs = 30

[uploads]
max_file_size_bytes = 1048576
rate_limit_per_minute = 4
max_concurrent = 2
completed_grace_ms = 500

[cache]
ttl_secs = 60

[provisioning]
cleanup = "best_effort"

[logging]
level = "debug"
file = "logs/studio.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.web.cors_origins, vec!["https://studio.example.com"]);
        assert_eq!(config.web.api_rate_limit, 50);
        assert!(!config.web.swagger);
        assert_eq!(config.drive.backend, DriveBackend::Memory);
        assert_eq!(config.drive.root_folder_id, "root-123");
        assert_eq!(config.drive.request_timeout_secs, 30);
        assert_eq!(config.uploads.max_file_size_bytes, 1_048_576);
        assert_eq!(config.uploads.rate_limit_per_minute, 4);
        assert_eq!(config.uploads.max_concurrent, 2);
        assert_eq!(config.uploads.completed_grace(), Duration::from_millis(500));
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.provisioning.cleanup, CleanupPolicy::BestEffort);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("logs/studio.log"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[uploads]
rate_limit_per_minute = 20
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.uploads.rate_limit_per_minute, 20);
        assert_eq!(config.uploads.max_concurrent, 3);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.drive.backend, DriveBackend::Google);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(StudioError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_cleanup_policy() {
        let toml = r#"
[provisioning]
cleanup = "rollback"
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(StudioError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides() {
        let keys = ["STUDIO_DRIVE_ROOT_FOLDER_ID", "UPLOAD_RATE_LIMIT"];
        let originals: Vec<_> = keys.iter().map(|k| std::env::var(k).ok()).collect();

        std::env::set_var("STUDIO_DRIVE_ROOT_FOLDER_ID", "env-root");
        std::env::set_var("UPLOAD_RATE_LIMIT", "not-a-number");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.drive.root_folder_id, "env-root");
        // Unparsable values keep the configured default
        assert_eq!(config.uploads.rate_limit_per_minute, 10);

        for (key, original) in keys.iter().zip(originals) {
            match original {
                Some(val) => std::env::set_var(key, val),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_validate_google_requires_root_folder() {
        let mut config = Config::default();
        config.drive.access_token = "token".to_string();

        let result = config.validate();
        if let Err(StudioError::Config(msg)) = result {
            assert!(msg.contains("root_folder_id"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_google_requires_token() {
        let mut config = Config::default();
        config.drive.root_folder_id = "root".to_string();

        let result = config.validate();
        assert!(matches!(result, Err(StudioError::Config(msg)) if msg.contains("access_token")));
    }

    #[test]
    fn test_validate_memory_backend() {
        let mut config = Config::default();
        config.drive.backend = DriveBackend::Memory;
        assert!(config.validate().is_ok());

        config.uploads.max_concurrent = 0;
        assert!(config.validate().is_err());
    }
}
