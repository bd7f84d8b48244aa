//! Listener settings loaded from `.env` / the environment.

use std::path::PathBuf;

/// HTTP server configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | SHEVANTA_HOST | 127.0.0.1 | Bind address. |
/// | SHEVANTA_PORT | 5000 | Bind port. |
/// | SHEVANTA_MAX_UPLOAD_BYTES | 26214400 | Request body limit (audio uploads). |
/// | SHEVANTA_CORS_ORIGINS | (any) | Comma-separated allowed origins. |
/// | SHEVANTA_LOG_DIR | — | Also write a daily-rolling log file here. |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 25 * 1024 * 1024,
            cors_origins: Vec::new(),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load from environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_opt_string("SHEVANTA_HOST").unwrap_or(defaults.host),
            port: env_parse("SHEVANTA_PORT", defaults.port),
            max_upload_bytes: env_parse("SHEVANTA_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            cors_origins: env_opt_string("SHEVANTA_CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            log_dir: env_opt_string("SHEVANTA_LOG_DIR").map(PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_opt_string(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
