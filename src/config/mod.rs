//! Configuration management
//!
//! Configuration is loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Broker API client configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Session gate configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Template configuration
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5173
}

/// Broker API client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL every API path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

/// Session gate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Paths reachable without a session (matched exactly or with a trailing slash)
    #[serde(default = "default_public_routes")]
    pub public_routes: Vec<String>,
    /// Where unauthenticated requests are redirected
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Mark cookies issued by this server as `Secure`
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            public_routes: default_public_routes(),
            login_path: default_login_path(),
            secure_cookies: false,
        }
    }
}

fn default_public_routes() -> Vec<String> {
    vec![
        "/".to_string(),
        "/login".to_string(),
        "/register".to_string(),
        "/about".to_string(),
    ]
}

fn default_login_path() -> String {
    "/login".to_string()
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory whose templates override the embedded ones
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - QPGEN_SERVER_HOST
    /// - QPGEN_SERVER_PORT
    /// - QPGEN_BACKEND_BASE_URL
    /// - QPGEN_BACKEND_TIMEOUT_MS
    /// - QPGEN_SESSION_LOGIN_PATH
    /// - QPGEN_SESSION_SECURE_COOKIES
    /// - QPGEN_THEME_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QPGEN_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("QPGEN_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(base_url) = std::env::var("QPGEN_BACKEND_BASE_URL") {
            self.backend.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("QPGEN_BACKEND_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.backend.timeout_ms = timeout;
            }
        }

        if let Ok(login_path) = std::env::var("QPGEN_SESSION_LOGIN_PATH") {
            self.session.login_path = login_path;
        }
        if let Ok(secure) = std::env::var("QPGEN_SESSION_SECURE_COOKIES") {
            match secure.to_lowercase().as_str() {
                "true" | "1" => self.session.secure_cookies = true,
                "false" | "0" => self.session.secure_cookies = false,
                _ => {} // Ignore invalid values
            }
        }

        if let Ok(path) = std::env::var("QPGEN_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "QPGEN_SERVER_HOST",
    "QPGEN_SERVER_PORT",
    "QPGEN_BACKEND_BASE_URL",
    "QPGEN_BACKEND_TIMEOUT_MS",
    "QPGEN_SESSION_LOGIN_PATH",
    "QPGEN_SESSION_SECURE_COOKIES",
    "QPGEN_THEME_PATH",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn route_strategy() -> impl Strategy<Value = String> {
        "/[a-z]{0,10}".prop_map(|s| s)
    }

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            1u16..=65535,
            "http://[a-z]{1,10}(:[0-9]{2,4})?",
            1u64..=60_000,
            prop::collection::vec(route_strategy(), 0..6),
            any::<bool>(),
        )
            .prop_map(|(port, base_url, timeout_ms, public_routes, secure_cookies)| Config {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port,
                },
                backend: BackendConfig {
                    base_url,
                    timeout_ms,
                },
                session: SessionConfig {
                    public_routes,
                    login_path: "/login".to_string(),
                    secure_cookies,
                },
                theme: ThemeConfig::default(),
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_config_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, config.server.port);
            prop_assert_eq!(parsed.backend, config.backend);
            prop_assert_eq!(parsed.session, config.session);
        }

        #[test]
        fn prop_timeout_only_fills_other_defaults(timeout_ms in 1u64..=60_000) {
            let yaml = format!("backend:\n  timeout_ms: {}\n", timeout_ms);
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.backend.timeout_ms, timeout_ms);
            prop_assert_eq!(parsed.backend.base_url, default_base_url());
            prop_assert_eq!(parsed.session, SessionConfig::default());
        }
    }
}
