use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the `__Secure-1PSID` session cookie value.
pub const ENV_TOKEN: &str = "GEMINI_WEB_1PSID";

/// Environment variable holding the target natural-language code (e.g. "de").
pub const ENV_LANGUAGE: &str = "GEMINI_WEB_LANG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options recognized by the client.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to override. Values from the environment take precedence over the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `__Secure-1PSID` cookie value. Resolved against the environment and
    /// the browser cookie source when absent.
    pub token: Option<String>,

    /// Additional named cookies to attach to the session
    /// (`__Secure-1PSIDTS`, `__Secure-1PSIDCC`, `NID`, ...).
    pub cookies: HashMap<String, String>,

    /// Per-request wall-clock timeout in seconds.
    pub timeout_secs: u64,

    /// Proxy URL applied to every request.
    pub proxy: Option<String>,

    /// Target natural-language code. When set and outside the provider's
    /// natively supported set, prompts and answers go through the
    /// configured translator.
    pub language: Option<String>,

    /// Conversation ID to resume instead of starting fresh.
    pub conversation_id: Option<String>,

    /// Run a returned code snippet through the configured code runner.
    pub run_code: bool,

    /// Fall back to extracting the session cookie from a local browser
    /// profile when no token is supplied.
    pub token_from_browser: bool,

    /// With `token_from_browser`, require the full cookie set instead of
    /// the single `__Secure-1PSID` cookie.
    pub multi_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            cookies: HashMap::new(),
            timeout_secs: 20,
            proxy: None,
            language: None,
            conversation_id: None,
            run_code: false,
            token_from_browser: false,
            multi_cookies: false,
        }
    }
}

impl Config {
    /// Loads the config file from the platform config dir, falling back to
    /// defaults when no file exists. Environment overrides are applied
    /// either way.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match crate::platform::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Loads a config file from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Applies environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
        if let Ok(lang) = std::env::var(ENV_LANGUAGE) {
            if !lang.is_empty() {
                self.language = Some(lang);
            }
        }
    }

    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout_secs, 20);
        assert!(config.token.is_none());
        assert!(!config.run_code);
        assert!(!config.multi_cookies);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            timeout_secs = 45
            language = "ko"

            [cookies]
            NID = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 45);
        assert_eq!(config.language.as_deref(), Some("ko"));
        assert_eq!(config.cookies.get("NID").map(String::as_str), Some("abc"));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = Config {
            timeout_secs: 7,
            ..Config::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(7));
    }
}
