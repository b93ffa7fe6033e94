use std::time::Duration;

use thiserror::Error;

use crate::engine::Pacing;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("unknown pacing {0:?} (expected normal, fast or none)")]
    UnknownPacing(String),
}

/// Settings for the completion service behind the chat assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Bearer credential.  `None` puts chat into fallback-only mode.
    pub api_key:     Option<String>,
    pub base_url:    String,
    pub model:       String,
    pub timeout:     Duration,
    pub max_tokens:  u32,
    pub temperature: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            api_key:     None,
            base_url:    DEFAULT_BASE_URL.to_owned(),
            model:       DEFAULT_MODEL.to_owned(),
            timeout:     Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
            max_tokens:  DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host:   String,
    pub port:   u16,
    pub chat:   ChatConfig,
    pub pacing: Pacing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host:   DEFAULT_HOST.to_owned(),
            port:   DEFAULT_PORT,
            chat:   ChatConfig::default(),
            pacing: Pacing::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// Unset or blank variables take their defaults.  A missing API key is
    /// not an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = ServerConfig::default();

        if let Some(host) = get("HOST") {
            cfg.host = host;
        }
        if let Some(port) = get("PORT") {
            cfg.port = parse_number("PORT", port)?;
        }
        if let Some(name) = get("DEMO_PACING") {
            cfg.pacing = Pacing::from_name(&name).ok_or(ConfigError::UnknownPacing(name))?;
        }

        cfg.chat.api_key = get("OPENAI_API_KEY");
        if let Some(url) = get("OPENAI_BASE_URL") {
            cfg.chat.base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(model) = get("OPENAI_MODEL") {
            cfg.chat.model = model;
        }
        if let Some(secs) = get("CHAT_TIMEOUT_SECS") {
            cfg.chat.timeout = Duration::from_secs(parse_number("CHAT_TIMEOUT_SECS", secs)?);
        }

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
        assert!(cfg.chat.api_key.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("CHAT_TIMEOUT_SECS", "5"),
            ("DEMO_PACING", "none"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.chat.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.chat.base_url, "http://localhost:9999/v1");
        assert_eq!(cfg.chat.model, "gpt-4o-mini");
        assert_eq!(cfg.chat.timeout, Duration::from_secs(5));
        assert_eq!(cfg.pacing, Pacing::none());
    }

    #[test]
    fn blank_key_means_no_credential() {
        let cfg = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(cfg.chat.api_key.is_none());
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber { var: "PORT", value: "eighty".into() }
        );
    }

    #[test]
    fn unknown_pacing_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("DEMO_PACING", "ludicrous")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPacing(_)));
    }
}
