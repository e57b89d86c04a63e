use rand::distr::{Alphanumeric, SampleString};
use thiserror::Error;

/// Placeholder secrets that MUST NOT be used outside testing.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WARBLER_SECRET_KEY is unset or still a placeholder")]
    InsecureSecret,

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_key: String,
    pub csrf_enabled: bool,
    pub testing: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let testing = parse_flag(&lookup, "WARBLER_TESTING", false)?;
        let csrf_enabled = parse_flag(&lookup, "WARBLER_CSRF_ENABLED", true)?;

        let secret_key = match lookup("WARBLER_SECRET_KEY").filter(|s| !s.is_empty()) {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.as_str()) => secret,
            _ if testing => random_secret(),
            _ => return Err(ConfigError::InsecureSecret),
        };

        let port: u16 = match lookup("WARBLER_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "WARBLER_PORT", value: raw })?,
            None => 5000,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "warbler.db".into()),
            secret_key,
            csrf_enabled,
            testing,
            host: lookup("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }

    /// Disposable in-memory database, random secret, CSRF off.
    pub fn for_tests() -> Self {
        Self {
            database_url: warbler_db::IN_MEMORY.into(),
            secret_key: random_secret(),
            csrf_enabled: false,
            testing: true,
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}

fn random_secret() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 48)
}

fn parse_flag<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_with_real_secret() {
        let cfg = config(&[("WARBLER_SECRET_KEY", "s3cret-value")]).unwrap();
        assert_eq!(cfg.database_url, "warbler.db");
        assert!(cfg.csrf_enabled);
        assert!(!cfg.testing);
        assert_eq!(cfg.port, 5000);
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::InsecureSecret);
        assert_eq!(
            config(&[("WARBLER_SECRET_KEY", "dev-secret-change-me")]).unwrap_err(),
            ConfigError::InsecureSecret
        );
    }

    #[test]
    fn testing_mode_generates_secret() {
        let cfg = config(&[("WARBLER_TESTING", "true"), ("WARBLER_CSRF_ENABLED", "0")]).unwrap();
        assert!(cfg.testing);
        assert!(!cfg.csrf_enabled);
        assert_eq!(cfg.secret_key.len(), 48);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config(&[("WARBLER_SECRET_KEY", "x"), ("WARBLER_PORT", "http")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "WARBLER_PORT", value: "http".into() });

        let err = config(&[("WARBLER_SECRET_KEY", "x"), ("WARBLER_TESTING", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "WARBLER_TESTING", .. }));
    }

    #[test]
    fn test_config_is_disposable() {
        let cfg = AppConfig::for_tests();
        assert_eq!(cfg.database_url, ":memory:");
        assert!(!cfg.csrf_enabled);
        assert!(cfg.testing);
        assert_ne!(cfg.secret_key, AppConfig::for_tests().secret_key);
    }
}
