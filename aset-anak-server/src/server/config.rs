use std::{env, fs, path::Path};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::service::SessionPolicy;

pub const DEFAULT_TIMEZONE: &str = "Asia/Kuala_Lumpur";
pub const DEFAULT_PORT: u16 = 5151;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub dev_cors_origin: Option<String>,
    /// IANA zone name used for "today" (ages, birthdate checks).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub allow_registration: bool,
    #[serde(default = "default_idle_days")]
    pub session_idle_days: i64,
    #[serde(default = "default_ttl_days")]
    pub token_ttl_days: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_true() -> bool {
    true
}
fn default_idle_days() -> i64 {
    14
}
fn default_ttl_days() -> i64 {
    30
}
fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Minimal config with every optional key at its default.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        AppConfig {
            jwt_secret: jwt_secret.into(),
            listen_port: None,
            dev_cors_origin: None,
            timezone: default_timezone(),
            allow_registration: true,
            session_idle_days: default_idle_days(),
            token_ttl_days: default_ttl_days(),
            bcrypt_cost: default_bcrypt_cost(),
            secure_cookies: false,
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        self.tz()?;
        if self.session_idle_days <= 0 || self.token_ttl_days <= 0 {
            return Err(ConfigError::Invalid(
                "session_idle_days and token_ttl_days must be positive".into(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt_cost out of range: {}",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid(format!("timezone {:?}: {}", self.timezone, e)))
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            token_ttl: chrono::Duration::days(self.token_ttl_days),
            idle: chrono::Duration::days(self.session_idle_days),
            bcrypt_cost: self.bcrypt_cost,
            allow_registration: self.allow_registration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_keys() {
        let cfg = AppConfig::from_yaml("jwt_secret: s3cret\n").unwrap();
        assert_eq!(cfg.timezone, DEFAULT_TIMEZONE);
        assert!(cfg.allow_registration);
        assert_eq!(cfg.session_idle_days, 14);
        assert_eq!(cfg.token_ttl_days, 30);
        assert!(!cfg.secure_cookies);
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Asia::Kuala_Lumpur);
    }

    #[test]
    fn example_config_parses() {
        let cfg = AppConfig::from_yaml(include_str!("../../config.yaml.example")).unwrap();
        assert_eq!(cfg.listen_port, Some(DEFAULT_PORT));
        assert!(cfg.dev_cors_origin.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_yaml("jwt_secret: x\ntimezone: Mars/Base\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_yaml("jwt_secret: ''\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_yaml("listen_port: 80\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
