//! Dashboard configuration.
//!
//! # Responsibility
//! - Load the TOML configuration file into typed settings.
//! - Apply environment overrides for secrets.
//!
//! # Invariants
//! - A loaded config has a non-empty database path, an absolute log dir
//!   (when set), a parseable sender mailbox and a non-zero SMTP port.

use lettre::message::Mailbox;
use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const SMTP_PASSWORD_ENV: &str = "CAREDESK_SMTP_PASSWORD";
pub const DEFAULT_SENDER: &str = "Golden Serenity <info@goldenserenityhomecare.org>";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

/// Top-level dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// SQLite file backing the local document store.
    pub database_path: PathBuf,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub mail: MailConfig,
}

/// Outbound reply email settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    #[serde(default = "default_sender")]
    pub from: String,
    /// `None` disables reply sending.
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

/// SMTP transport security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    None,
    #[default]
    Starttls,
    Tls,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_sender(),
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            security: SmtpSecurity::default(),
            timeout_secs: DEFAULT_SMTP_TIMEOUT_SECS,
        }
    }
}

impl DashboardConfig {
    /// Config with defaults for everything but the database path.
    pub fn with_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            log_dir: None,
            log_level: default_log_level(),
            mail: MailConfig::default(),
        }
    }

    /// Parses and validates TOML text. Environment overrides are not applied.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides secrets from `lookup` (normally the process environment).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(SMTP_PASSWORD_ENV).filter(|value| !value.is_empty()) {
            self.mail.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path cannot be empty".to_string(),
            ));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                )));
            }
        }
        self.mail.validate()
    }
}

impl MailConfig {
    /// Parsed sender mailbox.
    pub fn sender(&self) -> Result<Mailbox, ConfigError> {
        self.from
            .parse::<Mailbox>()
            .map_err(|err| ConfigError::Invalid(format!("mail.from `{}`: {err}", self.from)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sender()?;
        if self.smtp_port == 0 {
            return Err(ConfigError::Invalid(
                "mail.smtp_port cannot be zero".to_string(),
            ));
        }
        if let Some(host) = &self.smtp_host {
            if host.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "mail.smtp_host cannot be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Loads, overrides from the environment, and validates a config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DashboardConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = DashboardConfig::from_toml_str(&text)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;

    info!(
        "event=config_load module=config status=ok path={} mail_enabled={}",
        path.display(),
        config.mail.smtp_host.is_some()
    );
    Ok(config)
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_smtp_timeout() -> u64 {
    DEFAULT_SMTP_TIMEOUT_SECS
}

/// Configuration load failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DashboardConfig, SmtpSecurity, DEFAULT_SENDER, SMTP_PASSWORD_ENV};

    #[test]
    fn minimal_config_uses_defaults() {
        let config = DashboardConfig::from_toml_str("database_path = \"caredesk.sqlite3\"").unwrap();
        assert_eq!(config.mail.from, DEFAULT_SENDER);
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.security, SmtpSecurity::Starttls);
        assert!(config.mail.smtp_host.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn full_mail_section_parses() {
        let config = DashboardConfig::from_toml_str(
            r#"
            database_path = "/var/lib/caredesk/db.sqlite3"
            log_level = "warn"

            [mail]
            from = "Front Desk <desk@example.org>"
            smtp_host = "smtp.example.org"
            smtp_port = 465
            username = "desk"
            security = "tls"
            timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.mail.smtp_host.as_deref(), Some("smtp.example.org"));
        assert_eq!(config.mail.security, SmtpSecurity::Tls);
        assert_eq!(config.mail.sender().unwrap().email.to_string(), "desk@example.org");
    }

    #[test]
    fn relative_log_dir_and_bad_sender_are_rejected() {
        let err = DashboardConfig::from_toml_str(
            "database_path = \"db.sqlite3\"\nlog_dir = \"logs\"",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("absolute")));

        let err = DashboardConfig::from_toml_str(
            "database_path = \"db.sqlite3\"\n[mail]\nfrom = \"not an address\"",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_a_parse_error() {
        let err = DashboardConfig::from_toml_str("database_path = \"a\"\nfirebase = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn password_env_override_wins() {
        let mut config = DashboardConfig::with_database("db.sqlite3");
        config.mail.password = Some("from-file".to_string());
        config.apply_env_overrides(|key| {
            (key == SMTP_PASSWORD_ENV).then(|| "from-env".to_string())
        });
        assert_eq!(config.mail.password.as_deref(), Some("from-env"));

        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.mail.password.as_deref(), Some("from-env"));
    }
}
