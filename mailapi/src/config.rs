//! Environment configuration for the mail service

use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MAIL_TO, MAIL_USERNAME and MAIL_PASSWD env must be required")]
    MissingRequired,

    #[error("MAIL_SMTP_PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("BIND_ADDRESS must be host:port, got {0:?}")]
    InvalidBindAddress(String),
}

/// SMTP account, envelope and listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub username: String,
    pub password: String,
    pub to: String,
    /// Defaults to `username`
    pub from: String,
    pub subject: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub bind_address: SocketAddr,
}

impl MailConfig {
    /// Read the configuration from the process environment
    ///
    /// # Errors
    ///
    /// `MAIL_USERNAME`, `MAIL_PASSWD` and `MAIL_TO` must be set and non-empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, treating empty values as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let (username, password, to) =
            match (var("MAIL_USERNAME"), var("MAIL_PASSWD"), var("MAIL_TO")) {
                (Some(username), Some(password), Some(to)) => (username, password, to),
                _ => return Err(ConfigError::MissingRequired),
            };

        let smtp_port = match var("MAIL_SMTP_PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort(port))?,
            None => DEFAULT_SMTP_PORT,
        };

        let bind = var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(bind))?;

        Ok(Self {
            from: var("MAIL_FROM").unwrap_or_else(|| username.clone()),
            subject: var("MAIL_SUBJECT").unwrap_or_default(),
            smtp_host: var("MAIL_SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            username,
            password,
            to,
            smtp_port,
            bind_address,
        })
    }
}
