//! Mail-sending JSON-RPC service
//!
//! Exposes one method, `Service.SendMail`, which takes `{"message": "..."}`
//! and mails it as HTML to the configured recipient. Configuration comes
//! from the environment; see [`MailConfig::from_env`].
//!
//! ```rust,no_run
//! use mailapi::{MailConfig, MailService, SmtpMailer};
//! use mailrpc_server::RpcServer;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MailConfig::from_env()?;
//! let mailer = SmtpMailer::from_config(&config)?;
//! let service = MailService::new(mailer, &config.from, &config.to, &config.subject);
//!
//! RpcServer::builder()
//!     .bind(config.bind_address)
//!     .service(Arc::new(service), "Service")
//!     .build()?
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! [`testing::RecordingMailer`] is a [`Mailer`] that records mails instead of
//! delivering them. It is public so that code embedding [`MailService`] can
//! drive `Service.SendMail` end to end, e.g. through `warp::test`, without an
//! SMTP relay. The binary never constructs it.

mod config;
mod mailer;
mod service;
pub mod testing;

pub use config::{
    ConfigError, MailConfig, DEFAULT_BIND_ADDRESS, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT,
};
pub use mailer::{Mail, Mailer, SmtpMailer};
pub use service::{MailService, SendMailRequest};
