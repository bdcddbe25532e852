//! In-memory [`Mailer`] for tests

use crate::mailer::{Mail, Mailer};
use async_trait::async_trait;
use mailrpc_core::{Error, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// Records every mail instead of delivering it
///
/// Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Vec<Mail>>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose every send fails like an unreachable relay
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<()> {
        if self.fail {
            return Err(Error::Internal("smtp send: connection refused".into()));
        }
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail);
        Ok(())
    }
}
