//! Notification collaborator
//!
//! Credentials and welcome mail go out through this seam. Dispatch is
//! fire-and-forget relative to identity creation: a failed send is
//! logged and never rolls anything back. Rendering and transport live
//! behind the trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// One outbound message.
#[derive(Debug, Clone)]
pub struct MailRequest {
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: Option<String>,
    /// Plain-text body.
    pub text: Option<String>,
}

/// Confirmation of an accepted message.
#[derive(Debug, Clone)]
pub struct MailReceipt {
    /// Transport-assigned message id.
    pub message_id: String,
}

/// A send that the transport rejected.
#[derive(Debug, Error)]
#[error("mail delivery failed: {message}")]
pub struct MailError {
    /// Transport diagnostic.
    pub message: String,
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatch one message.
    async fn send(&self, mail: &MailRequest) -> Result<MailReceipt, MailError>;
}

/// In-memory mailer that records every message. Accepts everything
/// unless told to fail; used in tests and local setups.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailRequest>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    /// Mailer that accepts and records every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        *self.failing.lock() = true;
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<MailRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &MailRequest) -> Result<MailReceipt, MailError> {
        if *self.failing.lock() {
            return Err(MailError {
                message: "transport unavailable".into(),
            });
        }
        self.sent.lock().push(mail.clone());
        Ok(MailReceipt {
            message_id: campus_platform::unique_id(),
        })
    }
}
