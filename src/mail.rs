//! Outgoing email notifications.
//!
//! The app sends two kinds of email: an alert when someone logs in, and
//! monthly expense reports requested from the export page. Delivery is fire
//! and forget, a failed or dropped email never fails the request that
//! triggered it.

use std::fmt::Debug;

/// A file attached to an [EmailMessage].
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// The file name shown to the recipient.
    pub filename: String,
    /// The raw file contents.
    pub content: Vec<u8>,
}

/// An email to be handed to a [Mailer] for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    /// The recipient's email address.
    pub to: String,
    /// The subject line.
    pub subject: String,
    /// The plain text body.
    pub body: String,
    /// An optional file attachment.
    pub attachment: Option<Attachment>,
}

/// Hands outgoing email to a delivery mechanism.
///
/// Implementations must not block the request path on delivery and must not
/// surface delivery failures to the caller.
pub trait Mailer: Send + Sync + Debug {
    /// Queue `message` for delivery.
    fn send(&self, message: EmailMessage);
}

/// A [Mailer] that records outgoing email in the application log instead of
/// delivering it.
///
/// Used when no mail transport is configured so that notifications are still
/// visible to the operator.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: EmailMessage) {
        match &message.attachment {
            Some(attachment) => tracing::info!(
                "email to {}: \"{}\" with attachment {} ({} bytes)",
                message.to,
                message.subject,
                attachment.filename,
                attachment.content.len()
            ),
            None => tracing::info!("email to {}: \"{}\"", message.to, message.subject),
        }
    }
}
