//! Outbound customer notifications.
//!
//! The API only depends on the [`Notifier`] trait. [`EmailDelivery`] sends
//! over SMTP when `SMTP_HOST` is configured; otherwise [`LogNotifier`]
//! records the message in the log so local setups still work end to end.

pub mod email;

use async_trait::async_trait;
use koi_core::otp::OtpSubject;

pub use email::{EmailConfig, EmailDelivery, EmailError};

/// A confirmation code ready to be delivered to a customer.
#[derive(Debug, Clone)]
pub struct OtpNotice<'a> {
    pub subject: OtpSubject,
    /// Display name of the contract or document being confirmed.
    pub entity_name: &'a str,
    pub code: &'a str,
    pub ttl_minutes: i64,
}

impl OtpNotice<'_> {
    /// Subject line and plain-text body for this notice.
    pub fn render(&self) -> (String, String) {
        let what = match self.subject {
            OtpSubject::Contract => "contract",
            OtpSubject::Doc => "document",
        };
        let title = format!("[Koi Pond Works] Confirm your {what}");
        let body = format!(
            "Your confirmation code for the {what} \"{}\" is {}.\n\
             The code expires in {} minutes. If you did not request it, ignore this email.",
            self.entity_name, self.code, self.ttl_minutes
        );
        (title, body)
    }
}

/// Delivery channel for customer notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(&self, to: &str, notice: &OtpNotice<'_>) -> Result<(), EmailError>;
}

/// Fallback notifier that only logs.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, to: &str, notice: &OtpNotice<'_>) -> Result<(), EmailError> {
        let (title, _) = notice.render();
        tracing::warn!(to, %title, "SMTP not configured, OTP not emailed");
        tracing::debug!(to, code = notice.code, "Undelivered OTP");
        Ok(())
    }
}
