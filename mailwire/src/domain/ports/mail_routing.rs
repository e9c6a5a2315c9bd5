//! Driving ports consumed by the mail daemons.
//!
//! The MTA's acceptance path calls [`MailRouting`]; its sender-policy check
//! calls [`SenderPolicy`]. Both answer with plain booleans or options: a
//! negative result is not an error, while [`crate::domain::Error`] always
//! means "could not decide" and must be treated as deny or defer.

use async_trait::async_trait;

use crate::domain::Error;

/// Routing decisions for a candidate recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailRouting: Send + Sync {
    /// Whether mail for `domain` is accepted here.
    async fn domain_has_any_recipient(&self, domain: &str) -> Result<bool, Error>;

    /// Whether `email` is a local mailbox. Aliases never count.
    async fn user_exists(&self, email: &str) -> Result<bool, Error>;

    /// Canonical destination of `address`, explicit aliases first.
    async fn resolve_destination(&self, address: &str) -> Result<Option<String>, Error>;
}

/// Sender-address authorization for authenticated submissions.
#[async_trait]
pub trait SenderPolicy: Send + Sync {
    /// Whether `principal` may send with `from_address` in the envelope.
    async fn may_use_sender_address(
        &self,
        principal: &str,
        from_address: &str,
    ) -> Result<bool, Error>;
}
