//! Routing decisions the MTA asks for on every inbound message.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::Error;
use crate::domain::ports::{MailDirectoryError, MailDirectoryRepository, MailRouting};

/// Map store failures onto the domain taxonomy.
///
/// Connection problems become `StoreUnavailable` so that callers fail
/// closed.
pub(crate) fn map_directory_error(error: MailDirectoryError) -> Error {
    match error {
        MailDirectoryError::Connection { message } => {
            Error::store_unavailable(format!("mail directory unavailable: {message}"))
        }
        MailDirectoryError::Duplicate { message } => Error::constraint_violation(message),
        MailDirectoryError::Query { message } => {
            Error::internal(format!("mail directory error: {message}"))
        }
    }
}

/// [`MailRouting`] backed by a [`MailDirectoryRepository`].
#[derive(Clone)]
pub struct MailRoutingService<R> {
    directory: Arc<R>,
}

impl<R> MailRoutingService<R> {
    /// Create a routing service reading from `directory`.
    pub fn new(directory: Arc<R>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl<R> MailRouting for MailRoutingService<R>
where
    R: MailDirectoryRepository,
{
    async fn domain_has_any_recipient(&self, domain: &str) -> Result<bool, Error> {
        if domain.is_empty() || domain.contains('@') {
            debug!(domain, "malformed domain never matches");
            return Ok(false);
        }
        let owned = self
            .directory
            .domain_has_any_recipient(domain)
            .await
            .map_err(map_directory_error)?;
        debug!(domain, owned, "domain ownership lookup");
        Ok(owned)
    }

    async fn user_exists(&self, email: &str) -> Result<bool, Error> {
        if email.is_empty() {
            return Ok(false);
        }
        let exists = self
            .directory
            .user_exists(email)
            .await
            .map_err(map_directory_error)?;
        debug!(email, exists, "mailbox lookup");
        Ok(exists)
    }

    async fn resolve_destination(&self, address: &str) -> Result<Option<String>, Error> {
        if address.is_empty() {
            return Ok(None);
        }
        let destination = self
            .directory
            .resolve_destination(address)
            .await
            .map_err(map_directory_error)?;
        debug!(address, destination = ?destination, "alias lookup");
        Ok(destination)
    }
}
