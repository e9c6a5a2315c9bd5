//! Sender-address authorization.
//!
//! A principal may send as an address exactly when that address routes to
//! the principal, so the check goes through the same destination lookup the
//! MTA uses for delivery.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{MailRouting, SenderPolicy};

/// [`SenderPolicy`] that delegates to a [`MailRouting`] resolver.
#[derive(Clone)]
pub struct SenderPolicyService {
    routing: Arc<dyn MailRouting>,
}

impl SenderPolicyService {
    /// Create a policy that resolves addresses through `routing`.
    pub fn new(routing: Arc<dyn MailRouting>) -> Self {
        Self { routing }
    }
}

#[async_trait]
impl SenderPolicy for SenderPolicyService {
    async fn may_use_sender_address(
        &self,
        principal: &str,
        from_address: &str,
    ) -> Result<bool, Error> {
        if principal.is_empty() {
            return Ok(false);
        }
        let destination = self.routing.resolve_destination(from_address).await?;
        let permitted = destination.as_deref() == Some(principal);
        if permitted {
            debug!(principal, from_address, "sender address permitted");
        } else {
            warn!(
                principal,
                from_address,
                resolved = ?destination,
                "sender address not owned by principal"
            );
        }
        Ok(permitted)
    }
}
