//! SubscriberReader port - Subscription records owned by the account subsystem.

use async_trait::async_trait;

use crate::domain::entitlement::Subscriber;
use crate::domain::foundation::{DomainError, UserId};

/// Read-only access to a user's tier and billing period.
#[async_trait]
pub trait SubscriberReader: Send + Sync {
    /// Returns `None` if the user does not exist.
    async fn find_subscriber(&self, user_id: &UserId) -> Result<Option<Subscriber>, DomainError>;
}
