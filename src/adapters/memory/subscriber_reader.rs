//! In-memory subscriber directory.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entitlement::Subscriber;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::SubscriberReader;

#[derive(Default)]
pub struct InMemorySubscriberReader {
    subscribers: RwLock<HashMap<UserId, Subscriber>>,
}

impl InMemorySubscriberReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        let map = subscribers
            .into_iter()
            .map(|subscriber| (subscriber.user_id.clone(), subscriber))
            .collect();
        Self {
            subscribers: RwLock::new(map),
        }
    }

    /// Inserts or replaces a subscriber record.
    pub async fn upsert(&self, subscriber: Subscriber) {
        self.subscribers
            .write()
            .await
            .insert(subscriber.user_id.clone(), subscriber);
    }
}

#[async_trait]
impl SubscriberReader for InMemorySubscriberReader {
    async fn find_subscriber(&self, user_id: &UserId) -> Result<Option<Subscriber>, DomainError> {
        Ok(self.subscribers.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{SubscriptionStatus, TierId};
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn finds_only_known_users() {
        let now = Timestamp::now();
        let reader = InMemorySubscriberReader::new();
        reader
            .upsert(Subscriber {
                user_id: UserId::new("user-1").unwrap(),
                tier_id: TierId::new("basic").unwrap(),
                status: SubscriptionStatus::Active,
                period_start: now,
                period_end: now.add_days(30),
            })
            .await;

        let found = reader.find_subscriber(&UserId::new("user-1").unwrap()).await.unwrap();
        assert_eq!(found.map(|s| s.tier_id.to_string()), Some("basic".to_string()));
        assert!(reader
            .find_subscriber(&UserId::new("ghost").unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
