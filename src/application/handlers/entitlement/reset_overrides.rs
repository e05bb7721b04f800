//! ResetOverridesHandler - Two-step removal of every override for a user.
//!
//! `request` issues a short-lived token bound to the user and the acting
//! admin; `confirm` checks it before deleting anything.

use std::sync::Arc;

use crate::application::services::AuditLogger;
use crate::domain::entitlement::{
    AuditAction, AuditDiff, EntitlementError, ResetToken, ResetTokenSigner,
};
use crate::domain::foundation::{AdminId, AuditEntryId, Timestamp, UserId};
use crate::ports::OverrideStore;

#[derive(Debug, Clone)]
pub struct RequestResetCommand {
    pub user_id: UserId,
    pub acting_admin_id: AdminId,
}

#[derive(Debug, Clone)]
pub struct ConfirmResetCommand {
    pub user_id: UserId,
    pub acting_admin_id: AdminId,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOverridesResult {
    /// Number of overrides that were removed.
    pub removed: usize,
    pub audit_entry_id: AuditEntryId,
}

pub struct ResetOverridesHandler {
    store: Arc<dyn OverrideStore>,
    audit: Arc<AuditLogger>,
    signer: Arc<ResetTokenSigner>,
}

impl ResetOverridesHandler {
    pub fn new(
        store: Arc<dyn OverrideStore>,
        audit: Arc<AuditLogger>,
        signer: Arc<ResetTokenSigner>,
    ) -> Self {
        Self {
            store,
            audit,
            signer,
        }
    }

    /// First step: issue a confirmation token.
    pub async fn request(&self, cmd: RequestResetCommand) -> Result<ResetToken, EntitlementError> {
        let token = self
            .signer
            .issue(&cmd.user_id, &cmd.acting_admin_id, Timestamp::now())?;

        tracing::info!(
            user_id = %cmd.user_id,
            admin_id = %cmd.acting_admin_id,
            expires_at = %token.expires_at.as_datetime(),
            "override reset requested"
        );
        Ok(token)
    }

    /// Second step: verify the token, delete every override and audit the
    /// prior state.
    ///
    /// # Errors
    ///
    /// `InvalidResetToken` if the token is malformed, expired, or was issued
    /// for a different user or admin.
    pub async fn confirm(&self, cmd: ConfirmResetCommand) -> Result<ResetOverridesResult, EntitlementError> {
        if let Err(error) =
            self.signer
                .verify(&cmd.token, &cmd.user_id, &cmd.acting_admin_id, Timestamp::now())
        {
            tracing::warn!(
                user_id = %cmd.user_id,
                admin_id = %cmd.acting_admin_id,
                error = %error,
                "override reset refused"
            );
            return Err(error.into());
        }

        let removed = self.store.clear(&cmd.user_id).await?;
        let diff = AuditDiff::between(&removed.values(), &Default::default());

        let entry = self
            .audit
            .record(&cmd.acting_admin_id, &cmd.user_id, AuditAction::Reset, diff)
            .await;

        tracing::info!(
            user_id = %cmd.user_id,
            admin_id = %cmd.acting_admin_id,
            removed = removed.len(),
            "overrides reset"
        );

        Ok(ResetOverridesResult {
            removed: removed.len(),
            audit_entry_id: entry.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::TracingAuditAlertSink;
    use crate::adapters::memory::{InMemoryAuditLog, InMemoryOverrideStore};
    use crate::domain::entitlement::{FeatureKey, Limit, OverridePatch, OverrideValue, ResetTokenError};
    use secrecy::SecretString;
    use std::time::Duration;

    struct Fixture {
        handler: ResetOverridesHandler,
        store: Arc<InMemoryOverrideStore>,
        audit: Arc<AuditLogger>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOverrideStore::new());
        let audit = Arc::new(AuditLogger::new(
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(TracingAuditAlertSink::new()),
        ));
        let signer = Arc::new(ResetTokenSigner::new(
            SecretString::new("reset-secret".to_string()),
            Duration::from_secs(300),
        ));
        Fixture {
            handler: ResetOverridesHandler::new(store.clone(), audit.clone(), signer),
            store,
            audit,
        }
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn admin() -> AdminId {
        AdminId::new("admin-1").unwrap()
    }

    async fn seed(store: &InMemoryOverrideStore) {
        let patch = OverridePatch::new()
            .with_flag(FeatureKey::PrioritySupport, true)
            .unwrap()
            .with_limit(FeatureKey::MaxMealPlansPerMonth, Limit::Capped(5))
            .unwrap();
        store.merge(&user(), &patch, &admin(), Timestamp::now()).await.unwrap();
    }

    #[tokio::test]
    async fn confirmed_reset_clears_and_audits_prior_state() {
        let f = fixture();
        seed(&f.store).await;

        let token = f
            .handler
            .request(RequestResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
            })
            .await
            .unwrap();
        let result = f
            .handler
            .confirm(ConfirmResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
                token: token.token,
            })
            .await
            .unwrap();

        assert_eq!(result.removed, 2);
        assert!(f.store.get(&user()).await.unwrap().is_empty());

        let entries = f.audit.entries_for(&user()).await.unwrap();
        let entry = entries.last().unwrap();
        assert_eq!(entry.action, AuditAction::Reset);
        assert_eq!(entry.diff.len(), 2);
        let change = entry.diff.get(FeatureKey::PrioritySupport).unwrap();
        assert_eq!(change.before, Some(OverrideValue::Flag(true)));
        assert_eq!(change.after, None);
    }

    #[tokio::test]
    async fn bad_token_deletes_nothing() {
        let f = fixture();
        seed(&f.store).await;

        let result = f
            .handler
            .confirm(ConfirmResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
                token: "v1.0.nonce.00".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(EntitlementError::InvalidResetToken(ResetTokenError::InvalidSignature))
        ));
        assert_eq!(f.store.get(&user()).await.unwrap().len(), 2);
        assert!(f.audit.entries_for(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_for_other_admin_is_refused() {
        let f = fixture();
        let token = f
            .handler
            .request(RequestResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
            })
            .await
            .unwrap();

        let result = f
            .handler
            .confirm(ConfirmResetCommand {
                user_id: user(),
                acting_admin_id: AdminId::new("admin-2").unwrap(),
                token: token.token,
            })
            .await;

        assert!(matches!(result, Err(EntitlementError::InvalidResetToken(_))));
    }

    #[tokio::test]
    async fn reset_without_overrides_still_audits() {
        let f = fixture();
        let token = f
            .handler
            .request(RequestResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
            })
            .await
            .unwrap();

        let result = f
            .handler
            .confirm(ConfirmResetCommand {
                user_id: user(),
                acting_admin_id: admin(),
                token: token.token,
            })
            .await
            .unwrap();

        assert_eq!(result.removed, 0);
        let entries = f.audit.entries_for(&user()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].diff.is_empty());
    }
}
