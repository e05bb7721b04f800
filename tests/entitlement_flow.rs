//! End-to-end flows through the application handlers with in-memory adapters.
//!
//! 1. Tier and override precedence for live and lapsed subscriptions
//! 2. Period-scoped quotas and concurrent usage recording
//! 3. Two-step override reset and the audit trail
//! 4. Audit write failures never fail or stall an override change

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::SecretString;

use entitlement_engine::adapters::alerting::TracingAuditAlertSink;
use entitlement_engine::adapters::memory::{
    InMemoryAuditLog, InMemoryOverrideStore, InMemorySubscriberReader, InMemoryUsageCounterStore,
};
use entitlement_engine::application::handlers::{
    CheckEntitlementHandler, CheckEntitlementQuery, CheckQuotaHandler, CheckQuotaQuery,
    ConfirmResetCommand, GetOverridesHandler, GetOverridesQuery, RecordUsageCommand,
    RecordUsageHandler, RequestResetCommand, ResetOverridesHandler, SetOverridesCommand,
    SetOverridesHandler,
};
use entitlement_engine::application::services::{AuditLogger, RetryConfig, UsageCounterService};
use entitlement_engine::domain::entitlement::{
    AuditAction, AuditLogEntry, DecisionSource, EntitlementResolver, FeatureKey, Limit,
    OverridePatch, ResetTokenSigner, Subscriber, SubscriptionStatus, TierCatalog, TierId,
};
use entitlement_engine::domain::foundation::{
    AdminId, DomainError, ErrorCode, PeriodKey, Timestamp, UserId,
};
use entitlement_engine::ports::{AuditLog, OverrideStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct FailingAuditLog;

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _entry: &AuditLogEntry) -> Result<(), DomainError> {
        Err(DomainError::new(ErrorCode::DatabaseError, "audit table unavailable"))
    }

    async fn entries_for(&self, _user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError> {
        Ok(Vec::new())
    }
}

/// Audit store whose appends stall and then fail, as during a database outage.
#[derive(Default)]
struct StalledAuditLog {
    appends: AtomicUsize,
}

#[async_trait]
impl AuditLog for StalledAuditLog {
    async fn append(&self, _entry: &AuditLogEntry) -> Result<(), DomainError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(DomainError::new(ErrorCode::DatabaseError, "pool timed out"))
    }

    async fn entries_for(&self, _user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError> {
        Ok(Vec::new())
    }
}

struct Harness {
    subscribers: Arc<InMemorySubscriberReader>,
    overrides: Arc<InMemoryOverrideStore>,
    audit: Arc<AuditLogger>,
    entitlements: Arc<CheckEntitlementHandler>,
    quota: CheckQuotaHandler,
    record_usage: Arc<RecordUsageHandler>,
    get_overrides: GetOverridesHandler,
    set_overrides: SetOverridesHandler,
    reset_overrides: ResetOverridesHandler,
}

impl Harness {
    fn new() -> Self {
        Self::with_audit_log(Arc::new(InMemoryAuditLog::new()))
    }

    fn with_audit_log(log: Arc<dyn AuditLog>) -> Self {
        let catalog = Arc::new(TierCatalog::standard());
        let subscribers = Arc::new(InMemorySubscriberReader::new());
        let overrides = Arc::new(InMemoryOverrideStore::new());
        let audit = Arc::new(AuditLogger::new(log, Arc::new(TracingAuditAlertSink::new())));
        let counters = Arc::new(UsageCounterService::new(
            Arc::new(InMemoryUsageCounterStore::new()),
            RetryConfig::immediate(3),
        ));
        let signer = Arc::new(ResetTokenSigner::new(
            SecretString::new("integration-test-secret-value".to_string()),
            Duration::from_secs(600),
        ));

        let store: Arc<dyn OverrideStore> = overrides.clone();
        let entitlements = Arc::new(CheckEntitlementHandler::new(
            subscribers.clone(),
            store.clone(),
            EntitlementResolver::new(catalog),
        ));

        Self {
            quota: CheckQuotaHandler::new(entitlements.clone(), counters.clone()),
            record_usage: Arc::new(RecordUsageHandler::new(counters)),
            get_overrides: GetOverridesHandler::new(store.clone()),
            set_overrides: SetOverridesHandler::new(store.clone(), audit.clone()),
            reset_overrides: ResetOverridesHandler::new(store, audit.clone(), signer),
            entitlements,
            subscribers,
            overrides,
            audit,
        }
    }

    async fn subscribe(&self, user: &str, tier: &str, status: SubscriptionStatus) -> UserId {
        let now = Timestamp::now();
        let user_id = UserId::new(user).unwrap();
        self.subscribers
            .upsert(Subscriber {
                user_id: user_id.clone(),
                tier_id: TierId::new(tier).unwrap(),
                status,
                period_start: now.add_days(-10),
                period_end: now.add_days(20),
            })
            .await;
        user_id
    }

    async fn set(&self, user_id: &UserId, patch: OverridePatch) {
        self.set_overrides
            .handle(SetOverridesCommand::new(user_id.clone(), admin(), patch))
            .await
            .unwrap();
    }
}

fn admin() -> AdminId {
    AdminId::new("admin-ops").unwrap()
}

fn period() -> PeriodKey {
    PeriodKey::new(2026, 10).unwrap()
}

// =============================================================================
// Precedence
// =============================================================================

#[tokio::test]
async fn premium_tier_then_override_revokes_analytics() {
    let harness = Harness::new();
    let user = harness
        .subscribe("user-premium", "premium", SubscriptionStatus::Active)
        .await;

    let decision = harness
        .entitlements
        .handle(CheckEntitlementQuery::new(user.clone(), FeatureKey::AdvancedAnalytics))
        .await;
    assert!(decision.allowed);
    assert_eq!(decision.source, DecisionSource::Tier);

    harness
        .set(
            &user,
            OverridePatch::new()
                .with_flag(FeatureKey::AdvancedAnalytics, false)
                .unwrap(),
        )
        .await;

    let decision = harness
        .entitlements
        .handle(CheckEntitlementQuery::new(user, FeatureKey::AdvancedAnalytics))
        .await;
    assert!(!decision.allowed);
    assert_eq!(decision.source, DecisionSource::Override);
}

#[tokio::test]
async fn expired_elite_resolves_like_free() {
    let harness = Harness::new();
    let lapsed = harness
        .subscribe("user-lapsed", "elite", SubscriptionStatus::Expired)
        .await;
    let free = harness
        .subscribe("user-free", "free", SubscriptionStatus::Active)
        .await;

    for feature in FeatureKey::ALL {
        let lapsed_decision = harness
            .entitlements
            .handle(CheckEntitlementQuery::new(lapsed.clone(), feature))
            .await;
        let free_decision = harness
            .entitlements
            .handle(CheckEntitlementQuery::new(free.clone(), feature))
            .await;

        assert_eq!(lapsed_decision.allowed, free_decision.allowed, "{feature}");
        assert_eq!(lapsed_decision.limit, free_decision.limit, "{feature}");
        assert_eq!(lapsed_decision.source, DecisionSource::Default);
    }
}

#[tokio::test]
async fn unknown_user_is_denied() {
    let harness = Harness::new();
    let ghost = UserId::new("ghost").unwrap();

    assert!(
        !harness
            .entitlements
            .has_access(&ghost, FeatureKey::CoachMessaging)
            .await
    );
    assert_eq!(
        harness
            .entitlements
            .get_limit(&ghost, FeatureKey::MaxMealPlansPerMonth)
            .await,
        Limit::DISABLED
    );
}

// =============================================================================
// Quotas
// =============================================================================

#[tokio::test]
async fn override_caps_unlimited_tier_per_period() {
    let harness = Harness::new();
    let user = harness
        .subscribe("user-elite", "elite", SubscriptionStatus::Active)
        .await;
    let feature = FeatureKey::MaxMealPlansPerMonth;

    assert_eq!(
        harness.entitlements.get_limit(&user, feature).await,
        Limit::Unlimited
    );

    harness
        .set(
            &user,
            OverridePatch::new().with_limit(feature, Limit::Capped(5)).unwrap(),
        )
        .await;

    for expected in 1..=5 {
        let result = harness
            .record_usage
            .handle(RecordUsageCommand {
                user_id: user.clone(),
                feature,
                amount: 1,
                period: Some(period()),
            })
            .await
            .unwrap();
        assert_eq!(result.count, expected);
    }

    let status = harness
        .quota
        .handle(CheckQuotaQuery {
            user_id: user.clone(),
            feature,
            period: Some(period()),
        })
        .await
        .unwrap();
    assert_eq!(status.limit, Limit::Capped(5));
    assert_eq!(status.source, DecisionSource::Override);
    assert_eq!(status.used, Some(5));
    assert_eq!(status.remaining, Some(0));
    assert!(!status.within_limit);

    let next = harness
        .quota
        .handle(CheckQuotaQuery {
            user_id: user,
            feature,
            period: Some(period().next()),
        })
        .await
        .unwrap();
    assert_eq!(next.used, Some(0));
    assert!(next.within_limit);
}

#[tokio::test]
async fn concurrent_increments_are_all_counted() {
    let harness = Harness::new();
    let user = UserId::new("user-busy").unwrap();
    let feature = FeatureKey::MaxCoachMessagesPerMonth;
    const TASKS: u64 = 64;

    let handles = (0..TASKS).map(|_| {
        let handler = harness.record_usage.clone();
        let user = user.clone();
        tokio::spawn(async move {
            handler
                .handle(RecordUsageCommand {
                    user_id: user,
                    feature,
                    amount: 1,
                    period: Some(period()),
                })
                .await
        })
    });

    let mut counts: Vec<u64> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().count)
        .collect();
    counts.sort_unstable();

    assert_eq!(counts, (1..=TASKS).collect::<Vec<_>>());

    let status = harness
        .quota
        .handle(CheckQuotaQuery {
            user_id: user,
            feature,
            period: Some(period()),
        })
        .await
        .unwrap();
    assert_eq!(status.used, Some(TASKS));
}

// =============================================================================
// Reset and Audit
// =============================================================================

#[tokio::test]
async fn reset_clears_overrides_and_falls_back_to_tier() {
    let harness = Harness::new();
    let user = harness
        .subscribe("user-basic", "basic", SubscriptionStatus::Active)
        .await;

    harness
        .set(
            &user,
            OverridePatch::new()
                .with_flag(FeatureKey::PrioritySupport, true)
                .unwrap()
                .with_limit(FeatureKey::MaxWorkoutPlansPerMonth, Limit::Unlimited)
                .unwrap(),
        )
        .await;

    let token = harness
        .reset_overrides
        .request(RequestResetCommand {
            user_id: user.clone(),
            acting_admin_id: admin(),
        })
        .await
        .unwrap();

    let confirm = ConfirmResetCommand {
        user_id: user.clone(),
        acting_admin_id: admin(),
        token: token.token,
    };
    let result = harness.reset_overrides.confirm(confirm.clone()).await.unwrap();
    assert_eq!(result.removed, 2);

    let remaining = harness
        .get_overrides
        .handle(GetOverridesQuery {
            user_id: user.clone(),
        })
        .await
        .unwrap();
    assert!(remaining.is_empty());

    let decision = harness
        .entitlements
        .handle(CheckEntitlementQuery::new(user.clone(), FeatureKey::MaxWorkoutPlansPerMonth))
        .await;
    assert_eq!(decision.limit, Limit::Capped(10));
    assert_eq!(decision.source, DecisionSource::Tier);

    // A second confirmation is harmless.
    let again = harness.reset_overrides.confirm(confirm).await.unwrap();
    assert_eq!(again.removed, 0);

    let actions: Vec<AuditAction> = harness
        .audit
        .entries_for(&user)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec![AuditAction::Set, AuditAction::Reset, AuditAction::Reset]
    );
}

#[tokio::test]
async fn audit_failure_does_not_fail_override_change() {
    let harness = Harness::with_audit_log(Arc::new(FailingAuditLog));
    let user = harness
        .subscribe("user-free", "free", SubscriptionStatus::Active)
        .await;

    harness
        .set(
            &user,
            OverridePatch::new()
                .with_flag(FeatureKey::WearableSync, true)
                .unwrap(),
        )
        .await;

    assert!(
        harness
            .entitlements
            .has_access(&user, FeatureKey::WearableSync)
            .await
    );
    assert_eq!(harness.overrides.get(&user).await.unwrap().len(), 1);
    assert_eq!(harness.audit.pending_count().await, 1);
}

#[tokio::test]
async fn audit_backlog_does_not_slow_override_changes() {
    let log = Arc::new(StalledAuditLog::default());
    let harness = Harness::with_audit_log(log.clone());
    let user = harness
        .subscribe("user-free", "free", SubscriptionStatus::Active)
        .await;

    for round in 1..=30 {
        let started = Instant::now();
        harness
            .set(
                &user,
                OverridePatch::new()
                    .with_limit(FeatureKey::MaxMealPlansPerMonth, Limit::Capped(round))
                    .unwrap(),
            )
            .await;

        assert_eq!(log.appends.load(Ordering::SeqCst), round as usize);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    assert_eq!(harness.audit.pending_count().await, 30);
    assert_eq!(
        harness
            .entitlements
            .get_limit(&user, FeatureKey::MaxMealPlansPerMonth)
            .await,
        Limit::Capped(30)
    );
}

// =============================================================================
// Catalog
// =============================================================================

#[test]
fn shipped_catalog_file_matches_standard_catalog() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/catalog/tiers.yaml");
    let catalog = TierCatalog::from_path(path).unwrap();

    assert_eq!(catalog, TierCatalog::standard());
    assert!(catalog.monotonicity_violations().is_empty());
}
