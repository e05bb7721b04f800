//! RecordUsageHandler - Command handler for metered feature consumption.

use std::sync::Arc;

use crate::application::services::UsageCounterService;
use crate::domain::entitlement::{EntitlementError, FeatureKey};
use crate::domain::foundation::{PeriodKey, Timestamp, UserId};

/// Command to record consumption after a successful action.
#[derive(Debug, Clone)]
pub struct RecordUsageCommand {
    pub user_id: UserId,
    pub feature: FeatureKey,
    pub amount: u64,
    /// Defaults to the period containing now.
    pub period: Option<PeriodKey>,
}

impl RecordUsageCommand {
    /// Records a single unit in the current period.
    pub fn single(user_id: UserId, feature: FeatureKey) -> Self {
        Self {
            user_id,
            feature,
            amount: 1,
            period: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUsageResult {
    pub period: PeriodKey,
    pub count: u64,
}

pub struct RecordUsageHandler {
    counters: Arc<UsageCounterService>,
}

impl RecordUsageHandler {
    pub fn new(counters: Arc<UsageCounterService>) -> Self {
        Self { counters }
    }

    /// # Errors
    ///
    /// - `Validation` for a zero amount or a non-metered feature
    /// - `CounterUpdate` when the increment could not be applied; treat
    ///   the feature as over its limit
    pub async fn handle(&self, cmd: RecordUsageCommand) -> Result<RecordUsageResult, EntitlementError> {
        let period = cmd.period.unwrap_or_else(|| Timestamp::now().period_key());
        let count = self
            .counters
            .increment(&cmd.user_id, cmd.feature, period, cmd.amount)
            .await?;

        Ok(RecordUsageResult { period, count })
    }
}
