//! HTTP handlers for entitlement endpoints.
//!
//! These handlers connect Axum routes to the entitlement command and query
//! handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::entitlement::{
    CheckEntitlementHandler, CheckEntitlementQuery, CheckQuotaHandler, CheckQuotaQuery,
    ConfirmResetCommand, GetOverridesHandler, GetOverridesQuery, ListAuditEntriesHandler,
    ListAuditEntriesQuery, RecordUsageCommand, RecordUsageHandler, RequestResetCommand,
    ResetOverridesHandler, SetOverridesCommand, SetOverridesHandler,
};
use crate::application::services::{AuditLogger, UsageCounterService};
use crate::domain::entitlement::{
    registry, EntitlementError, EntitlementResolver, FeatureKey, ResetTokenSigner, TierCatalog,
    REGISTRY_VERSION,
};
use crate::domain::foundation::{AdminId, ErrorCode, UserId, ValidationError};
use crate::ports::{OverrideStore, SubscriberReader};

use super::dto::{
    AccessResponse, AuditEntriesResponse, AuditRetryResponse, ConfirmResetRequest, DecisionResponse, ErrorResponse,
    FeaturesResponse, LimitResponse, OverridesResponse, QuotaParams, RecordUsageRequest,
    RecordUsageResponse, SetOverridesResponse, TiersResponse,
};

/// Header carrying the acting administrator, set by the auth gateway.
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the entitlement routes. Cheap to clone.
#[derive(Clone)]
pub struct EntitlementAppState {
    pub catalog: Arc<TierCatalog>,
    pub entitlements: Arc<CheckEntitlementHandler>,
    pub quota: Arc<CheckQuotaHandler>,
    pub record_usage: Arc<RecordUsageHandler>,
    pub get_overrides: Arc<GetOverridesHandler>,
    pub set_overrides: Arc<SetOverridesHandler>,
    pub reset_overrides: Arc<ResetOverridesHandler>,
    pub audit_entries: Arc<ListAuditEntriesHandler>,
    pub audit: Arc<AuditLogger>,
}

impl EntitlementAppState {
    /// Wires every handler from the shared ports and services.
    pub fn new(
        catalog: Arc<TierCatalog>,
        subscribers: Arc<dyn SubscriberReader>,
        overrides: Arc<dyn OverrideStore>,
        counters: Arc<UsageCounterService>,
        audit: Arc<AuditLogger>,
        signer: Arc<ResetTokenSigner>,
    ) -> Self {
        let entitlements = Arc::new(CheckEntitlementHandler::new(
            subscribers,
            overrides.clone(),
            EntitlementResolver::new(catalog.clone()),
        ));

        Self {
            quota: Arc::new(CheckQuotaHandler::new(entitlements.clone(), counters.clone())),
            record_usage: Arc::new(RecordUsageHandler::new(counters)),
            get_overrides: Arc::new(GetOverridesHandler::new(overrides.clone())),
            set_overrides: Arc::new(SetOverridesHandler::new(overrides.clone(), audit.clone())),
            reset_overrides: Arc::new(ResetOverridesHandler::new(overrides, audit.clone(), signer)),
            audit_entries: Arc::new(ListAuditEntriesHandler::new(audit.clone())),
            audit,
            entitlements,
            catalog,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Context
// ════════════════════════════════════════════════════════════════════════════════

/// Administrator identity taken from the [`ADMIN_ID_HEADER`] header.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub AdminId);

/// Rejection for requests without an admin identity.
pub struct AdminIdentityRequired;

impl IntoResponse for AdminIdentityRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new(
            ErrorCode::Unauthorized.to_string(),
            "Admin identity is required",
        );
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = AdminIdentityRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ADMIN_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| AdminId::new(s.trim()).ok())
            .map(AdminIdentity)
            .ok_or(AdminIdentityRequired)
    }
}

fn parse_target(user: String, feature: &str) -> Result<(UserId, FeatureKey), ApiError> {
    Ok((UserId::new(user)?, FeatureKey::from_str(feature)?))
}

// ════════════════════════════════════════════════════════════════════════════════
// Entitlement Queries
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/entitlements/:user/:feature - Full decision
pub async fn get_decision(
    State(state): State<EntitlementAppState>,
    Path((user, feature)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, feature) = parse_target(user, &feature)?;
    let decision = state
        .entitlements
        .handle(CheckEntitlementQuery::new(user_id, feature))
        .await;
    Ok(Json(DecisionResponse::new(feature, decision)))
}

/// GET /api/entitlements/:user/:feature/access
pub async fn check_access(
    State(state): State<EntitlementAppState>,
    Path((user, feature)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, feature) = parse_target(user, &feature)?;
    let has_access = state.entitlements.has_access(&user_id, feature).await;
    Ok(Json(AccessResponse { has_access }))
}

/// GET /api/entitlements/:user/:feature/limit
pub async fn get_limit(
    State(state): State<EntitlementAppState>,
    Path((user, feature)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, feature) = parse_target(user, &feature)?;
    let limit = state.entitlements.get_limit(&user_id, feature).await;
    Ok(Json(LimitResponse { limit }))
}

/// GET /api/entitlements/:user/:feature/quota?period=YYYY-MM
pub async fn get_quota(
    State(state): State<EntitlementAppState>,
    Path((user, feature)): Path<(String, String)>,
    Query(params): Query<QuotaParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, feature) = parse_target(user, &feature)?;
    let status = state
        .quota
        .handle(CheckQuotaQuery {
            user_id,
            feature,
            period: params.period,
        })
        .await?;
    Ok(Json(status))
}

// ════════════════════════════════════════════════════════════════════════════════
// Usage
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/usage/:user/:feature - Record consumption
///
/// The body is optional; an empty body records one unit in the current
/// period.
pub async fn record_usage(
    State(state): State<EntitlementAppState>,
    Path((user, feature)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, feature) = parse_target(user, &feature)?;
    let request: RecordUsageRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RecordUsageRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ValidationError::invalid_format("body", e.to_string()))?
    };

    let result = state
        .record_usage
        .handle(RecordUsageCommand {
            user_id,
            feature,
            amount: request.amount.unwrap_or(1),
            period: request.period,
        })
        .await?;
    Ok(Json(RecordUsageResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Overrides
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/admin/users/:user/overrides
pub async fn get_overrides(
    State(state): State<EntitlementAppState>,
    AdminIdentity(_admin): AdminIdentity,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::new(user)?;
    let overrides = state
        .get_overrides
        .handle(GetOverridesQuery { user_id })
        .await?;
    Ok(Json(OverridesResponse::from(overrides)))
}

/// PATCH /api/admin/users/:user/overrides - Shallow-merge `{ featureKey: value }`
pub async fn set_overrides(
    State(state): State<EntitlementAppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(user): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = UserId::new(user)?;
    let serde_json::Value::Object(changes) = body else {
        return Err(ValidationError::invalid_format("body", "expected a JSON object").into());
    };

    let command = SetOverridesCommand::from_json(user_id, admin, &changes)?;
    let result = state.set_overrides.handle(command).await?;
    Ok(Json(SetOverridesResponse::from(result)))
}

/// POST /api/admin/users/:user/overrides/reset-request - Issue a reset token
pub async fn request_reset(
    State(state): State<EntitlementAppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .reset_overrides
        .request(RequestResetCommand {
            user_id: UserId::new(user)?,
            acting_admin_id: admin,
        })
        .await?;
    Ok(Json(token))
}

/// POST /api/admin/users/:user/overrides/reset - Confirm with a token
pub async fn confirm_reset(
    State(state): State<EntitlementAppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(user): Path<String>,
    Json(request): Json<ConfirmResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .reset_overrides
        .confirm(ConfirmResetCommand {
            user_id: UserId::new(user)?,
            acting_admin_id: admin,
            token: request.token,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/users/:user/audit - Override history, oldest first
pub async fn list_audit_entries(
    State(state): State<EntitlementAppState>,
    AdminIdentity(_admin): AdminIdentity,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .audit_entries
        .handle(ListAuditEntriesQuery {
            user_id: UserId::new(user)?,
        })
        .await?;
    Ok(Json(AuditEntriesResponse { entries }))
}

/// POST /api/admin/audit/retry - Write queued audit entries
pub async fn retry_audit_entries(
    State(state): State<EntitlementAppState>,
    AdminIdentity(admin): AdminIdentity,
) -> impl IntoResponse {
    let written = state.audit.retry_pending().await;
    let remaining = state.audit.pending_count().await;
    tracing::info!(admin_id = %admin, written, remaining, "audit retry requested");
    Json(AuditRetryResponse { written, remaining })
}

// ════════════════════════════════════════════════════════════════════════════════
// Catalog
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/catalog/tiers
pub async fn list_tiers(State(state): State<EntitlementAppState>) -> impl IntoResponse {
    Json(TiersResponse {
        tiers: state.catalog.list_tiers().to_vec(),
    })
}

/// GET /api/catalog/features
pub async fn list_features() -> impl IntoResponse {
    Json(FeaturesResponse {
        registry_version: REGISTRY_VERSION,
        features: registry().collect(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for entitlement errors.
#[derive(Debug)]
pub struct ApiError(EntitlementError);

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(EntitlementError::Validation(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EntitlementError::Validation(_) => StatusCode::BAD_REQUEST,
            EntitlementError::InvalidResetToken(_) => StatusCode::FORBIDDEN,
            EntitlementError::CounterUpdate { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EntitlementError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            EntitlementError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}
