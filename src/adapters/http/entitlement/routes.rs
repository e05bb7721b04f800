//! Axum router configuration for entitlement endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    check_access, confirm_reset, get_decision, get_limit, get_overrides, get_quota,
    list_audit_entries, list_features, list_tiers, record_usage, request_reset,
    retry_audit_entries, set_overrides,
    EntitlementAppState,
};

/// Creates the entitlement router.
///
/// # Routes
///
/// ## Checks
/// - `GET /api/entitlements/:user/:feature` - Full decision
/// - `GET /api/entitlements/:user/:feature/access` - `{has_access}`
/// - `GET /api/entitlements/:user/:feature/limit` - `{limit}`, `-1` unlimited
/// - `GET /api/entitlements/:user/:feature/quota` - Limit and usage for a period
/// - `POST /api/usage/:user/:feature` - Record usage
///
/// ## Admin (require `X-Admin-Id`)
/// - `GET /api/admin/users/:user/overrides`
/// - `PATCH /api/admin/users/:user/overrides`
/// - `POST /api/admin/users/:user/overrides/reset-request`
/// - `POST /api/admin/users/:user/overrides/reset`
/// - `GET /api/admin/users/:user/audit`
/// - `POST /api/admin/audit/retry` - Drain the audit retry queue
///
/// ## Catalog
/// - `GET /api/catalog/tiers`
/// - `GET /api/catalog/features`
pub fn entitlement_router() -> Router<EntitlementAppState> {
    Router::new()
        .route("/api/entitlements/:user/:feature", get(get_decision))
        .route("/api/entitlements/:user/:feature/access", get(check_access))
        .route("/api/entitlements/:user/:feature/limit", get(get_limit))
        .route("/api/entitlements/:user/:feature/quota", get(get_quota))
        .route("/api/usage/:user/:feature", post(record_usage))
        .route(
            "/api/admin/users/:user/overrides",
            get(get_overrides).patch(set_overrides),
        )
        .route(
            "/api/admin/users/:user/overrides/reset-request",
            post(request_reset),
        )
        .route("/api/admin/users/:user/overrides/reset", post(confirm_reset))
        .route("/api/admin/users/:user/audit", get(list_audit_entries))
        .route("/api/admin/audit/retry", post(retry_audit_entries))
        .route("/api/catalog/tiers", get(list_tiers))
        .route("/api/catalog/features", get(list_features))
}
