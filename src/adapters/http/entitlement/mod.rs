//! HTTP adapter for entitlement endpoints.
//!
//! Exposes entitlement checks, usage recording, admin override management
//! and the tier catalog over REST.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AdminIdentity, ApiError, EntitlementAppState, ADMIN_ID_HEADER};
pub use routes::entitlement_router;
