//! Entitlement domain.
//!
//! Tier catalog, feature registry, per-user overrides and the pure resolver
//! that combines them into a [`Decision`].

mod audit;
mod catalog;
mod decision;
mod errors;
mod feature;
mod limit;
mod overrides;
mod reset_token;
mod resolver;
mod subscriber;
mod tier;

pub use audit::{AuditAction, AuditDiff, AuditLogEntry, ValueChange};
pub use catalog::{CatalogError, CatalogViolation, TierCatalog};
pub use decision::{Decision, DecisionSource};
pub use errors::EntitlementError;
pub use feature::{registry, FeatureDescriptor, FeatureKey, FeatureKind, REGISTRY_VERSION};
pub use limit::Limit;
pub use overrides::{FeatureOverrides, OverrideEntry, OverridePatch, OverrideValue};
pub use reset_token::{ResetToken, ResetTokenError, ResetTokenSigner, MAX_TOKEN_TTL};
pub use resolver::{resolve, EntitlementResolver};
pub use subscriber::{Subscriber, SubscriptionStatus};
pub use tier::{Tier, TierId};
