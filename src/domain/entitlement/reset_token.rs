//! Confirmation tokens for resetting a user's overrides.
//!
//! Resetting is destructive, so it takes two calls: one to request a token,
//! one to confirm with it. A token is an HMAC-SHA256 signature over the
//! target user, the requesting admin, an expiry and a random nonce.
//!
//! Format: `v1.<expires_unix>.<nonce>.<hex signature>`

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::foundation::{AdminId, Timestamp, UserId};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Longest lifetime a token may be issued with.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Why a reset token was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetTokenError {
    #[error("reset token is malformed: {0}")]
    Malformed(String),

    #[error("reset token signature does not match")]
    InvalidSignature,

    #[error("reset token expired")]
    Expired,

    #[error("reset token key rejected")]
    InvalidKey,
}

/// An issued token and when it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Issues and verifies reset tokens with a shared secret.
pub struct ResetTokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl ResetTokenSigner {
    /// Creates a signer. The lifetime is clamped to [`MAX_TOKEN_TTL`].
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self {
            secret,
            ttl: ttl.min(MAX_TOKEN_TTL),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for resetting `user`'s overrides on behalf of `admin`.
    pub fn issue(
        &self,
        user: &UserId,
        admin: &AdminId,
        now: Timestamp,
    ) -> Result<ResetToken, ResetTokenError> {
        let expires_at = now.plus_secs(self.ttl.as_secs() as i64);
        let expires = expires_at.as_unix_secs();
        let nonce = Uuid::new_v4().simple().to_string();

        let signature = self.sign(user, admin, expires, &nonce)?;

        Ok(ResetToken {
            token: format!("{}.{}.{}.{}", TOKEN_VERSION, expires, nonce, hex::encode(signature)),
            expires_at,
        })
    }

    /// Verifies that `token` was issued for this user and admin and is
    /// still within its lifetime.
    pub fn verify(
        &self,
        token: &str,
        user: &UserId,
        admin: &AdminId,
        now: Timestamp,
    ) -> Result<(), ResetTokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [version, expires, nonce, signature] = parts.as_slice() else {
            return Err(ResetTokenError::Malformed("expected four segments".to_string()));
        };

        if *version != TOKEN_VERSION {
            return Err(ResetTokenError::Malformed(format!("unsupported version '{}'", version)));
        }
        let expires: i64 = expires
            .parse()
            .map_err(|_| ResetTokenError::Malformed("invalid expiry".to_string()))?;
        let provided = hex::decode(signature)
            .map_err(|_| ResetTokenError::Malformed("invalid signature hex".to_string()))?;

        let expected = self.sign(user, admin, expires, nonce)?;
        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            return Err(ResetTokenError::InvalidSignature);
        }

        // Checked after the signature so a forged expiry is reported as forged.
        if now.as_unix_secs() > expires {
            return Err(ResetTokenError::Expired);
        }

        Ok(())
    }

    fn sign(
        &self,
        user: &UserId,
        admin: &AdminId,
        expires: i64,
        nonce: &str,
    ) -> Result<Vec<u8>, ResetTokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| ResetTokenError::InvalidKey)?;
        let message = format!(
            "{}|{}|{}|{}|{}",
            TOKEN_VERSION,
            user.as_str(),
            admin.as_str(),
            expires,
            nonce
        );
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for ResetTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetTokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
