//! Token claims and their validity rules.
//!
//! Claims are serialized with short, stable tags to keep tokens small. Fields
//! holding their zero value are left out of the payload entirely and decode
//! back to that same zero value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a claim set is not usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ClaimsError {
    /// One of `iss`, `sub` or `scp` is empty, or `exp` is missing.
    #[error("claims are missing a required field")]
    Invalid,

    /// The current time is past `exp`.
    #[error("claims have expired")]
    Expired,
}

/// Assertions made about an authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claims {
    /// Issuing authority.
    #[serde(rename = "iss", default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,

    /// Principal (user or device) the token was issued to.
    #[serde(rename = "sub", default, skip_serializing_if = "String::is_empty")]
    pub subject: String,

    /// Class of operations the token permits.
    #[serde(rename = "scp", default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    /// Expiration time, Unix seconds. Zero means absent.
    #[serde(rename = "exp", default, skip_serializing_if = "is_zero")]
    pub expires_at: i64,

    /// Issue time, Unix seconds.
    #[serde(rename = "iat", default, skip_serializing_if = "is_zero")]
    pub issued_at: i64,

    /// Start of validity, Unix seconds.
    #[serde(rename = "nbf", default, skip_serializing_if = "is_zero")]
    pub not_before: i64,

    /// Token identifier.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Intended recipient.
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Tenant the principal belongs to.
    #[serde(
        rename = "mender.tenant",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tenant: Option<String>,

    /// Set for tokens issued to human users rather than devices.
    #[serde(rename = "mender.user", default, skip_serializing_if = "is_false")]
    pub is_user: bool,
}

impl Claims {
    /// Create a claim set carrying the required fields.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        scope: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            scope: scope.into(),
            expires_at,
            ..Self::default()
        }
    }

    /// Returns `true` when every required field is present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.issuer.is_empty()
            && !self.subject.is_empty()
            && !self.scope.is_empty()
            && self.expires_at != 0
    }

    /// Returns `true` when `now` does not exceed the expiration time.
    #[must_use]
    pub fn is_current_at(&self, now: i64) -> bool {
        now <= self.expires_at
    }

    /// Check the claims against a fixed clock reading.
    ///
    /// # Errors
    ///
    /// [`ClaimsError::Invalid`] when a required field is missing, otherwise
    /// [`ClaimsError::Expired`] when `now` is past `exp`.
    pub fn validate_at(&self, now: i64) -> Result<(), ClaimsError> {
        if !self.is_well_formed() {
            return Err(ClaimsError::Invalid);
        }
        if !self.is_current_at(now) {
            return Err(ClaimsError::Expired);
        }
        Ok(())
    }

    /// Check the claims against the wall clock.
    ///
    /// # Errors
    ///
    /// See [`Claims::validate_at`].
    pub fn validate(&self) -> Result<(), ClaimsError> {
        self.validate_at(now())
    }
}

/// Current Unix time in seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}
