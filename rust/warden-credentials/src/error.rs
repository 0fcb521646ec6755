//! Error types for token issuance and verification.

use crate::ClaimsError;
use thiserror::Error;

/// Why an inbound token was refused.
///
/// Cryptographic and encoding failures collapse into [`TokenError::Invalid`]
/// so callers cannot learn which structural check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TokenError {
    /// Malformed, wrongly signed, or missing required claims.
    #[error("token invalid")]
    Invalid,

    /// Correctly signed but past its expiration time.
    #[error("token expired")]
    Expired,
}

impl From<ClaimsError> for TokenError {
    fn from(error: ClaimsError) -> Self {
        match error {
            ClaimsError::Invalid => Self::Invalid,
            ClaimsError::Expired => Self::Expired,
        }
    }
}

/// Failure to mint a token. Only reachable through misconfiguration.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The claims could not be encoded.
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),

    /// The signing key refused to sign.
    #[error("failed to sign token: {0}")]
    Sign(#[source] signature::Error),
}
