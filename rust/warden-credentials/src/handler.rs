use crate::{IssueError, Token, TokenError};

/// Mints and verifies signed bearer tokens.
///
/// Implementations are shared across concurrent requests and hold only
/// read-only key material.
pub trait CredentialHandler: Send + Sync {
    /// Produce the compact signed form of `token`.
    ///
    /// # Errors
    ///
    /// Only fails when the claims cannot be encoded or the signing key is
    /// unusable, both of which indicate a configuration problem.
    fn issue(&self, token: &Token) -> Result<String, IssueError>;

    /// Verify a compact token and recover its claims.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] for a correctly signed token past its
    /// expiration time, [`TokenError::Invalid`] for every other failure.
    fn verify(&self, token: &str) -> Result<Token, TokenError>;
}
