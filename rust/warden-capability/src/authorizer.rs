//! The authorization capability trait.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Why an authorization decision did not allow the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum AuthorizeError {
    /// The policy was consulted and refused the request.
    #[error("access denied: {0}")]
    Denied(String),

    /// No decision could be obtained, e.g. the policy source is unreachable.
    ///
    /// Callers may retry; this is not a permanent denial.
    #[error("authorization unavailable: {0}")]
    Unavailable(String),
}

impl AuthorizeError {
    /// A policy denial.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied(reason.into())
    }

    /// A failure to reach a decision.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns `true` for [`AuthorizeError::Denied`].
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

/// Decides whether the bearer of a token may perform `action` on `resource`.
///
/// The gate treats the implementation as an opaque policy decision point and
/// never inspects its reasoning. Implementations that perform I/O own their
/// retry policy; the caller only bounds the total time spent.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Allow or refuse one request.
    ///
    /// # Errors
    ///
    /// [`AuthorizeError::Denied`] when policy refuses the request and
    /// [`AuthorizeError::Unavailable`] when no decision could be reached.
    async fn authorize(&self, token: &str, resource: &str, action: &str)
    -> Result<(), AuthorizeError>;
}

#[async_trait]
impl<A> Authorizer for Arc<A>
where
    A: Authorizer + ?Sized,
{
    async fn authorize(
        &self,
        token: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthorizeError> {
        (**self).authorize(token, resource, action).await
    }
}
