use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::AUTHORIZATION;
use hyper::http::{Extensions, HeaderMap, request::Parts};
use hyper::{Method, Request, Uri};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use warden_capability::{AuthorizeError, Authorizer};
use warden_credentials::{CredentialHandler, TokenError};

use crate::{GatedEndpoints, Principal, Rejection, UnauthenticatedReason, extract};

/// Default bound on the authorization decision for one request.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(10);

/// A per-request deadline, read from the request extensions.
///
/// When present the gate waits for the authorization decision until the
/// earlier of this instant and its own timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(pub Instant);

impl Deadline {
    /// A deadline `duration` from now.
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }
}

/// What the gate decided for a request it did not reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The path is not gated; the request proceeds unchanged.
    Bypass,
    /// The request is authenticated and authorized.
    Allow(Principal),
}

/// Authenticates and authorizes requests to gated endpoints.
///
/// Each check is independent: the gate keeps no state between requests and
/// only reads the shared handler and authorizer.
#[derive(Clone)]
pub struct Gate {
    handler: Arc<dyn CredentialHandler>,
    authorizer: Arc<dyn Authorizer>,
    endpoints: GatedEndpoints,
    timeout: Duration,
}

impl Gate {
    /// Gate the default endpoints with the default timeout.
    pub fn new(handler: Arc<dyn CredentialHandler>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            handler,
            authorizer,
            endpoints: GatedEndpoints::default(),
            timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
        }
    }

    /// Replace the set of gated endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: GatedEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Replace the authorization timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The gated endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &GatedEndpoints {
        &self.endpoints
    }

    /// The authorization timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decide a request.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] that should terminate the request.
    pub fn check<'a, B>(
        &'a self,
        request: &'a Request<B>,
    ) -> impl Future<Output = Result<Outcome, Rejection>> + Send + 'a {
        self.decide(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    /// Decide a request that has been split into its parts.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] that should terminate the request.
    pub async fn check_parts(&self, parts: &Parts) -> Result<Outcome, Rejection> {
        self.decide(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
            .await
    }

    async fn decide(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        extensions: &Extensions,
    ) -> Result<Outcome, Rejection> {
        let path = uri.path();
        if !self.endpoints.is_gated(path) {
            return Ok(Outcome::Bypass);
        }

        let Some(token) = bearer_token(headers) else {
            tracing::warn!(path, "request without bearer credential");
            return Err(Rejection::Unauthenticated(
                UnauthenticatedReason::MissingCredential,
            ));
        };

        let verified = self.handler.verify(token).map_err(|error| {
            let reason = match error {
                TokenError::Expired => UnauthenticatedReason::TokenExpired,
                TokenError::Invalid => UnauthenticatedReason::InvalidToken,
            };
            tracing::warn!(path, %reason, "rejected bearer credential");
            Rejection::Unauthenticated(reason)
        })?;
        let principal = Principal::from(verified.into_claims());

        let target = extract(method, path);

        let mut deadline = Instant::now() + self.timeout;
        if let Some(Deadline(requested)) = extensions.get::<Deadline>() {
            deadline = deadline.min(*requested);
        }
        let decision = timeout_at(
            deadline,
            self.authorizer
                .authorize(token, &target.resource, &target.action),
        );

        let decision = match extensions.get::<CancellationToken>() {
            Some(cancellation) => tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    tracing::warn!(%target, "request cancelled during authorization");
                    return Err(Rejection::AuthorizationUnavailable);
                }
                decision = decision => decision,
            },
            None => decision.await,
        };

        match decision {
            Ok(Ok(())) => {
                tracing::debug!(%target, subject = %principal.subject, "request allowed");
                Ok(Outcome::Allow(principal))
            }
            Ok(Err(AuthorizeError::Denied(reason))) => {
                tracing::warn!(%target, subject = %principal.subject, %reason, "request denied");
                Err(Rejection::Forbidden)
            }
            Ok(Err(AuthorizeError::Unavailable(reason))) => {
                tracing::warn!(%target, %reason, "authorization unavailable");
                Err(Rejection::AuthorizationUnavailable)
            }
            Err(_) => {
                tracing::warn!(%target, "authorization timed out");
                Err(Rejection::AuthorizationUnavailable)
            }
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; an empty token counts as
/// missing.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn it_reads_bearer_tokens_with_any_scheme_case() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER  abc ")), Some("abc"));
    }

    #[test]
    fn it_treats_malformed_headers_as_missing() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearerabc")), None);
    }

    #[test]
    fn it_orders_deadlines_by_instant() {
        let now = Instant::now();
        assert!(Deadline(now) < Deadline(now + Duration::from_millis(1)));
        assert!(Deadline::after(Duration::from_secs(60)) > Deadline(now));
    }
}
