use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, WWW_AUTHENTICATE};
use hyper::{Response, StatusCode};
use thiserror::Error;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UnauthenticatedReason {
    /// No usable `Authorization: Bearer` header.
    #[error("missing bearer credential")]
    MissingCredential,
    /// The token failed verification.
    #[error("invalid token")]
    InvalidToken,
    /// The token verified but is past its expiration time.
    #[error("token expired")]
    TokenExpired,
}

/// The terminal outcome of a request the gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The caller's identity could not be established.
    #[error("unauthenticated: {0}")]
    Unauthenticated(UnauthenticatedReason),

    /// The caller is known but may not perform the request.
    #[error("forbidden")]
    Forbidden,

    /// No authorization decision could be obtained in time.
    #[error("authorization unavailable")]
    AuthorizationUnavailable,
}

impl Rejection {
    /// HTTP status reported to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AuthorizationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message reported to the caller.
    ///
    /// Every [`Rejection::Unauthenticated`] reason shares one message so
    /// callers cannot probe which check failed.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::AuthorizationUnavailable => "authorization unavailable",
        }
    }

    /// Render as a JSON error response, `{"error": "<message>"}`.
    #[must_use]
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({ "error": self.public_message() }).to_string();

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = self.status();

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Self::Unauthenticated(_) = self {
            headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    async fn body(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn it_hides_why_authentication_failed() {
        let expired = Rejection::Unauthenticated(UnauthenticatedReason::TokenExpired);
        let invalid = Rejection::Unauthenticated(UnauthenticatedReason::InvalidToken);

        let expired = expired.into_response();
        let invalid = invalid.into_response();

        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.headers()[WWW_AUTHENTICATE], "Bearer");
        assert_eq!(expired.headers(), invalid.headers());
        assert_eq!(body(expired).await, body(invalid).await);
    }

    #[tokio::test]
    async fn it_maps_decisions_to_status_codes() {
        let forbidden = Rejection::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert!(forbidden.headers().get(WWW_AUTHENTICATE).is_none());
        assert_eq!(body(forbidden).await, r#"{"error":"forbidden"}"#);

        let unavailable = Rejection::AuthorizationUnavailable.into_response();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body(unavailable).await,
            r#"{"error":"authorization unavailable"}"#
        );
    }
}
