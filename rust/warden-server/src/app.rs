//! Routes served behind the gate.

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use tower::Service;
use warden_gate::{INTERNAL_VERIFY_PATH, MANAGEMENT_VERIFY_PATH, Principal};

/// Liveness endpoint. Never gated by default.
pub const HEALTH_PATH: &str = "/api/internal/v1/warden/health";

/// The Warden routes.
///
/// The verification endpoints answer with the [`Principal`] the gate
/// attached; without one they refuse the request, so they are only useful
/// behind a gate that covers them.
#[derive(Debug, Clone, Copy, Default)]
pub struct App;

impl<B> Service<Request<B>> for App {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        ready(Ok(route(&request)))
    }
}

fn route<B>(request: &Request<B>) -> Response<Full<Bytes>> {
    let path = request.uri().path();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    match (request.method(), path) {
        (&Method::GET, HEALTH_PATH) => empty(StatusCode::NO_CONTENT),
        (&Method::GET | &Method::POST, INTERNAL_VERIFY_PATH | MANAGEMENT_VERIFY_PATH) => {
            match request.extensions().get::<Principal>() {
                Some(principal) => json(StatusCode::OK, principal),
                None => error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
            }
        }
        (_, HEALTH_PATH | INTERNAL_VERIFY_PATH | MANAGEMENT_VERIFY_PATH) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::default());
    *response.status_mut() = status;
    response
}

fn json<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(error) => {
            tracing::error!(%error, "failed to encode response");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// A `{"error": "<message>"}` response.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn request(method: Method, path: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .unwrap()
    }

    async fn body(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn it_reports_health() {
        let response = App.oneshot(request(Method::GET, HEALTH_PATH)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn it_returns_the_attached_principal() {
        let mut request = request(Method::POST, "/api/management/v1/warden/auth/verify/");
        request.extensions_mut().insert(Principal {
            subject: "user-1".into(),
            tenant: None,
            scope: "mender.*".into(),
        });

        let response = App.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body(response).await,
            r#"{"subject":"user-1","scope":"mender.*"}"#
        );
    }

    #[tokio::test]
    async fn it_refuses_verification_without_a_principal() {
        let response = App
            .oneshot(request(Method::POST, INTERNAL_VERIFY_PATH))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn it_rejects_unknown_routes_and_methods() {
        let response = App.oneshot(request(Method::GET, "/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await, r#"{"error":"not found"}"#);

        let response = App
            .oneshot(request(Method::DELETE, HEALTH_PATH))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
