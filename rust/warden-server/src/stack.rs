//! Middleware stacks wrapped around the gated application.

use std::any::Any;
use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Body;
use hyper::header::{
    ACCEPT, ACCEPT_ENCODING, ACCESS_CONTROL_REQUEST_HEADERS, ALLOW, AUTHORIZATION, CONTENT_TYPE,
    HeaderName, HeaderValue, LINK, LOCATION, ORIGIN,
};
use hyper::{Method, Request, Response, StatusCode};
use tower::ServiceBuilder;
use tower::util::BoxCloneService;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use warden_gate::{Gate, GateLayer};

use crate::{App, MiddlewareStack, error_response};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Response body produced by every stack.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// A complete Warden service, ready to be handed to hyper.
pub type WardenService<B> = BoxCloneService<Request<B>, Response<ResponseBody>, Infallible>;

/// Header carrying the server version on every response.
pub const VERSION_HEADER: &str = "x-warden-version";

/// Assemble the gated application inside the selected middleware stack.
///
/// Both stacks assign request ids, trace requests, answer CORS preflights and
/// stamp [`VERSION_HEADER`]. `Dev` reports panic messages to the caller,
/// `Prod` hides them and compresses responses.
pub fn build<B>(stack: MiddlewareStack, gate: Gate) -> WardenService<B>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let app = ServiceBuilder::new()
        .layer(GateLayer::new(gate))
        .service(App);

    tracing::info!(?stack, "setting up middleware");
    match stack {
        MiddlewareStack::Dev => BoxCloneService::new(
            ServiceBuilder::new()
                .map_response(boxed)
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(version_header())
                .layer(cors())
                .layer(CatchPanicLayer::custom(report_panic))
                .service(app),
        ),
        MiddlewareStack::Prod => BoxCloneService::new(
            ServiceBuilder::new()
                .map_response(boxed)
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(version_header())
                .layer(cors())
                .layer(CompressionLayer::new())
                .layer(CatchPanicLayer::custom(conceal_panic))
                .service(app),
        ),
    }
}

fn boxed<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    response.map(|body| body.map_err(Into::into).boxed_unsync())
}

fn version_header() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static(VERSION_HEADER),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    )
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            ALLOW,
            CONTENT_TYPE,
            ORIGIN,
            AUTHORIZATION,
            ACCEPT_ENCODING,
            ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderName::from_static("header-access-control-request"),
        ])
        .expose_headers([LOCATION, LINK])
        .max_age(Duration::from_secs(60))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "panic with a non-string payload"
    }
}

fn report_panic(panic: Box<dyn Any + Send + 'static>) -> Response<http_body_util::Full<Bytes>> {
    let message = panic_message(panic.as_ref());
    tracing::error!(panic = message, "request handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn conceal_panic(panic: Box<dyn Any + Send + 'static>) -> Response<http_body_util::Full<Bytes>> {
    tracing::error!(panic = panic_message(panic.as_ref()), "request handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}
