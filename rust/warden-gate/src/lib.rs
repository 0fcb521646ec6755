//! The Warden request gate.
//!
//! For each request to a gated endpoint the [`Gate`]:
//!
//! 1. reads the bearer token from the `Authorization` header,
//! 2. verifies it with a [`warden_credentials::CredentialHandler`],
//! 3. derives the resource/action pair with [`extract`],
//! 4. asks a [`warden_capability::Authorizer`] for a decision, bounded by a
//!    timeout, an optional [`Deadline`] and an optional
//!    [`tokio_util::sync::CancellationToken`] in the request extensions.
//!
//! Requests to other endpoints bypass the gate. Allowed requests continue
//! with a [`Principal`] attached; refused ones end in a [`Rejection`].
//! [`GateLayer`] packages the gate as `tower` middleware.

mod extract;
pub use extract::*;

mod gate;
pub use gate::*;

mod layer;
pub use layer::*;

mod principal;
pub use principal::*;

mod rejection;
pub use rejection::*;
