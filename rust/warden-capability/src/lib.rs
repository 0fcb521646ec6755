//! Authorization capabilities for Warden.
//!
//! The gate asks an [`Authorizer`] whether the bearer of a verified token may
//! perform an action on a resource. How the decision is made is up to the
//! implementation. Two are provided:
//!
//! - [`ScopeAuthorizer`] decides locally from the token's `scp` claim and a
//!   list of [`ScopeRule`]s.
//! - [`RemoteAuthorizer`] asks an HTTP policy decision endpoint.

mod authorizer;
pub use authorizer::*;

mod remote;
pub use remote::*;

mod scope;
pub use scope::*;
