//! Bearer credentials for Warden.
//!
//! This crate covers the token lifecycle:
//!
//! - [`Claims`]: the assertions carried by a token and the rules deciding
//!   whether a claim set is usable.
//! - [`Token`]: an immutable wrapper around one claim set.
//! - [`KeyMaterial`]: the active signing key plus fallback verification keys.
//! - [`CredentialHandler`]: mints and verifies compact tokens;
//!   [`Rs256Handler`] is the RS256 implementation with key rollover.
//!
//! # Example
//!
//! ```ignore
//! use warden_credentials::{Claims, CredentialHandler, KeyMaterial, Rs256Handler, Token};
//!
//! let keys = KeyMaterial::load("private.pem", &["previous.pem"])?;
//! let handler = Rs256Handler::new(&keys);
//!
//! let claims = Claims::new("mender", "user-1", "mender.users.manage", expires_at);
//! let encoded = handler.issue(&Token::new(claims))?;
//! let token = handler.verify(&encoded)?;
//! ```

mod claims;
pub use claims::*;

mod error;
pub use error::*;

mod handler;
pub use handler::*;

pub mod key;
pub use key::{KeyError, KeyMaterial};

mod rs256;
pub use rs256::*;

mod token;
pub use token::*;
