//! The `warden` server and operator tooling.
//!
//! [`serve`] runs the gate from [`warden_gate`] in front of the token
//! verification and health routes, wrapped in a [`MiddlewareStack`].
//! [`commands`] holds the `issue` and `verify` operator commands.

mod app;
pub use app::*;

mod cli;
pub use cli::*;

pub mod commands;

mod serve;
pub use serve::*;

pub mod stack;
pub use stack::{BoxError, ResponseBody, VERSION_HEADER, WardenService};
