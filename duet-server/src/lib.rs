mod config;
mod error;
mod server;
mod session;
mod signaling;

pub use config::RelayConfig;
pub use error::RelayError;
pub use server::{RelayHandle, router, serve, serve_on, spawn};
pub use session::*;
pub use signaling::*;
