mod client;
mod description;
mod role;
mod session;
mod signaling;

pub use client::ClientId;
pub use description::{Candidate, SdpType, SessionDescription};
pub use role::Role;
pub use session::{InvalidSessionId, SessionId};
pub use signaling::{IceServerConfig, SignalConversionError, SignalEnvelope, SignalMessage};
