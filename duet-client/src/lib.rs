pub mod call;
mod error;
pub mod media;
pub mod negotiation;
pub mod signaling;

pub use call::{Call, CallCommand, CallConfig, CallEvent, CallHandle};
pub use error::{CallError, MediaError, NegotiationError, TransportError};
pub use media::{
    ConnectionState, MediaConfig, MediaEngine, MediaEngineFactory, MediaEvent, SignalingState,
    WebRtcEngineFactory,
};
pub use negotiation::{NegotiationEngine, RemoteDescriptionOutcome};
pub use signaling::SignalChannel;
