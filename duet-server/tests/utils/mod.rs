
pub use signal_helpers::*;
pub use test_peer::*;
pub use ws_peer::*;
