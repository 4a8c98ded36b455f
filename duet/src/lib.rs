pub use duet_core::model::{ClientId, Role, SessionId};

pub mod model {
    pub use duet_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use duet_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use duet_client::*;
}
