use crate::RelayError;
use axum::extract::ws::Utf8Bytes;
use duet_core::{ClientId, Role};
use tokio::sync::{mpsc, oneshot};

/// Commands a session actor receives from the sockets attached to it.
#[derive(Debug)]
pub enum SessionCommand {
    /// A socket was accepted. `outbound` is drained by that socket's writer.
    Connect {
        client_id: ClientId,
        outbound: mpsc::Sender<Utf8Bytes>,
        reply: oneshot::Sender<Result<Role, RelayError>>,
    },

    /// A text frame arrived from `client_id`, untouched.
    Relay { client_id: ClientId, text: Utf8Bytes },

    /// The socket of `client_id` is gone.
    Disconnect { client_id: ClientId },
}
