use crate::RelayError;
use crate::session::session_command::SessionCommand;
use crate::signaling::encode_signal;
use axum::extract::ws::Utf8Bytes;
use duet_core::{ClientId, Role, SessionId, SignalEnvelope, SignalMessage};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// One live socket attached to a session.
#[derive(Debug)]
pub struct ConnectionRecord {
    pub id: ClientId,
    pub role: Role,
    outbound: mpsc::Sender<Utf8Bytes>,
}

impl ConnectionRecord {
    /// Never waits: a peer that stops reading loses frames, not the session.
    fn send(&self, text: Utf8Bytes) {
        match self.outbound.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of {} is full, dropping frame", self.id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Writer for {} already gone, dropping frame", self.id);
            }
        }
    }

    fn announce_role(&self) {
        let msg = SignalMessage::Role {
            role: self.role,
            client_id: self.id,
        };
        match encode_signal(&msg) {
            Ok(text) => self.send(text),
            Err(e) => error!("Failed to encode role for {}: {}", self.id, e),
        }
    }
}

/// Actor owning the connection table of one session.
///
/// Every insert, removal and broadcast runs on this task, in command order.
pub struct Session {
    id: SessionId,
    capacity: usize,
    connections: HashMap<ClientId, ConnectionRecord>,
    command_rx: mpsc::Receiver<SessionCommand>,
}

impl Session {
    pub fn new(id: SessionId, capacity: usize, command_rx: mpsc::Receiver<SessionCommand>) -> Self {
        Self {
            id,
            capacity,
            connections: HashMap::new(),
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Session {} event loop started", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }

        info!("Command channel closed. Session {} finished", self.id);
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Connect {
                client_id,
                outbound,
                reply,
            } => {
                let result = self.connect(client_id, outbound);
                if reply.send(result).is_err() {
                    // The socket vanished while we were admitting it.
                    self.disconnect(client_id);
                }
            }

            SessionCommand::Relay { client_id, text } => self.relay(client_id, text),

            SessionCommand::Disconnect { client_id } => self.disconnect(client_id),
        }
    }

    fn connect(
        &mut self,
        client_id: ClientId,
        outbound: mpsc::Sender<Utf8Bytes>,
    ) -> Result<Role, RelayError> {
        if self.connections.len() >= self.capacity {
            warn!(
                "Session {} is full, rejecting {} ({} live)",
                self.id,
                client_id,
                self.connections.len()
            );
            return Err(RelayError::SessionFull {
                capacity: self.capacity,
            });
        }

        let role = if self.connections.is_empty() {
            Role::Polite
        } else {
            Role::Impolite
        };

        let record = ConnectionRecord {
            id: client_id,
            role,
            outbound,
        };
        record.announce_role();
        self.connections.insert(client_id, record);

        info!("{} joined session {} as {}", client_id, self.id, role);
        Ok(role)
    }

    fn relay(&self, sender: ClientId, text: Utf8Bytes) {
        if !self.connections.contains_key(&sender) {
            warn!("Dropping frame from {} which is not in session {}", sender, self.id);
            return;
        }

        let envelope = match SignalEnvelope::parse(text.as_str()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Malformed message from {}: {}", sender, e);
                return;
            }
        };

        if !envelope.is_relayable() {
            warn!("Dropping message of type {:?} from {}", envelope.kind, sender);
            return;
        }

        debug!("Forwarding {} from {}", envelope.kind, sender);
        for record in self.connections.values().filter(|r| r.id != sender) {
            record.send(text.clone());
        }
    }

    fn disconnect(&mut self, client_id: ClientId) {
        let Some(record) = self.connections.remove(&client_id) else {
            return;
        };
        info!("{} ({}) left session {}", client_id, record.role, self.id);

        if self.connections.values().any(|r| r.role.is_polite()) {
            return;
        }

        let Some(successor) = self.connections.values_mut().min_by_key(|r| r.id) else {
            return;
        };
        successor.role = Role::Polite;
        successor.announce_role();
        info!("{} promoted to polite in session {}", successor.id, self.id);
    }
}
