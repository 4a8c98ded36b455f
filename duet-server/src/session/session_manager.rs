use crate::RelayError;
use crate::session::{Session, SessionCommand};
use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use duet_core::{ClientId, Role, SessionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

struct SessionSlot {
    tx: mpsc::Sender<SessionCommand>,
    /// Sockets that joined and have not left yet. Only touched under the
    /// map's shard lock.
    reservations: AtomicUsize,
}

/// Registry of live sessions, creating them on first join and dropping them
/// once the last socket leaves.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionId, SessionSlot>>,
    next_client_id: Arc<AtomicU64>,
    capacity: usize,
    command_buffer: usize,
}

impl SessionManager {
    pub fn new(capacity: usize, command_buffer: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_client_id: Arc::new(AtomicU64::new(1)),
            capacity,
            command_buffer,
        }
    }

    pub fn next_client_id(&self) -> ClientId {
        ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Reserve a place in `session_id`, spawning its actor if needed.
    /// Every call must be paired with [`SessionManager::leave`].
    pub fn join(&self, session_id: &SessionId) -> SessionHandle {
        let slot = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                info!("Creating new session: {}", session_id);
                let (tx, rx) = mpsc::channel(self.command_buffer);
                tokio::spawn(Session::new(session_id.clone(), self.capacity, rx).run());
                SessionSlot {
                    tx,
                    reservations: AtomicUsize::new(0),
                }
            });
        slot.reservations.fetch_add(1, Ordering::AcqRel);

        SessionHandle {
            session_id: session_id.clone(),
            tx: slot.tx.clone(),
        }
    }

    pub fn leave(&self, session_id: &SessionId) {
        let removed = self.sessions.remove_if(session_id, |_, slot| {
            slot.reservations.fetch_sub(1, Ordering::AcqRel) == 1
        });
        if removed.is_some() {
            info!("Session {} has no participants left", session_id);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Cheap handle used by one socket to talk to its session actor.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Attach a connection. On success the role announcement is already
    /// queued on `outbound`.
    pub async fn connect(
        &self,
        client_id: ClientId,
        outbound: mpsc::Sender<Utf8Bytes>,
    ) -> Result<Role, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Connect {
                client_id,
                outbound,
                reply,
            })
            .await
            .map_err(|_| RelayError::SessionClosed)?;
        rx.await.map_err(|_| RelayError::SessionClosed)?
    }

    pub async fn relay(&self, client_id: ClientId, text: Utf8Bytes) -> Result<(), RelayError> {
        self.tx
            .send(SessionCommand::Relay { client_id, text })
            .await
            .map_err(|_| RelayError::SessionClosed)
    }

    pub async fn disconnect(&self, client_id: ClientId) {
        let _ = self
            .tx
            .send(SessionCommand::Disconnect { client_id })
            .await;
    }
}
