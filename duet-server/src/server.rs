use crate::{RelayConfig, SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws/{session_id}", get(ws_handler))
        .with_state(service)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let relay = spawn(config).await?;
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
    relay.shutdown().await
}

/// Bind `config.bind_addr` and serve in the background. Port 0 picks a free
/// port; see [`RelayHandle::local_addr`].
pub async fn spawn(config: RelayConfig) -> Result<RelayHandle> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr().context("Listener has no local address")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve_on(listener, config, async {
        let _ = shutdown_rx.await;
    }));

    Ok(RelayHandle {
        addr,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    })
}

/// A relay started with [`spawn`]. Dropping it stops the relay.
pub struct RelayHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl RelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base `ws://` URL of the relay.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// WebSocket endpoint of `session`, passed through unvalidated.
    pub fn session_url(&self, session: &str) -> String {
        format!("{}/ws/{}", self.url(), session)
    }

    /// Stop accepting, let open sockets finish and wait for the server.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.context("Relay task panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, config: RelayConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(
        "Relay listening on ws://{}/ws/{{session_id}} (capacity {})",
        addr, config.session_capacity
    );

    let app = router(SignalingService::new(&config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Relay server failed")?;

    info!("Relay stopped");
    Ok(())
}
