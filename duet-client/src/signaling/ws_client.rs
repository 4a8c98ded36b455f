use crate::TransportError;
use crate::signaling::SignalChannel;
use duet_core::{SessionId, SignalMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// `ws://host:port` + session → the relay's WebSocket endpoint.
pub fn session_url(relay_url: &str, session: &SessionId) -> String {
    format!("{}/ws/{}", relay_url.trim_end_matches('/'), session)
}

/// Open a WebSocket to the relay and pump it through a [`SignalChannel`].
///
/// Frames that are not valid signal messages are logged and dropped.
pub async fn connect(url: &str) -> Result<SignalChannel, TransportError> {
    let (socket, _) = connect_async(url)
        .await
        .map_err(|source| TransportError::Connect {
            url: url.to_owned(),
            source,
        })?;
    info!("WS open: {}", url);

    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SignalMessage>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SignalMessage>();

    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                warn!("WS send failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
        debug!("WS writer finished");
    });

    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match SignalMessage::from_json(text.as_str()) {
                    Ok(msg) => {
                        if inbound_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid SignalMessage: {}. Text: {}", e, text.as_str()),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WS receive failed: {}", e);
                    break;
                }
            }
        }
        info!("WS closed");
    });

    Ok(SignalChannel::new(outbound_tx, inbound_rx))
}
