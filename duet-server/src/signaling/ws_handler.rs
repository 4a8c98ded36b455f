use crate::{RelayError, SignalingService, encode_signal};
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duet_core::{SessionId, SignalMessage};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(service): State<SignalingService>,
) -> Response {
    let session_id = match SessionId::parse(&session_id) {
        Ok(id) => id,
        Err(e) => {
            warn!("Refusing upgrade for session {:?}: {}", session_id, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session_id, service))
}

async fn handle_socket(socket: WebSocket, session_id: SessionId, service: SignalingService) {
    let sessions = service.sessions();
    let client_id = sessions.next_client_id();
    info!("New WebSocket connection {} for session {}", client_id, session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(service.outbound_buffer());

    let session = sessions.join(&session_id);
    if let Err(e) = session.connect(client_id, tx).await {
        reject(&mut sender, &e).await;
        sessions.leave(&session_id);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let session = session.clone();

        async move {
            while let Some(frame) = receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = session.relay(client_id, text).await {
                            error!("Session died under {}: {}", client_id, e);
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        warn!("Dropping binary frame from {}", client_id);
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Transport error on {}: {}", client_id, e);
                        break;
                    }
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    session.disconnect(client_id).await;
    sessions.leave(&session_id);
    info!("WebSocket disconnected: {}", client_id);
}

async fn reject(sender: &mut SplitSink<WebSocket, Message>, reason: &RelayError) {
    warn!("Rejecting connection: {}", reason);

    let notice = SignalMessage::Error {
        reason: reason.to_string(),
    };
    if let Ok(text) = encode_signal(&notice) {
        let _ = sender.send(Message::Text(text)).await;
    }

    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.to_string().into(),
        })))
        .await;
}
