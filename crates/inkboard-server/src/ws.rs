//! WebSocket relay: one topic per whiteboard, no echo to the sender.

use crate::state::{AppState, Envelope};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use inkboard_core::WhiteboardId;
use inkboard_core::broadcast::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// Sent before dropping a peer whose topic went away, so its client
/// reconnects instead of idling on a dead subscription.
fn topic_closed() -> ServerMessage {
    ServerMessage::Error {
        message: "Whiteboard topic closed, reconnect to resume".into(),
    }
}

/// Wait for the next relayed message. Lagged receivers skip what they
/// missed; the relay never re-sends.
async fn next_relayed(rx: &mut Option<broadcast::Receiver<Envelope>>, peer_id: &str) -> Option<Envelope> {
    let Some(rx) = rx else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(envelope) => return Some(envelope),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Peer {} lagged, dropped {} message(s)", peer_id, skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current: Option<WhiteboardId> = None;
    let mut topic_rx: Option<broadcast::Receiver<Envelope>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Invalid message from {}: {}", peer_id, e);
                        let err = ServerMessage::Error { message: format!("Invalid message: {}", e) };
                        if let Some(reply) = encode(&err) {
                            let _ = sender.send(reply).await;
                        }
                        continue;
                    }
                };

                match client_msg {
                    ClientMessage::Join { whiteboard } => {
                        if let Some(old) = current.take() {
                            state.leave(old, &peer_id);
                            state.broadcast(old, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
                        }

                        let (rx, peer_count) = state.join(whiteboard, &peer_id);
                        topic_rx = Some(rx);
                        current = Some(whiteboard);

                        let joined = ServerMessage::Joined { whiteboard, peer_count };
                        if let Some(reply) = encode(&joined) {
                            if sender.send(reply).await.is_err() {
                                break;
                            }
                        }
                        state.broadcast(whiteboard, &peer_id, ServerMessage::PeerJoined { peer_id: peer_id.clone() });
                        info!("Peer {} joined {}", peer_id, whiteboard.topic());
                    }
                    ClientMessage::Leave => {
                        if let Some(whiteboard) = current.take() {
                            state.leave(whiteboard, &peer_id);
                            state.broadcast(whiteboard, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
                            info!("Peer {} left {}", peer_id, whiteboard.topic());
                        }
                        topic_rx = None;
                    }
                    ClientMessage::Stroke { stroke } => match current {
                        Some(whiteboard) => {
                            debug!("Relaying stroke from {} on {}", peer_id, whiteboard.topic());
                            state.broadcast(whiteboard, &peer_id, ServerMessage::Stroke { from: peer_id.clone(), stroke });
                        }
                        None => debug!("Dropping stroke from {}: not joined", peer_id),
                    },
                }
            }

            relayed = next_relayed(&mut topic_rx, &peer_id) => {
                let Some((from, server_msg)) = relayed else {
                    warn!("Topic closed under peer {}, dropping connection", peer_id);
                    if let Some(reply) = encode(&topic_closed()) {
                        let _ = sender.send(reply).await;
                    }
                    break;
                };
                // Don't echo back to sender
                if from == peer_id {
                    continue;
                }
                if let Some(out) = encode(&server_msg) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(whiteboard) = current {
        state.leave(whiteboard, &peer_id);
        state.broadcast(whiteboard, &peer_id, ServerMessage::PeerLeft { peer_id: peer_id.clone() });
    }
    info!("Connection closed: {}", peer_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_closed_notice_is_an_error_frame() {
        let Some(Message::Text(text)) = encode(&topic_closed()) else {
            panic!("expected a text frame");
        };
        let decoded: ServerMessage = serde_json::from_str(text.as_str()).unwrap();
        assert!(matches!(decoded, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_closed_topic_ends_relay_wait() {
        let (tx, rx) = broadcast::channel::<Envelope>(4);
        let mut rx = Some(rx);
        drop(tx);
        assert!(next_relayed(&mut rx, "peer").await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_skips_to_newest() {
        let (tx, rx) = broadcast::channel::<Envelope>(2);
        let mut rx = Some(rx);
        for i in 0..5 {
            tx.send((format!("p{}", i), topic_closed())).unwrap();
        }
        let (from, _) = next_relayed(&mut rx, "slow").await.unwrap();
        assert_eq!(from, "p3");
    }
}
