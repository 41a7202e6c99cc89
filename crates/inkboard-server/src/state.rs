//! Shared server state: broadcast topics and the durable stores.

use dashmap::DashMap;
use inkboard_core::broadcast::ServerMessage;
use inkboard_core::{StrokeStore, WhiteboardDirectory, WhiteboardId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A relayed message tagged with the sending peer.
pub type Envelope = (String, ServerMessage);

/// One whiteboard's topic.
struct Topic {
    /// Broadcast channel for this topic
    tx: broadcast::Sender<Envelope>,
    /// Connected peer IDs
    peers: HashSet<String>,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    topics: DashMap<WhiteboardId, Topic>,
    channel_capacity: usize,
    pub store: Arc<dyn StrokeStore>,
    pub directory: Arc<dyn WhiteboardDirectory>,
}

impl AppState {
    pub fn new(store: Arc<dyn StrokeStore>, directory: Arc<dyn WhiteboardDirectory>, channel_capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            channel_capacity,
            store,
            directory,
        }
    }

    /// Add a peer to a topic. Returns its receiver and the new peer count.
    pub fn join(&self, whiteboard_id: WhiteboardId, peer_id: &str) -> (broadcast::Receiver<Envelope>, usize) {
        let mut topic = self
            .topics
            .entry(whiteboard_id)
            .or_insert_with(|| Topic::new(self.channel_capacity));
        topic.peers.insert(peer_id.to_string());
        (topic.tx.subscribe(), topic.peers.len())
    }

    /// Remove a peer, dropping the topic once empty.
    ///
    /// The emptiness check runs under the shard lock, so a concurrent
    /// `join` either lands before it (and keeps the topic) or creates a
    /// fresh one after it.
    pub fn leave(&self, whiteboard_id: WhiteboardId, peer_id: &str) {
        if let Some(mut topic) = self.topics.get_mut(&whiteboard_id) {
            topic.peers.remove(peer_id);
        }
        self.topics.remove_if(&whiteboard_id, |_, topic| topic.peers.is_empty());
    }

    /// Send to every receiver of the topic. No-op when nobody listens.
    pub fn broadcast(&self, whiteboard_id: WhiteboardId, from: &str, msg: ServerMessage) {
        if let Some(topic) = self.topics.get(&whiteboard_id) {
            let _ = topic.tx.send((from.to_string(), msg));
        }
    }

    pub fn peer_count(&self, whiteboard_id: WhiteboardId) -> usize {
        self.topics.get(&whiteboard_id).map_or(0, |t| t.peers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_core::{MemoryDirectory, MemoryStrokeStore};

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStrokeStore::new()), Arc::new(MemoryDirectory::new()), 8)
    }

    #[tokio::test]
    async fn test_join_broadcast_leave() {
        let state = state();
        let board = WhiteboardId::new();

        let (mut rx, count) = state.join(board, "a");
        assert_eq!(count, 1);
        let (_rx_b, count) = state.join(board, "b");
        assert_eq!(count, 2);

        state.broadcast(
            board,
            "b",
            ServerMessage::PeerJoined {
                peer_id: "b".into(),
            },
        );
        let (from, msg) = rx.recv().await.unwrap();
        assert_eq!(from, "b");
        assert!(matches!(msg, ServerMessage::PeerJoined { .. }));

        state.leave(board, "a");
        state.leave(board, "b");
        assert_eq!(state.peer_count(board), 0);
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let state = state();
        let board = WhiteboardId::new();
        let (mut rx, _) = state.join(board, "slow");

        for i in 0..20 {
            state.broadcast(
                board,
                "fast",
                ServerMessage::Error {
                    message: i.to_string(),
                },
            );
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[test]
    fn test_rejoin_after_last_leave_gets_live_topic() {
        let state = state();
        let board = WhiteboardId::new();
        let (old_rx, _) = state.join(board, "a");
        state.leave(board, "a");
        drop(old_rx);

        let (mut rx, count) = state.join(board, "b");
        assert_eq!(count, 1);
        state.broadcast(board, "c", ServerMessage::PeerJoined { peer_id: "c".into() });
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_join_racing_last_leave_keeps_its_topic() {
        let state = Arc::new(state());
        let board = WhiteboardId::new();

        let churn = {
            let state = state.clone();
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    let _rx = state.join(board, "a");
                    state.leave(board, "a");
                }
            })
        };

        for _ in 0..2_000 {
            let (mut rx, _) = state.join(board, "b");
            state.broadcast(board, "c", ServerMessage::PeerLeft { peer_id: "c".into() });
            assert!(
                rx.try_recv().is_ok(),
                "joined peer lost its topic before leaving"
            );
            state.leave(board, "b");
        }
        churn.join().unwrap();
        assert_eq!(state.peer_count(board), 0);
    }
}
