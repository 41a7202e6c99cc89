//! Broadcast channel: per-whiteboard publish/subscribe topics.
//!
//! A hub hands out one explicit [`Topic`] handle per whiteboard. The owner
//! publishes finalized strokes on it and drains incoming strokes and link
//! events with [`Topic::poll_events`]. Delivery is at-most-once: nothing is
//! acknowledged, retried or replayed, and a topic never receives its own
//! strokes back.

mod local;
pub mod protocol;

#[cfg(feature = "remote")]
mod ws;

pub use local::{LocalHub, LocalTopic};
pub use protocol::{ClientMessage, ServerMessage, StrokePayload};

#[cfg(feature = "remote")]
pub use ws::{WsHub, WsTopic};

use crate::stroke::Stroke;
use crate::whiteboard::WhiteboardId;
use thiserror::Error;

/// Broadcast errors.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Topic is not connected")]
    NotConnected,
    #[error("Topic is closed")]
    Closed,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for broadcast operations.
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Link-level events reported by a topic.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicEvent {
    /// Transport is up.
    Connected,
    /// Transport went away; no further strokes will arrive.
    Disconnected,
    /// Subscription confirmed by the relay.
    Joined { peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    Error { message: String },
}

/// Callback invoked once per remotely published stroke.
pub type StrokeHandler = Box<dyn FnMut(Stroke)>;

/// An open handle on one whiteboard's topic.
pub trait Topic {
    fn whiteboard_id(&self) -> WhiteboardId;

    fn state(&self) -> ConnectionState;

    /// Register the stroke callback and start receiving.
    ///
    /// Strokes published before this call are not delivered.
    fn subscribe(&mut self, handler: StrokeHandler) -> BroadcastResult<()>;

    /// Send a finalized stroke to every other subscriber. Fire-and-forget.
    fn publish(&mut self, stroke: &Stroke) -> BroadcastResult<()>;

    /// Dispatch pending strokes to the handler and return link events.
    fn poll_events(&mut self) -> Vec<TopicEvent>;

    /// Stop callbacks and release the topic. Idempotent.
    fn close(&mut self);
}

/// Factory for topic handles.
pub trait BroadcastHub: Send + Sync {
    fn connect(&self, whiteboard_id: &WhiteboardId) -> BroadcastResult<Box<dyn Topic>>;
}
