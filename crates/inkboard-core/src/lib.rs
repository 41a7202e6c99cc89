//! Inkboard Core Library
//!
//! Synchronization engine for the Inkboard collaborative whiteboard: stroke
//! capture, live broadcast between connected peers, and durable replay for
//! late joiners.

pub mod board;
pub mod broadcast;
pub mod camera;
pub mod color;
pub mod config;
pub mod identity;
pub mod input;
pub mod session;
pub mod storage;
pub mod stroke;
pub mod whiteboard;

pub use board::Board;
pub use broadcast::{
    BroadcastError, BroadcastHub, BroadcastResult, ConnectionState, LocalHub, StrokeHandler, StrokePayload, Topic,
    TopicEvent,
};
pub use camera::Camera;
pub use color::{Rgba, author_color, author_hue};
pub use config::{RemoteConfig, SessionConfig};
pub use identity::{IdentityProvider, StaticIdentity};
pub use input::{CaptureOutcome, InteractionMode, MouseButton, PointerCapture, PointerEvent, TouchPhase, Viewport};
pub use session::{Services, SessionError, SessionEvent, SessionNotice, SessionPhase, WhiteboardSession};
pub use storage::{
    BackgroundPersister, FileDirectory, FileStrokeStore, MemoryStrokeStore, PersistStats, Persister, StorageError,
    StorageResult, StoredStroke, StrokeRecord, StrokeStore,
};
pub use stroke::{OpenStroke, Stroke, StrokeId, StrokeStyle, UserId};
pub use whiteboard::{MemoryDirectory, Whiteboard, WhiteboardDirectory, WhiteboardId};

#[cfg(feature = "remote")]
pub use broadcast::WsHub;
#[cfg(feature = "remote")]
pub use storage::{RemoteDirectory, RemoteStrokeStore};
