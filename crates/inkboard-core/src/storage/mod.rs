//! Durable stroke log: the append-only record store used for replay.

mod file;
mod memory;
mod persister;

#[cfg(feature = "remote")]
mod remote;

pub use file::{FileDirectory, FileStrokeStore};
pub use memory::MemoryStrokeStore;
pub use persister::{BackgroundPersister, PersistStats, Persister};

#[cfg(feature = "remote")]
pub use remote::{RemoteDirectory, RemoteStrokeStore};

use crate::stroke::{Stroke, StrokeId, StrokeStyle, UserId};
use crate::whiteboard::WhiteboardId;
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Remote store error: {0}")]
    Remote(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stroke as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub stroke_id: StrokeId,
    pub whiteboard_id: WhiteboardId,
    pub user_id: UserId,
    pub points: Vec<Point>,
    pub color: String,
    pub thickness: f64,
}

impl From<&Stroke> for StrokeRecord {
    fn from(stroke: &Stroke) -> Self {
        Self {
            stroke_id: stroke.id(),
            whiteboard_id: stroke.whiteboard_id(),
            user_id: stroke.author_id().clone(),
            points: stroke.points().to_vec(),
            color: stroke.style().color().to_string(),
            thickness: stroke.style().thickness,
        }
    }
}

/// A persisted stroke row with its store-assigned ordering fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStroke {
    #[serde(flatten)]
    pub record: StrokeRecord,
    /// Position in the whiteboard's log, starting at 0.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredStroke {
    /// Convert back into a stroke for the working set.
    ///
    /// Returns `None` for rows that could never have been valid strokes.
    pub fn to_stroke(&self) -> Option<Stroke> {
        let record = &self.record;
        Stroke::from_parts(
            record.stroke_id,
            record.whiteboard_id,
            record.user_id.clone(),
            record.points.clone(),
            StrokeStyle::new(record.color.clone(), record.thickness),
        )
    }
}

/// Append-only, per-whiteboard stroke log.
///
/// There is deliberately no update or delete.
pub trait StrokeStore: Send + Sync {
    /// Persist one finalized stroke.
    fn append(&self, record: StrokeRecord) -> BoxFuture<'_, StorageResult<StoredStroke>>;

    /// All persisted strokes of a whiteboard, in insertion order.
    fn list(&self, whiteboard_id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Vec<StoredStroke>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::OpenStroke;

    #[test]
    fn test_record_from_stroke() {
        let mut open = OpenStroke::begin(Point::new(1.0, 2.0), StrokeStyle::new("#ff0000", 5.0));
        open.add_point(Point::new(3.0, 4.0));
        let stroke = open
            .finalize(WhiteboardId::new(), UserId::new("alice"), 2)
            .unwrap();

        let record = StrokeRecord::from(&stroke);
        assert_eq!(record.stroke_id, stroke.id());
        assert_eq!(record.points, stroke.points());
        assert_eq!(record.color, "#ff0000");
        assert_eq!(record.thickness, 5.0);
    }

    #[test]
    fn test_stored_stroke_json_shape() {
        let stored = StoredStroke {
            record: StrokeRecord {
                stroke_id: StrokeId::new(),
                whiteboard_id: WhiteboardId::new(),
                user_id: UserId::new("alice"),
                points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
                color: "#000000".into(),
                thickness: 3.0,
            },
            seq: 7,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["user_id"], "alice");
        assert_eq!(value["seq"], 7);
        assert_eq!(value["points"][1]["x"], 1.0);

        let back: StoredStroke = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
        assert!(back.to_stroke().is_some());
    }
}
