//! In-memory stroke log.

use super::{BoxFuture, StorageError, StorageResult, StoredStroke, StrokeRecord, StrokeStore};
use crate::whiteboard::WhiteboardId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral servers.
#[derive(Default)]
pub struct MemoryStrokeStore {
    logs: RwLock<HashMap<WhiteboardId, Vec<StoredStroke>>>,
}

impl MemoryStrokeStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of strokes persisted for a whiteboard.
    pub fn len(&self, whiteboard_id: &WhiteboardId) -> usize {
        self.logs
            .read()
            .map(|logs| logs.get(whiteboard_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl StrokeStore for MemoryStrokeStore {
    fn append(&self, record: StrokeRecord) -> BoxFuture<'_, StorageResult<StoredStroke>> {
        Box::pin(async move {
            let mut logs = self
                .logs
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let log = logs.entry(record.whiteboard_id).or_default();
            let stored = StoredStroke {
                seq: log.len() as u64,
                created_at: Utc::now(),
                record,
            };
            log.push(stored.clone());
            Ok(stored)
        })
    }

    fn list(&self, whiteboard_id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Vec<StoredStroke>>> {
        let whiteboard_id = *whiteboard_id;
        Box::pin(async move {
            let logs = self
                .logs
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(logs.get(&whiteboard_id).cloned().unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{StrokeId, UserId};
    use kurbo::Point;
    use pollster::block_on;

    fn record(whiteboard_id: WhiteboardId, x: f64) -> StrokeRecord {
        StrokeRecord {
            stroke_id: StrokeId::new(),
            whiteboard_id,
            user_id: UserId::new("u1"),
            points: vec![Point::new(x, 0.0), Point::new(x, 10.0)],
            color: "#000000".into(),
            thickness: 3.0,
        }
    }

    #[test]
    fn test_list_empty_board() {
        let store = MemoryStrokeStore::new();
        let list = block_on(store.list(&WhiteboardId::new())).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let store = MemoryStrokeStore::new();
        let board = WhiteboardId::new();

        for x in [3.0, 1.0, 2.0] {
            block_on(store.append(record(board, x))).unwrap();
        }

        let list = block_on(store.list(&board)).unwrap();
        let xs: Vec<f64> = list.iter().map(|s| s.record.points[0].x).collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
        let seqs: Vec<u64> = list.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_boards_are_isolated() {
        let store = MemoryStrokeStore::new();
        let a = WhiteboardId::new();
        let b = WhiteboardId::new();

        block_on(store.append(record(a, 1.0))).unwrap();

        assert_eq!(store.len(&a), 1);
        assert_eq!(store.len(&b), 0);
        assert!(block_on(store.list(&b)).unwrap().is_empty());
    }
}
