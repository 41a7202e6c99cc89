//! Whiteboard metadata and the read-mostly directory that serves it.

use crate::storage::{BoxFuture, StorageError, StorageResult};
use crate::stroke::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use uuid::Uuid;

/// Title shown when a whiteboard has none.
pub const UNTITLED_TITLE: &str = "Untitled Board";

/// Title shown when the metadata lookup itself fails.
pub const PLACEHOLDER_TITLE: &str = "Whiteboard";

/// Whiteboard identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhiteboardId(pub Uuid);

impl WhiteboardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Name of the broadcast topic for this whiteboard.
    pub fn topic(&self) -> String {
        format!("whiteboard:{}", self.0)
    }
}

impl Default for WhiteboardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WhiteboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WhiteboardId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Whiteboard metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whiteboard {
    pub id: WhiteboardId,
    pub owner_id: UserId,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Whiteboard {
    pub fn new(owner_id: UserId, title: Option<String>) -> Self {
        Self {
            id: WhiteboardId::new(),
            owner_id,
            title,
            created_at: Utc::now(),
        }
    }

    /// Title for display, falling back to [`UNTITLED_TITLE`].
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED_TITLE,
        }
    }
}

/// Request body for creating a whiteboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWhiteboard {
    pub owner_id: UserId,
    #[serde(default)]
    pub title: Option<String>,
}

/// Lookup and creation of whiteboards.
pub trait WhiteboardDirectory: Send + Sync {
    /// Create a whiteboard owned by `owner`.
    fn create(&self, owner: &UserId, title: Option<&str>) -> BoxFuture<'_, StorageResult<Whiteboard>>;

    /// Fetch a whiteboard by id.
    fn get(&self, id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Whiteboard>>;
}

/// In-memory directory for tests and ephemeral servers.
#[derive(Default)]
pub struct MemoryDirectory {
    boards: RwLock<HashMap<WhiteboardId, Whiteboard>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an existing record (e.g. fixtures).
    pub fn insert(&self, board: Whiteboard) -> StorageResult<()> {
        let mut boards = self
            .boards
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        boards.insert(board.id, board);
        Ok(())
    }
}

impl WhiteboardDirectory for MemoryDirectory {
    fn create(&self, owner: &UserId, title: Option<&str>) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let board = Whiteboard::new(owner.clone(), title.map(str::to_string));
        Box::pin(async move {
            self.insert(board.clone())?;
            Ok(board)
        })
    }

    fn get(&self, id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let id = *id;
        Box::pin(async move {
            let boards = self
                .boards
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            boards
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    #[test]
    fn test_create_and_get() {
        let directory = MemoryDirectory::new();
        let owner = UserId::new("owner");

        let created = block_on(directory.create(&owner, Some("Sprint retro"))).unwrap();
        let fetched = block_on(directory.get(&created.id)).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.display_title(), "Sprint retro");
    }

    #[test]
    fn test_missing_board() {
        let directory = MemoryDirectory::new();
        let result = block_on(directory.get(&WhiteboardId::new()));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_untitled_display() {
        let board = Whiteboard::new(UserId::new("owner"), None);
        assert_eq!(board.display_title(), UNTITLED_TITLE);

        let blank = Whiteboard::new(UserId::new("owner"), Some("  ".into()));
        assert_eq!(blank.display_title(), UNTITLED_TITLE);
    }

    #[test]
    fn test_topic_name() {
        let id: WhiteboardId = "6f1d0a52-3c9b-4d5e-8f10-2a3b4c5d6e7f".parse().unwrap();
        assert_eq!(id.topic(), "whiteboard:6f1d0a52-3c9b-4d5e-8f10-2a3b4c5d6e7f");
    }
}
