//! File-based storage for native platforms.
//!
//! Each whiteboard's stroke log is a JSON-lines file (`<id>.jsonl`), one
//! stored stroke per line, appended in place. Whiteboard metadata lives
//! next to it as `<id>.json`.

use super::{BoxFuture, StorageError, StorageResult, StoredStroke, StrokeRecord, StrokeStore};
use crate::stroke::UserId;
use crate::whiteboard::{Whiteboard, WhiteboardDirectory, WhiteboardId};
use chrono::Utc;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn ensure_dir(path: &Path) -> StorageResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            StorageError::Io(format!("Failed to create storage directory: {}", e))
        })?;
    }
    Ok(())
}

/// Append-only stroke log on the local filesystem.
pub struct FileStrokeStore {
    /// Base directory for stroke logs.
    base_path: PathBuf,
    /// Next sequence number per whiteboard; also serializes appends.
    next_seq: Mutex<HashMap<WhiteboardId, u64>>,
}

impl FileStrokeStore {
    /// Create a store rooted at `base_path`, creating it if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        ensure_dir(&base_path)?;
        Ok(Self {
            base_path,
            next_seq: Mutex::new(HashMap::new()),
        })
    }

    fn log_path(&self, whiteboard_id: &WhiteboardId) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", whiteboard_id))
    }

    /// Read every well-formed row of a log file.
    ///
    /// A torn trailing line (e.g. after a crash mid-write) is skipped.
    fn read_log(path: &Path) -> StorageResult<Vec<StoredStroke>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(path)
            .map_err(|e| StorageError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut rows = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredStroke>(&line) {
                Ok(row) => rows.push(row),
                Err(e) => log::warn!("Skipping malformed row {} of {}: {}", index + 1, path.display(), e),
            }
        }
        Ok(rows)
    }

    /// Make sure the next append starts on a fresh line.
    fn terminate_torn_line(path: &Path) -> StorageResult<()> {
        let Ok(bytes) = fs::read(path) else {
            return Ok(());
        };
        if bytes.last().is_some_and(|b| *b != b'\n') {
            let mut file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| StorageError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
            file.write_all(b"\n")
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        }
        Ok(())
    }
}

impl StrokeStore for FileStrokeStore {
    fn append(&self, record: StrokeRecord) -> BoxFuture<'_, StorageResult<StoredStroke>> {
        Box::pin(async move {
            let path = self.log_path(&record.whiteboard_id);
            let mut next_seq = self
                .next_seq
                .lock()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;

            let seq = match next_seq.get(&record.whiteboard_id) {
                Some(seq) => *seq,
                None => {
                    Self::terminate_torn_line(&path)?;
                    Self::read_log(&path)?.last().map_or(0, |row| row.seq + 1)
                }
            };

            let stored = StoredStroke {
                seq,
                created_at: Utc::now(),
                record,
            };
            let mut line = serde_json::to_string(&stored)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            line.push('\n');

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| StorageError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
            file.write_all(line.as_bytes())
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

            next_seq.insert(stored.record.whiteboard_id, seq + 1);
            Ok(stored)
        })
    }

    fn list(&self, whiteboard_id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Vec<StoredStroke>>> {
        let path = self.log_path(whiteboard_id);
        Box::pin(async move {
            let mut rows = Self::read_log(&path)?;
            rows.sort_by_key(|row| row.seq);
            Ok(rows)
        })
    }
}

/// Whiteboard metadata stored as one JSON file per board.
pub struct FileDirectory {
    base_path: PathBuf,
}

impl FileDirectory {
    /// Create a directory rooted at `base_path`, creating it if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        ensure_dir(&base_path)?;
        Ok(Self { base_path })
    }

    fn board_path(&self, id: &WhiteboardId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }
}

impl WhiteboardDirectory for FileDirectory {
    fn create(&self, owner: &UserId, title: Option<&str>) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let board = Whiteboard::new(owner.clone(), title.map(str::to_string));
        let path = self.board_path(&board.id);
        Box::pin(async move {
            let json = serde_json::to_string_pretty(&board)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            Ok(board)
        })
    }

    fn get(&self, id: &WhiteboardId) -> BoxFuture<'_, StorageResult<Whiteboard>> {
        let path = self.board_path(id);
        let id = *id;
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id.to_string()));
            }
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }
}
