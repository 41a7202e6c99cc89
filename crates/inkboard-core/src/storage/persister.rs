//! Fire-and-forget persistence of finalized strokes.
//!
//! The drawing path hands each stroke to a [`Persister`] and moves on. The
//! default implementation runs appends on a background thread, logs
//! failures and never retries. A stricter policy (retry, outbox) can be
//! swapped in behind the same trait.

use super::{StrokeRecord, StrokeStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Sink for finalized strokes headed to the durable store.
pub trait Persister: Send + Sync {
    /// Queue a stroke for persistence. Must not block on the store.
    fn persist(&self, record: StrokeRecord);
}

/// Counters of completed appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Jobs sent to the writer thread.
enum Job {
    Append(StrokeRecord),
    Flush(Sender<()>),
}

/// Persister that appends on a dedicated writer thread.
///
/// Appends complete in submission order. Failures are logged and counted;
/// the stroke is not retried.
pub struct BackgroundPersister {
    tx: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl BackgroundPersister {
    /// Spawn the writer thread for `store`.
    pub fn new(store: Arc<dyn StrokeStore>) -> Self {
        let (tx, rx) = channel::<Job>();
        let counters = Arc::new(Counters::default());
        let thread_counters = counters.clone();

        let handle = thread::Builder::new()
            .name("inkboard-persister".into())
            .spawn(move || {
                for job in rx {
                    match job {
                        Job::Append(record) => {
                            let stroke_id = record.stroke_id;
                            match pollster::block_on(store.append(record)) {
                                Ok(stored) => {
                                    log::debug!("Persisted stroke {} as #{}", stroke_id, stored.seq);
                                    thread_counters.succeeded.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(e) => {
                                    log::warn!("Failed to save stroke {}: {}", stroke_id, e);
                                    thread_counters.failed.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                        Job::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                log::debug!("Persister thread exiting");
            });

        let worker = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn persister thread: {}", e);
                None
            }
        };

        Self {
            tx: Mutex::new(worker.as_ref().map(|_| tx)),
            worker: Mutex::new(worker),
            counters,
        }
    }

    /// Block until every stroke queued so far has been attempted.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = channel();
        let sent = self
            .tx
            .lock()
            .ok()
            .and_then(|tx| tx.as_ref().map(|tx| tx.send(Job::Flush(ack_tx)).is_ok()))
            .unwrap_or(false);
        if sent {
            let _ = ack_rx.recv();
        }
    }

    /// Completed append counts.
    pub fn stats(&self) -> PersistStats {
        PersistStats {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Persister for BackgroundPersister {
    fn persist(&self, record: StrokeRecord) {
        let stroke_id = record.stroke_id;
        let queued = self
            .tx
            .lock()
            .ok()
            .and_then(|tx| tx.as_ref().map(|tx| tx.send(Job::Append(record)).is_ok()))
            .unwrap_or(false);
        if !queued {
            log::warn!("Persister unavailable, stroke {} will not be saved", stroke_id);
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Drop for BackgroundPersister {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        if let Some(handle) = self.worker.lock().ok().and_then(|mut w| w.take()) {
            let _ = handle.join();
        }
    }
}
