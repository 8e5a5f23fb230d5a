//! Background save thread.
//!
//! Rooms submit record batches and move on; the worker owns the store and
//! writes batches in submission order.

use crate::{CharacterRecord, CharacterStore, StoreError};
use crossbeam_channel::{Receiver, Sender};
use std::thread::{self, JoinHandle};

enum Job {
    Save(Vec<CharacterRecord>),
    Flush(Sender<()>),
}

/// Totals reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub saved: u64,
    pub failed: u64,
}

/// Handle to the save thread. Dropping it drains pending jobs and joins.
pub struct SaveWorker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<SaveStats>>,
}

impl std::fmt::Debug for SaveWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl SaveWorker {
    pub fn spawn(store: Box<dyn CharacterStore>) -> Result<Self, StoreError> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let handle = thread::Builder::new()
            .name("zonesim-save".into())
            .spawn(move || run(store, rx))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a batch for writing. Empty batches are ignored.
    pub fn submit(&self, records: Vec<CharacterRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        self.sender()?
            .send(Job::Save(records))
            .map_err(|_| StoreError::WorkerStopped)
    }

    /// Block until every batch submitted so far has been written.
    pub fn flush(&self) -> Result<(), StoreError> {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        self.sender()?
            .send(Job::Flush(done_tx))
            .map_err(|_| StoreError::WorkerStopped)?;
        done_rx.recv().map_err(|_| StoreError::WorkerStopped)
    }

    /// Write everything pending, stop the thread and report totals.
    pub fn shutdown(mut self) -> SaveStats {
        self.join()
    }

    fn sender(&self) -> Result<&Sender<Job>, StoreError> {
        self.tx.as_ref().ok_or(StoreError::WorkerStopped)
    }

    fn join(&mut self) -> SaveStats {
        self.tx.take();
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                tracing::error!("save worker panicked");
                SaveStats::default()
            }
            None => SaveStats::default(),
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.join();
    }
}

fn run(mut store: Box<dyn CharacterStore>, rx: Receiver<Job>) -> SaveStats {
    let mut stats = SaveStats::default();
    for job in rx {
        match job {
            Job::Save(records) => {
                for record in &records {
                    match store.save_character(record) {
                        Ok(()) => stats.saved += 1,
                        Err(e) => {
                            stats.failed += 1;
                            tracing::warn!(id = %record.id, error = %e, "character save failed");
                        }
                    }
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!(saved = stats.saved, failed = stats.failed, "save worker stopped");
    stats
}
