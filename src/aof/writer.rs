//! AOF Writer
//!
//! A single background thread owns the file and drains a bounded queue of
//! durability records. Producers block while the queue is full.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::AofSyncStrategy;
use crate::error::{KvError, Result};
use crate::protocol::{make_cmd_line, CmdLine, Reply};

/// Capacity of the ingestion queue
pub const AOF_QUEUE_SIZE: usize = 1 << 16;

/// A write command and the database it ran against
#[derive(Debug, Clone)]
pub struct AofRecord {
    pub db_index: usize,
    pub cmd_line: CmdLine,
}

enum AofMessage {
    Record(AofRecord),
    Shutdown,
}

/// Producer side of the queue, cloned into every logical database
#[derive(Clone)]
pub struct AofHandle {
    tx: Sender<AofMessage>,
}

impl AofHandle {
    /// Queue a record, blocking while the queue is full
    pub fn append(&self, db_index: usize, cmd_line: CmdLine) {
        let record = AofRecord { db_index, cmd_line };
        if self.tx.send(AofMessage::Record(record)).is_err() {
            tracing::warn!("AOF writer stopped, dropping record for db {}", db_index);
        }
    }
}

/// Owns the background writer thread
pub struct AofWriter {
    handle: AofHandle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl AofWriter {
    /// Open (or create) the AOF and start the writer
    ///
    /// `current_db` is the database the file's tail last selected, so the
    /// first record for any other database gets a SELECT marker.
    pub fn open(path: &Path, sync_strategy: AofSyncStrategy, current_db: usize) -> Result<Self> {
        Self::with_capacity(path, sync_strategy, current_db, AOF_QUEUE_SIZE)
    }

    /// Same as `open` with an explicit queue capacity
    pub fn with_capacity(
        path: &Path,
        sync_strategy: AofSyncStrategy,
        current_db: usize,
        capacity: usize,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .read(true)
            .open(path)?;

        let (tx, rx) = channel::bounded(capacity);
        let worker = WriterLoop {
            file: BufWriter::new(file),
            rx,
            current_db,
            sync_strategy,
            unsynced: 0,
        };

        let thread = thread::Builder::new()
            .name("aof-writer".to_string())
            .spawn(move || worker.run())
            .map_err(|e| KvError::Aof(format!("failed to spawn writer thread: {}", e)))?;

        tracing::info!("AOF writer started on {}", path.display());

        Ok(Self {
            handle: AofHandle { tx },
            thread: Mutex::new(Some(thread)),
        })
    }

    /// A producer handle
    pub fn handle(&self) -> AofHandle {
        self.handle.clone()
    }

    /// Write out everything queued so far, sync, and stop the thread
    ///
    /// Idempotent. Records queued afterwards are dropped with a warning.
    pub fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        if self.handle.tx.send(AofMessage::Shutdown).is_err() {
            tracing::warn!("AOF writer already gone");
        }
        if thread.join().is_err() {
            tracing::error!("AOF writer thread panicked");
        }
        tracing::info!("AOF writer stopped");
    }
}

impl Drop for AofWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Background Loop
// =============================================================================

struct WriterLoop {
    file: BufWriter<File>,
    rx: Receiver<AofMessage>,
    current_db: usize,
    sync_strategy: AofSyncStrategy,
    unsynced: usize,
}

impl WriterLoop {
    fn run(mut self) {
        while let Ok(message) = self.rx.recv() {
            match message {
                AofMessage::Record(record) => self.write_record(record),
                AofMessage::Shutdown => break,
            }
            if self.rx.is_empty() {
                self.flush();
            }
        }
        self.flush();
        self.sync();
    }

    /// Append one record, preceded by a SELECT marker when the db changes
    ///
    /// A failed write is logged and skipped; the writer keeps going.
    fn write_record(&mut self, record: AofRecord) {
        if record.db_index != self.current_db {
            let select = make_cmd_line(&["SELECT", &record.db_index.to_string()]);
            if let Err(e) = self.write_cmd_line(select) {
                tracing::warn!("AOF write of SELECT {} failed: {}", record.db_index, e);
                return;
            }
            self.current_db = record.db_index;
        }

        if let Err(e) = self.write_cmd_line(record.cmd_line) {
            tracing::warn!("AOF write failed: {}", e);
            return;
        }

        self.unsynced += 1;
        match self.sync_strategy {
            AofSyncStrategy::EveryWrite => self.sync(),
            AofSyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync(),
            _ => {}
        }
    }

    fn write_cmd_line(&mut self, cmd_line: CmdLine) -> Result<()> {
        self.file.write_all(&Reply::MultiBulk(cmd_line).to_bytes())?;
        Ok(())
    }

    fn flush(&mut self) {
        if let Err(e) = self.file.flush() {
            tracing::warn!("AOF flush failed: {}", e);
        }
    }

    fn sync(&mut self) {
        self.flush();
        if let Err(e) = self.file.get_ref().sync_data() {
            tracing::warn!("AOF fsync failed: {}", e);
            return;
        }
        self.unsynced = 0;
    }
}
