//! Client sessions
//!
//! The engine only sees a connection through the `Session` trait: it can read
//! and change the selected database and send bytes. Sockets stay in the
//! network layer.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::Result;

/// What the engine needs from a client connection
pub trait Session: Send + Sync {
    /// Send raw bytes to the client
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Currently selected logical database
    fn db_index(&self) -> usize;

    /// Change the selected logical database
    fn select_db(&self, index: usize);
}

/// A session with no socket behind it
///
/// Used to replay the AOF and by tests; written bytes are kept in memory.
#[derive(Debug, Default)]
pub struct FakeSession {
    selected_db: AtomicUsize,
    written: Mutex<Vec<u8>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }
}

impl Session for FakeSession {
    fn write(&self, data: &[u8]) -> Result<()> {
        self.written.lock().extend_from_slice(data);
        Ok(())
    }

    fn db_index(&self) -> usize {
        self.selected_db.load(Ordering::Acquire)
    }

    fn select_db(&self, index: usize) {
        self.selected_db.store(index, Ordering::Release);
    }
}
