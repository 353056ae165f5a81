//! Append-Only File (AOF) Module
//!
//! Makes write commands crash-recoverable without making them wait on disk.
//!
//! ## Responsibilities
//! - Queue every successful write command with its database index
//! - Append them in queue order from one background thread
//! - Emit a `SELECT` marker whenever the target database changes
//! - Replay the file at startup, before connections are accepted
//!
//! ## File Format
//! The file is plain RESP: one array per command, no header, no checksum.
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\nx\r\n$1\r\n1\r\n
//! *2\r\n$6\r\nSELECT\r\n$1\r\n2\r\n
//! *3\r\n$3\r\nSET\r\n$1\r\ny\r\n$1\r\n2\r\n
//! ```

mod writer;
mod recovery;

pub use writer::{AofHandle, AofRecord, AofWriter, AOF_QUEUE_SIZE};
pub use recovery::{AofRecovery, ReplayStats};
