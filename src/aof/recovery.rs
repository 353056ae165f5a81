//! AOF Recovery
//!
//! Replays the append-only file through the decoder at startup.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek};
use std::path::Path;

use crate::error::Result;
use crate::protocol::{parse_stream, CmdLine, Reply};
use crate::session::{FakeSession, Session};

/// Replays an AOF
pub struct AofRecovery;

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Commands executed
    pub commands_replayed: u64,

    /// Payloads that failed to decode or were not commands
    pub payloads_skipped: u64,

    /// Commands that executed but answered with an error reply
    pub error_replies: u64,

    /// Database the replay session had selected at the end of the file
    pub last_db: usize,

    /// Bytes of an incomplete final frame removed from the file
    pub truncated_bytes: u64,
}

impl AofRecovery {
    /// Replay every command in the file at `path`
    ///
    /// `exec` runs one command line against the engine. The session passed to
    /// it follows the file's SELECT markers. A missing file is an empty
    /// history; decode errors and error replies are logged and skipped, the
    /// valid remainder is still applied.
    ///
    /// A frame cut off by the end of the file is removed, so records appended
    /// later start on a frame boundary. Any other failure to open or read the
    /// file is returned.
    pub fn replay<F>(path: &Path, mut exec: F) -> Result<ReplayStats>
    where
        F: FnMut(&FakeSession, &CmdLine) -> Reply,
    {
        let mut stats = ReplayStats::default();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No AOF at {}, starting empty", path.display());
                return Ok(stats);
            }
            Err(e) => {
                tracing::error!("Cannot open AOF {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        let session = FakeSession::new();
        let mut decoder = parse_stream(file);
        // end of the last frame (or skipped garbage) fully consumed
        let mut valid_len = 0u64;

        while let Some(payload) = decoder.next() {
            let reply = match payload {
                Ok(reply) => reply,
                Err(e) if e.is_eof() => break,
                Err(e) if e.is_io() => {
                    tracing::error!("AOF read failed: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("AOF parse error: {}", e);
                    stats.payloads_skipped += 1;
                    valid_len = decoder.get_mut().stream_position()?;
                    continue;
                }
            };
            valid_len = decoder.get_mut().stream_position()?;

            let cmd_line = match reply {
                Reply::MultiBulk(args) if !args.is_empty() => args,
                other => {
                    tracing::error!("AOF entry is not a command: {:?}", other);
                    stats.payloads_skipped += 1;
                    continue;
                }
            };

            let result = exec(&session, &cmd_line);
            if let Reply::Error(message) = result {
                tracing::error!("AOF replay command failed: {}", message);
                stats.error_replies += 1;
            }
            stats.commands_replayed += 1;
        }
        drop(decoder);

        stats.truncated_bytes = Self::truncate_partial_tail(path, valid_len)?;
        stats.last_db = session.db_index();
        tracing::info!(
            "AOF replay: {} commands, {} skipped, {} error replies",
            stats.commands_replayed,
            stats.payloads_skipped,
            stats.error_replies
        );
        Ok(stats)
    }

    /// Cut the file back to `valid_len`; returns how many bytes were removed
    fn truncate_partial_tail(path: &Path, valid_len: u64) -> Result<u64> {
        let len = fs::metadata(path)?.len();
        if len <= valid_len {
            return Ok(0);
        }
        let file = OpenOptions::new().write(true).open(path)?;
        tracing::warn!(
            "AOF {} ends in a partial frame, truncating {} bytes",
            path.display(),
            len - valid_len
        );
        file.set_len(valid_len)?;
        file.sync_all()?;
        Ok(len - valid_len)
    }
}
