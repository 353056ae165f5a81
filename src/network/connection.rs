//! Client Connections
//!
//! Decode loop and reply path for one socket. Implements `Session` so the
//! engine can change the selected database.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::wait::WaitGroup;
use crate::engine::Engine;
use crate::error::{KvError, Result};
use crate::protocol::{Decoder, Reply};
use crate::session::Session;

/// One accepted client socket
pub struct Connection {
    /// Socket handle kept for shutdown and for cloning the read side
    stream: TcpStream,

    /// Buffered write side; one reply at a time
    writer: Mutex<BufWriter<TcpStream>>,

    /// Replies currently being written
    waiting: WaitGroup,

    /// Selected logical database
    selected_db: AtomicUsize,

    /// Shared engine every command is executed against
    engine: Arc<Engine>,

    /// How long `close` waits for in-flight replies
    close_timeout: Duration,

    peer_addr: String,
}

impl Connection {
    /// Wrap an accepted stream
    pub fn new(stream: TcpStream, engine: Arc<Engine>, close_timeout: Duration) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // replies are small and latency bound
        stream.set_nodelay(true)?;

        let write_stream = stream.try_clone()?;

        Ok(Self {
            stream,
            writer: Mutex::new(BufWriter::new(write_stream)),
            waiting: WaitGroup::new(),
            selected_db: AtomicUsize::new(0),
            engine,
            close_timeout,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction blocking)
    pub fn set_timeouts(&self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.stream
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.stream
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve the client until it disconnects or the socket is shut down
    ///
    /// Decodes commands in a loop and sends replies. A malformed command gets
    /// an error reply and the loop carries on; only I/O failure ends it.
    pub fn handle(&self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let reader = BufReader::new(self.stream.try_clone()?);
        for payload in Decoder::new(reader) {
            let reply = match payload {
                Ok(Reply::MultiBulk(cmd_line)) if cmd_line.is_empty() => continue,
                Ok(Reply::MultiBulk(cmd_line)) => {
                    tracing::trace!("Received command from {}: {:?}", self.peer_addr, cmd_line);
                    self.engine.execute(self, &cmd_line)
                }
                Ok(other) => {
                    tracing::debug!("Non-command payload from {}: {:?}", self.peer_addr, other);
                    Reply::error("ERR Protocol error: expected a command")
                }
                Err(KvError::Io(e)) => return self.end_of_input(e),
                Err(e) => {
                    tracing::debug!("Bad input from {}: {}", self.peer_addr, e);
                    Reply::error(format!("ERR {}", e))
                }
            };

            if let Err(e) = self.write(&reply.to_bytes()) {
                // The client went away before we could answer
                if let KvError::Io(ref io_err) = e {
                    if is_disconnect(io_err) {
                        tracing::debug!(
                            "Client {} disconnected before reply could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn end_of_input(&self, e: io::Error) -> Result<()> {
        if is_disconnect(&e) {
            tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
            return Ok(());
        }
        tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
        Err(KvError::Io(e))
    }

    /// Wait (bounded) for in-flight replies, then shut the socket down
    pub fn close(&self) {
        if !self.waiting.wait_timeout(self.close_timeout) {
            tracing::warn!(
                "Closing {} with {} replies still in flight",
                self.peer_addr,
                self.waiting.pending()
            );
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Session for Connection {
    fn write(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let _in_flight = self.waiting.enter();
        let mut writer = self.writer.lock();
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    fn db_index(&self) -> usize {
        self.selected_db.load(Ordering::Acquire)
    }

    fn select_db(&self, index: usize) {
        self.selected_db.store(index, Ordering::Release);
    }
}

/// I/O errors that just mean the peer is gone (or idle past the timeout)
fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::NotConnected
    )
}
