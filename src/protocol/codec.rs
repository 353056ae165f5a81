//! Protocol codec
//!
//! Streaming RESP decoder and stream helpers.
//!
//! ## Decoder States
//! ```text
//!             ┌──────────────────────── emit / reset ◀─────────────────┐
//!             ▼                                                        │
//!   ┌──────────────────┐  `*n` / `$n`   ┌──────────────────────────┐   │
//!   │  AwaitingLine    │───────────────▶│ multi-line: AwaitingLine │───┤
//!   │  (single-line)   │                │  `$n` header per element │   │
//!   └──────────────────┘                └────────────┬─────────────┘   │
//!        │ `+` `-` `:`  inline                       │ `$n`            │
//!        └──────────────▶ emit                       ▼                 │
//!                                       ┌──────────────────────────┐   │
//!                                       │ AwaitingBulkBody(n)      │───┘
//!                                       │ read exactly n + 2 bytes │
//!                                       └──────────────────────────┘
//! ```
//!
//! A protocol error yields one `Err` payload and resets the state; the stream
//! keeps going. An I/O error (including end of stream) yields one final `Err`
//! payload, after which the decoder is exhausted.

use std::io::{self, BufRead, BufReader, Read, Write};

use bytes::Bytes;

use super::Reply;
use crate::error::{KvError, Result};

/// Largest accepted bulk string (512 MiB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest accepted array element count
pub const MAX_MULTI_BULK_LEN: i64 = 1024 * 1024;

/// Longest accepted header or inline line, CRLF included
pub const MAX_LINE_LEN: u64 = 64 * 1024;

// =============================================================================
// Decoder
// =============================================================================

/// Per-stream parse state
#[derive(Debug, Default)]
struct ReadState {
    /// Accumulating the elements of a `*` or `$` frame
    reading_multi_line: bool,

    /// Elements the current frame declared
    expected_args: usize,

    /// Sigil that opened the current frame
    msg_type: u8,

    /// Elements read so far
    args: Vec<Bytes>,

    /// Declared length of the next bulk body, if one is pending
    bulk_len: Option<usize>,
}

/// Lazy decoder over a byte stream
///
/// Yields one `Result<Reply>` per decoded frame or per protocol error.
pub struct Decoder<R> {
    reader: R,
    state: ReadState,
    finished: bool,
}

impl<R: BufRead> Decoder<R> {
    /// Wrap a buffered byte source
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: ReadState::default(),
            finished: false,
        }
    }

    /// The underlying byte source
    ///
    /// Between payloads its position is the end of the last consumed frame.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Read one CRLF-terminated line, terminator included
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let read = self
            .reader
            .by_ref()
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut line)?;

        if read == 0 {
            return Err(eof());
        }
        if line.last() != Some(&b'\n') {
            if (read as u64) < MAX_LINE_LEN {
                // source ended mid-line
                return Err(eof());
            }
            self.discard_line()?;
            return Err(KvError::Protocol("line too long".to_string()));
        }
        if line.len() < 2 || line[line.len() - 2] != b'\r' {
            return Err(KvError::protocol(&line));
        }
        Ok(line)
    }

    /// Skip the rest of an over-long line, up to and including its `\n`
    ///
    /// A source that ends before the `\n` ended mid-line.
    fn discard_line(&mut self) -> Result<()> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Err(eof());
            }
            match buf.iter().position(|b| *b == b'\n') {
                Some(i) => {
                    self.reader.consume(i + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Read a bulk body of exactly `len` bytes followed by CRLF
    fn read_body(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut body = vec![0u8; len + 2];
        self.reader.read_exact(&mut body)?;
        if &body[len..] != b"\r\n" {
            return Err(KvError::Protocol(format!(
                "bulk body of {} bytes not terminated by CRLF",
                len
            )));
        }
        body.truncate(len);
        Ok(body)
    }

    /// Drive the state machine until one payload is ready
    fn next_payload(&mut self) -> Result<Reply> {
        loop {
            let step = match self.state.bulk_len {
                Some(len) => {
                    let body = self.read_body(len)?;
                    self.accept_body(body)
                }
                None => {
                    let line = self.read_line()?;
                    if self.state.reading_multi_line {
                        self.accept_element_header(&line).map(|_| None)
                    } else {
                        self.accept_line(&line)
                    }
                }
            };
            if let Some(reply) = step? {
                return Ok(reply);
            }
        }
    }

    /// A line read in single-line mode
    fn accept_line(&mut self, line: &[u8]) -> Result<Option<Reply>> {
        match line[0] {
            b'*' => {
                let count = parse_multi_bulk_header(line)?;
                if count == 0 {
                    return Ok(Some(Reply::MultiBulk(Vec::new())));
                }
                self.state.reading_multi_line = true;
                self.state.msg_type = b'*';
                self.state.expected_args = count;
                self.state.args = Vec::with_capacity(count.min(1024));
                Ok(None)
            }
            b'$' => match parse_bulk_header(line)? {
                None => Ok(Some(Reply::NullBulk)),
                Some(len) => {
                    self.state.reading_multi_line = true;
                    self.state.msg_type = b'$';
                    self.state.expected_args = 1;
                    self.state.bulk_len = Some(len);
                    Ok(None)
                }
            },
            _ => parse_single_line_reply(line).map(Some),
        }
    }

    /// A line read in multi-line mode must be a `$n` element header
    fn accept_element_header(&mut self, line: &[u8]) -> Result<()> {
        if line[0] != b'$' {
            return Err(KvError::protocol(line));
        }
        match parse_bulk_header(line)? {
            Some(len) => {
                self.state.bulk_len = Some(len);
                Ok(())
            }
            None => Err(KvError::protocol(line)),
        }
    }

    fn accept_body(&mut self, body: Vec<u8>) -> Result<Option<Reply>> {
        self.state.bulk_len = None;
        self.state.args.push(Bytes::from(body));
        if self.state.args.len() < self.state.expected_args {
            return Ok(None);
        }

        let state = std::mem::take(&mut self.state);
        let reply = if state.msg_type == b'$' {
            state
                .args
                .into_iter()
                .next()
                .map(Reply::Bulk)
                .unwrap_or(Reply::NullBulk)
        } else {
            Reply::MultiBulk(state.args)
        };
        Ok(Some(reply))
    }
}

impl<R: BufRead> Iterator for Decoder<R> {
    type Item = Result<Reply>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_payload() {
            Ok(reply) => {
                self.state = ReadState::default();
                Some(Ok(reply))
            }
            Err(e) => {
                if e.is_io() {
                    self.finished = true;
                } else {
                    tracing::trace!("decoder reset after {}", e);
                    self.state = ReadState::default();
                }
                Some(Err(e))
            }
        }
    }
}

fn eof() -> KvError {
    KvError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream"))
}

// =============================================================================
// Header / Line Parsing
// =============================================================================

/// Text between the sigil and the CRLF, as an integer
fn parse_header_number(line: &[u8]) -> Option<i64> {
    std::str::from_utf8(&line[1..line.len() - 2])
        .ok()?
        .parse::<i64>()
        .ok()
}

/// `*n` → element count
fn parse_multi_bulk_header(line: &[u8]) -> Result<usize> {
    match parse_header_number(line) {
        Some(count) if (0..=MAX_MULTI_BULK_LEN).contains(&count) => Ok(count as usize),
        _ => Err(KvError::protocol(line)),
    }
}

/// `$n` → `Some(n)`, `$-1` → `None`
fn parse_bulk_header(line: &[u8]) -> Result<Option<usize>> {
    match parse_header_number(line) {
        Some(-1) => Ok(None),
        Some(len) if (0..=MAX_BULK_LEN).contains(&len) => Ok(Some(len as usize)),
        _ => Err(KvError::protocol(line)),
    }
}

/// Status, error, integer or inline command
fn parse_single_line_reply(line: &[u8]) -> Result<Reply> {
    let text = &line[..line.len() - 2];
    let reply = match line[0] {
        b'+' => Reply::Status(String::from_utf8_lossy(&text[1..]).into_owned()),
        b'-' => Reply::Error(String::from_utf8_lossy(&text[1..]).into_owned()),
        b':' => match parse_header_number(line) {
            Some(value) => Reply::Integer(value),
            None => return Err(KvError::protocol(line)),
        },
        _ => Reply::MultiBulk(
            text.split(|b| *b == b' ')
                .filter(|token| !token.is_empty())
                .map(Bytes::copy_from_slice)
                .collect(),
        ),
    };
    Ok(reply)
}

// =============================================================================
// Stream Helpers
// =============================================================================

/// Decode a raw byte source (buffering it internally)
pub fn parse_stream<R: Read>(reader: R) -> Decoder<BufReader<R>> {
    Decoder::new(BufReader::new(reader))
}

/// Decode every payload in an in-memory buffer
///
/// The terminating end-of-stream error is not included.
pub fn decode_all(bytes: &[u8]) -> Vec<Result<Reply>> {
    Decoder::new(bytes)
        .filter(|payload| !matches!(payload, Err(e) if e.is_eof()))
        .collect()
}

/// Encode a reply to bytes
pub fn encode(reply: &Reply) -> Vec<u8> {
    reply.to_bytes()
}

/// Read exactly one payload from a buffered stream
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    Decoder::new(reader).next().unwrap_or_else(|| Err(eof()))
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&reply.to_bytes())?;
    writer.flush()?;
    Ok(())
}
