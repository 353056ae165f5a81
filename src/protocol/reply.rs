//! Reply definitions
//!
//! A `Reply` is both what the server sends back and what the decoder yields
//! for incoming traffic (a client command is a `MultiBulk`).

use bytes::Bytes;

/// Line terminator of the wire format
pub const CRLF: &[u8] = b"\r\n";

/// A RESP value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>`
    Status(String),

    /// `-<text>`
    Error(String),

    /// `:<integer>`
    Integer(i64),

    /// `$<n>\r\n<bytes>\r\n` (binary safe, may be empty)
    Bulk(Bytes),

    /// `$-1`
    NullBulk,

    /// `*<n>` followed by `n` bulk strings
    MultiBulk(Vec<Bytes>),
}

impl Reply {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// `+PONG`
    pub fn pong() -> Self {
        Reply::Status("PONG".to_string())
    }

    /// Status reply; CR and LF are replaced so the line stays well formed
    pub fn status(text: impl AsRef<str>) -> Self {
        Reply::Status(single_line(text.as_ref()))
    }

    /// Error reply; CR and LF are replaced so the line stays well formed
    pub fn error(message: impl AsRef<str>) -> Self {
        Reply::Error(single_line(message.as_ref()))
    }

    pub fn int(value: i64) -> Self {
        Reply::Integer(value)
    }

    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Reply::Bulk(value.into())
    }

    pub fn multi_bulk(values: Vec<Bytes>) -> Self {
        Reply::MultiBulk(values)
    }

    /// Wrong number of arguments for `name`
    pub fn arg_num_error(name: &str) -> Self {
        Reply::error(format!("ERR wrong number of arguments for '{}' command", name))
    }

    /// Name not present in the command table
    pub fn unknown_command(name: &str) -> Self {
        Reply::error(format!("ERR unknown command '{}'", name))
    }

    pub fn syntax_error() -> Self {
        Reply::error("ERR syntax error")
    }

    /// Generic reply for a fault contained at the dispatch boundary
    pub fn unknown_error() -> Self {
        Reply::error("ERR unknown")
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len_hint());
        self.write_to(&mut buf);
        buf
    }

    /// Append the wire encoding to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Status(text) => {
                buf.push(b'+');
                buf.extend_from_slice(single_line(text).as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(text) => {
                buf.push(b'-');
                buf.extend_from_slice(single_line(text).as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(value) => {
                buf.extend_from_slice(format!(":{}\r\n", value).as_bytes());
            }
            Reply::Bulk(value) => write_bulk(buf, value),
            Reply::NullBulk => buf.extend_from_slice(b"$-1\r\n"),
            Reply::MultiBulk(values) => {
                buf.extend_from_slice(format!("*{}\r\n", values.len()).as_bytes());
                for value in values {
                    write_bulk(buf, value);
                }
            }
        }
    }

    fn encoded_len_hint(&self) -> usize {
        match self {
            Reply::Bulk(value) => value.len() + 16,
            Reply::MultiBulk(values) => 16 + values.iter().map(|v| v.len() + 16).sum::<usize>(),
            _ => 32,
        }
    }
}

fn write_bulk(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(format!("${}\r\n", value.len()).as_bytes());
    buf.extend_from_slice(value);
    buf.extend_from_slice(CRLF);
}

fn single_line(text: &str) -> String {
    if text.contains(['\r', '\n']) {
        text.replace(['\r', '\n'], " ")
    } else {
        text.to_string()
    }
}
