//! Protocol Module
//!
//! RESP, the wire protocol used both on the network and in the AOF.
//!
//! ## Frames
//! ```text
//! +OK\r\n                      status
//! -ERR message\r\n             error
//! :42\r\n                      integer
//! $5\r\nhello\r\n              bulk string (binary safe)
//! $-1\r\n                      null bulk
//! *2\r\n$3\r\nGET\r\n$1\r\nk\r\n  array of bulk strings (every command)
//! PING\r\n                     inline command (space separated)
//! ```

mod command;
mod reply;
mod codec;

pub use command::{command_name, make_cmd_line, to_key, CmdLine};
pub use reply::{Reply, CRLF};
pub use codec::{
    decode_all, encode, parse_stream, read_reply, write_reply, Decoder, MAX_BULK_LEN,
    MAX_LINE_LEN, MAX_MULTI_BULK_LEN,
};
