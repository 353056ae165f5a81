//! Command lines
//!
//! A command line is the decoded array `[name, arg1, ..., argN]`.

use bytes::Bytes;

/// A command and its arguments, exactly as received
pub type CmdLine = Vec<Bytes>;

/// Build a command line from string parts
///
/// `make_cmd_line(&["SET", "k", "v"])`
pub fn make_cmd_line(parts: &[&str]) -> CmdLine {
    parts
        .iter()
        .map(|part| Bytes::copy_from_slice(part.as_bytes()))
        .collect()
}

/// Canonical (lowercase) command name of a command line
pub fn command_name(cmd_line: &[Bytes]) -> String {
    cmd_line
        .first()
        .map(|name| String::from_utf8_lossy(name).to_ascii_lowercase())
        .unwrap_or_default()
}

/// Interpret an argument as a key
pub fn to_key(arg: &Bytes) -> String {
    String::from_utf8_lossy(arg).into_owned()
}
