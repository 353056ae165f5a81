//! Connection-level commands

use bytes::Bytes;

use super::CommandTable;
use crate::error::Result;
use crate::keyspace::Keyspace;
use crate::protocol::Reply;

/// PING
fn exec_ping(_keyspace: &Keyspace, _args: &[Bytes]) -> Result<Reply> {
    Ok(Reply::pong())
}

pub(super) fn register(table: &mut CommandTable) {
    table.register("ping", exec_ping, 1);
}
