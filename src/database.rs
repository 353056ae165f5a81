//! Logical databases
//!
//! One `Database` per selectable index: a keyspace plus the handle that
//! routes its write commands to the AOF.

use bytes::Bytes;

use crate::aof::AofHandle;
use crate::command::CommandTable;
use crate::keyspace::Keyspace;
use crate::protocol::{command_name, Reply};

/// A single logical database
pub struct Database {
    index: usize,
    keyspace: Keyspace,
    aof: Option<AofHandle>,
}

impl Database {
    /// Create an empty database with no AOF attached
    pub fn new(index: usize) -> Self {
        Self {
            index,
            keyspace: Keyspace::new(),
            aof: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Route successful write commands to the AOF from now on
    pub(crate) fn attach_aof(&mut self, handle: AofHandle) {
        self.aof = Some(handle);
    }

    /// Execute a command line (name included) against this database
    ///
    /// Unknown commands, arity mismatches and handler faults all come back as
    /// error replies.
    pub fn exec(&self, commands: &CommandTable, cmd_line: &[Bytes]) -> Reply {
        let name = command_name(cmd_line);
        let command = match commands.get(&name) {
            Some(command) => command,
            None => return Reply::unknown_command(&name),
        };
        if !command.validate_arity(cmd_line) {
            return Reply::arg_num_error(&name);
        }

        let reply = match command.execute(&self.keyspace, &cmd_line[1..]) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("'{}' failed on db {}: {}", name, self.index, e);
                return Reply::unknown_error();
            }
        };

        if command.is_write() && !reply.is_error() {
            if let Some(aof) = &self.aof {
                aof.append(self.index, cmd_line.to_vec());
            }
        }
        reply
    }
}
