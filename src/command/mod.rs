//! Command Module
//!
//! The command table: lowercase name → handler, arity and write flag.
//!
//! ## Arity
//! Arity counts the command name itself:
//! - `k >= 0`: exactly `k` tokens (`GET key` is 2)
//! - `k < 0`: at least `-k` tokens (`DEL key [key ...]` is -2)
//!
//! The table is built once by `CommandTable::builtin()` before any connection
//! is accepted and is read-only afterwards.

mod keys;
mod ping;
mod string;

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::Result;
use crate::keyspace::Keyspace;
use crate::protocol::Reply;

/// Handler signature: keyspace of the selected database, arguments after the name
pub type ExecFn = fn(&Keyspace, &[Bytes]) -> Result<Reply>;

/// An immutable command descriptor
#[derive(Clone, Copy)]
pub struct Command {
    name: &'static str,
    exec: ExecFn,
    arity: i32,
    write: bool,
}

impl Command {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> i32 {
        self.arity
    }

    /// Whether successful executions are appended to the AOF
    pub fn is_write(&self) -> bool {
        self.write
    }

    /// Check a full command line (name included) against the arity contract
    pub fn validate_arity(&self, cmd_line: &[Bytes]) -> bool {
        validate_arity(self.arity, cmd_line.len())
    }

    /// Run the handler with the arguments after the name
    pub fn execute(&self, keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
        (self.exec)(keyspace, args)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("write", &self.write)
            .finish()
    }
}

fn validate_arity(arity: i32, token_count: usize) -> bool {
    if arity >= 0 {
        token_count == arity as usize
    } else {
        token_count >= arity.unsigned_abs() as usize
    }
}

/// Case-insensitive command table
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in command family registered
    pub fn builtin() -> Self {
        let mut table = Self::new();
        ping::register(&mut table);
        keys::register(&mut table);
        string::register(&mut table);
        tracing::debug!("Registered {} commands", table.len());
        table
    }

    /// Register a read-only command
    pub fn register(&mut self, name: &'static str, exec: ExecFn, arity: i32) {
        self.insert(name, exec, arity, false);
    }

    /// Register a command whose successful executions are persisted
    pub fn register_write(&mut self, name: &'static str, exec: ExecFn, arity: i32) {
        self.insert(name, exec, arity, true);
    }

    fn insert(&mut self, name: &'static str, exec: ExecFn, arity: i32, write: bool) {
        let key = name.to_ascii_lowercase();
        if self.commands.contains_key(&key) {
            tracing::warn!("Command '{}' registered twice, keeping the latest", key);
        }
        self.commands.insert(
            key,
            Command {
                name,
                exec,
                arity,
                write,
            },
        );
    }

    /// Look up a command by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&Command> {
        match self.commands.get(name) {
            Some(command) => Some(command),
            None => self.commands.get(&name.to_ascii_lowercase()),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
