//! Engine Module
//!
//! The database engine facade used by the network layer.
//!
//! ## Responsibilities
//! - Own the logical databases and the command table
//! - Handle SELECT (session state, not keyspace state)
//! - Dispatch everything else to the selected database
//! - Contain handler faults so one bad command never kills a connection
//! - Replay the AOF on startup, then attach the AOF writer

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;

use crate::aof::{AofRecovery, AofWriter, ReplayStats};
use crate::command::CommandTable;
use crate::config::Config;
use crate::database::Database;
use crate::error::Result;
use crate::protocol::{command_name, Reply};
use crate::session::Session;

/// The storage engine
///
/// ## Concurrency Model
///
/// `execute` takes `&self` and is called from every connection thread at
/// once. Each keyspace is internally sharded and locked, the command table is
/// read-only after `open`, and the AOF queue is a bounded channel. Nothing
/// here holds a lock across a whole command.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Name → descriptor, built once
    commands: CommandTable,

    /// Selectable logical databases
    databases: Vec<Database>,

    /// Background AOF writer, when append-only is enabled
    aof: Option<AofWriter>,

    /// Outcome of the startup replay
    replay_stats: ReplayStats,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Build the command table and the logical databases
    /// 2. Replay the AOF, if enabled (no AOF is attached yet, so nothing is
    ///    re-logged)
    /// 3. Start the AOF writer and attach it to every database
    pub fn open(config: Config) -> Result<Self> {
        let count = config.database_count();
        let mut engine = Self {
            commands: CommandTable::builtin(),
            databases: (0..count).map(Database::new).collect(),
            aof: None,
            replay_stats: ReplayStats::default(),
            config,
        };

        if engine.config.append_only {
            fs::create_dir_all(&engine.config.data_dir)?;
            let path = engine.config.aof_path();

            let stats = AofRecovery::replay(&path, |session, cmd_line| {
                engine.execute(session, cmd_line)
            })?;

            let writer = AofWriter::open(&path, engine.config.aof_sync_strategy, stats.last_db)?;
            for db in &mut engine.databases {
                db.attach_aof(writer.handle());
            }
            engine.aof = Some(writer);
            engine.replay_stats = stats;
        }

        tracing::info!(
            "Engine ready: {} databases, append-only {}",
            count,
            engine.config.append_only
        );
        Ok(engine)
    }

    /// An engine without persistence (default database count)
    pub fn in_memory() -> Self {
        Self {
            commands: CommandTable::builtin(),
            databases: (0..crate::config::DEFAULT_DATABASES)
                .map(Database::new)
                .collect(),
            aof: None,
            replay_stats: ReplayStats::default(),
            config: Config::builder().append_only(false).build(),
        }
    }

    /// Execute a command line on behalf of `session`
    ///
    /// Never fails: every problem becomes an error reply.
    pub fn execute(&self, session: &dyn Session, cmd_line: &[Bytes]) -> Reply {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(session, cmd_line))) {
            Ok(reply) => reply,
            Err(cause) => {
                tracing::error!(
                    "Command '{}' panicked: {}",
                    command_name(cmd_line),
                    panic_message(cause.as_ref())
                );
                Reply::unknown_error()
            }
        }
    }

    fn dispatch(&self, session: &dyn Session, cmd_line: &[Bytes]) -> Reply {
        if cmd_line.is_empty() {
            return Reply::error("ERR empty command");
        }

        let name = command_name(cmd_line);
        if name == "select" {
            if cmd_line.len() != 2 {
                return Reply::arg_num_error("select");
            }
            return self.exec_select(session, &cmd_line[1]);
        }

        match self.databases.get(session.db_index()) {
            Some(db) => db.exec(&self.commands, cmd_line),
            None => Reply::error("ERR DB index is out of range"),
        }
    }

    /// SELECT index
    fn exec_select(&self, session: &dyn Session, arg: &Bytes) -> Reply {
        let index = match std::str::from_utf8(arg).ok().and_then(|s| s.parse::<usize>().ok()) {
            Some(index) => index,
            None => return Reply::error("ERR invalid DB index"),
        };
        if index >= self.databases.len() {
            return Reply::error("ERR DB index is out of range");
        }
        session.select_db(index);
        Reply::ok()
    }

    /// Called by the transport after a client disconnects
    pub fn on_connection_closed(&self, session: &dyn Session) {
        tracing::debug!("Session closed (db {})", session.db_index());
    }

    /// Stop the AOF writer after it has written everything queued
    pub fn shutdown(&self) {
        if let Some(aof) = &self.aof {
            aof.shutdown();
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database_count(&self) -> usize {
        self.databases.len()
    }

    pub fn database(&self, index: usize) -> Option<&Database> {
        self.databases.get(index)
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn replay_stats(&self) -> &ReplayStats {
        &self.replay_stats
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
