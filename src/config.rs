//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults. The engine reads it once
//! at construction time and treats it as immutable afterwards.

use std::path::PathBuf;

/// Number of logical databases used when none (or zero) is configured
pub const DEFAULT_DATABASES: usize = 16;

/// Main configuration for an EmberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── appendonly.aof   (append-only file)
    pub data_dir: PathBuf,

    /// Number of selectable logical databases (0 means the default of 16)
    pub databases: usize,

    // -------------------------------------------------------------------------
    // AOF Configuration
    // -------------------------------------------------------------------------
    /// Whether write commands are logged and replayed at startup
    pub append_only: bool,

    /// AOF file name, relative to `data_dir`
    pub append_filename: String,

    /// Sync strategy: how often the AOF writer fsyncs
    pub aof_sync_strategy: AofSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Address the server binds, `host:port`
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// How long a closing connection waits for in-flight replies (milliseconds)
    pub close_timeout_ms: u64,
}

/// AOF sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofSyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N records (balanced durability/performance)
    EveryNEntries { count: usize },

    /// never fsync explicitly, leave it to the OS
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            databases: DEFAULT_DATABASES,
            append_only: true,
            append_filename: "appendonly.aof".to_string(),
            aof_sync_strategy: AofSyncStrategy::EveryNEntries { count: 100 },
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            close_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the append-only file
    pub fn aof_path(&self) -> PathBuf {
        self.data_dir.join(&self.append_filename)
    }

    /// Effective number of logical databases
    pub fn database_count(&self) -> usize {
        if self.databases == 0 {
            DEFAULT_DATABASES
        } else {
            self.databases
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for the AOF)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of logical databases
    pub fn databases(mut self, count: usize) -> Self {
        self.config.databases = count;
        self
    }

    /// Enable or disable the append-only file
    pub fn append_only(mut self, enabled: bool) -> Self {
        self.config.append_only = enabled;
        self
    }

    /// Set the AOF file name
    pub fn append_filename(mut self, name: impl Into<String>) -> Self {
        self.config.append_filename = name.into();
        self
    }

    /// Set the AOF sync strategy
    pub fn aof_sync_strategy(mut self, strategy: AofSyncStrategy) -> Self {
        self.config.aof_sync_strategy = strategy;
        self
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Cap on open client connections; extra clients get an error and are dropped
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Idle read timeout per connection, 0 for none
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the close drain timeout (in milliseconds)
    pub fn close_timeout_ms(mut self, ms: u64) -> Self {
        self.config.close_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
