//! Keyspace Module
//!
//! In-memory mapping from keys to value entities for one logical database.
//!
//! ## Responsibilities
//! - Linearizable per-key operations under concurrent access
//! - Insert-vs-overwrite counting (`put` returns keys *added*)
//! - Atomic conditional writes (`put_if_absent`, `put_if_exists`)
//! - Random sampling for RANDOMKEY
//! - Whole-map clear for FLUSHDB
//!
//! ## Data Structure Choice
//! Keys are hashed onto a fixed set of shards, each a `HashMap` behind a
//! `parking_lot::RwLock`. The shard set sits behind one more lock as an
//! `Arc`, so `clear` is a pointer swap and an iteration that already holds
//! the old set keeps walking it undisturbed.

mod dict;
mod pattern;

pub use dict::{Keyspace, SHARD_COUNT};
pub use pattern::Pattern;

use bytes::Bytes;

/// A value stored in the keyspace
///
/// New data types become new variants; commands match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Binary-safe string
    Str(Bytes),
}

impl Entity {
    /// Type tag reported by TYPE
    pub fn type_name(&self) -> &'static str {
        match self {
            Entity::Str(_) => "string",
        }
    }

    /// Convenience constructor for string values
    pub fn string(value: impl Into<Bytes>) -> Self {
        Entity::Str(value.into())
    }
}
