//! Generic key commands
//!
//! Multi-key commands (RENAME, RENAMENX) run as independent per-key steps;
//! there is no isolation from concurrent writers of the same keys.

use bytes::Bytes;

use super::CommandTable;
use crate::error::Result;
use crate::keyspace::{Keyspace, Pattern};
use crate::protocol::{to_key, Reply};

/// DEL key [key ...]
fn exec_del(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let keys: Vec<String> = args.iter().map(to_key).collect();
    let deleted = keyspace.remove_all(&keys);
    Ok(Reply::int(deleted as i64))
}

/// EXISTS key [key ...]; a key listed twice counts twice
fn exec_exists(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let count = args
        .iter()
        .filter(|arg| keyspace.contains(&to_key(arg)))
        .count();
    Ok(Reply::int(count as i64))
}

/// FLUSHDB
fn exec_flush_db(keyspace: &Keyspace, _args: &[Bytes]) -> Result<Reply> {
    keyspace.clear();
    Ok(Reply::ok())
}

/// TYPE key
fn exec_type(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    Ok(match keyspace.get(&to_key(&args[0])) {
        Some(entity) => Reply::status(entity.type_name()),
        None => Reply::status("none"),
    })
}

/// RENAME src dest
fn exec_rename(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let (src, dest) = (to_key(&args[0]), to_key(&args[1]));
    match keyspace.take(&src) {
        Some(entity) => {
            keyspace.put(dest, entity);
            Ok(Reply::ok())
        }
        None => Ok(Reply::error("ERR no such key")),
    }
}

/// RENAMENX src dest: 0 when dest already exists
fn exec_renamenx(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let (src, dest) = (to_key(&args[0]), to_key(&args[1]));
    if keyspace.contains(&dest) {
        return Ok(Reply::int(0));
    }
    match keyspace.take(&src) {
        Some(entity) => {
            keyspace.put(dest, entity);
            Ok(Reply::int(1))
        }
        None => Ok(Reply::error("ERR no such key")),
    }
}

/// KEYS pattern
fn exec_keys(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let pattern = Pattern::compile(&to_key(&args[0]));
    let mut matched = Vec::new();
    keyspace.for_each(|key, _| {
        if pattern.is_match(key) {
            matched.push(Bytes::copy_from_slice(key.as_bytes()));
        }
        true
    });
    Ok(Reply::multi_bulk(matched))
}

/// RANDOMKEY
fn exec_random_key(keyspace: &Keyspace, _args: &[Bytes]) -> Result<Reply> {
    Ok(match keyspace.random_keys(1).pop() {
        Some(key) => Reply::bulk(key),
        None => Reply::NullBulk,
    })
}

/// DBSIZE
fn exec_db_size(keyspace: &Keyspace, _args: &[Bytes]) -> Result<Reply> {
    Ok(Reply::int(keyspace.len() as i64))
}

pub(super) fn register(table: &mut CommandTable) {
    table.register_write("del", exec_del, -2);
    table.register("exists", exec_exists, -2);
    table.register_write("flushdb", exec_flush_db, 1);
    table.register("type", exec_type, 2);
    table.register_write("rename", exec_rename, 3);
    table.register_write("renamenx", exec_renamenx, 3);
    table.register("keys", exec_keys, 2);
    table.register("randomkey", exec_random_key, 1);
    table.register("dbsize", exec_db_size, 1);
}
