//! String commands

use bytes::Bytes;

use super::CommandTable;
use crate::error::Result;
use crate::keyspace::{Entity, Keyspace};
use crate::protocol::{to_key, Reply};

/// Existence condition of SET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetCondition {
    Always,
    IfAbsent,
    IfExists,
}

fn parse_set_condition(options: &[Bytes]) -> Option<SetCondition> {
    let mut condition = SetCondition::Always;
    for option in options {
        let next = match option.to_ascii_uppercase().as_slice() {
            b"NX" => SetCondition::IfAbsent,
            b"XX" => SetCondition::IfExists,
            _ => return None,
        };
        if condition != SetCondition::Always && condition != next {
            return None;
        }
        condition = next;
    }
    Some(condition)
}

/// GET key
fn exec_get(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    Ok(match keyspace.get(&to_key(&args[0])) {
        Some(Entity::Str(value)) => Reply::Bulk(value),
        None => Reply::NullBulk,
    })
}

/// SET key value [NX|XX]
fn exec_set(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let condition = match parse_set_condition(&args[2..]) {
        Some(condition) => condition,
        None => return Ok(Reply::syntax_error()),
    };

    let key = to_key(&args[0]);
    let entity = Entity::Str(args[1].clone());
    let stored = match condition {
        SetCondition::Always => {
            keyspace.put(key, entity);
            true
        }
        SetCondition::IfAbsent => keyspace.put_if_absent(key, entity) > 0,
        SetCondition::IfExists => keyspace.put_if_exists(&key, entity) > 0,
    };

    Ok(if stored { Reply::ok() } else { Reply::NullBulk })
}

/// SETNX key value
fn exec_setnx(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    let stored = keyspace.put_if_absent(to_key(&args[0]), Entity::Str(args[1].clone()));
    Ok(Reply::int(stored as i64))
}

/// GETSET key value
fn exec_getset(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    Ok(
        match keyspace.replace(to_key(&args[0]), Entity::Str(args[1].clone())) {
            Some(Entity::Str(old)) => Reply::Bulk(old),
            None => Reply::NullBulk,
        },
    )
}

/// STRLEN key
fn exec_strlen(keyspace: &Keyspace, args: &[Bytes]) -> Result<Reply> {
    Ok(match keyspace.get(&to_key(&args[0])) {
        Some(Entity::Str(value)) => Reply::int(value.len() as i64),
        None => Reply::int(0),
    })
}

pub(super) fn register(table: &mut CommandTable) {
    table.register("get", exec_get, 2);
    table.register_write("set", exec_set, -3);
    table.register_write("setnx", exec_setnx, 3);
    table.register_write("getset", exec_getset, 3);
    table.register("strlen", exec_strlen, 2);
}
