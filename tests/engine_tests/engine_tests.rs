//! Tests for Engine
//!
//! These tests verify:
//! - Command dispatch and arity checking
//! - SELECT and per-session database isolation
//! - Generic key commands (DEL, EXISTS, TYPE, RENAME, RENAMENX, KEYS, FLUSHDB)
//! - String commands
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use emberkv::protocol::{make_cmd_line, Reply};
use emberkv::session::{FakeSession, Session};
use emberkv::Engine;

// =============================================================================
// Helper Functions
// =============================================================================

fn run(engine: &Engine, session: &FakeSession, parts: &[&str]) -> Reply {
    engine.execute(session, &make_cmd_line(parts))
}

fn bulk(s: &str) -> Reply {
    Reply::Bulk(Bytes::copy_from_slice(s.as_bytes()))
}

fn err(s: &str) -> Reply {
    Reply::Error(s.to_string())
}

fn sorted_keys(reply: Reply) -> Vec<String> {
    match reply {
        Reply::MultiBulk(values) => {
            let mut keys: Vec<String> = values
                .iter()
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .collect();
            keys.sort();
            keys
        }
        other => panic!("Expected multi bulk, got {:?}", other),
    }
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_ping() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["PING"]), Reply::pong());
    assert_eq!(run(&engine, &session, &["ping"]), Reply::pong());
}

#[test]
fn test_ping_rejects_extra_argument() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(
        run(&engine, &session, &["PING", "extra"]),
        err("ERR wrong number of arguments for 'ping' command")
    );
}

#[test]
fn test_unknown_command() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(
        run(&engine, &session, &["FROB", "x"]),
        err("ERR unknown command 'frob'")
    );
}

#[test]
fn test_empty_command_line() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert!(engine.execute(&session, &[]).is_error());
}

#[test]
fn test_arity_errors() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(
        run(&engine, &session, &["GET"]),
        err("ERR wrong number of arguments for 'get' command")
    );
    assert_eq!(
        run(&engine, &session, &["TYPE", "a", "b"]),
        err("ERR wrong number of arguments for 'type' command")
    );
    assert_eq!(
        run(&engine, &session, &["DEL"]),
        err("ERR wrong number of arguments for 'del' command")
    );
    assert_eq!(
        run(&engine, &session, &["FLUSHDB", "now"]),
        err("ERR wrong number of arguments for 'flushdb' command")
    );
}

#[test]
fn test_command_names_are_case_insensitive() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["sEt", "k", "v"]), Reply::ok());
    assert_eq!(run(&engine, &session, &["GeT", "k"]), bulk("v"));
}

// =============================================================================
// SELECT Tests
// =============================================================================

#[test]
fn test_select_switches_database() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "k", "db0"]);
    assert_eq!(run(&engine, &session, &["SELECT", "3"]), Reply::ok());
    assert_eq!(session.db_index(), 3);
    assert_eq!(run(&engine, &session, &["GET", "k"]), Reply::NullBulk);

    run(&engine, &session, &["SET", "k", "db3"]);
    run(&engine, &session, &["SELECT", "0"]);
    assert_eq!(run(&engine, &session, &["GET", "k"]), bulk("db0"));
}

#[test]
fn test_select_errors() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["SELECT", "abc"]), err("ERR invalid DB index"));
    assert_eq!(
        run(&engine, &session, &["SELECT", "16"]),
        err("ERR DB index is out of range")
    );
    assert_eq!(
        run(&engine, &session, &["SELECT"]),
        err("ERR wrong number of arguments for 'select' command")
    );
    assert_eq!(session.db_index(), 0);
}

#[test]
fn test_sessions_are_independent() {
    let engine = Engine::in_memory();
    let a = FakeSession::new();
    let b = FakeSession::new();

    run(&engine, &a, &["SELECT", "1"]);
    run(&engine, &a, &["SET", "k", "from-a"]);

    assert_eq!(b.db_index(), 0);
    assert_eq!(run(&engine, &b, &["GET", "k"]), Reply::NullBulk);
    assert_eq!(engine.database(1).unwrap().keyspace().len(), 1);
}

// =============================================================================
// Key Command Tests
// =============================================================================

#[test]
fn test_del_counts_removed_keys() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "a", "1"]);
    run(&engine, &session, &["SET", "b", "2"]);
    assert_eq!(run(&engine, &session, &["DEL", "a", "b", "c"]), Reply::int(2));
    assert_eq!(run(&engine, &session, &["DEL", "a"]), Reply::int(0));
}

#[test]
fn test_exists_counts_duplicates() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "a", "1"]);
    assert_eq!(run(&engine, &session, &["EXISTS", "a", "a", "b"]), Reply::int(2));
}

#[test]
fn test_type() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "a", "1"]);
    assert_eq!(run(&engine, &session, &["TYPE", "a"]), Reply::status("string"));
    assert_eq!(run(&engine, &session, &["TYPE", "nope"]), Reply::status("none"));
}

#[test]
fn test_rename() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "src", "v"]);
    run(&engine, &session, &["SET", "dest", "old"]);
    assert_eq!(run(&engine, &session, &["RENAME", "src", "dest"]), Reply::ok());
    assert_eq!(run(&engine, &session, &["GET", "dest"]), bulk("v"));
    assert_eq!(run(&engine, &session, &["EXISTS", "src"]), Reply::int(0));

    assert_eq!(
        run(&engine, &session, &["RENAME", "src", "other"]),
        err("ERR no such key")
    );
}

#[test]
fn test_renamenx() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "a", "1"]);
    run(&engine, &session, &["SET", "b", "2"]);

    assert_eq!(run(&engine, &session, &["RENAMENX", "a", "b"]), Reply::int(0));
    assert_eq!(run(&engine, &session, &["GET", "a"]), bulk("1"));
    assert_eq!(run(&engine, &session, &["GET", "b"]), bulk("2"));

    assert_eq!(run(&engine, &session, &["RENAMENX", "a", "c"]), Reply::int(1));
    assert_eq!(run(&engine, &session, &["GET", "c"]), bulk("1"));
    assert!(run(&engine, &session, &["RENAMENX", "missing", "d"]).is_error());
}

#[test]
fn test_keys_pattern() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    for key in ["apple", "avocado", "banana", "a"] {
        run(&engine, &session, &["SET", key, "v"]);
    }

    assert_eq!(
        sorted_keys(run(&engine, &session, &["KEYS", "a*"])),
        vec!["a", "apple", "avocado"]
    );
    assert_eq!(
        sorted_keys(run(&engine, &session, &["KEYS", "*"])).len(),
        4
    );
    assert!(sorted_keys(run(&engine, &session, &["KEYS", "z*"])).is_empty());
}

#[test]
fn test_flushdb_only_touches_selected_db() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    run(&engine, &session, &["SET", "a", "1"]);
    run(&engine, &session, &["SELECT", "1"]);
    run(&engine, &session, &["SET", "b", "2"]);

    assert_eq!(run(&engine, &session, &["FLUSHDB"]), Reply::ok());
    assert_eq!(run(&engine, &session, &["DBSIZE"]), Reply::int(0));

    run(&engine, &session, &["SELECT", "0"]);
    assert_eq!(run(&engine, &session, &["DBSIZE"]), Reply::int(1));
}

#[test]
fn test_randomkey() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["RANDOMKEY"]), Reply::NullBulk);
    run(&engine, &session, &["SET", "only", "v"]);
    assert_eq!(run(&engine, &session, &["RANDOMKEY"]), bulk("only"));
}

// =============================================================================
// String Command Tests
// =============================================================================

#[test]
fn test_set_nx_xx() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["SET", "k", "1", "XX"]), Reply::NullBulk);
    assert_eq!(run(&engine, &session, &["SET", "k", "1", "NX"]), Reply::ok());
    assert_eq!(run(&engine, &session, &["SET", "k", "2", "nx"]), Reply::NullBulk);
    assert_eq!(run(&engine, &session, &["SET", "k", "3", "XX"]), Reply::ok());
    assert_eq!(run(&engine, &session, &["GET", "k"]), bulk("3"));

    assert_eq!(
        run(&engine, &session, &["SET", "k", "4", "NX", "XX"]),
        err("ERR syntax error")
    );
    assert_eq!(run(&engine, &session, &["SET", "k", "4", "EX"]), err("ERR syntax error"));
}

#[test]
fn test_setnx_getset_strlen() {
    let engine = Engine::in_memory();
    let session = FakeSession::new();

    assert_eq!(run(&engine, &session, &["SETNX", "k", "hello"]), Reply::int(1));
    assert_eq!(run(&engine, &session, &["SETNX", "k", "other"]), Reply::int(0));
    assert_eq!(run(&engine, &session, &["STRLEN", "k"]), Reply::int(5));
    assert_eq!(run(&engine, &session, &["GETSET", "k", "new"]), bulk("hello"));
    assert_eq!(run(&engine, &session, &["GETSET", "fresh", "v"]), Reply::NullBulk);
    assert_eq!(run(&engine, &session, &["STRLEN", "missing"]), Reply::int(0));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_sessions() {
    let engine = Arc::new(Engine::in_memory());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let session = FakeSession::new();
                run(&engine, &session, &["SELECT", t.to_string().as_str()]);
                for i in 0..200 {
                    let key = format!("k{}", i);
                    assert_eq!(run(&engine, &session, &["SET", key.as_str(), "v"]), Reply::ok());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    for t in 0..4 {
        assert_eq!(engine.database(t).unwrap().keyspace().len(), 200);
    }
}
