//! Codec Tests
//!
//! Tests for reply encoding and streaming decoding.

use std::io::Cursor;

use bytes::Bytes;
use emberkv::protocol::{
    decode_all, encode, make_cmd_line, parse_stream, read_reply, write_reply, Decoder, Reply,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn decode_ok(input: &[u8]) -> Vec<Reply> {
    decode_all(input)
        .into_iter()
        .map(|payload| payload.unwrap())
        .collect()
}

fn bulk(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_simple_replies() {
    assert_eq!(encode(&Reply::ok()), b"+OK\r\n");
    assert_eq!(encode(&Reply::pong()), b"+PONG\r\n");
    assert_eq!(encode(&Reply::int(-7)), b":-7\r\n");
    assert_eq!(encode(&Reply::NullBulk), b"$-1\r\n");
    assert_eq!(
        encode(&Reply::arg_num_error("get")),
        b"-ERR wrong number of arguments for 'get' command\r\n"
    );
}

#[test]
fn test_encode_bulk_and_multi_bulk() {
    assert_eq!(encode(&Reply::bulk("abc")), b"$3\r\nabc\r\n");
    assert_eq!(encode(&Reply::bulk("")), b"$0\r\n\r\n");
    assert_eq!(encode(&Reply::MultiBulk(vec![])), b"*0\r\n");
    assert_eq!(
        encode(&Reply::MultiBulk(make_cmd_line(&["SET", "k", "v"]))),
        b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n"
    );
}

#[test]
fn test_status_and_error_stay_single_line() {
    assert_eq!(encode(&Reply::error("ERR bad\r\nthing")), b"-ERR bad  thing\r\n");
    assert_eq!(encode(&Reply::status("a\nb")), b"+a b\r\n");
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_single_line_replies() {
    let replies = decode_ok(b"+OK\r\n-ERR oops\r\n:42\r\n");
    assert_eq!(
        replies,
        vec![
            Reply::Status("OK".to_string()),
            Reply::Error("ERR oops".to_string()),
            Reply::Integer(42),
        ]
    );
}

#[test]
fn test_decode_bulk_variants() {
    let replies = decode_ok(b"$5\r\nhello\r\n$-1\r\n$0\r\n\r\n");
    assert_eq!(
        replies,
        vec![Reply::Bulk(bulk("hello")), Reply::NullBulk, Reply::Bulk(Bytes::new())]
    );
}

#[test]
fn test_decode_command_array() {
    let replies = decode_ok(b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n");
    assert_eq!(replies, vec![Reply::MultiBulk(make_cmd_line(&["SET", "key", "value"]))]);
}

#[test]
fn test_decode_empty_array() {
    let replies = decode_ok(b"*0\r\n*1\r\n$4\r\nPING\r\n");
    assert_eq!(
        replies,
        vec![Reply::MultiBulk(vec![]), Reply::MultiBulk(make_cmd_line(&["PING"]))]
    );
}

#[test]
fn test_bulk_body_is_binary_safe() {
    let replies = decode_ok(b"*2\r\n$3\r\nGET\r\n$4\r\na\r\nb\r\n");
    assert_eq!(
        replies,
        vec![Reply::MultiBulk(vec![bulk("GET"), Bytes::from_static(b"a\r\nb")])]
    );
}

#[test]
fn test_decode_inline_command() {
    let replies = decode_ok(b"PING\r\nSET  a   b\r\n");
    assert_eq!(
        replies,
        vec![
            Reply::MultiBulk(make_cmd_line(&["PING"])),
            Reply::MultiBulk(make_cmd_line(&["SET", "a", "b"])),
        ]
    );
}

#[test]
fn test_pipelined_commands_in_order() {
    let mut input = Vec::new();
    for i in 0..50 {
        let key = format!("k{}", i);
        input.extend(encode(&Reply::MultiBulk(make_cmd_line(&["SET", &key, "v"]))));
    }

    let replies = decode_ok(&input);
    assert_eq!(replies.len(), 50);
    for (i, reply) in replies.iter().enumerate() {
        match reply {
            Reply::MultiBulk(args) => assert_eq!(args[1], bulk(&format!("k{}", i))),
            other => panic!("Expected command, got {:?}", other),
        }
    }
}

// =============================================================================
// Error Recovery Tests
// =============================================================================

#[test]
fn test_malformed_header_then_recovery() {
    let payloads = decode_all(b"*2\r\n$bad\r\n*1\r\n$4\r\nPING\r\n");
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].is_err());
    assert_eq!(
        payloads[1].as_ref().unwrap(),
        &Reply::MultiBulk(make_cmd_line(&["PING"]))
    );
}

#[test]
fn test_line_without_cr_is_protocol_error() {
    let payloads = decode_all(b"+OK\n:1\r\n");
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].is_err());
    assert_eq!(payloads[1].as_ref().unwrap(), &Reply::Integer(1));
}

#[test]
fn test_null_element_inside_array_is_rejected() {
    let payloads = decode_all(b"*2\r\n$-1\r\n+OK\r\n");
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].is_err());
    assert_eq!(payloads[1].as_ref().unwrap(), &Reply::Status("OK".to_string()));
}

#[test]
fn test_bad_integer_reply() {
    let payloads = decode_all(b":abc\r\n:5\r\n");
    assert!(payloads[0].is_err());
    assert_eq!(payloads[1].as_ref().unwrap(), &Reply::Integer(5));
}

#[test]
fn test_oversized_bulk_header_rejected() {
    let payloads = decode_all(b"$999999999999\r\n+OK\r\n");
    assert!(payloads[0].is_err());
    assert_eq!(payloads[1].as_ref().unwrap(), &Reply::Status("OK".to_string()));
}

#[test]
fn test_overlong_line_discarded_through_newline() {
    let mut input = vec![b'x'; 64 * 1024];
    input.extend_from_slice(b"FLUSHDB\r\nPING\r\n");

    let payloads = decode_all(&input);
    assert_eq!(payloads.len(), 2);
    assert!(!payloads[0].as_ref().unwrap_err().is_io());
    assert_eq!(
        payloads[1].as_ref().unwrap(),
        &Reply::MultiBulk(make_cmd_line(&["PING"]))
    );
}

#[test]
fn test_overlong_line_at_end_of_stream() {
    let input = vec![b'x'; 64 * 1024 + 10];

    let mut decoder = Decoder::new(&input[..]);
    assert!(decoder.next().unwrap().unwrap_err().is_eof());
    assert!(decoder.next().is_none());
}

// =============================================================================
// Stream Termination Tests
// =============================================================================

#[test]
fn test_truncated_stream_ends_with_eof() {
    let mut decoder = Decoder::new(&b"+OK\r\n*2\r\n$3\r\nfoo\r\n"[..]);

    assert_eq!(decoder.next().unwrap().unwrap(), Reply::Status("OK".to_string()));

    let last = decoder.next().unwrap();
    assert!(last.unwrap_err().is_eof());
    assert!(decoder.next().is_none());
}

#[test]
fn test_decode_all_drops_eof() {
    assert!(decode_all(b"").is_empty());
    assert!(decode_all(b"*2\r\n$3\r\nfoo\r\n").is_empty());
}

#[test]
fn test_parse_stream_over_reader() {
    let input = Cursor::new(b"*1\r\n$4\r\nPING\r\n".to_vec());
    let payloads: Vec<_> = parse_stream(input).collect();
    assert_eq!(payloads.len(), 2);
    assert_eq!(
        payloads[0].as_ref().unwrap(),
        &Reply::MultiBulk(make_cmd_line(&["PING"]))
    );
    assert!(payloads[1].as_ref().unwrap_err().is_eof());
}

#[test]
fn test_read_write_reply_helpers() {
    let mut buf = Vec::new();
    write_reply(&mut buf, &Reply::bulk("hi")).unwrap();
    write_reply(&mut buf, &Reply::int(3)).unwrap();

    let mut reader = Cursor::new(buf);
    assert_eq!(read_reply(&mut reader).unwrap(), Reply::bulk("hi"));
    assert_eq!(read_reply(&mut reader).unwrap(), Reply::Integer(3));
    assert!(read_reply(&mut reader).unwrap_err().is_eof());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_every_reply_survives_encode_decode() {
    let replies = vec![
        Reply::Status("OK".to_string()),
        Reply::Error("ERR no such key".to_string()),
        Reply::Integer(0),
        Reply::Integer(-42),
        Reply::Bulk(bulk("abc")),
        Reply::Bulk(Bytes::new()),
        Reply::Bulk(Bytes::from_static(b"a\r\nb\0")),
        Reply::NullBulk,
        Reply::MultiBulk(Vec::new()),
        Reply::MultiBulk(vec![
            bulk("SET"),
            Bytes::new(),
            Bytes::from_static(b"\r\n\xff"),
        ]),
    ];

    for reply in replies {
        assert_eq!(decode_ok(&encode(&reply)), vec![reply.clone()], "{:?}", reply);
    }
}

#[test]
fn test_canonical_wire_reencodes_identically() {
    let inputs: [&[u8]; 8] = [
        b"+OK\r\n",
        b"-ERR x\r\n",
        b":-7\r\n",
        b"$0\r\n\r\n",
        b"$-1\r\n",
        b"*0\r\n",
        b"$4\r\n\r\n\r\n\r\n",
        b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n",
    ];

    for input in inputs {
        let decoded = decode_ok(input);
        assert_eq!(decoded.len(), 1);
        assert_eq!(encode(&decoded[0]), input.to_vec());
    }
}
