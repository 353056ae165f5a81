//! EmberKV CLI Client
//!
//! Sends one command to the server and prints the reply.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use bytes::Bytes;
use clap::Parser;
use emberkv::protocol::{read_reply, write_reply, Reply};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the EmberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Database to SELECT before running the command
    #[arg(short = 'n', long, default_value = "0")]
    db: usize,

    /// Command and arguments, e.g. `SET key value`
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(reply) => {
            print_reply(&reply, "");
            if reply.is_error() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Could not talk to {}: {}", args.server, e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> emberkv::Result<Reply> {
    let stream = TcpStream::connect(&args.server)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    if args.db != 0 {
        let select = vec![
            Bytes::from_static(b"SELECT"),
            Bytes::from(args.db.to_string()),
        ];
        write_reply(&mut writer, &Reply::MultiBulk(select))?;
        let reply = read_reply(&mut reader)?;
        if reply.is_error() {
            return Ok(reply);
        }
    }

    let cmd_line = args
        .command
        .iter()
        .map(|part| Bytes::from(part.clone()))
        .collect();
    write_reply(&mut writer, &Reply::MultiBulk(cmd_line))?;
    read_reply(&mut reader)
}

/// Print in the usual redis-cli style
fn print_reply(reply: &Reply, indent: &str) {
    match reply {
        Reply::Status(text) => println!("{}", text),
        Reply::Error(text) => println!("(error) {}", text),
        Reply::Integer(value) => println!("(integer) {}", value),
        Reply::Bulk(value) => println!("\"{}\"", String::from_utf8_lossy(value)),
        Reply::NullBulk => println!("(nil)"),
        Reply::MultiBulk(values) if values.is_empty() => println!("(empty array)"),
        Reply::MultiBulk(values) => {
            for (i, value) in values.iter().enumerate() {
                print!("{}{}) ", indent, i + 1);
                print_reply(&Reply::Bulk(value.clone()), indent);
            }
        }
    }
}
