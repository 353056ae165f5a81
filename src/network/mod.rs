//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking, polls the shutdown flag)
//! - One thread per connection
//! - Commands routed through Engine

mod server;
mod connection;
mod wait;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use wait::{WaitGroup, WaitGuard};
