//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::Connection;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvError, Result};
use crate::protocol::Reply;

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Flips the server's shutdown flag from anywhere
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// TCP server for EmberKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    next_id: AtomicU64,
    connections: Arc<Mutex<HashMap<u64, Arc<Connection>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: ShutdownHandle(Arc::new(AtomicBool::new(false))),
            next_id: AtomicU64::new(0),
            connections: Arc::new(Mutex::new(HashMap::new())),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Number of open client connections
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Accept connections until shutdown is signalled (blocking)
    ///
    /// On shutdown every open connection is closed and its thread joined.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, _)) => self.accept(stream),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, closing {} connections", self.connection_count());
        let open: Vec<Arc<Connection>> = self.connections.lock().values().cloned().collect();
        for connection in open {
            connection.close();
        }
        for worker in self.workers.lock().drain(..) {
            let _ = worker.join();
        }
        Ok(())
    }

    fn accept(&self, mut stream: TcpStream) {
        if self.connection_count() >= self.config.max_connections {
            tracing::warn!("Rejecting connection: max clients reached");
            let reply = Reply::error("ERR max number of clients reached");
            let _ = stream.write_all(&reply.to_bytes());
            return;
        }

        let connection = match self.prepare(stream) {
            Ok(connection) => Arc::new(connection),
            Err(e) => {
                tracing::warn!("Failed to set up connection: {}", e);
                return;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().insert(id, Arc::clone(&connection));

        let engine = Arc::clone(&self.engine);
        let connections = Arc::clone(&self.connections);
        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
                engine.on_connection_closed(connection.as_ref());
                connection.close();
                connections.lock().remove(&id);
            });

        match spawned {
            Ok(worker) => {
                let mut workers = self.workers.lock();
                workers.retain(|w| !w.is_finished());
                workers.push(worker);
            }
            Err(e) => {
                tracing::error!("Failed to spawn connection thread: {}", e);
                self.connections.lock().remove(&id);
            }
        }
    }

    fn prepare(&self, stream: TcpStream) -> Result<Connection> {
        // accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;
        let connection = Connection::new(
            stream,
            Arc::clone(&self.engine),
            Duration::from_millis(self.config.close_timeout_ms),
        )?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
        Ok(connection)
    }
}
