//! TCP server for message lookup connections.
//!
//! Accepts incoming connections and hands each one to its own task running a
//! `Session`. All sessions share the same read-only message catalog.

use crate::config::Config;
use crate::session::Session;
use crate::storage::MessageStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, trace, warn};

/// Server instance
pub struct Server {
    config: Config,
    store: Arc<MessageStore>,
    listener: TcpListener,
}

impl Server {
    /// Bind the listening socket. No connection is accepted until `run`.
    pub async fn bind(config: Config, store: Arc<MessageStore>) -> io::Result<Self> {
        let addr = resolve_listen_addr(&config.listen).await?;
        let listener = create_listener(addr, config.backlog)?;

        info!(
            address = %listener.local_addr()?,
            messages = store.total(),
            "Server listening"
        );

        Ok(Server {
            config,
            store,
            listener,
        })
    }

    /// Address the server is actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get a reference to the shared catalog
    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    /// Accept connections until the process is stopped.
    ///
    /// Each connection runs in its own task; the accept loop never waits on a
    /// session.
    pub async fn run(self) {
        let mut next_conn_id: u64 = 0;

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let conn_id = next_conn_id;
                    next_conn_id += 1;
                    debug!(conn_id, peer = %peer, "Client connected");

                    let store = Arc::clone(&self.store);
                    let rng = session_rng(self.config.seed, conn_id);

                    tokio::spawn(async move {
                        handle_connection(stream, peer, conn_id, store, rng).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Serve one client and log how the connection ended
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: u64,
    store: Arc<MessageStore>,
    rng: StdRng,
) {
    if let Err(e) = stream.set_nodelay(true) {
        trace!(conn_id, error = %e, "Failed to set TCP_NODELAY");
    }

    let mut session = Session::new(stream, store, rng);

    match session.run().await {
        Ok(summary) => {
            debug!(
                conn_id,
                peer = %peer,
                served = summary.requests_served,
                "Connection closed by client request"
            );
        }
        Err(e) if e.is_disconnect() => {
            debug!(
                conn_id,
                peer = %peer,
                served = session.summary().requests_served,
                "Client disconnected"
            );
        }
        Err(e) => {
            warn!(
                conn_id,
                peer = %peer,
                served = session.summary().requests_served,
                error = %e,
                "Connection terminated"
            );
        }
    }
}

/// Random source for one session.
///
/// With a configured seed every connection still gets its own stream,
/// derived from the seed and the connection number.
fn session_rng(seed: Option<u64>, conn_id: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(conn_id)),
        None => StdRng::from_entropy(),
    }
}

async fn resolve_listen_addr(listen: &str) -> io::Result<SocketAddr> {
    tokio::net::lookup_host(listen).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("listen address '{listen}' did not resolve"),
        )
    })
}

/// Create a TCP listener with SO_REUSEADDR and the configured backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    TcpListener::from_std(socket.into())
}
