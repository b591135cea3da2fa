//! TCP acceptor.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Accept incoming TCP connections on one execution context
//! - Hand each connection to the next context in round-robin order
//! - Keep accepting through per-connection errors until shutdown

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::http::handler::Handler;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionTracker;
use crate::net::error::ServerError;
use crate::net::pool::{ExecutionContext, ExecutionContextPool};
use crate::net::session::{Session, SessionSettings};

/// Pause after an accept error that is not the peer's fault (e.g. EMFILE).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A listening socket registered with one execution context.
#[derive(Debug)]
pub struct Acceptor {
    inner: TcpListener,
    local_addr: SocketAddr,
    context: ExecutionContext,
}

impl Acceptor {
    /// Resolve `host:port` and bind the first address that accepts.
    pub fn bind(context: &ExecutionContext, host: &str, port: u16) -> Result<Self, ServerError> {
        let resolve_error = |source| ServerError::Resolve {
            host: host.to_string(),
            port,
            source,
        };
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(resolve_error)?
            .collect();
        if addrs.is_empty() {
            return Err(resolve_error(io::Error::new(
                io::ErrorKind::NotFound,
                "no addresses found",
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            match std::net::TcpListener::bind(addr) {
                Ok(listener) => return Self::register(context, listener, addr),
                Err(source) => {
                    tracing::debug!(address = %addr, error = %source, "Bind attempt failed");
                    last_error = Some(ServerError::Bind {
                        address: addr.to_string(),
                        source,
                    });
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ServerError::Bind {
            address: format!("{host}:{port}"),
            source: io::Error::from(io::ErrorKind::AddrNotAvailable),
        }))
    }

    fn register(
        context: &ExecutionContext,
        listener: std::net::TcpListener,
        addr: SocketAddr,
    ) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            address: addr.to_string(),
            source,
        };
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        let inner = {
            let _guard = context.enter();
            TcpListener::from_std(listener).map_err(bind_error)?
        };

        tracing::info!(address = %local_addr, context = context.index(), "Listener bound");

        Ok(Self {
            inner,
            local_addr,
            context: context.clone(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The context whose reactor owns the listening socket.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Accept until `shutdown` fires, spawning a session per connection.
    ///
    /// Must run on the acceptor's own context.
    pub async fn serve(
        self,
        pool: Arc<ExecutionContextPool>,
        settings: SessionSettings,
        handler: Arc<dyn Handler>,
        tracker: ConnectionTracker,
        mut shutdown: ShutdownSignal,
    ) {
        tracing::debug!(address = %self.local_addr, "Accept loop started");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = self.inner.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let stream = match stream.into_std() {
                        Ok(stream) => stream,
                        Err(error) => {
                            tracing::warn!(peer = %peer, %error, "Failed to detach accepted socket");
                            continue;
                        }
                    };

                    let context = pool.next_context();
                    let guard = tracker.track();
                    let handler = Arc::clone(&handler);
                    tracing::debug!(
                        connection_id = %guard.id(),
                        peer = %peer,
                        context = context.index(),
                        "Connection accepted"
                    );

                    context.spawn(async move {
                        match TcpStream::from_std(stream) {
                            Ok(stream) => {
                                Session::new(stream, peer, guard, settings, handler).run().await
                            }
                            Err(error) => tracing::warn!(
                                connection_id = %guard.id(),
                                %error,
                                "Failed to register connection with worker"
                            ),
                        }
                    });
                }
                Err(error) if is_connection_error(&error) => {
                    tracing::warn!(%error, "Accept failed");
                }
                Err(error) => {
                    tracing::warn!(%error, "Accept failed, backing off");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        tracing::info!(address = %self.local_addr, "Accept loop stopped");
    }
}

/// Errors caused by a single peer; the listener itself is healthy.
fn is_connection_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_ephemeral_port() {
        let pool = ExecutionContextPool::new(1).unwrap();
        let context = pool.context(0).unwrap();
        let acceptor = Acceptor::bind(context, "127.0.0.1", 0).unwrap();
        assert_ne!(acceptor.local_addr().port(), 0);
        assert_eq!(acceptor.context().index(), 0);
    }

    #[test]
    fn port_in_use_is_a_bind_error() {
        let pool = ExecutionContextPool::new(1).unwrap();
        let context = pool.context(0).unwrap();
        let first = Acceptor::bind(context, "127.0.0.1", 0).unwrap();
        let taken = first.local_addr().port();

        let err = Acceptor::bind(context, "127.0.0.1", taken).unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[test]
    fn unresolvable_host_is_a_resolve_error() {
        let pool = ExecutionContextPool::new(1).unwrap();
        let context = pool.context(0).unwrap();
        let err = Acceptor::bind(context, "not a host name", 80).unwrap_err();
        assert!(matches!(err, ServerError::Resolve { .. }));
    }
}
