//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the worker pool sized from configuration
//! - Bind the acceptor on the first execution context
//! - Start, stop and join the whole server
//!
//! `bind` does all fallible setup, so a bound server only fails to `run`
//! when it was already started or stopped.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::ServerConfig;
use crate::http::handler::Handler;
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::error::ServerError;
use crate::net::listener::Acceptor;
use crate::net::pool::{ExecutionContextPool, PoolError};

/// HTTP/1.1 server front end.
pub struct HttpServer {
    config: ServerConfig,
    pool: Arc<ExecutionContextPool>,
    /// Taken by `run`, which moves it onto its context.
    acceptor: Mutex<Option<Acceptor>>,
    local_addr: SocketAddr,
    handler: Arc<dyn Handler>,
    tracker: ConnectionTracker,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create the pool and bind the listener. Nothing runs until [`run`](Self::run).
    pub fn bind<H: Handler>(config: ServerConfig, handler: H) -> Result<Self, ServerError> {
        let pool = match config.pool.workers {
            0 => ExecutionContextPool::with_default_size()?,
            workers => ExecutionContextPool::new(workers)?,
        };
        let context = pool.context(0).ok_or(PoolError::Stopped)?;
        let acceptor = Acceptor::bind(context, &config.listener.host, config.listener.port)?;
        let local_addr = acceptor.local_addr();

        tracing::info!(
            address = %local_addr,
            workers = pool.size(),
            read_timeout_secs = config.timeouts.read_secs,
            write_timeout_secs = config.timeouts.write_secs,
            "HTTP server bound"
        );

        Ok(Self {
            config,
            pool: Arc::new(pool),
            acceptor: Mutex::new(Some(acceptor)),
            local_addr,
            handler: Arc::new(handler),
            tracker: ConnectionTracker::new(),
            shutdown: Shutdown::new(),
        })
    }

    /// Start the workers and the accept loop. Returns immediately.
    pub fn run(&self) -> Result<(), ServerError> {
        self.pool.run()?;

        let acceptor = self
            .acceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PoolError::AlreadyRunning)?;
        let context = acceptor.context().clone();
        context.spawn(acceptor.serve(
            Arc::clone(&self.pool),
            self.config.session_settings(),
            Arc::clone(&self.handler),
            self.tracker.clone(),
            self.shutdown.subscribe(),
        ));

        tracing::info!(address = %self.local_addr, "HTTP server running");
        Ok(())
    }

    /// Block until every worker has exited.
    pub fn wait(&self) {
        self.pool.wait();
        tracing::info!("HTTP server stopped");
    }

    /// Stop accepting and stop the workers. Open sessions are dropped.
    pub fn stop(&self) {
        // Never run: the listener is still parked here.
        drop(
            self.acceptor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        if self.shutdown.trigger() {
            tracing::info!(
                active_connections = self.tracker.active_count(),
                "HTTP server stopping"
            );
        }
        self.pool.stop();
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sessions currently open across all workers.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}
