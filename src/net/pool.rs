//! Pool of worker-bound reactors.
//!
//! # Responsibilities
//! - Own one single-threaded Tokio runtime per worker thread
//! - Hand out contexts round-robin so connections spread across workers
//! - Start, stop and join the worker threads
//!
//! # Design Decisions
//! - Runtimes are built up front, so contexts accept work before `run`;
//!   that work starts executing once the worker thread drives the runtime
//! - A worker parks on the stop signal, so an idle reactor never exits early
//! - Dropping a runtime drops its tasks, which closes their sockets

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::runtime::{self, EnterGuard, Handle, Runtime};
use tokio::task;

use crate::lifecycle::Shutdown;

/// Error type for pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("execution context pool is already running")]
    AlreadyRunning,

    #[error("execution context pool has been stopped")]
    Stopped,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to build worker runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Handle to one worker's reactor.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    index: usize,
    handle: Handle,
}

impl ExecutionContext {
    /// Position of this context in its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a task that will only ever run on this context's worker thread.
    pub fn spawn<F>(&self, future: F) -> task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Enter the runtime context, e.g. to register an I/O resource with it.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.handle.enter()
    }
}

/// Fixed-size set of worker threads, each driving its own reactor.
#[derive(Debug)]
pub struct ExecutionContextPool {
    contexts: Vec<ExecutionContext>,
    /// Runtimes waiting for `run` to move them onto their threads.
    parked: Mutex<Vec<Runtime>>,
    next_index: AtomicUsize,
    running: AtomicBool,
    stopped: Shutdown,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ExecutionContextPool {
    /// Build `size` contexts. A size of zero is raised to one.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let size = if size == 0 {
            tracing::warn!("Execution context pool size 0 requested, using 1");
            1
        } else {
            size
        };

        let mut contexts = Vec::with_capacity(size);
        let mut parked = Vec::with_capacity(size);
        for index in 0..size {
            let runtime = runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(PoolError::Runtime)?;
            contexts.push(ExecutionContext {
                index,
                handle: runtime.handle().clone(),
            });
            parked.push(runtime);
        }

        tracing::debug!(size, "Execution context pool created");

        Ok(Self {
            contexts,
            parked: Mutex::new(parked),
            next_index: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            stopped: Shutdown::new(),
            workers: Mutex::new(Vec::with_capacity(size)),
        })
    }

    /// One context per available hardware thread.
    pub fn with_default_size() -> Result<Self, PoolError> {
        Self::new(default_size())
    }

    /// Start one named worker thread per context. Returns immediately.
    pub fn run(&self) -> Result<(), PoolError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PoolError::AlreadyRunning);
        }
        if self.stopped.is_triggered() {
            return Err(PoolError::Stopped);
        }

        let runtimes = std::mem::take(&mut *lock(&self.parked));
        let mut workers = lock(&self.workers);
        for (index, runtime) in runtimes.into_iter().enumerate() {
            let mut stop = self.stopped.subscribe();
            let spawned = thread::Builder::new()
                .name(format!("camille-worker-{index}"))
                .spawn(move || {
                    tracing::debug!(worker = index, "Worker started");
                    runtime.block_on(stop.recv());
                    drop(runtime);
                    tracing::debug!(worker = index, "Worker stopped");
                });

            match spawned {
                Ok(worker) => workers.push(worker),
                Err(error) => {
                    drop(workers);
                    self.stop();
                    return Err(PoolError::Spawn(error));
                }
            }
        }

        tracing::info!(workers = self.contexts.len(), "Execution context pool running");
        Ok(())
    }

    /// Block until every worker thread has exited.
    pub fn wait(&self) {
        let workers = std::mem::take(&mut *lock(&self.workers));
        join_all(workers);
    }

    /// Signal every worker to stop. Idempotent.
    pub fn stop(&self) {
        if self.stopped.trigger() {
            tracing::info!("Execution context pool stopping");
        }
    }

    /// Next context in round-robin order.
    pub fn next_context(&self) -> &ExecutionContext {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed) % self.contexts.len();
        &self.contexts[index]
    }

    pub fn context(&self, index: usize) -> Option<&ExecutionContext> {
        self.contexts.get(index)
    }

    pub fn size(&self) -> usize {
        self.contexts.len()
    }

    /// Started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.stopped.is_triggered()
    }
}

impl Drop for ExecutionContextPool {
    fn drop(&mut self) {
        self.stop();

        // Never-started runtimes may be dropped from inside another runtime.
        for runtime in std::mem::take(&mut *lock(&self.parked)) {
            runtime.shutdown_background();
        }

        let current = thread::current().id();
        let workers = std::mem::take(&mut *lock(&self.workers));
        join_all(workers.into_iter().filter(|w| w.thread().id() != current));
    }
}

/// Number of hardware threads, falling back to one.
pub fn default_size() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn join_all(workers: impl IntoIterator<Item = JoinHandle<()>>) {
    for worker in workers {
        let name = worker.thread().name().unwrap_or("worker").to_string();
        if worker.join().is_err() {
            tracing::error!(worker = %name, "Worker thread panicked");
        }
    }
}
