//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every ShutdownSignal resolves → accept loop / workers exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_shutdown() resolves → server stop
//! ```
//!
//! # Design Decisions
//! - Shutdown is a level, not an edge: late subscribers still see it
//! - Stopping a worker drops its in-flight sessions

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
