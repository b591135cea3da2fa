//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions, acceptor and pool produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Connection id and peer address flow through every session event
//! - Metrics are cheap (atomic increments), and free without a recorder

pub mod logging;
pub mod metrics;
