//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop on one execution context)
//!     → pool.rs (next context, round-robin)
//!     → session.rs (read → parse → handle → write, per connection)
//!     → connection.rs (id, active count)
//!
//! Session States:
//!     AwaitingRequest → ParsingBody → RequestReady → Responding
//!         → AwaitingRequest (keep-alive), or the session task ends
//! ```
//!
//! # Design Decisions
//! - One single-threaded reactor per worker; sessions never migrate
//! - Each session is a task that owns its socket
//! - Every connection is counted until its session ends

pub mod connection;
pub mod error;
pub mod listener;
pub mod pool;
pub mod session;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use error::{ServerError, SessionError};
pub use listener::Acceptor;
pub use pool::{ExecutionContext, ExecutionContextPool, PoolError};
pub use session::{Session, SessionSettings, SessionState};
