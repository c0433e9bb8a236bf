//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind once, serial accept loop)
//!     → connection.rs (read config → validate → decode → reply → close)
//!
//! Connection States:
//!     Accepted → ConfigReceived → {Decoding | Rejected} → Closed
//! ```
//!
//! # Design Decisions
//! - One connection at a time: the handler is awaited to completion
//!   before the next accept
//! - Per-connection failures of any kind never reach the accept loop

pub mod connection;
pub mod listener;

pub use connection::{ConnectionHandler, ConnectionState};
pub use listener::{ListenerError, Server};
