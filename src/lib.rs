//! Multi-engine translation decoding service library.
//!
//! One immutable language model is loaded at startup and shared read-only
//! by an unbounded sequence of client connections. Each connection sends a
//! line-oriented configuration, gets validated, drives the decode pipeline
//! over its matched-input file, and receives `Done` or the validation
//! error back on the same stream.

pub mod config;
pub mod decode;
pub mod input;
pub mod lm;
pub mod net;
pub mod output;

use thiserror::Error;

pub use config::{parse_request, ConfigError, RequestConfig};
pub use decode::{BeamDecoder, Decoder};
pub use lm::LanguageModel;
pub use net::Server;

/// Fatal startup failures. Any of these aborts the process before the
/// service accepts its first connection.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Model(#[from] lm::LmError),

    #[error(transparent)]
    Listener(#[from] net::ListenerError),
}
