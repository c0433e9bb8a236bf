//! Per-connection request handling.
//!
//! # Responsibilities
//! - Own one accepted connection from accept to close
//! - Drive the state machine: Accepted → ConfigReceived → {Decoding |
//!   Rejected} → Closed
//! - Contain every failure at the connection boundary
//!
//! # Design Decisions
//! - Configuration errors go back to the client verbatim; anything else is
//!   logged server-side only, since the stream may already be unusable
//! - Decode work runs under `spawn_blocking`; a panic there surfaces as a
//!   join error and is contained like any other runtime fault

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{parse_request, ConfigError, RequestConfig};
use crate::decode::{run_request, Decoder};
use crate::lm::LanguageModel;

/// Completion marker written to the client after a successful decode.
const DONE_MARKER: &str = "Done";

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one accepted connection, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle states of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Established, nothing read yet.
    Accepted,
    /// The configuration stream parsed and validated.
    ConfigReceived,
    /// The decode pipeline is running.
    Decoding,
    /// Validation failed; the error was reported to the client.
    Rejected,
    /// Decoding finished and the completion marker was written.
    Completed,
    /// Resources released.
    Closed,
}

/// Owns the lifecycle of one accepted connection.
pub struct ConnectionHandler {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    model: Arc<dyn LanguageModel>,
    decoder: Arc<dyn Decoder>,
    state: ConnectionState,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        model: Arc<dyn LanguageModel>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            stream,
            peer,
            model,
            decoder,
            state: ConnectionState::Accepted,
        }
    }

    /// Run the connection to the Closed state. Never propagates an error:
    /// whatever happens here stays here.
    pub async fn run(mut self) {
        tracing::info!(connection_id = %self.id, peer_addr = %self.peer, "Got connection");

        match self.read_config().await {
            Ok(config) => {
                self.transition(ConnectionState::ConfigReceived);
                self.decode(config).await;
            }
            Err(error) => {
                self.transition(ConnectionState::Rejected);
                tracing::warn!(connection_id = %self.id, error = %error, "Request rejected");
                self.reply(&error.to_string()).await;
            }
        }

        if let Err(error) = self.stream.shutdown().await {
            tracing::debug!(connection_id = %self.id, error = %error, "Shutdown failed");
        }
        self.transition(ConnectionState::Closed);
    }

    /// Read the configuration stream to EOF and parse it.
    async fn read_config(&mut self) -> Result<RequestConfig, ConfigError> {
        let mut raw = String::new();
        self.stream.read_to_string(&mut raw).await?;
        parse_request(&raw)
    }

    /// Run the decode pipeline and report the outcome.
    ///
    /// A pipeline error or panic is logged and the connection abandoned
    /// without a reply; it never escapes this method.
    async fn decode(&mut self, config: RequestConfig) {
        self.transition(ConnectionState::Decoding);
        let model = Arc::clone(&self.model);
        let decoder = Arc::clone(&self.decoder);
        let outcome =
            tokio::task::spawn_blocking(move || run_request(model.as_ref(), decoder.as_ref(), &config))
                .await;

        match outcome {
            Ok(Ok(stats)) => {
                self.transition(ConnectionState::Completed);
                tracing::info!(
                    connection_id = %self.id,
                    sentences = stats.sentences,
                    "Request completed"
                );
                self.reply(DONE_MARKER).await;
            }
            Ok(Err(error)) => {
                tracing::error!(connection_id = %self.id, error = %error, "Decode pipeline failed");
            }
            Err(join_error) => {
                tracing::error!(
                    connection_id = %self.id,
                    error = %join_error,
                    "Decode task aborted"
                );
            }
        }
    }

    /// Write one line back to the client. A write failure only gets a log
    /// line; the connection is closing either way.
    async fn reply(&mut self, message: &str) {
        let line = format!("{message}\n");
        if let Err(error) = self.stream.write_all(line.as_bytes()).await {
            tracing::warn!(connection_id = %self.id, error = %error, "Failed to write reply");
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::debug!(
            connection_id = %self.id,
            from = ?self.state,
            to = ?next,
            "Connection state"
        );
        self.state = next;
    }
}
