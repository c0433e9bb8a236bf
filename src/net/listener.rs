//! TCP listener and the serial accept loop.
//!
//! # Responsibilities
//! - Bind the listening port once at startup (failure is fatal)
//! - Accept connections indefinitely, one at a time
//! - Contain accept faults: log and keep accepting
//!
//! # Design Decisions
//! - Strictly sequential: a connection is handled to completion before
//!   the next accept, so no two requests are ever in flight together
//! - The model handle is read-only and shared by reference counting;
//!   nothing else crosses connection boundaries

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::decode::Decoder;
use crate::lm::LanguageModel;
use crate::net::connection::ConnectionHandler;

/// Fatal listener errors. Binding happens once, before serving begins.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// The decoding service: one bound listener plus the process-wide shared
/// model and decoder.
pub struct Server {
    listener: TcpListener,
    model: Arc<dyn LanguageModel>,
    decoder: Arc<dyn Decoder>,
}

impl Server {
    /// Bind the listening port. The model must already be loaded; a bind
    /// failure aborts startup.
    pub async fn bind(
        port: u16,
        model: Arc<dyn LanguageModel>,
        decoder: Arc<dyn Decoder>,
    ) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| ListenerError::Bind { port, source })?;
        Ok(Self {
            listener,
            model,
            decoder,
        })
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and handle connections forever.
    ///
    /// Each connection runs to completion before the next accept. A failed
    /// accept is logged and the loop continues; nothing that happens on a
    /// connection can end the loop.
    pub async fn serve(self) {
        tracing::info!("Accepting connections.");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let handler = ConnectionHandler::new(
                        stream,
                        peer,
                        Arc::clone(&self.model),
                        Arc::clone(&self.decoder),
                    );
                    handler.run().await;
                }
                Err(error) => {
                    tracing::error!(error = %error, "Failed to accept connection");
                }
            }
        }
    }
}
