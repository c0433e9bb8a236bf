//! Translation decoding service entry point.
//!
//! Startup order is deliberate: arguments, logging, model, listener. The
//! model loads before the port binds, so a bad `lm.type` or unreadable
//! model file aborts with no partial startup state.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memt_server::{lm, BeamDecoder, Server, StartupError};

#[derive(Parser)]
#[command(name = "memt-server", about = "Multi-engine translation decoding service")]
struct Args {
    /// Language model type: sri or salm.
    #[arg(long = "lm.type", default_value = "salm")]
    lm_type: String,

    /// File for language model.
    #[arg(long = "lm.file")]
    lm_file: PathBuf,

    /// Order of language model.
    #[arg(long = "lm.order", value_parser = clap::value_parser!(u32).range(1..))]
    lm_order: u32,

    /// Port to listen on.
    #[arg(long)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memt_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("memt-server v0.1.0 starting");

    let model = lm::load(&args.lm_type, &args.lm_file, args.lm_order as usize)?;
    let server = Server::bind(args.port, model, Arc::new(BeamDecoder)).await?;
    if let Ok(addr) = server.local_addr() {
        tracing::info!(address = %addr, "Listener bound");
    }
    server.serve().await;
    Ok(())
}
