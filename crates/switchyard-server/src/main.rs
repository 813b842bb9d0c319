//! switchyard-server
//!
//! Serves the demo application over HTTP/1.

mod app;
mod transport;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use switchyard::body::DEFAULT_MAX_BODY_BYTES;
use switchyard::DecoderConfig;

/// Minimal HTTP server built on the switchyard dispatch core.
#[derive(Parser)]
#[command(name = "switchyard-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "SWITCHYARD_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Directory served under `/static/`.
    #[arg(short, long)]
    static_dir: Option<PathBuf>,

    /// Largest request body accepted, in bytes.
    #[arg(long, env = "SWITCHYARD_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let decoder = DecoderConfig {
        max_body_bytes: cli.max_body_bytes,
        ..DecoderConfig::default()
    };
    let router = app::build_registry(cli.static_dir, decoder).freeze()?;
    info!(entries = router.entries().len(), "router frozen");

    let listener = TcpListener::bind(cli.addr).await?;
    info!("listening on http://{}", cli.addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let router = router.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| transport::handle_request(req, router.clone()));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %err, "connection closed");
            }
        });
    }
}
