use std::{io, num::NonZeroUsize, sync::Arc, time::Duration};

use clap::Parser;
use log::info;
use rendezvous::{RoundBarrier, service};
use tokio::{net::TcpListener, signal};

#[derive(Parser)]
#[command(
    name = "rendezvous",
    about = "Gradient averaging barrier for a fixed pool of workers"
)]
struct Args {
    /// Contributions every round waits for.
    #[arg(long, env = "RENDEZVOUS_WORKERS")]
    workers: NonZeroUsize,

    #[arg(long, default_value = "0.0.0.0", env = "RENDEZVOUS_HOST")]
    host: String,

    #[arg(long, default_value_t = 8080, env = "RENDEZVOUS_PORT")]
    port: u16,

    /// Abort a round that does not fill within this many seconds, waits forever when unset.
    #[arg(long, env = "RENDEZVOUS_ROUND_TIMEOUT_SECS")]
    round_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut barrier = RoundBarrier::new(args.workers);
    if let Some(secs) = args.round_timeout_secs {
        barrier = barrier.with_round_timeout(Duration::from_secs(secs));
    }

    let barrier = Arc::new(barrier);
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;

    // Graceful shutdown waits on every request, parked contributions included.
    let closing = Arc::clone(&barrier);
    let shutdown = async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
        closing.abort();
    };

    service::serve(listener, barrier, shutdown).await
}
