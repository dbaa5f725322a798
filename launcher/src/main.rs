use std::{
    io,
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use comms::specs::machine_learning::{DatasetSpec, Hyperparams, ModelSpec};
use launcher::{
    Launcher, LauncherErr, Result,
    config::LaunchConfig,
    host::HostedRendezvous,
    invoker::{Invoker, LocalInvoker, TcpInvoker},
};
use log::{error, info};
use rendezvous::RoundBarrier;
use tokio::signal;
use worker::{Worker, config::WorkerConfig};

#[derive(Parser)]
#[command(
    name = "launcher",
    about = "Runs a synchronous data parallel training across elastic worker invocations"
)]
struct Args {
    /// Worker slots, each one owns a contiguous shard of the dataset.
    #[arg(long, default_value = "4", env = "LAUNCHER_WORKERS")]
    workers: NonZeroUsize,

    /// Training samples split across the slots.
    #[arg(long, default_value_t = 60_000, env = "LAUNCHER_DATA_SIZE")]
    data_size: usize,

    #[arg(long, default_value_t = 2_000, env = "LAUNCHER_TEST_SIZE")]
    test_size: usize,

    #[arg(long, default_value = "10", env = "LAUNCHER_EPOCHS")]
    epochs: NonZeroUsize,

    /// Port the in-process rendezvous service listens on, 0 picks any free port.
    #[arg(long, default_value_t = 8080, env = "RENDEZVOUS_PORT")]
    port: u16,

    #[arg(long, default_value = "0.0.0.0", env = "RENDEZVOUS_HOST")]
    host: String,

    /// Host the workers reach the rendezvous service at.
    #[arg(long, default_value = "127.0.0.1", env = "RENDEZVOUS_PUBLIC_HOST")]
    public_host: String,

    /// Abort a round that does not fill within this many seconds, waits forever when unset.
    #[arg(long, env = "RENDEZVOUS_ROUND_TIMEOUT_SECS")]
    round_timeout_secs: Option<u64>,

    /// Where the results line of a successful run is written.
    #[arg(long, default_value = "results/result.txt", env = "LAUNCHER_OUTPUT")]
    output: PathBuf,

    #[arg(long, default_value = "64", env = "LAUNCHER_BATCH_SIZE")]
    batch_size: NonZeroUsize,

    #[arg(long, default_value_t = 0.9, env = "LAUNCHER_MOMENTUM")]
    momentum: f32,

    #[arg(long, default_value_t = 0.05, env = "LAUNCHER_LEARNING_RATE")]
    learning_rate: f32,

    /// Wall clock budget of a single invocation, in milliseconds.
    #[arg(long, default_value_t = 900_000, env = "WORKER_TOTAL_TIME_MS")]
    invocation_budget_ms: u64,

    /// Share of the budget an invocation may spend training, in milliseconds.
    #[arg(long, default_value_t = 800_000, env = "WORKER_TRAIN_LIMIT_MS")]
    train_limit_ms: u64,

    /// Comma separated worker node addresses, invocations run in-process when absent.
    #[arg(long, value_delimiter = ',', env = "LAUNCHER_WORKER_NODES")]
    worker_nodes: Option<Vec<SocketAddr>>,

    #[arg(long, default_value = "16", env = "LAUNCHER_FEATURES")]
    features: NonZeroUsize,

    #[arg(long, default_value = "10", env = "LAUNCHER_CLASSES")]
    classes: NonZeroUsize,

    /// Comma separated hidden layer widths.
    #[arg(long, value_delimiter = ',', default_value = "64", env = "LAUNCHER_HIDDEN")]
    hidden: Vec<NonZeroUsize>,

    #[arg(long, default_value_t = 42, env = "LAUNCHER_DATASET_SEED")]
    dataset_seed: u64,

    #[arg(long, default_value_t = 7, env = "LAUNCHER_MODEL_SEED")]
    model_seed: u64,
}

impl Args {
    fn launch_config(&self, rendezvous_url: String) -> Result<LaunchConfig> {
        let test_size = NonZeroUsize::new(self.test_size)
            .ok_or_else(|| LauncherErr::InvalidConfig("test size must be positive".into()))?;

        Ok(LaunchConfig {
            workers: self.workers,
            epochs: self.epochs,
            dataset: DatasetSpec {
                size: self.data_size,
                test_size,
                features: self.features,
                classes: self.classes,
                seed: self.dataset_seed,
            },
            model: ModelSpec {
                hidden: self.hidden.clone(),
                seed: self.model_seed,
            },
            hyperparams: Hyperparams {
                learning_rate: self.learning_rate,
                batch_size: self.batch_size,
                momentum: self.momentum,
            },
            rendezvous_url,
            invocation_budget: Duration::from_millis(self.invocation_budget_ms),
        })
    }
}

/// Runs the launcher and writes the results line only if every slot completed.
async fn launch<I>(config: LaunchConfig, invoker: I, output: &Path) -> Result<()>
where
    I: Invoker + Sync + 'static,
{
    let launcher = Launcher::new(config, invoker)?;
    let report = tokio::select! {
        report = launcher.run() => report?,
        _ = signal::ctrl_c() => {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "run interrupted").into());
        }
    };

    report.write_to(output)?;
    info!("results written to {}", output.display());
    Ok(())
}

/// Trains through the rendezvous service at `rendezvous_url` with the configured invoker.
async fn train(args: &Args, rendezvous_url: String) -> Result<()> {
    let config = args.launch_config(rendezvous_url)?;

    match &args.worker_nodes {
        Some(addrs) => {
            info!("invoking {} worker nodes", addrs.len());
            let invoker = TcpInvoker::new(addrs.clone())?;
            launch(config, invoker, &args.output).await
        }
        None => {
            info!("invoking workers in-process");
            let worker_config = WorkerConfig::new(
                config.invocation_budget,
                Duration::from_millis(args.train_limit_ms),
            );
            let invoker = LocalInvoker::new(Worker::new(worker_config), config.invocation_budget);
            launch(config, invoker, &args.output).await
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut barrier = RoundBarrier::new(args.workers);
    if let Some(secs) = args.round_timeout_secs {
        barrier = barrier.with_round_timeout(Duration::from_secs(secs));
    }

    let rendezvous =
        HostedRendezvous::start(&args.host, args.port, &args.public_host, barrier).await?;
    let result = train(&args, rendezvous.url().to_string()).await;

    if let Err(e) = rendezvous.shutdown().await {
        error!("rendezvous service failed: {e}");
    }

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
