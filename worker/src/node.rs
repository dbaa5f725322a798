use std::{borrow::Cow, io, sync::Arc};

use comms::{
    msg::{Command, Msg},
    specs::worker::WorkerResponse,
};
use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::{Result, Worker, clock::Deadline, config::WorkerConfig};

/// Serves invocations on every connection accepted by `listener`.
///
/// Every invocation reads a fresh configuration through `config`, a failure to do so is
/// answered with an `Errored` response instead of stopping the node.
///
/// # Arguments
/// * `listener` - A bound listener.
/// * `config` - Produces the configuration of each invocation.
///
/// # Returns
/// An io error if accepting connections failed.
pub async fn serve<F>(listener: TcpListener, config: F) -> io::Result<()>
where
    F: Fn() -> Result<WorkerConfig> + Send + Sync + 'static,
{
    let config = Arc::new(config);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("launcher connected from {addr}");

        let config = Arc::clone(&config);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, config.as_ref()).await {
                warn!("connection with {addr} failed: {e}");
            }
        });
    }
}

/// Answers every invocation sent through `stream` until the peer hangs up.
async fn handle_connection<F>(stream: TcpStream, config: &F) -> io::Result<()>
where
    F: Fn() -> Result<WorkerConfig>,
{
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);
    let mut rx_buf = Vec::new();

    loop {
        let spec = match rx.recv_into(&mut rx_buf).await {
            Ok(Msg::Control(Command::Invoke(spec))) => spec,
            Ok(msg) => {
                warn!("expected an invocation, got {msg:?}");
                tx.send(&Msg::Err(Cow::Borrowed("expected an invocation")))
                    .await?;
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("received a malformed frame: {e}");
                tx.send(&Msg::Err(Cow::Owned(e.to_string()))).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = match config() {
            Ok(config) => {
                let clock = Deadline::after(config.total_budget());
                Worker::new(config).invoke(spec, &clock).await
            }
            Err(e) => {
                warn!(slot = spec.slot; "rejecting invocation: {e}");
                WorkerResponse::errored(e.to_string(), 0.0)
            }
        };

        tx.send(&Msg::Control(Command::Respond(response))).await?;
    }
}
