use std::{future::Future, io, sync::Arc};

use log::info;
use tokio::net::TcpListener;

use super::router;
use crate::RoundBarrier;

/// Serves the rendezvous surface on `listener` until `shutdown` resolves.
///
/// # Arguments
/// * `listener` - A bound listener.
/// * `barrier` - The barrier shared by every request, built once for the process.
/// * `shutdown` - A future that stops the server gracefully once it completes.
///
/// # Returns
/// An io error if serving failed.
pub async fn serve<F>(
    listener: TcpListener,
    barrier: Arc<RoundBarrier>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(workers = barrier.workers().get(); "rendezvous listening on {addr}");

    axum::serve(listener, router(barrier))
        .with_graceful_shutdown(shutdown)
        .await
}
