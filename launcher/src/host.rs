use std::{io, sync::Arc};

use log::info;
use rendezvous::{RoundBarrier, service};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// A rendezvous service running inside the launcher's process.
pub struct HostedRendezvous {
    url: String,
    barrier: Arc<RoundBarrier>,
    stop: oneshot::Sender<()>,
    server: JoinHandle<io::Result<()>>,
}

impl HostedRendezvous {
    /// Binds the service and starts serving it in the background.
    ///
    /// # Arguments
    /// * `host` - The address to bind.
    /// * `port` - The port to bind, 0 picks any free port.
    /// * `public_host` - The host workers reach the service at.
    /// * `barrier` - The barrier every request shares.
    ///
    /// # Returns
    /// The running service or an io error if binding failed.
    pub async fn start(
        host: &str,
        port: u16,
        public_host: &str,
        barrier: RoundBarrier,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let port = listener.local_addr()?.port();
        let barrier = Arc::new(barrier);

        let (stop, stopped) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = stopped.await;
        };
        let server = tokio::spawn(service::serve(listener, Arc::clone(&barrier), shutdown));

        Ok(Self {
            url: format!("http://{public_host}:{port}"),
            barrier,
            stop,
            server,
        })
    }

    /// The base URL workers sync through.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn barrier(&self) -> Arc<RoundBarrier> {
        Arc::clone(&self.barrier)
    }

    /// Closes the barrier, releasing every contribution still parked in it, then stops the
    /// server and waits for it.
    pub async fn shutdown(self) -> io::Result<()> {
        self.barrier.abort();
        let _ = self.stop.send(());

        self.server.await.map_err(io::Error::other)??;
        info!("rendezvous service stopped");
        Ok(())
    }
}
