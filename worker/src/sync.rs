use comms::{
    TensorSet,
    specs::rendezvous::{SyncRequest, SyncResponse},
};
use log::debug;

use crate::{Result, WorkerErr};

/// Exchanges a worker's gradient set for the cross-worker mean of the round.
#[trait_variant::make(GradientSync: Send)]
pub trait GradientSyncTemplate {
    /// Contributes `grads` to the current round and waits for its mean.
    ///
    /// # Arguments
    /// * `grads` - The gradient of the worker's last optimization step.
    ///
    /// # Returns
    /// The mean of every worker's gradient set for this round.
    async fn sync(&self, grads: &TensorSet) -> Result<TensorSet>;
}

/// Talks to the rendezvous service over HTTP.
///
/// The request carries no timeout, it may block for as long as the slowest sibling takes to
/// finish its epoch.
#[derive(Clone)]
pub struct HttpSync {
    client: reqwest::Client,
    url: String,
}

impl HttpSync {
    /// Creates a new `HttpSync`.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the rendezvous service, e.g. `http://10.0.0.1:8080`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            url: format!("{}/sync", base_url.trim_end_matches('/')),
        })
    }
}

impl GradientSync for HttpSync {
    async fn sync(&self, grads: &TensorSet) -> Result<TensorSet> {
        let body = SyncRequest {
            grads: grads.to_hex(),
        };
        debug!(bytes = body.grads.len(); "posting gradients");

        let res = self.client.post(&self.url).json(&body).send().await?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(WorkerErr::SyncStatus {
                status: status.as_u16(),
                body,
            });
        }

        let SyncResponse { new_grads } = res.json().await?;
        debug!(bytes = new_grads.len(); "received mean gradients");
        Ok(TensorSet::from_hex(&new_grads)?)
    }
}
