use std::time::Duration;

use comms::specs::worker::{InvocationSpec, WorkerResponse};
use worker::{Worker, clock::Deadline};

use super::Invoker;
use crate::Result;

/// Runs every invocation inside the launcher's own process, each one against a fresh
/// countdown of the invocation budget.
#[derive(Clone)]
pub struct LocalInvoker {
    worker: Worker,
    budget: Duration,
}

impl LocalInvoker {
    /// Creates a new `LocalInvoker`.
    ///
    /// # Arguments
    /// * `worker` - The worker that runs every invocation.
    /// * `budget` - The wall clock budget given to each invocation.
    pub fn new(worker: Worker, budget: Duration) -> Self {
        Self { worker, budget }
    }
}

impl Invoker for LocalInvoker {
    async fn invoke(&self, spec: InvocationSpec) -> Result<WorkerResponse> {
        let clock = Deadline::after(self.budget);
        Ok(self.worker.invoke(spec, &clock).await)
    }
}
