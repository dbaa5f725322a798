mod local;
mod tcp;

use comms::specs::worker::{InvocationSpec, WorkerResponse};

pub use local::LocalInvoker;
pub use tcp::TcpInvoker;

use crate::Result;

/// Delivers one invocation payload to a worker and waits for its response.
#[trait_variant::make(Invoker: Send)]
pub trait InvokerTemplate {
    /// Runs one generation of a worker slot.
    ///
    /// # Arguments
    /// * `spec` - The invocation payload of this generation.
    ///
    /// # Returns
    /// The worker's response, or an error if it could not be obtained.
    async fn invoke(&self, spec: InvocationSpec) -> Result<WorkerResponse>;
}
