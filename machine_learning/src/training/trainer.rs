use comms::{Snapshot, TensorSet};

use crate::Result;

/// The local training collaborator driven by a worker, one epoch at a time.
pub trait Trainer: Send {
    /// Runs one full pass over the local shard, stepping the optimizer after every batch.
    ///
    /// # Arguments
    /// * `epoch` - The global index of the epoch, used for logging.
    ///
    /// # Returns
    /// The gradient computed on the last batch of the epoch.
    fn train_epoch(&mut self, epoch: usize) -> Result<TensorSet>;

    /// Takes one optimizer step with an externally provided gradient.
    fn apply_gradients(&mut self, grads: &TensorSet) -> Result<()>;

    /// Computes the accuracy of the model on the held-out set.
    fn evaluate(&mut self) -> Result<f32>;

    /// Captures the parameters and the optimizer state.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Loads the parameters and optimizer state captured by `snapshot`.
    fn restore(&mut self, snapshot: &Snapshot) -> Result<()>;
}
