use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification of the synthetic classification dataset every worker trains on.
///
/// Every worker rebuilds the same dataset from this spec and trains on its own shard of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Amount of training samples, shards are taken from `0..size`.
    pub size: usize,
    /// Amount of held-out samples used to report accuracy.
    pub test_size: NonZeroUsize,
    pub features: NonZeroUsize,
    pub classes: NonZeroUsize,
    pub seed: u64,
}

/// The specification of the model trained by the workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Widths of the hidden layers, input and output widths come from the dataset.
    pub hidden: Vec<NonZeroUsize>,
    /// Seed for the initial weights, shared by every worker so they start in sync.
    pub seed: u64,
}

/// Optimization hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    pub learning_rate: f32,
    pub batch_size: NonZeroUsize,
    pub momentum: f32,
}
