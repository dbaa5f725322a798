use std::ops::Range;

use comms::specs::machine_learning::{DatasetSpec, Hyperparams, ModelSpec};

use super::{ModelTrainer, Trainer};
use crate::{
    Result,
    arch::{Sequential, loss::SoftmaxCrossEntropy},
    dataset::Dataset,
    optimization::GradientDescentWithMomentum,
};

/// Default amount of optimization steps between loss log lines.
pub const DEFAULT_LOG_EVERY: usize = 10;

/// Builds `Trainer`s given a specification.
pub struct TrainerBuilder {
    log_every: usize,
}

impl Default for TrainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self {
            log_every: DEFAULT_LOG_EVERY,
        }
    }

    /// Sets the amount of optimization steps between loss log lines, zero disables them.
    pub fn log_every(mut self, steps: usize) -> Self {
        self.log_every = steps;
        self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `dataset` - The dataset every worker shares.
    /// * `model` - The shape and initial seed of the model.
    /// * `hyperparams` - The optimization hyperparameters.
    /// * `shard` - The range of training samples this trainer owns.
    ///
    /// # Returns
    /// The trainer or an error if the shard does not fit the dataset.
    pub fn build(
        &self,
        dataset: &DatasetSpec,
        model: &ModelSpec,
        hyperparams: &Hyperparams,
        shard: Range<usize>,
    ) -> Result<Box<dyn Trainer>> {
        let (train, test) = Dataset::synthetic(dataset)?;
        let train = train.slice(shard)?;

        let hidden: Vec<_> = model.hidden.iter().map(|w| w.get()).collect();
        let net = Sequential::mlp(dataset.features.get(), &hidden, dataset.classes.get());
        let params = net.init_params(model.seed)?;

        let optimizer = GradientDescentWithMomentum::new(
            params.len(),
            hyperparams.learning_rate,
            hyperparams.momentum,
        );

        let trainer = ModelTrainer::new(
            net,
            params,
            optimizer,
            SoftmaxCrossEntropy::new(),
            train,
            test,
            hyperparams.batch_size,
            self.log_every,
        )?;

        Ok(Box::new(trainer))
    }
}
