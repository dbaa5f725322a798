use std::num::NonZeroUsize;

use comms::{Snapshot, TensorSet};
use log::debug;

use super::Trainer;
use crate::{
    MlErr, Result,
    arch::{Sequential, loss::LossFn},
    dataset::Dataset,
    optimization::{GradientDescentWithMomentum, Optimizer},
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself and its flat parameters.
pub struct ModelTrainer<L: LossFn> {
    model: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    optimizer: GradientDescentWithMomentum,
    loss_fn: L,

    train: Dataset,
    test: Dataset,
    batch_size: NonZeroUsize,
    log_every: usize,
    step: usize,
}

impl<L: LossFn> ModelTrainer<L> {
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `params` - The initial parameters of `model`.
    /// * `optimizer` - The optimizer stepping `params`.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `train` - The local shard the model will be trained with.
    /// * `test` - The held-out set used by `evaluate`.
    /// * `batch_size` - The amount of rows per optimization step.
    /// * `log_every` - Log the loss every this many steps, zero disables it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Sequential,
        params: Vec<f32>,
        optimizer: GradientDescentWithMomentum,
        loss_fn: L,
        train: Dataset,
        test: Dataset,
        batch_size: NonZeroUsize,
        log_every: usize,
    ) -> Result<Self> {
        if train.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self {
            grad: vec![0.0; params.len()],
            model,
            params,
            optimizer,
            loss_fn,
            train,
            test,
            batch_size,
            log_every,
            step: 0,
        })
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }
}

impl<L: LossFn + Send> Trainer for ModelTrainer<L> {
    fn train_epoch(&mut self, epoch: usize) -> Result<TensorSet> {
        let Self {
            model,
            params,
            grad,
            optimizer,
            loss_fn,
            train,
            batch_size,
            log_every,
            step,
            ..
        } = self;

        for (x, y) in train.batches(batch_size.get()) {
            let loss = model.backprop(params, grad, loss_fn, x, y)?;
            optimizer.update_params(params, grad)?;
            *step += 1;

            if *log_every != 0 && *step % *log_every == 0 {
                debug!(epoch = epoch, step = *step, loss = loss; "training step");
            }
        }

        model.to_tensor_set(grad)
    }

    fn apply_gradients(&mut self, grads: &TensorSet) -> Result<()> {
        let flat = self.model.from_tensor_set(grads)?;
        self.optimizer.update_params(&mut self.params, &flat)
    }

    fn evaluate(&mut self) -> Result<f32> {
        self.model
            .accuracy(&self.params, self.test.x(), self.test.y())
    }

    fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            params: self.model.to_tensor_set(&self.params)?,
            velocity: self.model.to_tensor_set(self.optimizer.velocity())?,
        })
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let invalid = |e: MlErr| MlErr::InvalidSnapshot(e.to_string());

        let params = self.model.from_tensor_set(&snapshot.params).map_err(invalid)?;
        let velocity = self
            .model
            .from_tensor_set(&snapshot.velocity)
            .map_err(invalid)?;

        self.optimizer.set_velocity(velocity).map_err(invalid)?;
        self.params = params;
        Ok(())
    }
}
