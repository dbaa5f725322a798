use std::{num::NonZeroUsize, ops::Range, time::Duration};

use comms::specs::{
    machine_learning::{DatasetSpec, Hyperparams, ModelSpec},
    worker::InvocationSpec,
};

use crate::{LauncherErr, Result};

/// Everything a run needs to build the first payload of every slot.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub workers: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub dataset: DatasetSpec,
    pub model: ModelSpec,
    pub hyperparams: Hyperparams,
    /// Base URL the workers reach the rendezvous service at.
    pub rendezvous_url: String,
    /// Wall clock budget of every invocation, used to turn `left_time` into elapsed time.
    pub invocation_budget: Duration,
}

impl LaunchConfig {
    /// Checks the configuration before anything is invoked.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.size < self.workers.get() {
            return Err(LauncherErr::InvalidConfig(format!(
                "{} samples cannot be split across {} workers",
                self.dataset.size, self.workers
            )));
        }

        if !(self.hyperparams.learning_rate.is_finite() && self.hyperparams.learning_rate > 0.0) {
            return Err(LauncherErr::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.hyperparams.learning_rate
            )));
        }

        if !(0.0..1.0).contains(&self.hyperparams.momentum) {
            return Err(LauncherErr::InvalidConfig(format!(
                "momentum must be in [0, 1), got {}",
                self.hyperparams.momentum
            )));
        }

        Ok(())
    }

    /// The contiguous sample range owned by `slot`, `[slot * N / W, (slot + 1) * N / W)`.
    pub fn shard(&self, slot: usize) -> Range<usize> {
        let n = self.dataset.size;
        let w = self.workers.get();
        slot * n / w..(slot + 1) * n / w
    }

    /// The first generation payload of `slot`.
    pub fn initial_spec(&self, slot: usize) -> InvocationSpec {
        InvocationSpec {
            slot,
            workers: self.workers,
            shard: self.shard(slot),
            epochs: self.epochs,
            resume_epoch: 0,
            hyperparams: self.hyperparams,
            dataset: self.dataset.clone(),
            model: self.model.clone(),
            rendezvous_url: self.rendezvous_url.clone(),
            snapshot: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn config(workers: usize, size: usize) -> LaunchConfig {
        LaunchConfig {
            workers: nz(workers),
            epochs: nz(1),
            dataset: DatasetSpec {
                size,
                test_size: nz(10),
                features: nz(2),
                classes: nz(2),
                seed: 0,
            },
            model: ModelSpec {
                hidden: vec![],
                seed: 0,
            },
            hyperparams: Hyperparams {
                learning_rate: 0.1,
                batch_size: nz(10),
                momentum: 0.9,
            },
            rendezvous_url: "http://127.0.0.1:8080".into(),
            invocation_budget: Duration::from_secs(60),
        }
    }

    #[test]
    fn shards_split_the_dataset_evenly() {
        let config = config(4, 60_000);
        let shards: Vec<_> = (0..4).map(|slot| config.shard(slot)).collect();

        assert_eq!(
            shards,
            vec![0..15_000, 15_000..30_000, 30_000..45_000, 45_000..60_000]
        );
    }

    #[test]
    fn uneven_shards_cover_every_sample_once() {
        let config = config(3, 10);
        let shards: Vec<_> = (0..3).map(|slot| config.shard(slot)).collect();

        assert_eq!(shards, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn initial_spec_starts_from_scratch() {
        let spec = config(2, 10).initial_spec(1);

        assert_eq!(spec.slot, 1);
        assert_eq!(spec.shard, 5..10);
        assert_eq!(spec.resume_epoch, 0);
        assert!(spec.snapshot.is_none());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(config(4, 3).validate().is_err());

        let mut bad_momentum = config(1, 3);
        bad_momentum.hyperparams.momentum = 1.5;
        assert!(bad_momentum.validate().is_err());

        assert!(config(4, 4).validate().is_ok());
    }
}
