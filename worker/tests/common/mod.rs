#![allow(dead_code)]

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use comms::{
    TensorSet,
    specs::{
        machine_learning::{DatasetSpec, Hyperparams, ModelSpec},
        worker::InvocationSpec,
    },
};
use worker::{
    Result, WorkerErr,
    clock::Clock,
    config::WorkerConfig,
    sync::GradientSync,
};

pub const BUDGET: Duration = Duration::from_secs(900);
pub const LIMIT: Duration = Duration::from_secs(800);

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub fn config() -> WorkerConfig {
    WorkerConfig::new(BUDGET, LIMIT)
}

pub fn spec(epochs: usize) -> InvocationSpec {
    InvocationSpec {
        slot: 0,
        workers: nz(1),
        shard: 0..48,
        epochs: nz(epochs),
        resume_epoch: 0,
        hyperparams: Hyperparams {
            learning_rate: 0.1,
            batch_size: nz(8),
            momentum: 0.9,
        },
        dataset: DatasetSpec {
            size: 48,
            test_size: nz(24),
            features: nz(4),
            classes: nz(3),
            seed: 17,
        },
        model: ModelSpec {
            hidden: vec![nz(6)],
            seed: 5,
        },
        rendezvous_url: "http://127.0.0.1:1".into(),
        snapshot: None,
    }
}

/// A clock that always reports the same remaining time and counts how often it was asked.
pub struct ScriptedClock {
    remaining: Duration,
    calls: AtomicUsize,
}

impl ScriptedClock {
    /// Never triggers a checkpoint.
    pub fn plenty() -> Self {
        Self::new(BUDGET)
    }

    /// Always triggers a checkpoint.
    pub fn exhausted() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn new(remaining: Duration) -> Self {
        Self {
            remaining,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Clock for ScriptedClock {
    fn remaining(&self) -> Duration {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.remaining
    }
}

/// Syncs a single worker with itself, the mean of one gradient is the gradient.
pub struct LoopbackSync;

impl GradientSync for LoopbackSync {
    async fn sync(&self, grads: &TensorSet) -> Result<TensorSet> {
        Ok(grads.clone())
    }
}

/// A rendezvous service that rejects every contribution.
pub struct FailingSync;

impl GradientSync for FailingSync {
    async fn sync(&self, _grads: &TensorSet) -> Result<TensorSet> {
        Err(WorkerErr::SyncStatus {
            status: 500,
            body: "rendezvous unavailable".into(),
        })
    }
}
