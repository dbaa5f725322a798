use std::{num::NonZeroUsize, ops::Range};

use serde::{Deserialize, Serialize};

use super::machine_learning::{DatasetSpec, Hyperparams, ModelSpec};

/// The payload of a single worker invocation.
///
/// Built once per launcher attempt and consumed by exactly one invocation. A checkpoint
/// produces the next one through `next_generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// The worker slot this invocation fills.
    pub slot: usize,
    /// The amount of workers contributing to every round.
    pub workers: NonZeroUsize,
    /// The range of training samples owned by this slot.
    pub shard: Range<usize>,
    pub epochs: NonZeroUsize,
    /// The first epoch this invocation trains, zero indexed.
    #[serde(default)]
    pub resume_epoch: usize,
    pub hyperparams: Hyperparams,
    pub dataset: DatasetSpec,
    pub model: ModelSpec,
    /// Base URL of the rendezvous service, for example `http://10.0.0.1:8080`.
    pub rendezvous_url: String,
    /// The hex encoded `Snapshot` to resume from, present only on resumption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl InvocationSpec {
    /// Builds the payload of the next generation of this slot.
    ///
    /// # Arguments
    /// * `resume_epoch` - The epoch the next generation starts from.
    /// * `snapshot` - The hex encoded snapshot returned by the checkpointing invocation.
    ///
    /// # Returns
    /// A payload inheriting the shard and hyperparameters of `self`.
    pub fn next_generation(&self, resume_epoch: usize, snapshot: String) -> Self {
        Self {
            resume_epoch,
            snapshot: Some(snapshot),
            ..self.clone()
        }
    }
}

/// How a worker invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// Every configured epoch was trained.
    Completed { test_accuracy: f32 },
    /// The worker checkpointed and must be invoked again from `resume_epoch`.
    Restarted {
        resume_epoch: usize,
        snapshot: String,
    },
    Errored { message: String },
}

/// The response of a worker invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    #[serde(flatten)]
    pub outcome: InvocationOutcome,
    /// Remaining time of the invocation budget at exit, in seconds.
    pub left_time: f64,
}

impl WorkerResponse {
    pub fn errored(message: impl Into<String>, left_time: f64) -> Self {
        Self {
            outcome: InvocationOutcome::Errored {
                message: message.into(),
            },
            left_time,
        }
    }
}
