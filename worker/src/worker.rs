use std::{any::Any, sync::Arc};

use comms::{
    Snapshot,
    specs::worker::{InvocationOutcome, InvocationSpec, WorkerResponse},
};
use log::{debug, error, info};
use machine_learning::training::Trainer;

use crate::{
    Result, WorkerErr,
    clock::Clock,
    config::WorkerConfig,
    predictor::Predictor,
    sync::{GradientSync, HttpSync},
};

/// How the training routine of one invocation ended.
#[derive(Debug)]
pub enum TrainOutcome {
    /// Every configured epoch ran, carrying the held-out accuracy.
    Completed { test_accuracy: f32 },
    /// The predictor asked to stop, a successor must resume from `resume_epoch`.
    CheckpointRequested {
        resume_epoch: usize,
        snapshot: Snapshot,
    },
    Failed(WorkerErr),
}

/// Builds the local trainer of an invocation from its payload.
pub type TrainerFactory = Arc<dyn Fn(&InvocationSpec) -> Result<Box<dyn Trainer>> + Send + Sync>;

/// Runs worker invocations: train an epoch, sync with the rendezvous service, then continue,
/// checkpoint or complete.
#[derive(Clone)]
pub struct Worker {
    config: WorkerConfig,
    factory: TrainerFactory,
}

impl Worker {
    /// Creates a worker training the payload's model on the payload's dataset shard.
    pub fn new(config: WorkerConfig) -> Self {
        let builder = config.trainer_builder();
        let factory: TrainerFactory = Arc::new(move |spec: &InvocationSpec| {
            let trainer = builder.build(
                &spec.dataset,
                &spec.model,
                &spec.hyperparams,
                spec.shard.clone(),
            )?;

            Ok(trainer)
        });

        Self { config, factory }
    }

    /// Replaces how the local trainer of each invocation is built.
    pub fn with_trainer_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&InvocationSpec) -> Result<Box<dyn Trainer>> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Serves one invocation, syncing through the rendezvous service named in `spec`.
    ///
    /// # Args
    /// * `spec` - The invocation payload.
    /// * `clock` - The remaining time of this invocation.
    ///
    /// # Returns
    /// The response of the invocation, failures are reported as `Errored`.
    pub async fn invoke<C: Clock>(&self, spec: InvocationSpec, clock: &C) -> WorkerResponse {
        match HttpSync::new(&spec.rendezvous_url) {
            Ok(sync) => self.invoke_with(spec, clock, &sync).await,
            Err(e) => respond(spec.slot, TrainOutcome::Failed(e), clock),
        }
    }

    /// Serves one invocation with the given gradient sync.
    pub async fn invoke_with<C, S>(
        &self,
        spec: InvocationSpec,
        clock: &C,
        sync: &S,
    ) -> WorkerResponse
    where
        C: Clock,
        S: GradientSync + Sync,
    {
        let slot = spec.slot;
        let outcome = self.train(spec, clock, sync).await;
        respond(slot, outcome, clock)
    }

    /// Runs the training routine of an invocation.
    pub async fn train<C, S>(&self, spec: InvocationSpec, clock: &C, sync: &S) -> TrainOutcome
    where
        C: Clock,
        S: GradientSync + Sync,
    {
        match self.try_train(spec, clock, sync).await {
            Ok(outcome) => outcome,
            Err(e) => TrainOutcome::Failed(e),
        }
    }

    async fn try_train<C, S>(
        &self,
        spec: InvocationSpec,
        clock: &C,
        sync: &S,
    ) -> Result<TrainOutcome>
    where
        C: Clock,
        S: GradientSync + Sync,
    {
        validate(&spec)?;

        let slot = spec.slot;
        let epochs = spec.epochs.get();
        let resume_epoch = spec.resume_epoch;
        let predictor = Predictor::new(self.config.total_budget(), self.config.train_limit());
        let factory = Arc::clone(&self.factory);

        info!(slot = slot, resume_epoch = resume_epoch, epochs = epochs; "invocation started");

        let mut trainer = blocking(move || -> Result<Box<dyn Trainer>> {
            let mut trainer = factory(&spec)?;

            if let Some(hex) = &spec.snapshot {
                trainer.restore(&Snapshot::from_hex(hex)?)?;
            }

            Ok(trainer)
        })
        .await??;

        for epoch in resume_epoch..epochs {
            let (returned, grads) = blocking(move || {
                let grads = trainer.train_epoch(epoch);
                (trainer, grads)
            })
            .await?;

            trainer = returned;
            let grads = grads?;

            let mean = sync.sync(&grads).await?;
            trainer.apply_gradients(&mean)?;
            debug!(slot = slot, epoch = epoch; "epoch synced");

            if epoch + 1 == epochs {
                let test_accuracy = trainer.evaluate()?;
                return Ok(TrainOutcome::Completed { test_accuracy });
            }

            if predictor.should_checkpoint(epoch - resume_epoch, clock.remaining()) {
                return Ok(TrainOutcome::CheckpointRequested {
                    resume_epoch: epoch + 1,
                    snapshot: trainer.snapshot()?,
                });
            }
        }

        Err(WorkerErr::Config(format!(
            "resume epoch {resume_epoch} leaves no epochs of {epochs} to train"
        )))
    }
}

/// Checks the invocation payload before any training starts.
fn validate(spec: &InvocationSpec) -> Result<()> {
    let invalid = |msg: String| Err(WorkerErr::Config(msg));

    if spec.shard.is_empty() || spec.shard.end > spec.dataset.size {
        return invalid(format!(
            "shard {}..{} is empty or outside a dataset of {} samples",
            spec.shard.start, spec.shard.end, spec.dataset.size
        ));
    }

    if spec.resume_epoch >= spec.epochs.get() {
        return invalid(format!(
            "resume epoch {} is not below the {} configured epochs",
            spec.resume_epoch, spec.epochs
        ));
    }

    if spec.slot >= spec.workers.get() {
        return invalid(format!(
            "slot {} is out of {} workers",
            spec.slot, spec.workers
        ));
    }

    Ok(())
}

/// Runs `f` on the blocking pool, a panic inside it becomes `Panicked`.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        let reason = if e.is_panic() {
            panic_message(e.into_panic())
        } else {
            e.to_string()
        };

        WorkerErr::Panicked(reason)
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}

fn respond<C: Clock>(slot: usize, outcome: TrainOutcome, clock: &C) -> WorkerResponse {
    let left_time = clock.remaining().as_secs_f64();

    let outcome = match outcome {
        TrainOutcome::Completed { test_accuracy } => {
            info!(slot = slot, accuracy = test_accuracy; "invocation completed");
            InvocationOutcome::Completed { test_accuracy }
        }
        TrainOutcome::CheckpointRequested {
            resume_epoch,
            snapshot,
        } => {
            let snapshot = snapshot.to_hex();
            info!(
                slot = slot,
                resume_epoch = resume_epoch,
                snapshot_bytes = snapshot.len();
                "checkpointing"
            );
            InvocationOutcome::Restarted {
                resume_epoch,
                snapshot,
            }
        }
        TrainOutcome::Failed(e) => {
            error!(slot = slot; "invocation failed: {e}");
            InvocationOutcome::Errored {
                message: e.to_string(),
            }
        }
    };

    WorkerResponse { outcome, left_time }
}
