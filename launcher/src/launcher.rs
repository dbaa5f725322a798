use std::{sync::Arc, time::Duration};

use comms::specs::worker::{InvocationOutcome, InvocationSpec};
use log::{error, info};
use tokio::task::JoinSet;

use crate::{
    LauncherErr, Result,
    config::LaunchConfig,
    invoker::Invoker,
    report::{RunReport, SlotReport},
};

/// Owns the worker slots of a run and re-invokes each one across checkpoints until it
/// completes.
pub struct Launcher<I> {
    config: LaunchConfig,
    invoker: Arc<I>,
}

impl<I> Launcher<I>
where
    I: Invoker + Sync + 'static,
{
    /// Creates a new `Launcher`.
    ///
    /// # Arguments
    /// * `config` - The run's configuration, validated here.
    /// * `invoker` - Delivers every generation of every slot.
    ///
    /// # Returns
    /// A new `Launcher` or `InvalidConfig` if the configuration is unusable.
    pub fn new(config: LaunchConfig, invoker: I) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            invoker: Arc::new(invoker),
        })
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Runs every slot concurrently until all of them complete.
    ///
    /// The first failing slot aborts its siblings, no report is produced from partial slot
    /// data.
    ///
    /// # Returns
    /// The run's report or the error of the first slot that failed.
    pub async fn run(&self) -> Result<RunReport> {
        let workers = self.config.workers.get();
        let budget = self.config.invocation_budget;
        info!(workers = workers, epochs = self.config.epochs.get(); "launching run");

        let mut tasks = JoinSet::new();
        for slot in 0..workers {
            let spec = self.config.initial_spec(slot);
            let invoker = Arc::clone(&self.invoker);
            tasks.spawn(run_slot(invoker, spec, budget));
        }

        let mut slots = Vec::with_capacity(workers);
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| LauncherErr::Join(e.to_string()))
                .and_then(|slot_result| slot_result);

            match result {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    error!("run failed: {e}");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots.sort_by_key(|slot| slot.slot);
        let report = RunReport::new(slots);
        info!(
            mean_accuracy = report.mean_accuracy,
            elapsed_secs = report.elapsed_secs,
            invocations = report.invocations;
            "run completed"
        );

        Ok(report)
    }
}

/// Drives the generations of a single slot.
///
/// # Arguments
/// * `invoker` - Delivers every generation.
/// * `spec` - The first generation's payload.
/// * `budget` - The wall clock budget of every invocation.
///
/// # Returns
/// The slot's report or the error that ended it.
async fn run_slot<I: Invoker>(
    invoker: Arc<I>,
    mut spec: InvocationSpec,
    budget: Duration,
) -> Result<SlotReport> {
    let slot = spec.slot;
    let mut elapsed_secs = 0.0;
    let mut generation = 0;

    loop {
        generation += 1;
        let response = invoker.invoke(spec.clone()).await?;
        elapsed_secs += (budget.as_secs_f64() - response.left_time).max(0.0);

        match response.outcome {
            InvocationOutcome::Completed { test_accuracy } => {
                info!(
                    slot = slot,
                    generation = generation,
                    accuracy = test_accuracy;
                    "slot completed"
                );

                return Ok(SlotReport {
                    slot,
                    test_accuracy,
                    elapsed_secs,
                    invocations: generation,
                });
            }
            InvocationOutcome::Restarted {
                resume_epoch,
                snapshot,
            } => {
                if resume_epoch <= spec.resume_epoch {
                    return Err(LauncherErr::StalledCheckpoint {
                        slot,
                        generation,
                        resume_epoch,
                    });
                }

                info!(
                    slot = slot,
                    generation = generation,
                    resume_epoch = resume_epoch;
                    "slot checkpointed, reinvoking"
                );
                spec = spec.next_generation(resume_epoch, snapshot);
            }
            InvocationOutcome::Errored { message } => {
                return Err(LauncherErr::WorkerFailed {
                    slot,
                    generation,
                    message,
                });
            }
        }
    }
}
