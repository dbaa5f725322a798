use std::{env, time::Duration};

use log::warn;
use machine_learning::training::TrainerBuilder;

use crate::{Result, WorkerErr};

pub const TOTAL_TIME_VAR: &str = "WORKER_TOTAL_TIME_MS";
pub const TRAIN_LIMIT_VAR: &str = "WORKER_TRAIN_LIMIT_MS";
pub const LOGGING_GAP_VAR: &str = "TRAIN_LOGGING_GAP";

const DEFAULT_LOGGING_GAP: usize = 10;

/// Execution bounds of a worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    total_budget: Duration,
    train_limit: Duration,
    log_every: usize,
}

impl WorkerConfig {
    /// Creates a new worker configuration.
    ///
    /// # Args
    /// * `total_budget` - The wall clock budget of one invocation.
    /// * `train_limit` - The part of the budget training may use, clamped to `total_budget`.
    ///
    /// # Returns
    /// A `WorkerConfig` instance.
    pub fn new(total_budget: Duration, train_limit: Duration) -> Self {
        let train_limit = if train_limit > total_budget {
            warn!(
                total_ms = total_budget.as_millis() as u64,
                limit_ms = train_limit.as_millis() as u64;
                "train limit exceeds the invocation budget, clamping it"
            );
            total_budget
        } else {
            train_limit
        };

        Self {
            total_budget,
            train_limit,
            log_every: DEFAULT_LOGGING_GAP,
        }
    }

    /// Sets the amount of optimization steps between loss log lines.
    pub fn with_log_every(mut self, steps: usize) -> Self {
        self.log_every = steps;
        self
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Returns
    /// The configuration or a `Config` error if a required value is missing or not a number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str| -> Result<Duration> {
            let raw = lookup(key).ok_or_else(|| WorkerErr::Config(format!("{key} is not set")))?;
            raw.trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|e| WorkerErr::Config(format!("{key}={raw:?} is invalid: {e}")))
        };

        let config = Self::new(millis(TOTAL_TIME_VAR)?, millis(TRAIN_LIMIT_VAR)?);

        let log_every = match lookup(LOGGING_GAP_VAR) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                WorkerErr::Config(format!("{LOGGING_GAP_VAR}={raw:?} is invalid: {e}"))
            })?,
            None => DEFAULT_LOGGING_GAP,
        };

        Ok(config.with_log_every(log_every))
    }

    pub fn total_budget(&self) -> Duration {
        self.total_budget
    }

    pub fn train_limit(&self) -> Duration {
        self.train_limit
    }

    /// A trainer builder honoring this configuration's logging gap.
    pub fn trainer_builder(&self) -> TrainerBuilder {
        TrainerBuilder::new().log_every(self.log_every)
    }
}
