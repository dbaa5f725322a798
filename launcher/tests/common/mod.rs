#![allow(dead_code)]

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::Duration,
};

use comms::specs::{
    machine_learning::{DatasetSpec, Hyperparams, ModelSpec},
    worker::{InvocationSpec, WorkerResponse},
};
use launcher::{Result, config::LaunchConfig, host::HostedRendezvous, invoker::Invoker};
use rendezvous::RoundBarrier;

pub const BUDGET: Duration = Duration::from_secs(60);

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub fn config(workers: usize, size: usize, epochs: usize) -> LaunchConfig {
    LaunchConfig {
        workers: nz(workers),
        epochs: nz(epochs),
        dataset: DatasetSpec {
            size,
            test_size: nz(200),
            features: nz(4),
            classes: nz(3),
            seed: 11,
        },
        model: ModelSpec {
            hidden: vec![nz(8)],
            seed: 5,
        },
        hyperparams: Hyperparams {
            learning_rate: 0.1,
            batch_size: nz(500),
            momentum: 0.9,
        },
        rendezvous_url: "http://127.0.0.1:1".into(),
        invocation_budget: BUDGET,
    }
}

/// Starts a rendezvous service for `workers` on an ephemeral port.
pub async fn start_rendezvous(workers: usize) -> HostedRendezvous {
    HostedRendezvous::start("127.0.0.1", 0, "127.0.0.1", RoundBarrier::new(nz(workers)))
        .await
        .unwrap()
}

/// Answers every invocation through a script, `None` never answers.
pub struct ScriptedInvoker<F> {
    script: F,
    calls: Arc<Mutex<Vec<InvocationSpec>>>,
}

impl<F> ScriptedInvoker<F>
where
    F: Fn(&InvocationSpec) -> Option<WorkerResponse> + Send + Sync,
{
    pub fn new(script: F) -> (Self, Arc<Mutex<Vec<InvocationSpec>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let invoker = Self {
            script,
            calls: Arc::clone(&calls),
        };

        (invoker, calls)
    }
}

impl<F> Invoker for ScriptedInvoker<F>
where
    F: Fn(&InvocationSpec) -> Option<WorkerResponse> + Send + Sync,
{
    async fn invoke(&self, spec: InvocationSpec) -> Result<WorkerResponse> {
        let response = (self.script)(&spec);
        self.calls.lock().unwrap().push(spec);

        match response {
            Some(response) => Ok(response),
            None => std::future::pending().await,
        }
    }
}

/// Records every payload before handing it to `inner`.
pub struct RecordingInvoker<I> {
    inner: I,
    calls: Arc<Mutex<Vec<InvocationSpec>>>,
}

impl<I: Invoker + Sync> RecordingInvoker<I> {
    pub fn new(inner: I) -> (Self, Arc<Mutex<Vec<InvocationSpec>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let invoker = Self {
            inner,
            calls: Arc::clone(&calls),
        };

        (invoker, calls)
    }
}

impl<I: Invoker + Sync> Invoker for RecordingInvoker<I> {
    async fn invoke(&self, spec: InvocationSpec) -> Result<WorkerResponse> {
        self.calls.lock().unwrap().push(spec.clone());
        self.inner.invoke(spec).await
    }
}
