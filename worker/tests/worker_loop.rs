mod common;

use std::time::Duration;

use comms::{
    Snapshot, TensorSet,
    specs::worker::{InvocationOutcome, WorkerResponse},
};
use machine_learning::{MlErr, training::Trainer};
use worker::Worker;

use common::{FailingSync, LoopbackSync, ScriptedClock, config, spec};

fn restarted(response: WorkerResponse) -> (usize, String) {
    match response.outcome {
        InvocationOutcome::Restarted {
            resume_epoch,
            snapshot,
        } => (resume_epoch, snapshot),
        other => panic!("expected a restart, got {other:?}"),
    }
}

fn errored(response: WorkerResponse) -> String {
    match response.outcome {
        InvocationOutcome::Errored { message } => message,
        other => panic!("expected an error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn checkpoint_chain_matches_an_uninterrupted_run() {
    const EPOCHS: usize = 4;
    let worker = Worker::new(config());

    // Reference: the same trainer driven straight through two epochs.
    let payload = spec(EPOCHS);
    let mut reference = config()
        .trainer_builder()
        .build(
            &payload.dataset,
            &payload.model,
            &payload.hyperparams,
            payload.shard.clone(),
        )
        .unwrap();
    for epoch in 0..2 {
        let grads = reference.train_epoch(epoch).unwrap();
        reference.apply_gradients(&grads).unwrap();
    }

    // One epoch per generation.
    let exhausted = ScriptedClock::exhausted();
    let first = worker.invoke_with(payload.clone(), &exhausted, &LoopbackSync).await;
    let (resume_epoch, snapshot) = restarted(first);
    assert_eq!(resume_epoch, 1);

    let second_spec = payload.next_generation(resume_epoch, snapshot);
    let second = worker.invoke_with(second_spec.clone(), &exhausted, &LoopbackSync).await;
    let (resume_epoch, snapshot) = restarted(second);
    assert_eq!(resume_epoch, 2);

    assert_eq!(
        Snapshot::from_hex(&snapshot).unwrap(),
        reference.snapshot().unwrap()
    );

    // Finishing the chain reports what an uninterrupted invocation reports.
    let plenty = ScriptedClock::plenty();
    let third_spec = second_spec.next_generation(resume_epoch, snapshot);
    let last = worker.invoke_with(third_spec, &plenty, &LoopbackSync).await;
    let straight = worker.invoke_with(payload, &plenty, &LoopbackSync).await;

    assert!(matches!(last.outcome, InvocationOutcome::Completed { .. }));
    assert_eq!(last.outcome, straight.outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn single_epoch_runs_never_consult_the_predictor() {
    let worker = Worker::new(config());
    let clock = ScriptedClock::exhausted();

    let response = worker.invoke_with(spec(1), &clock, &LoopbackSync).await;

    assert!(matches!(
        response.outcome,
        InvocationOutcome::Completed { test_accuracy } if (0.0..=1.0).contains(&test_accuracy)
    ));
    // Only the exit telemetry reads the clock.
    assert_eq!(clock.calls(), 1);
    assert_eq!(response.left_time, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn predictor_is_consulted_once_per_non_final_epoch() {
    let worker = Worker::new(config());
    let clock = ScriptedClock::plenty();

    let response = worker.invoke_with(spec(3), &clock, &LoopbackSync).await;

    assert!(matches!(response.outcome, InvocationOutcome::Completed { .. }));
    assert_eq!(clock.calls(), 3);
    assert_eq!(response.left_time, common::BUDGET.as_secs_f64());
}

#[tokio::test(flavor = "multi_thread")]
async fn resumed_invocations_average_over_their_own_epochs() {
    let worker = Worker::new(config());
    // 320s of the 800s training allotment left: 60% spent after one local epoch.
    let clock = ScriptedClock::new(Duration::from_secs(420));
    let mut payload = spec(4);
    payload.resume_epoch = 2;

    let response = worker.invoke_with(payload, &clock, &LoopbackSync).await;

    // Averaging over three global epochs instead would keep training to completion.
    let (resume_epoch, _) = restarted(response);
    assert_eq!(resume_epoch, 3);
    assert_eq!(clock.calls(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_failure_is_errored_without_retry() {
    let worker = Worker::new(config());
    let response = worker
        .invoke_with(spec(3), &ScriptedClock::plenty(), &FailingSync)
        .await;

    assert!(errored(response).contains("500"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_rendezvous_is_errored() {
    let worker = Worker::new(config());
    let response = worker.invoke(spec(2), &ScriptedClock::plenty()).await;

    assert!(errored(response).contains("sync request failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_snapshot_is_errored() {
    let worker = Worker::new(config());
    let mut payload = spec(3);
    payload.resume_epoch = 1;
    payload.snapshot = Some("not a snapshot".into());

    let response = worker
        .invoke_with(payload, &ScriptedClock::plenty(), &LoopbackSync)
        .await;

    assert!(errored(response).contains("codec"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_payloads_are_configuration_errors() {
    let worker = Worker::new(config());
    let clock = ScriptedClock::plenty();

    let mut past_the_end = spec(2);
    past_the_end.resume_epoch = 2;
    let message = errored(worker.invoke_with(past_the_end, &clock, &LoopbackSync).await);
    assert!(message.contains("configuration error"));

    let mut outside = spec(2);
    outside.shard = 40..60;
    let message = errored(worker.invoke_with(outside, &clock, &LoopbackSync).await);
    assert!(message.contains("configuration error"));
}

struct PanickingTrainer;

impl Trainer for PanickingTrainer {
    fn train_epoch(&mut self, epoch: usize) -> machine_learning::Result<TensorSet> {
        panic!("boom at epoch {epoch}");
    }

    fn apply_gradients(&mut self, _grads: &TensorSet) -> machine_learning::Result<()> {
        Ok(())
    }

    fn evaluate(&mut self) -> machine_learning::Result<f32> {
        Err(MlErr::EmptyDataset)
    }

    fn snapshot(&self) -> machine_learning::Result<Snapshot> {
        Ok(Snapshot::default())
    }

    fn restore(&mut self, _snapshot: &Snapshot) -> machine_learning::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_trainer_is_errored_not_crashed() {
    let worker = Worker::new(config()).with_trainer_factory(|_| Ok(Box::new(PanickingTrainer)));

    let response = worker
        .invoke_with(spec(2), &ScriptedClock::plenty(), &LoopbackSync)
        .await;

    assert!(errored(response).contains("boom at epoch 0"));
}
