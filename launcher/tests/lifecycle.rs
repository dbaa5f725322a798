mod common;

use std::time::Duration;

use comms::specs::worker::{InvocationOutcome, WorkerResponse};
use launcher::{Launcher, LauncherErr};

use common::{ScriptedInvoker, config};

fn completed(test_accuracy: f32, left_time: f64) -> Option<WorkerResponse> {
    Some(WorkerResponse {
        outcome: InvocationOutcome::Completed { test_accuracy },
        left_time,
    })
}

fn restarted(resume_epoch: usize, snapshot: &str, left_time: f64) -> Option<WorkerResponse> {
    Some(WorkerResponse {
        outcome: InvocationOutcome::Restarted {
            resume_epoch,
            snapshot: snapshot.into(),
        },
        left_time,
    })
}

#[tokio::test]
async fn restarted_slots_are_reinvoked_from_their_checkpoint() {
    let (invoker, calls) = ScriptedInvoker::new(|spec| match (spec.slot, spec.resume_epoch) {
        (0, 0) => restarted(2, "aabb", 50.0),
        (0, 2) => completed(0.75, 55.0),
        (1, 0) => completed(0.25, 40.0),
        _ => panic!("unexpected payload {spec:?}"),
    });

    let launcher = Launcher::new(config(2, 100, 3), invoker).unwrap();
    let report = launcher.run().await.unwrap();

    assert_eq!(report.invocations, 3);
    assert_eq!(report.mean_accuracy, 0.5);
    assert!((report.elapsed_secs - 35.0).abs() < 1e-9);
    assert_eq!(report.slots[0].invocations, 2);
    assert_eq!(report.slots[1].invocations, 1);

    let calls = calls.lock().unwrap();
    let slot_zero: Vec<_> = calls.iter().filter(|spec| spec.slot == 0).collect();
    assert_eq!(slot_zero.len(), 2);
    assert_eq!(slot_zero[1].shard, slot_zero[0].shard);
    assert_eq!(slot_zero[1].hyperparams, slot_zero[0].hyperparams);
    assert_eq!(slot_zero[1].resume_epoch, 2);
    assert_eq!(slot_zero[1].snapshot.as_deref(), Some("aabb"));
}

#[tokio::test]
async fn an_errored_slot_fails_the_whole_run() {
    let (invoker, _) = ScriptedInvoker::new(|spec| match spec.slot {
        1 => Some(WorkerResponse::errored("out of memory", 30.0)),
        _ => completed(0.9, 30.0),
    });

    let launcher = Launcher::new(config(3, 90, 1), invoker).unwrap();
    let err = launcher.run().await.unwrap_err();

    assert!(matches!(
        err,
        LauncherErr::WorkerFailed { slot: 1, generation: 1, ref message } if message == "out of memory"
    ));
}

#[tokio::test]
async fn a_failing_slot_aborts_siblings_stuck_in_the_barrier() {
    let (invoker, _) = ScriptedInvoker::new(|spec| match spec.slot {
        0 => Some(WorkerResponse::errored("sync rejected", 10.0)),
        _ => None,
    });

    let launcher = Launcher::new(config(2, 10, 1), invoker).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), launcher.run())
        .await
        .expect("a failed slot must end the run");

    assert!(matches!(result, Err(LauncherErr::WorkerFailed { slot: 0, .. })));
}

#[tokio::test]
async fn checkpoints_that_do_not_advance_are_fatal() {
    let (invoker, calls) = ScriptedInvoker::new(|_| restarted(1, "00", 50.0));

    let launcher = Launcher::new(config(1, 10, 4), invoker).unwrap();
    let err = launcher.run().await.unwrap_err();

    assert!(matches!(
        err,
        LauncherErr::StalledCheckpoint {
            slot: 0,
            generation: 2,
            resume_epoch: 1
        }
    ));
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_configs_never_invoke_anything() {
    let (invoker, calls) = ScriptedInvoker::new(|_| completed(1.0, 0.0));

    let result = Launcher::new(config(8, 4, 1), invoker);

    assert!(matches!(result, Err(LauncherErr::InvalidConfig(_))));
    assert!(calls.lock().unwrap().is_empty());
}
