mod common;

use std::{future, net::SocketAddr, num::NonZeroUsize, sync::Arc};

use comms::specs::worker::InvocationOutcome;
use rendezvous::{RoundBarrier, service};
use tokio::{net::TcpListener, task::JoinSet};
use worker::Worker;

use common::{ScriptedClock, config, nz, spec};

async fn spawn_rendezvous(workers: usize) -> (SocketAddr, Arc<RoundBarrier>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let barrier = Arc::new(RoundBarrier::new(NonZeroUsize::new(workers).unwrap()));

    tokio::spawn(service::serve(listener, Arc::clone(&barrier), future::pending()));
    (addr, barrier)
}

#[tokio::test(flavor = "multi_thread")]
async fn workers_train_in_lockstep_through_the_rendezvous() {
    const WORKERS: usize = 2;
    const EPOCHS: usize = 3;

    let (addr, barrier) = spawn_rendezvous(WORKERS).await;
    let mut invocations = JoinSet::new();

    for slot in 0..WORKERS {
        let mut payload = spec(EPOCHS);
        payload.slot = slot;
        payload.workers = nz(WORKERS);
        payload.shard = slot * 24..(slot + 1) * 24;
        payload.rendezvous_url = format!("http://{addr}");

        invocations.spawn(async move {
            let clock = ScriptedClock::plenty();
            Worker::new(config()).invoke(payload, &clock).await
        });
    }

    for response in invocations.join_all().await {
        assert!(
            matches!(response.outcome, InvocationOutcome::Completed { .. }),
            "{response:?}"
        );
    }

    let status = barrier.status();
    assert_eq!(status.round, EPOCHS as u64);
    assert_eq!(status.received, 0);
}
