use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use comms::{TensorSet, specs::rendezvous::RoundStatus};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::accumulate;
use crate::{RendezvousErr, Result};

/// The state of the current round, reset once every participant consumed its mean.
#[derive(Debug, Default)]
struct RoundState {
    round: u64,
    received: usize,
    sent: usize,
    accumulated: Option<TensorSet>,
    published: Option<Arc<TensorSet>>,
    closed: bool,
}

impl RoundState {
    /// Whether `round` is still collecting contributions.
    fn awaiting(&self, round: u64) -> bool {
        self.round == round && self.published.is_none()
    }

    /// Clears the round and advances the generation, releasing every waiter of it.
    fn reset(&mut self) {
        self.received = 0;
        self.sent = 0;
        self.accumulated = None;
        self.published = None;
        self.round += 1;
    }
}

/// A reusable barrier that averages one gradient set per worker every round.
///
/// A round has two phases. While collecting, callers add their set into a shared accumulator
/// and wait until the last of the `workers` contributions turns it into the published mean.
/// While draining, every caller acknowledges the mean and waits for the rest, the last one
/// resets the state for the next round. Callers of the next round wait at the entry until the
/// drain completes.
pub struct RoundBarrier {
    workers: NonZeroUsize,
    round_timeout: Option<Duration>,
    state: Mutex<RoundState>,
    cvar: Condvar,
}

impl RoundBarrier {
    /// Creates a new `RoundBarrier` without a round deadline.
    ///
    /// # Arguments
    /// * `workers` - The amount of contributions every round waits for.
    ///
    /// # Returns
    /// A new `RoundBarrier` instance.
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            round_timeout: None,
            state: Mutex::default(),
            cvar: Condvar::new(),
        }
    }

    /// Aborts any round whose collect phase does not fill within `timeout` of a caller's
    /// arrival. Every waiter of the aborted round gets an error.
    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = Some(timeout);
        self
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Contributes `grads` to the current round and blocks until the mean of the round is known
    /// and every participant acknowledged it.
    ///
    /// # Arguments
    /// * `grads` - The caller's gradient set.
    ///
    /// # Returns
    /// The elementwise mean of every contribution of the round, shared by every caller.
    pub fn sync(&self, grads: TensorSet) -> Result<Arc<TensorSet>> {
        let workers = self.workers.get();
        let mut state = self.state.lock();

        while state.published.is_some() && !state.closed {
            self.cvar.wait(&mut state);
        }

        let round = state.round;
        if state.closed {
            return Err(RendezvousErr::RoundAborted { round });
        }

        match state.accumulated.as_mut() {
            None => state.accumulated = Some(grads),
            Some(acc) if acc.same_layout(&grads) => accumulate::add_assign(acc, &grads),
            Some(_) => {
                warn!(round = round; "rejected a gradient set with a different layout");
                return Err(RendezvousErr::LayoutMismatch { round });
            }
        }

        state.received += 1;
        debug!(
            round = round,
            received = state.received,
            workers = workers;
            "contribution received"
        );

        if state.received == workers {
            let mut mean = state.accumulated.take().unwrap_or_default();
            accumulate::scale(&mut mean, 1.0 / workers as f32);
            state.published = Some(Arc::new(mean));
            self.cvar.notify_all();
            debug!(round = round; "round mean published");
        } else {
            self.wait_for_publish(&mut state, round)?;
        }

        let Some(mean) = state.published.clone() else {
            return Err(RendezvousErr::RoundAborted { round });
        };

        state.sent += 1;
        if state.sent == workers {
            state.reset();
            self.cvar.notify_all();
        } else {
            while state.round == round {
                self.cvar.wait(&mut state);
            }
        }

        Ok(mean)
    }

    /// Closes the barrier for good.
    ///
    /// The current round is dropped and every caller parked in it is released with
    /// `RoundAborted`, as is every later caller. Callers that already hold the published mean
    /// keep it.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }

        warn!(
            round = state.round,
            received = state.received;
            "barrier closed, aborting the round"
        );
        state.closed = true;
        state.reset();
        self.cvar.notify_all();
    }

    /// Returns a copy of the round counters without modifying them.
    pub fn status(&self) -> RoundStatus {
        let state = self.state.lock();

        RoundStatus {
            round: state.round,
            workers: self.workers.get(),
            received: state.received,
            sent: state.sent,
            collecting: state.accumulated.is_some(),
            published: state.published.is_some(),
        }
    }

    fn wait_for_publish(&self, state: &mut MutexGuard<'_, RoundState>, round: u64) -> Result<()> {
        let deadline = self.round_timeout.map(|timeout| Instant::now() + timeout);

        while state.awaiting(round) {
            let Some(deadline) = deadline else {
                self.cvar.wait(state);
                continue;
            };

            if self.cvar.wait_until(state, deadline).timed_out() && state.awaiting(round) {
                let received = state.received;
                warn!(round = round, received = received; "round timed out, aborting it");

                state.reset();
                self.cvar.notify_all();
                return Err(RendezvousErr::RoundTimedOut {
                    round,
                    received,
                    workers: self.workers.get(),
                });
            }
        }

        if state.round != round {
            return Err(RendezvousErr::RoundAborted { round });
        }

        Ok(())
    }
}
