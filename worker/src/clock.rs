use std::time::{Duration, Instant};

/// Tells how much of an invocation's wall clock budget is left. Polled once per epoch.
pub trait Clock: Send + Sync {
    fn remaining(&self) -> Duration;
}

/// A clock counting down to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    end: Instant,
}

impl Deadline {
    /// Starts a countdown of `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }
}

impl Clock for Deadline {
    fn remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}
