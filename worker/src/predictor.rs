use std::time::Duration;

/// Decides whether a time bounded worker should checkpoint after finishing `cur_epoch`.
///
/// Part of the budget, `total_budget - train_limit`, is kept aside for everything that is not
/// training. What is left of the training allotment gives the fraction spent so far, and
/// dividing it by the epochs run gives the average cost of an epoch. The worker should
/// checkpoint when one more epoch at that average would not fit.
///
/// # Arguments
/// * `cur_epoch` - Zero based index of the epoch just completed within this invocation.
/// * `remaining` - Time left in the invocation budget.
/// * `total_budget` - The whole invocation budget.
/// * `train_limit` - The part of the budget available for training, at most `total_budget`.
///
/// # Returns
/// `true` if the worker should checkpoint now.
pub fn should_checkpoint(
    cur_epoch: usize,
    remaining: Duration,
    total_budget: Duration,
    train_limit: Duration,
) -> bool {
    let limit = train_limit.as_secs_f64();
    if limit <= 0.0 {
        return true;
    }

    let slack = total_budget.as_secs_f64() - limit;
    let adjusted_remaining = remaining.as_secs_f64() - slack;
    let spent = 1.0 - adjusted_remaining / limit;
    let avg_per_epoch = spent / (cur_epoch + 1) as f64;

    spent + avg_per_epoch >= 1.0
}

/// `should_checkpoint` bound to one invocation's budget.
#[derive(Debug, Clone, Copy)]
pub struct Predictor {
    total_budget: Duration,
    train_limit: Duration,
}

impl Predictor {
    pub fn new(total_budget: Duration, train_limit: Duration) -> Self {
        Self {
            total_budget,
            train_limit: train_limit.min(total_budget),
        }
    }

    /// Whether to checkpoint after the epoch at `cur_epoch`.
    ///
    /// `cur_epoch` counts the epochs completed within the current invocation, starting at zero,
    /// not the global epoch index. A resumed invocation passes `epoch - resume_epoch`.
    pub fn should_checkpoint(&self, cur_epoch: usize, remaining: Duration) -> bool {
        should_checkpoint(cur_epoch, remaining, self.total_budget, self.train_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: Duration = Duration::from_millis(900_000);
    const LIMIT: Duration = Duration::from_millis(800_000);

    #[test]
    fn plenty_of_time_left_keeps_training() {
        assert!(!should_checkpoint(
            0,
            Duration::from_millis(850_000),
            TOTAL,
            LIMIT
        ));
    }

    #[test]
    fn eating_into_the_slack_checkpoints() {
        assert!(should_checkpoint(
            0,
            Duration::from_millis(50_000),
            TOTAL,
            LIMIT
        ));
    }

    #[test]
    fn more_epochs_lower_the_average_cost() {
        // 50% of the training allotment spent.
        let remaining = Duration::from_millis(500_000);

        assert!(should_checkpoint(0, remaining, TOTAL, LIMIT));
        assert!(!should_checkpoint(3, remaining, TOTAL, LIMIT));
    }

    #[test]
    fn non_increasing_in_remaining_time() {
        for cur_epoch in [0, 1, 4, 20] {
            let mut previous = true;

            for ms in (0..=900_000).step_by(2_500) {
                let now = should_checkpoint(cur_epoch, Duration::from_millis(ms), TOTAL, LIMIT);
                assert!(previous || !now, "epoch {cur_epoch} flipped back at {ms}ms");
                previous = now;
            }
        }
    }

    #[test]
    fn zero_train_limit_always_checkpoints() {
        assert!(should_checkpoint(5, TOTAL, TOTAL, Duration::ZERO));
    }

    #[test]
    fn predictor_clamps_the_limit() {
        let predictor = Predictor::new(LIMIT, TOTAL);
        assert!(!predictor.should_checkpoint(0, LIMIT));
        assert!(predictor.should_checkpoint(0, Duration::ZERO));
    }
}
