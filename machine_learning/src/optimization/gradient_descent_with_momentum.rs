use super::Optimizer;
use crate::{MlErr, Result};

/// Gradient descent keeping an exponentially decaying velocity of past gradients.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Vec<f32>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len],
        }
    }

    pub fn velocity(&self) -> &[f32] {
        &self.velocity
    }

    /// Replaces the velocity, used when resuming from a snapshot.
    pub fn set_velocity(&mut self, velocity: Vec<f32>) -> Result<()> {
        if velocity.len() != self.velocity.len() {
            return Err(MlErr::SizeMismatch {
                what: "velocity",
                got: velocity.len(),
                expected: self.velocity.len(),
            });
        }

        self.velocity = velocity;
        Ok(())
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        for (what, got) in [("gradient", grad.len()), ("parameters", params.len())] {
            if got != self.velocity.len() {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: self.velocity.len(),
                });
            }
        }

        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + g;
                *p -= lr * *v;
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_accumulates_across_steps() {
        let mut optimizer = GradientDescentWithMomentum::new(2, 0.5, 0.5);
        let mut params = [1.0, 1.0];

        optimizer.update_params(&mut params, &[1.0, -2.0]).unwrap();
        assert_eq!(params, [0.5, 2.0]);

        optimizer.update_params(&mut params, &[1.0, -2.0]).unwrap();
        assert_eq!(optimizer.velocity(), &[1.5, -3.0]);
        assert_eq!(params, [-0.25, 3.5]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut optimizer = GradientDescentWithMomentum::new(2, 0.1, 0.9);

        assert!(optimizer.update_params(&mut [0.0; 3], &[0.0; 3]).is_err());
        assert!(optimizer.set_velocity(vec![0.0]).is_err());
    }
}
