use ndarray::{Array2, ArrayView2, Axis};

use super::LossFn;

/// Softmax followed by cross entropy, computed on raw logits against one hot targets.
#[derive(Default, Clone, Copy)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    pub fn new() -> Self {
        Self
    }

    /// Row wise softmax, shifted by each row's maximum for stability.
    pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
        let mut out = logits.to_owned();

        for mut row in out.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |acc, &z| acc.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|e| e / sum);
        }

        out
    }
}

impl LossFn for SoftmaxCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows().max(1) as f32;
        let probs = Self::softmax(y_pred);

        let total: f32 = probs
            .iter()
            .zip(y.iter())
            .filter(|&(_, &t)| t > 0.0)
            .map(|(&p, &t)| -t * p.max(f32::MIN_POSITIVE).ln())
            .sum();

        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        (Self::softmax(y_pred) - &y) / n
    }
}
