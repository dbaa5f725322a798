mod cross_entropy;

use ndarray::{Array2, ArrayView2};

pub use cross_entropy::SoftmaxCrossEntropy;

/// A loss over a batch of predictions, one sample per row.
pub trait LossFn {
    /// Computes the mean loss of the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// Computes the derivative of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
