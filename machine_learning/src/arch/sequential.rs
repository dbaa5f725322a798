use comms::{Tensor, TensorSet};
use ndarray::{ArrayView2, Axis};
use rand::{SeedableRng, rngs::StdRng};

use super::{activations::Sigmoid, layers::Dense, loss::LossFn};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The model owns no parameters, it reads them from a flat slice holding every layer's weights
/// and biases back to back.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Creates a multilayer perceptron with sigmoid hidden layers and a linear output layer
    /// producing one logit per class.
    pub fn mlp(features: usize, hidden: &[usize], classes: usize) -> Self {
        let widths: Vec<_> = [features]
            .into_iter()
            .chain(hidden.iter().copied())
            .chain([classes])
            .collect();

        let last = widths.len() - 2;
        let layers = widths.windows(2).enumerate().map(|(i, w)| {
            let act_fn = (i != last).then(Sigmoid::default);
            Dense::new((w[0], w[1]), act_fn)
        });

        Self::new(layers)
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }

    /// The shape of every parameter tensor, ordered as the weights then the biases of each layer.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.layers.iter().flat_map(Dense::shapes).collect()
    }

    /// Creates the initial parameters of the model, equal for equal seeds.
    pub fn init_params(&self, seed: u64) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = vec![0.0; self.size()];
        let mut rest = params.as_mut_slice();

        for layer in &self.layers {
            let (head, tail) = rest.split_at_mut(layer.size());
            layer.init(head, &mut rng)?;
            rest = tail;
        }

        Ok(params)
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The flat parameters of the model.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward<'a>(
        &'a mut self,
        params: &[f32],
        mut x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        self.check_size("parameters", params.len())?;
        let mut rest = params;

        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            x = layer.forward(head, x)?;
            rest = tail;
        }

        Ok(x)
    }

    /// Computes the gradient of the loss over one batch, overwriting `grad`.
    ///
    /// # Arguments
    /// * `params` - The flat parameters of the model.
    /// * `grad` - A buffer of the same size as `params` for the computed gradient.
    /// * `loss_fn` - The loss function.
    /// * `x` - The batch inputs.
    /// * `y` - The batch targets.
    ///
    /// # Returns
    /// The loss of the batch.
    pub fn backprop<L: LossFn>(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        loss_fn: &L,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32> {
        self.check_size("gradient", grad.len())?;

        let y_pred = self.forward(params, x)?;
        let loss = loss_fn.loss(y_pred, y);
        let mut d_last = loss_fn.loss_prime(y_pred, y);
        let mut d = d_last.view_mut();
        let mut end = params.len();

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(loss)
    }

    /// Computes the fraction of rows of `x` whose highest logit matches the hot entry of `y`.
    pub fn accuracy(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32> {
        if x.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        let y_pred = self.forward(params, x)?;
        let hits = y_pred
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .filter(|(pred, target)| argmax(pred.iter()) == argmax(target.iter()))
            .count();

        Ok(hits as f32 / x.nrows() as f32)
    }

    /// Splits a flat buffer into one tensor per parameter, in parameter order.
    pub fn to_tensor_set(&self, flat: &[f32]) -> Result<TensorSet> {
        self.check_size("flat buffer", flat.len())?;

        let mut rest = flat;
        let mut entries = Vec::new();

        for shape in self.shapes() {
            let (head, tail) = rest.split_at(shape.iter().product());
            entries.push(Some(Tensor::new(shape, head.to_vec())?));
            rest = tail;
        }

        Ok(TensorSet::new(entries))
    }

    /// Joins a tensor set back into a flat buffer, absent entries become zeros.
    ///
    /// # Returns
    /// The flat buffer or a `SizeMismatch` if the set does not match this model's layout.
    pub fn from_tensor_set(&self, set: &TensorSet) -> Result<Vec<f32>> {
        let shapes = self.shapes();
        if set.len() != shapes.len() {
            return Err(MlErr::SizeMismatch {
                what: "tensor set entries",
                got: set.len(),
                expected: shapes.len(),
            });
        }

        let mut flat = Vec::with_capacity(self.size());

        for (entry, shape) in set.entries().iter().zip(&shapes) {
            let numel = shape.iter().product();

            match entry {
                Some(tensor) if tensor.shape() == shape.as_slice() => {
                    flat.extend_from_slice(tensor.data())
                }
                Some(tensor) => {
                    return Err(MlErr::SizeMismatch {
                        what: "tensor elements",
                        got: tensor.data().len(),
                        expected: numel,
                    });
                }
                None => flat.resize(flat.len() + numel, 0.0),
            }
        }

        Ok(flat)
    }

    fn check_size(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

fn argmax<'a, I: Iterator<Item = &'a f32>>(values: I) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
