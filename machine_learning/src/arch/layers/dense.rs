use ndarray::{linalg, prelude::*};
use rand::Rng;

use crate::{MlErr, Result, arch::activations::Sigmoid};

/// A fully connected layer over a flat parameter slice laid out as the row major weights
/// followed by the biases.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<Sigmoid>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,

    // Backward metadata
    d: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output widths.
    /// * `act_fn` - The activation applied to the output, `None` leaves the raw logits.
    pub fn new(dim: (usize, usize), act_fn: Option<Sigmoid>) -> Self {
        let zeros = Array2::zeros((0, 0));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros.clone(),
            d: zeros,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The shapes of the weights and the biases, in that order.
    pub fn shapes(&self) -> [Vec<usize>; 2] {
        [vec![self.dim.0, self.dim.1], vec![self.dim.1]]
    }

    /// Fills `params` with Xavier uniform weights and zero biases.
    pub fn init<R: Rng>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        self.check_len(params.len())?;

        let (fan_in, fan_out) = self.dim;
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let (weights, biases) = params.split_at_mut(fan_in * fan_out);

        weights
            .iter_mut()
            .for_each(|w| *w = rng.random_range(-limit..=limit));
        biases.fill(0.0);
        Ok(())
    }

    /// Makes a forward pass through this layer, caching what `backward` needs.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The output batch.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        let (w, b) = self.view_params(params)?;
        let shape = (x.nrows(), self.dim.1);

        if self.z.dim() != shape {
            self.z = Array2::zeros(shape);
        }

        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.z);
        self.z += &b;
        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return Ok(self.z.view());
        };

        self.a = self.z.mapv(|z| act_fn.f(z));
        Ok(self.a.view())
    }

    /// Propagates the output delta `d` back through this layer.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of parameters.
    /// * `grad` - This layer's slice of the gradient, gets overwritten.
    /// * `d` - The delta of the loss with respect to this layer's output.
    ///
    /// # Returns
    /// The delta of the loss with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: ArrayViewMut2<f32>,
    ) -> Result<ArrayViewMut2<'_, f32>> {
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (w, _) = self.view_params(params)?;
        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let shape = (d.nrows(), self.dim.0);
        if self.d.dim() != shape {
            self.d = Array2::zeros(shape);
        }

        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut self.d);
        Ok(self.d.view_mut())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what: "dense layer parameters",
                got: len,
                expected: self.size,
            });
        }

        Ok(())
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len(grad.len())?;

        let (dw_raw, db_raw) = grad.split_at_mut(self.dim.0 * self.dim.1);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.shape_err())?;
        Ok((dw, ArrayViewMut1::from(db_raw)))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len(params.len())?;

        let (w_raw, b_raw) = params.split_at(self.dim.0 * self.dim.1);
        let w = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.shape_err())?;
        Ok((w, ArrayView1::from(b_raw)))
    }

    fn shape_err(&self) -> MlErr {
        MlErr::SizeMismatch {
            what: "dense layer weights",
            got: self.size,
            expected: self.dim.0 * self.dim.1 + self.dim.1,
        }
    }
}
