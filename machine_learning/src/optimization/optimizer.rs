use crate::Result;

/// An optimization algorithm over flat parameter buffers.
pub trait Optimizer {
    /// Takes one step in `params` following `grad`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    ///
    /// # Returns
    /// An error if the buffers disagree in length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
