use crate::backend::Float;
use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;

/// The base trait for all network components.
///
/// Layers and composite units implement the forward pass, expose their parameters,
/// and can infer output shapes without touching any data. Composite units collect the
/// parameters of their children, so calling [`Module::parameters`] on the top-level
/// network returns every learnable tensor in forward order.
///
/// # Examples
///
/// ```rust
/// use transformnet::nn::Module;
/// use transformnet::{Result, Tensor};
///
/// struct Double;
///
/// impl Module<f32> for Double {
///     fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
///         Ok(input.affine(2.0, 0.0))
///     }
///
///     fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
///         Ok(input_shape.to_vec())
///     }
///
///     fn name(&self) -> &str {
///         "double"
///     }
///
///     fn kind(&self) -> &'static str {
///         "Double"
///     }
/// }
///
/// let out = Double.forward(&Tensor::ones(&[2])).unwrap();
/// assert_eq!(out.to_vec(), vec![2.0, 2.0]);
/// assert_eq!(Double.num_parameters(), 0);
/// ```
pub trait Module<T>
where
    T: Float,
{
    /// Performs the forward pass of the module.
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>>;

    /// Shape the forward pass would produce for an input of `input_shape`,
    /// or the error it would fail with.
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>>;

    /// Instance name, unique within a network (e.g. `conv_2`, `res_3`).
    fn name(&self) -> &str;

    /// Type name used in summaries.
    fn kind(&self) -> &'static str;

    /// Returns all parameters of this module, including those of submodules.
    fn parameters(&self) -> Vec<&Parameter<T>> {
        Vec::new()
    }

    /// Mutable access to the same parameters, in the same order.
    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        Vec::new()
    }

    /// Total number of scalars across all parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.size()).sum()
    }
}
