use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::tensor::Tensor;

/// A Parameter is a named tensor holding learnable state of a layer
/// (a convolution kernel, or the scale and shift of a normalization).
///
/// The network only runs forward, so parameters are plain values here. Weights produced
/// elsewhere are loaded with [`Parameter::set_data`], which keeps the shape fixed.
///
/// # Examples
///
/// ```rust
/// use transformnet::{Parameter, Tensor};
///
/// let mut p = Parameter::new("conv_1.weight", Tensor::<f32>::zeros(&[32, 3, 9, 9]));
/// assert_eq!(p.size(), 32 * 3 * 9 * 9);
/// assert!(p.set_data(Tensor::ones(&[3, 3])).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<T>
where
    T: Float,
{
    data: Tensor<T>,
    name: String,
}

impl<T> Parameter<T>
where
    T: Float,
{
    pub fn new(name: impl Into<String>, data: Tensor<T>) -> Self {
        Self {
            data,
            name: name.into(),
        }
    }

    pub fn data(&self) -> &Tensor<T> {
        &self.data
    }

    /// Replace the value, keeping the original shape.
    pub fn set_data(&mut self, data: Tensor<T>) -> Result<()> {
        if data.shape() != self.data.shape() {
            return Err(TransformError::shape_mismatch(
                format!("parameter '{}'", self.name),
                self.data.shape(),
                data.shape(),
            ));
        }
        self.data = data;
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of scalars in the parameter.
    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
