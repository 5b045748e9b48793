// src/nn/layers/norm.rs
// Instance normalization layer with learnable per-channel scale and shift.

use super::conv2d::check_nchw;
use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::nn::Module;
use crate::nn::parameter::Parameter;
use crate::ops;
use crate::tensor::Tensor;

/// Default epsilon added to the variance.
pub const DEFAULT_EPS: f64 = 1e-3;

/// Instance Normalization: normalizes each channel of each sample over its spatial extent.
/// Unlike batch normalization there are no running statistics, so training and
/// inference compute the same thing.
/// Input shape: [batch_size, channels, height, width]
#[derive(Debug, Clone)]
pub struct InstanceNorm2d<T>
where
    T: Float,
{
    /// Learnable scale parameter (gamma), initialized to ones
    pub weight: Parameter<T>,
    /// Learnable shift parameter (beta), initialized to zeros
    pub bias: Parameter<T>,
    pub num_features: usize,
    eps: f64,
    name: String,
}

impl<T> InstanceNorm2d<T>
where
    T: Float,
{
    pub fn new(name: impl Into<String>, num_features: usize, eps: f64) -> Result<Self> {
        let name = name.into();
        if num_features == 0 {
            return Err(TransformError::InvalidArgument(format!(
                "{name}: num_features must be positive"
            )));
        }
        if !eps.is_finite() || eps <= 0.0 {
            return Err(TransformError::InvalidArgument(format!(
                "{name}: epsilon must be positive and finite, got {eps}"
            )));
        }

        Ok(Self {
            weight: Parameter::new(format!("{name}.gamma"), Tensor::ones(&[num_features])),
            bias: Parameter::new(format!("{name}.beta"), Tensor::zeros(&[num_features])),
            num_features,
            eps,
            name,
        })
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }
}

impl<T> Module<T> for InstanceNorm2d<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        check_nchw(&self.name, input.shape(), self.num_features)?;
        ops::instance_norm(input, self.weight.data(), self.bias.data(), self.eps)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        check_nchw(&self.name, input_shape, self.num_features)?;
        Ok(input_shape.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "InstanceNorm2d"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        vec![&mut self.weight, &mut self.bias]
    }
}
