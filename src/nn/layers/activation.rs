// src/nn/layers/activation.rs
// Element-wise activation layers. None of them has parameters.

use crate::backend::Float;
use crate::error::Result;
use crate::nn::Module;
use crate::tensor::Tensor;

/// ReLU activation layer: f(x) = max(0, x)
#[derive(Debug, Clone)]
pub struct ReLU {
    name: String,
}

impl ReLU {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<T> Module<T> for ReLU
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        Ok(input.relu())
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        Ok(input_shape.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ReLU"
    }
}

/// Tanh activation layer: squashes input to (-1, 1)
#[derive(Debug, Clone)]
pub struct Tanh {
    name: String,
}

impl Tanh {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<T> Module<T> for Tanh
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        Ok(input.tanh())
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        Ok(input_shape.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Tanh"
    }
}

/// Maps tanh output from [-1, 1] to pixel values in [0, 255]: f(x) = (x + 1) * 255 / 2
#[derive(Debug, Clone)]
pub struct PixelRange {
    name: String,
}

impl PixelRange {
    pub const MAX_PIXEL: f64 = 255.0;

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<T> Module<T> for PixelRange
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        let half = T::from_f64(Self::MAX_PIXEL / 2.0);
        Ok(input.affine(half, half))
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        Ok(input_shape.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "PixelRange"
    }
}
