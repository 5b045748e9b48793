// src/tensor/mod.rs
// Dense CPU tensor backed by ndarray.
// The network computes in NCHW layout: [batch, channels, height, width].

use crate::backend::Float;
use crate::error::{Result, TransformError};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Uniform};


/// Owned n-dimensional array of `T`.
///
/// ```rust
/// use transformnet::Tensor;
///
/// let t = Tensor::<f32>::from_vec(vec![-1.0, 2.0], &[2]).unwrap();
/// assert_eq!(t.relu().to_vec(), vec![0.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T>
where
    T: Float,
{
    data: ArrayD<T>,
}

impl<T> Tensor<T>
where
    T: Float,
{
    pub fn new(data: ArrayD<T>) -> Self {
        Self { data }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)))
    }

    pub fn full(shape: &[usize], value: T) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value))
    }

    /// Builds a tensor from row-major data. Fails if `data.len()` is not the product of `shape`.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TransformError::shape_mismatch(
                "Tensor::from_vec",
                &[expected],
                &[data.len()],
            ));
        }
        Ok(Self::new(ArrayD::from_shape_vec(IxDyn(shape), data)?))
    }

    /// Uniform random fill in `[low, high)` drawn from the caller's generator.
    pub fn rand_uniform<R>(shape: &[usize], low: f64, high: f64, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let dist = Uniform::new(low, high).map_err(|e| {
            TransformError::InvalidArgument(format!("uniform range [{low}, {high}): {e}"))
        })?;
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || T::from_f64(dist.sample(&mut *rng)));
        Ok(Self::new(data))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayD<T> {
        &mut self.data
    }

    pub fn into_data(self) -> ArrayD<T> {
        self.data
    }

    /// Elements in logical row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }

    /// Element-wise sum. No broadcasting: shapes must be identical.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(TransformError::shape_mismatch(
                "Tensor::add",
                self.shape(),
                other.shape(),
            ));
        }
        Ok(Self::new(&self.data + &other.data))
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Self::new(self.data.mapv(f))
    }

    pub fn relu(&self) -> Self {
        let zero = T::from_f64(0.0);
        self.map(|x| x.max_value(zero))
    }

    pub fn tanh(&self) -> Self {
        self.map(|x| x.tanh())
    }

    /// `x * scale + shift` for every element.
    pub fn affine(&self, scale: T, shift: T) -> Self {
        self.map(|x| x * scale + shift)
    }

    pub fn min_value(&self) -> Option<T> {
        self.data.iter().copied().reduce(|a, b| a.min_value(b))
    }

    pub fn max_value(&self) -> Option<T> {
        self.data.iter().copied().reduce(|a, b| a.max_value(b))
    }

    /// Arithmetic mean, accumulated in f64.
    pub fn mean_value(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        let sum: f64 = self.data.iter().map(|x| x.to_f64()).sum();
        Some(sum / self.data.len() as f64)
    }

    /// [N, H, W, C] -> [N, C, H, W]
    pub fn nhwc_to_nchw(&self) -> Result<Self> {
        self.permute_4d("Tensor::nhwc_to_nchw", [0, 3, 1, 2])
    }

    /// [N, C, H, W] -> [N, H, W, C]
    pub fn nchw_to_nhwc(&self) -> Result<Self> {
        self.permute_4d("Tensor::nchw_to_nhwc", [0, 2, 3, 1])
    }

    fn permute_4d(&self, context: &str, axes: [usize; 4]) -> Result<Self> {
        if self.ndim() != 4 {
            return Err(TransformError::rank_mismatch(context, 4, self.shape()));
        }
        let permuted = self
            .data
            .view()
            .permuted_axes(IxDyn(&axes))
            .as_standard_layout()
            .into_owned();
        Ok(Self::new(permuted))
    }
}

impl<T> From<ArrayD<T>> for Tensor<T>
where
    T: Float,
{
    fn from(data: ArrayD<T>) -> Self {
        Self::new(data)
    }
}
