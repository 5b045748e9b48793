// src/ops/mod.rs
// Forward kernels used by the layers. All of them work on 4D NCHW tensors
// and are pure functions: inputs are borrowed, results are freshly allocated.

pub mod conv;
pub mod norm;

pub use conv::{conv2d, conv_transpose2d};
pub use norm::instance_norm;

use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::tensor::Tensor;
use ndarray::{ArrayView4, Ix4};
use serde::{Deserialize, Serialize};

/// Spatial padding policy, following the usual "same"/"valid" conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Output size depends only on the stride: `ceil(in / stride)` for convolution,
    /// `in * stride` for transposed convolution. Odd padding goes after (bottom/right).
    #[default]
    Same,
    /// No padding.
    Valid,
}

impl std::fmt::Display for Padding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Padding::Same => write!(f, "same"),
            Padding::Valid => write!(f, "valid"),
        }
    }
}

/// Resolved geometry of one spatial axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisGeometry {
    /// Output extent along the axis.
    pub output: usize,
    /// Padding before the first input element (convolution) or
    /// cropping before the first output element (transposed convolution).
    pub offset: usize,
}

fn check_axis(input: usize, kernel: usize, stride: usize) -> Result<()> {
    if input == 0 {
        return Err(TransformError::InvalidArgument(
            "spatial extent must be at least 1".to_string(),
        ));
    }
    if kernel == 0 {
        return Err(TransformError::InvalidArgument(
            "kernel size must be at least 1".to_string(),
        ));
    }
    if stride == 0 {
        return Err(TransformError::InvalidArgument(
            "stride must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// `a * b + c` without wrapping; overflow means the geometry cannot be represented.
fn span(a: usize, b: usize, c: usize, context: &str) -> Result<usize> {
    a.checked_mul(b)
        .and_then(|v| v.checked_add(c))
        .ok_or_else(|| {
            TransformError::InvalidArgument(format!(
                "{context}: {a} * {b} + {c} overflows the addressable size"
            ))
        })
}

/// Rejects shapes whose element count does not fit an allocation.
pub(crate) fn check_size(shape: &[usize], context: &str) -> Result<()> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&n| n <= isize::MAX as usize)
        .map(|_| ())
        .ok_or_else(|| {
            TransformError::InvalidArgument(format!("{context}: shape {shape:?} is too large"))
        })
}

/// Output size and leading padding of a convolution along one axis.
pub fn conv_geometry(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
) -> Result<AxisGeometry> {
    check_axis(input, kernel, stride)?;
    match padding {
        Padding::Same => {
            let output = input.div_ceil(stride);
            let total = span(output - 1, stride, kernel, "convolution window")?.saturating_sub(input);
            Ok(AxisGeometry {
                output,
                offset: total / 2,
            })
        }
        Padding::Valid => {
            if kernel > input {
                return Err(TransformError::InvalidArgument(format!(
                    "kernel {kernel} larger than input {input} with valid padding"
                )));
            }
            Ok(AxisGeometry {
                output: (input - kernel) / stride + 1,
                offset: 0,
            })
        }
    }
}

/// Output size and leading crop of a transposed convolution along one axis.
pub fn conv_transpose_geometry(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
) -> Result<AxisGeometry> {
    check_axis(input, kernel, stride)?;
    let full = span(input - 1, stride, kernel, "transposed convolution extent")?;
    match padding {
        Padding::Same => {
            let output = span(input, stride, 0, "transposed convolution output")?;
            Ok(AxisGeometry {
                output,
                offset: full.saturating_sub(output) / 2,
            })
        }
        Padding::Valid => Ok(AxisGeometry {
            output: span(
                input,
                stride,
                kernel.saturating_sub(stride),
                "transposed convolution output",
            )?,
            offset: 0,
        }),
    }
}

/// Borrow a tensor as a 4D view, reporting `context` on rank mismatch.
pub(crate) fn view4<'a, T>(tensor: &'a Tensor<T>, context: &str) -> Result<ArrayView4<'a, T>>
where
    T: Float,
{
    tensor
        .data()
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| TransformError::rank_mismatch(context, 4, tensor.shape()))
}
