// src/ops/conv.rs
// 2D convolution (im2col + GEMM) and its adjoint, transposed convolution (GEMM + col2im).
// No bias term here; each convolution in the network feeds an instance normalization.

use super::{AxisGeometry, Padding, check_size, conv_geometry, conv_transpose_geometry, view4};
use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::tensor::Tensor;
use ndarray::{Array2, Array4, ArrayView4};
use tracing::trace;

/// Convert image patches to a column matrix so the convolution becomes one matrix product.
/// Rows index (channel, ky, kx), columns index (batch, out_y, out_x).
/// Positions that fall into the padding stay zero.
fn im2col<T>(
    input: &ArrayView4<'_, T>,
    kernel: (usize, usize),
    stride: (usize, usize),
    rows: AxisGeometry,
    cols: AxisGeometry,
) -> Array2<T>
where
    T: Float,
{
    let (batch, channels, in_h, in_w) = input.dim();
    let (kernel_h, kernel_w) = kernel;
    let (out_h, out_w) = (rows.output, cols.output);

    let mut col = Array2::<T>::zeros((channels * kernel_h * kernel_w, batch * out_h * out_w));

    for b in 0..batch {
        for c in 0..channels {
            for ky in 0..kernel_h {
                for kx in 0..kernel_w {
                    let row = (c * kernel_h + ky) * kernel_w + kx;
                    for oy in 0..out_h {
                        let Some(iy) = (oy * stride.0 + ky).checked_sub(rows.offset) else {
                            continue;
                        };
                        if iy >= in_h {
                            continue;
                        }
                        for ox in 0..out_w {
                            let Some(ix) = (ox * stride.1 + kx).checked_sub(cols.offset) else {
                                continue;
                            };
                            if ix >= in_w {
                                continue;
                            }
                            col[[row, (b * out_h + oy) * out_w + ox]] = input[[b, c, iy, ix]];
                        }
                    }
                }
            }
        }
    }

    col
}

/// Scatter-add a column matrix back into an image. Inverse layout of `im2col`:
/// rows index (out_channel, ky, kx), columns index (batch, in_y, in_x).
/// Overlapping windows accumulate; contributions landing in the crop are dropped.
fn col2im<T>(
    col: &Array2<T>,
    batch: usize,
    in_size: (usize, usize),
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    rows: AxisGeometry,
    cols: AxisGeometry,
) -> Array4<T>
where
    T: Float,
{
    let (in_h, in_w) = in_size;
    let (kernel_h, kernel_w) = kernel;
    let (out_h, out_w) = (rows.output, cols.output);

    let mut output = Array4::<T>::zeros((batch, out_channels, out_h, out_w));

    for b in 0..batch {
        for o in 0..out_channels {
            for ky in 0..kernel_h {
                for kx in 0..kernel_w {
                    let row = (o * kernel_h + ky) * kernel_w + kx;
                    for iy in 0..in_h {
                        let Some(y) = (iy * stride.0 + ky).checked_sub(rows.offset) else {
                            continue;
                        };
                        if y >= out_h {
                            continue;
                        }
                        for ix in 0..in_w {
                            let Some(x) = (ix * stride.1 + kx).checked_sub(cols.offset) else {
                                continue;
                            };
                            if x >= out_w {
                                continue;
                            }
                            output[[b, o, y, x]] += col[[row, (b * in_h + iy) * in_w + ix]];
                        }
                    }
                }
            }
        }
    }

    output
}

/// 2D convolution without bias.
///
/// * `input` - `[batch, in_channels, height, width]`
/// * `weight` - `[out_channels, in_channels, kernel_h, kernel_w]`
///
/// Returns `[batch, out_channels, out_h, out_w]`.
pub fn conv2d<T>(
    input: &Tensor<T>,
    weight: &Tensor<T>,
    stride: (usize, usize),
    padding: Padding,
) -> Result<Tensor<T>>
where
    T: Float,
{
    let x = view4(input, "conv2d input")?;
    let w = view4(weight, "conv2d weight")?;
    let (batch, channels, in_h, in_w) = x.dim();
    let (out_channels, in_channels, kernel_h, kernel_w) = w.dim();

    if channels != in_channels {
        return Err(TransformError::shape_mismatch(
            "conv2d input channels",
            &[in_channels],
            &[channels],
        ));
    }

    let rows = conv_geometry(in_h, kernel_h, stride.0, padding)?;
    let cols = conv_geometry(in_w, kernel_w, stride.1, padding)?;
    trace!(
        "conv2d {:?} * {:?} -> {}x{} ({padding})",
        input.shape(),
        weight.shape(),
        rows.output,
        cols.output
    );

    check_size(&[batch, out_channels, rows.output, cols.output], "conv2d output")?;
    check_size(
        &[in_channels, kernel_h, kernel_w, batch, rows.output, cols.output],
        "conv2d patches",
    )?;

    let col = im2col(&x, (kernel_h, kernel_w), stride, rows, cols);
    let filter = w.to_shape((out_channels, in_channels * kernel_h * kernel_w))?;

    // [out_c, batch * oh * ow] -> [out_c, batch, oh, ow] -> [batch, out_c, oh, ow]
    let output = filter
        .dot(&col)
        .into_shape_with_order((out_channels, batch, rows.output, cols.output))?
        .permuted_axes([1, 0, 2, 3])
        .as_standard_layout()
        .into_owned();

    Ok(Tensor::new(output.into_dyn()))
}

/// 2D transposed convolution without bias (the adjoint of [`conv2d`] with the same geometry).
///
/// * `input` - `[batch, in_channels, height, width]`
/// * `weight` - `[in_channels, out_channels, kernel_h, kernel_w]`
///
/// Returns `[batch, out_channels, out_h, out_w]`.
pub fn conv_transpose2d<T>(
    input: &Tensor<T>,
    weight: &Tensor<T>,
    stride: (usize, usize),
    padding: Padding,
) -> Result<Tensor<T>>
where
    T: Float,
{
    let x = view4(input, "conv_transpose2d input")?;
    let w = view4(weight, "conv_transpose2d weight")?;
    let (batch, channels, in_h, in_w) = x.dim();
    let (in_channels, out_channels, kernel_h, kernel_w) = w.dim();

    if channels != in_channels {
        return Err(TransformError::shape_mismatch(
            "conv_transpose2d input channels",
            &[in_channels],
            &[channels],
        ));
    }

    let rows = conv_transpose_geometry(in_h, kernel_h, stride.0, padding)?;
    let cols = conv_transpose_geometry(in_w, kernel_w, stride.1, padding)?;
    trace!(
        "conv_transpose2d {:?} * {:?} -> {}x{} ({padding})",
        input.shape(),
        weight.shape(),
        rows.output,
        cols.output
    );

    check_size(&[batch, out_channels, rows.output, cols.output], "conv_transpose2d output")?;
    check_size(
        &[out_channels, kernel_h, kernel_w, batch, in_h, in_w],
        "conv_transpose2d patches",
    )?;

    // [batch, in_c, h, w] -> [in_c, batch * h * w]
    let x_matrix = x
        .permuted_axes([1, 0, 2, 3])
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((in_channels, batch * in_h * in_w))?;
    let filter = w.to_shape((in_channels, out_channels * kernel_h * kernel_w))?;

    // filter.T @ x = [out_c * kh * kw, batch * h * w]
    let col = filter.t().dot(&x_matrix);

    let output = col2im(
        &col,
        batch,
        (in_h, in_w),
        out_channels,
        (kernel_h, kernel_w),
        stride,
        rows,
        cols,
    );

    Ok(Tensor::new(output.into_dyn()))
}
