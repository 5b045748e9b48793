// src/ops/norm.rs
// Instance normalization: statistics are taken per sample and per channel over H x W,
// so the result does not depend on the other images in the batch.

use super::view4;
use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::tensor::Tensor;
use ndarray::{Array4, Axis, Zip};

/// `(x - mean) / sqrt(var + eps) * gamma + beta`, with biased variance.
/// `eps` may be zero; a plane with zero variance then maps to `beta`.
///
/// * `input` - `[batch, channels, height, width]`
/// * `gamma`, `beta` - `[channels]`
pub fn instance_norm<T>(
    input: &Tensor<T>,
    gamma: &Tensor<T>,
    beta: &Tensor<T>,
    eps: f64,
) -> Result<Tensor<T>>
where
    T: Float,
{
    let x = view4(input, "instance_norm input")?;
    let (batch, channels, height, width) = x.dim();

    for (name, param) in [("gamma", gamma), ("beta", beta)] {
        if param.shape() != [channels] {
            return Err(TransformError::shape_mismatch(
                format!("instance_norm {name}"),
                &[channels],
                param.shape(),
            ));
        }
    }
    if height * width == 0 {
        return Err(TransformError::InvalidArgument(
            "instance_norm needs a non-empty spatial extent".to_string(),
        ));
    }
    if eps.is_nan() || eps < 0.0 {
        return Err(TransformError::InvalidArgument(format!(
            "instance_norm epsilon must be non-negative, got {eps}"
        )));
    }

    let count = (height * width) as f64;
    let mut output = Array4::<T>::zeros((batch, channels, height, width));

    for (sample, mut sample_out) in x.outer_iter().zip(output.outer_iter_mut()) {
        for (c, (plane, mut plane_out)) in sample
            .axis_iter(Axis(0))
            .zip(sample_out.axis_iter_mut(Axis(0)))
            .enumerate()
        {
            // Accumulate in f64 so f32 inputs with large planes keep their precision.
            let mean = plane.iter().map(|v| v.to_f64()).sum::<f64>() / count;
            let var = plane
                .iter()
                .map(|v| {
                    let d = v.to_f64() - mean;
                    d * d
                })
                .sum::<f64>()
                / count;

            // A constant plane with zero epsilon normalizes to zero, leaving beta.
            let denom = (var + eps).sqrt();
            let inv_std = if denom > 0.0 { 1.0 / denom } else { 0.0 };
            let g = gamma.data()[[c]].to_f64();
            let b = beta.data()[[c]].to_f64();
            let mean = T::from_f64(mean);
            let scale = T::from_f64(g * inv_std);
            let shift = T::from_f64(b);

            Zip::from(&mut plane_out)
                .and(&plane)
                .for_each(|out, &v| *out = (v - mean) * scale + shift);
        }
    }

    Ok(Tensor::new(output.into_dyn()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalizes_each_channel_independently() {
        // Channel 0 is [1, 2, 3, 4], channel 1 is a constant plane.
        let input = Tensor::<f64>::from_vec(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0],
            &[1, 2, 2, 2],
        )
        .unwrap();
        let gamma = Tensor::ones(&[2]);
        let beta = Tensor::zeros(&[2]);

        let out = instance_norm(&input, &gamma, &beta, 0.0).unwrap();
        let v = out.to_vec();

        // mean 2.5, biased variance 1.25
        let std = 1.25f64.sqrt();
        assert_abs_diff_eq!(v[0], -1.5 / std, epsilon = 1e-12);
        assert_abs_diff_eq!(v[3], 1.5 / std, epsilon = 1e-12);
        let mean0: f64 = v[..4].iter().sum::<f64>() / 4.0;
        assert_abs_diff_eq!(mean0, 0.0, epsilon = 1e-12);

        // Constant channel with zero epsilon: centred to zero, never NaN.
        assert_eq!(&v[4..], &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_constant_plane_maps_to_beta() {
        let input = Tensor::<f32>::full(&[2, 1, 3, 3], 9.0);
        let gamma = Tensor::full(&[1], 4.0);
        let beta = Tensor::full(&[1], 0.25);

        let out = instance_norm(&input, &gamma, &beta, 1e-3).unwrap();
        assert!(out.to_vec().iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_constant_plane_without_epsilon_maps_to_beta() {
        let input = Tensor::<f32>::full(&[1, 1, 2, 2], 5.0);
        let out = instance_norm(&input, &Tensor::ones(&[1]), &Tensor::full(&[1], 0.5), 0.0).unwrap();
        assert_eq!(out.to_vec(), vec![0.5; 4]);
    }

    #[test]
    fn test_statistics_are_per_sample() {
        // Same pattern at two different offsets/scales normalizes to the same values.
        let base = [0.0, 1.0, 2.0, 3.0];
        let mut data: Vec<f64> = base.to_vec();
        data.extend(base.iter().map(|v| v * 10.0 + 100.0));
        let input = Tensor::from_vec(data, &[2, 1, 2, 2]).unwrap();

        let out = instance_norm(&input, &Tensor::ones(&[1]), &Tensor::zeros(&[1]), 0.0).unwrap();
        let v = out.to_vec();
        for i in 0..4 {
            assert_abs_diff_eq!(v[i], v[i + 4], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gamma_and_beta_apply_affine() {
        let input = Tensor::<f64>::from_vec(vec![-1.0, 1.0], &[1, 1, 1, 2]).unwrap();
        let out = instance_norm(
            &input,
            &Tensor::full(&[1], 3.0),
            &Tensor::full(&[1], -2.0),
            0.0,
        )
        .unwrap();
        assert_eq!(out.to_vec(), vec![-5.0, 1.0]);
    }

    #[test]
    fn test_rejects_parameter_shape_mismatch() {
        let input = Tensor::<f32>::zeros(&[1, 3, 2, 2]);
        let err = instance_norm(&input, &Tensor::ones(&[2]), &Tensor::zeros(&[3]), 1e-3);
        assert!(matches!(err, Err(TransformError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_rejects_negative_epsilon() {
        let input = Tensor::<f32>::zeros(&[1, 1, 2, 2]);
        assert!(instance_norm(&input, &Tensor::ones(&[1]), &Tensor::zeros(&[1]), -1.0).is_err());
    }
}
