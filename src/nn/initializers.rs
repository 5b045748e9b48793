// Weight initialization schemes.
// Every initializer samples from a generator supplied by the caller, so a fixed
// seed reproduces the same network.

use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Xavier/Glorot uniform: U(-a, a) with a = sqrt(6 / (fan_in + fan_out))
    #[default]
    GlorotUniform,
    /// Xavier/Glorot normal: N(0, std) with std = sqrt(2 / (fan_in + fan_out))
    GlorotNormal,
    /// Kaiming/He uniform: U(-a, a) with a = sqrt(6 / fan_in)
    HeUniform,
    /// Kaiming/He normal: N(0, std) with std = sqrt(2 / fan_in)
    HeNormal,
    Zeros,
    Ones,
}

impl std::fmt::Display for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Initializer::GlorotUniform => "glorot_uniform",
            Initializer::GlorotNormal => "glorot_normal",
            Initializer::HeUniform => "he_uniform",
            Initializer::HeNormal => "he_normal",
            Initializer::Zeros => "zeros",
            Initializer::Ones => "ones",
        };
        f.write_str(name)
    }
}

/// Fan-in and fan-out of a convolution kernel.
/// Both `[out, in, kh, kw]` (convolution) and `[in, out, kh, kw]` (transposed) layouts
/// multiply the receptive field by the first two axes, so the sum used by Glorot
/// is the same either way. He schemes read the second axis as the fan-in.
pub fn conv_fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [a, b, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (b * receptive, a * receptive)
        }
        [n] => (*n, *n),
        [] => (1, 1),
    }
}

fn sample_into<T, D, R>(shape: &[usize], dist: D, rng: &mut R) -> Tensor<T>
where
    T: Float,
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    Tensor::new(ArrayD::from_shape_simple_fn(IxDyn(shape), || {
        T::from_f64(dist.sample(&mut *rng))
    }))
}

fn uniform(limit: f64) -> Result<Uniform<f64>> {
    Uniform::new_inclusive(-limit, limit)
        .map_err(|e| TransformError::InvalidArgument(format!("uniform limit {limit}: {e}")))
}

fn normal(std: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std)
        .map_err(|e| TransformError::InvalidArgument(format!("normal std {std}: {e}")))
}

impl Initializer {
    /// Sample a tensor of `shape` with fans computed by [`conv_fans`].
    pub fn init<T, R>(&self, shape: &[usize], rng: &mut R) -> Result<Tensor<T>>
    where
        T: Float,
        R: Rng + ?Sized,
    {
        let (fan_in, fan_out) = conv_fans(shape);
        if fan_in == 0 || fan_out == 0 {
            return Err(TransformError::InvalidArgument(format!(
                "cannot initialize {self} weights of shape {shape:?}"
            )));
        }
        let (fan_in, fan_out) = (fan_in as f64, fan_out as f64);

        let tensor = match self {
            Initializer::GlorotUniform => {
                sample_into(shape, uniform((6.0 / (fan_in + fan_out)).sqrt())?, rng)
            }
            Initializer::GlorotNormal => {
                sample_into(shape, normal((2.0 / (fan_in + fan_out)).sqrt())?, rng)
            }
            Initializer::HeUniform => sample_into(shape, uniform((6.0 / fan_in).sqrt())?, rng),
            Initializer::HeNormal => sample_into(shape, normal((2.0 / fan_in).sqrt())?, rng),
            Initializer::Zeros => Tensor::zeros(shape),
            Initializer::Ones => Tensor::ones(shape),
        };
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_conv_fans() {
        assert_eq!(conv_fans(&[32, 3, 9, 9]), (3 * 81, 32 * 81));
        assert_eq!(conv_fans(&[128, 64, 3, 3]), (64 * 9, 128 * 9));
        assert_eq!(conv_fans(&[10, 5]), (5, 10));
    }

    #[test]
    fn test_glorot_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let shape = [64, 32, 3, 3];
        let expected_bound = (6.0f64 / ((32 * 9 + 64 * 9) as f64)).sqrt();

        let w: Tensor<f64> = Initializer::GlorotUniform.init(&shape, &mut rng).unwrap();
        assert_eq!(w.shape(), &shape);
        assert!(
            w.to_vec()
                .iter()
                .all(|&v| v >= -expected_bound && v <= expected_bound)
        );
        // Not degenerate.
        assert!(w.max_value().unwrap() > expected_bound * 0.9);
    }

    #[test]
    fn test_he_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let expected_bound = (6.0f64 / (3.0 * 81.0)).sqrt();
        let w: Tensor<f32> = Initializer::HeUniform.init(&[32, 3, 9, 9], &mut rng).unwrap();
        assert!(w.to_vec().iter().all(|&v| (v as f64).abs() <= expected_bound + 1e-6));
    }

    #[test]
    fn test_normal_initializers_are_centered() {
        let mut rng = StdRng::seed_from_u64(5);
        for init in [Initializer::GlorotNormal, Initializer::HeNormal] {
            let w: Tensor<f64> = init.init(&[64, 64, 3, 3], &mut rng).unwrap();
            assert!(w.mean_value().unwrap().abs() < 0.01, "{init} mean drifted");
        }
    }

    #[test]
    fn test_constant_initializers() {
        let mut rng = StdRng::seed_from_u64(0);
        let z: Tensor<f32> = Initializer::Zeros.init(&[4, 2], &mut rng).unwrap();
        let o: Tensor<f32> = Initializer::Ones.init(&[4, 2], &mut rng).unwrap();
        assert_eq!(z.to_vec(), vec![0.0; 8]);
        assert_eq!(o.to_vec(), vec![1.0; 8]);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a: Tensor<f64> = Initializer::GlorotUniform
            .init(&[8, 4, 3, 3], &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b: Tensor<f64> = Initializer::GlorotUniform
            .init(&[8, 4, 3, 3], &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_fan_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Initializer::GlorotUniform.init::<f32, _>(&[0, 3, 3, 3], &mut rng).is_err());
    }
}
