// src/backend/number.rs

use ndarray::{LinalgScalar, ScalarOperand};
use std::fmt::{Debug, Display};
use std::ops::{AddAssign, Neg};

/// Floating point element type for tensors.
/// `ndarray::LinalgScalar` already brings the arithmetic operators plus zero and one,
/// so this trait only adds the conversions and transcendental functions the kernels need.
/// Implemented for `f32` and `f64`.
pub trait Float:
    LinalgScalar
    + ScalarOperand
    + AddAssign
    + Neg<Output = Self>
    + PartialOrd
    + Debug
    + Display
    + Default
    + Send
    + Sync
{
    /// Converts from f64. Infallible for floating point targets (may round).
    fn from_f64(value: f64) -> Self;

    /// Converts to f64 for statistics and reporting.
    fn to_f64(self) -> f64;

    fn sqrt(self) -> Self;

    fn tanh(self) -> Self;

    /// Larger of the two values. NaN loses against a number.
    fn max_value(self, other: Self) -> Self;

    /// Smaller of the two values. NaN loses against a number.
    fn min_value(self, other: Self) -> Self;

    fn is_finite(self) -> bool;
}

impl Float for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }

    fn tanh(self) -> Self {
        f32::tanh(self)
    }

    fn max_value(self, other: Self) -> Self {
        f32::max(self, other)
    }

    fn min_value(self, other: Self) -> Self {
        f32::min(self, other)
    }

    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Float for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    fn tanh(self) -> Self {
        f64::tanh(self)
    }

    fn max_value(self, other: Self) -> Self {
        f64::max(self, other)
    }

    fn min_value(self, other: Self) -> Self {
        f64::min(self, other)
    }

    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Float;

    #[test]
    fn test_conversions_round_trip_through_f64() {
        assert_eq!(<f32 as Float>::from_f64(1.5).to_f64(), 1.5);
        assert_eq!(<f64 as Float>::from_f64(-2.25).to_f64(), -2.25);
    }

    #[test]
    fn test_max_min_ignore_nan() {
        assert_eq!(Float::max_value(f64::NAN, 1.0), 1.0);
        assert_eq!(Float::min_value(2.0f32, f32::NAN), 2.0);
    }
}
