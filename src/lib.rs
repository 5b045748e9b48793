//! # transformnet
//!
//! A CPU implementation of the image transformation network used for fast neural
//! style transfer, written in Rust on top of `ndarray`.
//!
//! ## Features
//!
//! - Convolution and transposed convolution with TensorFlow-style `same` padding
//! - Instance normalization with learnable scale and shift
//! - Composite units: normalized convolution, residual and normalized transposed
//!   convolution
//! - The assembled network with forward pass, shape inference and a layer summary
//! - Seeded Glorot/He initialization
//! - TOML configuration of every stage
//!
//! ```rust
//! use transformnet::nn::Module;
//! use transformnet::{Tensor, TransformNet, TransformNetConfig};
//!
//! let net = TransformNet::<f32>::seeded(&TransformNetConfig::default(), 7).unwrap();
//! let image = Tensor::<f32>::full(&[1, 3, 8, 8], 128.0);
//! let styled = net.forward(&image).unwrap();
//!
//! assert_eq!(styled.shape(), &[1, 3, 8, 8]);
//! assert!(styled.min_value().unwrap() >= 0.0 && styled.max_value().unwrap() <= 255.0);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod nn;
pub mod ops;
pub mod tensor;

// Re-export commonly used types for convenience
pub use backend::Float;
pub use config::{ResidualConfig, StageConfig, TransformNetConfig};
pub use error::{Result, TransformError};
pub use nn::{Module, Parameter, Summary, TransformNet};
pub use tensor::Tensor;
