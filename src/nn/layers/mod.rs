// src/nn/layers/mod.rs
// Primitive layers the network is assembled from.

pub mod activation;
pub mod conv2d;
pub mod norm;

pub use activation::{PixelRange, ReLU, Tanh};
pub use conv2d::{Conv2d, ConvTranspose2d};
pub use norm::InstanceNorm2d;
