// Neural network module for transformnet
// Layers, composite units and the assembled transformation network,
// all forward-only on top of the ndarray-backed tensor.

pub mod blocks;
pub mod initializers;
pub mod layers;
pub mod module;
pub mod parameter;
pub mod summary;
pub mod transformnet;

// Re-export the main types and traits for convenience
pub use blocks::{ConvLayer, ConvTLayer, ResBlock};
pub use initializers::Initializer;
pub use layers::{Conv2d, ConvTranspose2d, InstanceNorm2d, PixelRange, ReLU, Tanh};
pub use module::Module;
pub use parameter::Parameter;
pub use summary::{LayerSummary, Summary};
pub use transformnet::TransformNet;
