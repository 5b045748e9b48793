// src/nn/transformnet.rs
// The image transformation network: downsampling units, residual units,
// upsampling units, output convolution, tanh and the remap to pixel range.

use crate::backend::Float;
use crate::config::TransformNetConfig;
use crate::error::Result;
use crate::nn::Module;
use crate::nn::blocks::{ConvLayer, ConvTLayer, ResBlock};
use crate::nn::layers::{PixelRange, Tanh};
use crate::nn::layers::conv2d::check_nchw;
use crate::nn::parameter::Parameter;
use crate::nn::summary::{LayerSummary, Summary};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, info};

/// Feed-forward style transfer generator.
///
/// Input is a batch of images `[batch, in_channels, height, width]` with pixel values in
/// any range; output is `[batch, out_channels, height', width']` with every value in
/// `[0, 255]`. With the default configuration `height' = 4 * ceil(ceil(height / 2) / 2)`,
/// which equals `height` whenever it is divisible by 4.
///
/// ```rust
/// use transformnet::{Tensor, TransformNet, TransformNetConfig};
/// use transformnet::nn::Module;
///
/// let net = TransformNet::<f32>::seeded(&TransformNetConfig::default(), 42).unwrap();
/// assert_eq!(net.num_parameters(), 1_677_638);
/// assert_eq!(net.output_shape(&[1, 3, 256, 256]).unwrap(), vec![1, 3, 256, 256]);
/// ```
#[derive(Debug, Clone)]
pub struct TransformNet<T>
where
    T: Float,
{
    config: TransformNetConfig,
    downsample: Vec<ConvLayer<T>>,
    residual: Vec<ResBlock<T>>,
    upsample: Vec<ConvTLayer<T>>,
    output: ConvLayer<T>,
    tanh: Tanh,
    pixel: PixelRange,
}

impl<T> TransformNet<T>
where
    T: Float,
{
    /// Builds the network, drawing every kernel from `rng` in layer order.
    pub fn new<R>(config: &TransformNetConfig, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;
        let eps = config.norm_eps;
        let init = config.initializer;

        let mut channels = config.in_channels;
        let mut downsample = Vec::with_capacity(config.downsample.len());
        for (i, stage) in config.downsample.iter().enumerate() {
            let name = format!("conv_{}", i + 1);
            downsample.push(ConvLayer::new(
                name,
                channels,
                stage.channels,
                stage.kernel_size,
                stage.stride,
                stage.padding,
                stage.activate,
                eps,
                init,
                rng,
            )?);
            channels = stage.channels;
        }

        let mut residual = Vec::with_capacity(config.residual.blocks);
        for i in 0..config.residual.blocks {
            let name = format!("res_{}", i + 1);
            let kernel = config.residual.kernel_size;
            residual.push(ResBlock::new(name, channels, kernel, eps, init, rng)?);
        }

        let mut upsample = Vec::with_capacity(config.upsample.len());
        for (i, stage) in config.upsample.iter().enumerate() {
            let name = format!("conv_t_{}", i + 1);
            upsample.push(ConvTLayer::new(
                name,
                channels,
                stage.channels,
                stage.kernel_size,
                stage.stride,
                stage.padding,
                stage.activate,
                eps,
                init,
                rng,
            )?);
            channels = stage.channels;
        }

        let output_name = format!("conv_{}", config.downsample.len() + 1);
        let stage = &config.output;
        let output = ConvLayer::new(
            output_name,
            channels,
            stage.channels,
            stage.kernel_size,
            stage.stride,
            stage.padding,
            stage.activate,
            eps,
            init,
            rng,
        )?;

        let net = Self {
            config: config.clone(),
            downsample,
            residual,
            upsample,
            output,
            tanh: Tanh::new("tanh"),
            pixel: PixelRange::new("pixel"),
        };
        info!(
            "Built transformnet with {} layers and {} parameters",
            net.layers().len(),
            net.num_parameters()
        );
        Ok(net)
    }

    /// Builds the network from a fixed seed; the same seed yields the same parameters.
    pub fn seeded(config: &TransformNetConfig, seed: u64) -> Result<Self> {
        Self::new(config, &mut StdRng::seed_from_u64(seed))
    }

    pub fn config(&self) -> &TransformNetConfig {
        &self.config
    }

    /// Top-level layers in forward order.
    pub fn layers(&self) -> Vec<&dyn Module<T>> {
        let mut layers: Vec<&dyn Module<T>> = Vec::new();
        layers.extend(self.downsample.iter().map(|l| l as &dyn Module<T>));
        layers.extend(self.residual.iter().map(|l| l as &dyn Module<T>));
        layers.extend(self.upsample.iter().map(|l| l as &dyn Module<T>));
        layers.push(&self.output);
        layers.push(&self.tanh);
        layers.push(&self.pixel);
        layers
    }

    /// Parameter lookup by full name, e.g. `res_2_conv_1.conv.weight`.
    pub fn parameter(&self, name: &str) -> Option<&Parameter<T>> {
        self.parameters().into_iter().find(|p| p.name() == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter<T>> {
        self.parameters_mut().into_iter().find(|p| p.name() == name)
    }

    /// Per-layer output shapes and parameter counts for an input of `input_shape`.
    pub fn summary(&self, input_shape: &[usize]) -> Result<Summary> {
        check_nchw("transformnet", input_shape, self.config.in_channels)?;

        let mut shape = input_shape.to_vec();
        let mut layers = Vec::new();
        for layer in self.layers() {
            shape = layer.output_shape(&shape)?;
            layers.push(LayerSummary {
                name: layer.name().to_string(),
                kind: layer.kind(),
                output_shape: shape.clone(),
                num_parameters: layer.num_parameters(),
            });
        }

        Ok(Summary {
            input_shape: input_shape.to_vec(),
            layers,
        })
    }
}

impl<T> Module<T> for TransformNet<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        check_nchw("transformnet", input.shape(), self.config.in_channels)?;
        let start = Instant::now();

        let mut x = input.clone();
        for layer in self.layers() {
            x = layer.forward(&x)?;
            debug!("{} -> {:?}", layer.name(), x.shape());
        }

        debug!(
            "Forward pass {:?} -> {:?} in {:?}",
            input.shape(),
            x.shape(),
            start.elapsed()
        );
        Ok(x)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        check_nchw("transformnet", input_shape, self.config.in_channels)?;
        self.layers()
            .iter()
            .try_fold(input_shape.to_vec(), |shape, layer| layer.output_shape(&shape))
    }

    fn name(&self) -> &str {
        "transformnet"
    }

    fn kind(&self) -> &'static str {
        "TransformNet"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        self.layers()
            .into_iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        let mut params = Vec::new();
        for layer in &mut self.downsample {
            params.extend(layer.parameters_mut());
        }
        for layer in &mut self.residual {
            params.extend(layer.parameters_mut());
        }
        for layer in &mut self.upsample {
            params.extend(layer.parameters_mut());
        }
        params.extend(self.output.parameters_mut());
        params
    }
}
