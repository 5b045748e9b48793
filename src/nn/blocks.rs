// src/nn/blocks.rs
// Composite units of the transformation network:
//   ConvLayer   conv -> instance norm -> optional relu
//   ResBlock    ConvLayer(relu) -> ConvLayer(no relu) -> + input
//   ConvTLayer  transposed conv -> instance norm -> optional relu

use crate::backend::Float;
use crate::error::Result;
use crate::nn::Module;
use crate::nn::initializers::Initializer;
use crate::nn::layers::{Conv2d, ConvTranspose2d, InstanceNorm2d, ReLU};
use crate::nn::parameter::Parameter;
use crate::ops::Padding;
use crate::tensor::Tensor;
use rand::Rng;

/// Normalized convolution unit: convolution (no bias), instance normalization,
/// then ReLU when `activate` is set.
#[derive(Debug, Clone)]
pub struct ConvLayer<T>
where
    T: Float,
{
    pub conv: Conv2d<T>,
    pub norm: InstanceNorm2d<T>,
    relu: Option<ReLU>,
    name: String,
}

impl<T> ConvLayer<T>
where
    T: Float,
{
    /// Creates a normalized convolution unit with a square kernel.
    ///
    /// # Arguments
    ///
    /// * `name` - Unit name; sublayers are named `{name}.conv`, `{name}.norm`, `{name}.relu`
    /// * `in_channels` - Channels of the input
    /// * `out_channels` - Channels produced by the convolution
    /// * `kernel_size` - Side of the square kernel
    /// * `stride` - Stride along both axes
    /// * `padding` - Spatial padding policy
    /// * `activate` - Apply ReLU after the normalization
    /// * `norm_eps` - Epsilon of the instance normalization, must be positive
    /// * `initializer` - Scheme used for the convolution kernel
    /// * `rng` - Generator the kernel is drawn from
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use transformnet::nn::{ConvLayer, Initializer, Module};
    /// use transformnet::ops::Padding;
    ///
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let unit = ConvLayer::<f32>::new(
    ///     "conv_2", 32, 64, 3, 2, Padding::Same, true, 1e-3, Initializer::GlorotUniform, &mut rng,
    /// )
    /// .unwrap();
    /// assert_eq!(unit.output_shape(&[1, 32, 64, 64]).unwrap(), vec![1, 64, 32, 32]);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn new<R>(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: Padding,
        activate: bool,
        norm_eps: f64,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let name = name.into();
        let conv = Conv2d::new(
            format!("{name}.conv"),
            in_channels,
            out_channels,
            (kernel_size, kernel_size),
            (stride, stride),
            padding,
            initializer,
            rng,
        )?;
        let norm = InstanceNorm2d::new(format!("{name}.norm"), out_channels, norm_eps)?;
        let relu = activate.then(|| ReLU::new(format!("{name}.relu")));

        Ok(Self {
            conv,
            norm,
            relu,
            name,
        })
    }

    pub fn activates(&self) -> bool {
        self.relu.is_some()
    }
}

impl<T> Module<T> for ConvLayer<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        let x = self.conv.forward(input)?;
        let x = self.norm.forward(&x)?;
        match &self.relu {
            Some(relu) => relu.forward(&x),
            None => Ok(x),
        }
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.conv.output_shape(input_shape)?;
        self.norm.output_shape(&shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ConvLayer"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        let mut params = self.conv.parameters();
        params.extend(self.norm.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        let mut params = self.conv.parameters_mut();
        params.extend(self.norm.parameters_mut());
        params
    }
}

/// Residual unit with an identity shortcut.
/// Both convolutions keep the channel count, use stride 1 and same padding,
/// so the branch output always has the input's shape.
#[derive(Debug, Clone)]
pub struct ResBlock<T>
where
    T: Float,
{
    pub conv1: ConvLayer<T>,
    pub conv2: ConvLayer<T>,
    name: String,
}

impl<T> ResBlock<T>
where
    T: Float,
{
    /// Creates a residual unit of two stride-1 convolution units at `channels` width.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Unit name; the convolution units are `{prefix}_conv_1` and `{prefix}_conv_2`
    /// * `channels` - Input and output channels
    /// * `kernel_size` - Side of the square kernels
    /// * `norm_eps` - Epsilon of both instance normalizations
    /// * `initializer` - Scheme used for both kernels
    /// * `rng` - Generator the kernels are drawn from, first unit first
    pub fn new<R>(
        prefix: impl Into<String>,
        channels: usize,
        kernel_size: usize,
        norm_eps: f64,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let name = prefix.into();
        let conv1 = ConvLayer::new(
            format!("{name}_conv_1"),
            channels,
            channels,
            kernel_size,
            1,
            Padding::Same,
            true,
            norm_eps,
            initializer,
            rng,
        )?;
        let conv2 = ConvLayer::new(
            format!("{name}_conv_2"),
            channels,
            channels,
            kernel_size,
            1,
            Padding::Same,
            false,
            norm_eps,
            initializer,
            rng,
        )?;

        Ok(Self { conv1, conv2, name })
    }

    pub fn channels(&self) -> usize {
        self.conv1.conv.in_channels
    }
}

impl<T> Module<T> for ResBlock<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        let branch = self.conv1.forward(input)?;
        let branch = self.conv2.forward(&branch)?;
        input.add(&branch)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.conv1.output_shape(input_shape)?;
        self.conv2.output_shape(&shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ResBlock"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        let mut params = self.conv1.parameters();
        params.extend(self.conv2.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        let mut params = self.conv1.parameters_mut();
        params.extend(self.conv2.parameters_mut());
        params
    }
}

/// Normalized transposed-convolution unit: transposed convolution (no bias),
/// instance normalization, then ReLU when `activate` is set.
#[derive(Debug, Clone)]
pub struct ConvTLayer<T>
where
    T: Float,
{
    pub conv_t: ConvTranspose2d<T>,
    pub norm: InstanceNorm2d<T>,
    relu: Option<ReLU>,
    name: String,
}

impl<T> ConvTLayer<T>
where
    T: Float,
{
    /// Creates a normalized transposed-convolution unit with a square kernel.
    ///
    /// # Arguments
    ///
    /// * `name` - Unit name; sublayers are named `{name}.conv_t`, `{name}.norm`, `{name}.relu`
    /// * `in_channels` - Channels of the input
    /// * `out_channels` - Channels produced by the transposed convolution
    /// * `kernel_size` - Side of the square kernel
    /// * `stride` - Upsampling factor along both axes
    /// * `padding` - `Same` gives `in * stride` outputs
    /// * `activate` - Apply ReLU after the normalization
    /// * `norm_eps` - Epsilon of the instance normalization, must be positive
    /// * `initializer` - Scheme used for the kernel
    /// * `rng` - Generator the kernel is drawn from
    #[allow(clippy::too_many_arguments)]
    pub fn new<R>(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: Padding,
        activate: bool,
        norm_eps: f64,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let name = name.into();
        let conv_t = ConvTranspose2d::new(
            format!("{name}.conv_t"),
            in_channels,
            out_channels,
            (kernel_size, kernel_size),
            (stride, stride),
            padding,
            initializer,
            rng,
        )?;
        let norm = InstanceNorm2d::new(format!("{name}.norm"), out_channels, norm_eps)?;
        let relu = activate.then(|| ReLU::new(format!("{name}.relu")));

        Ok(Self {
            conv_t,
            norm,
            relu,
            name,
        })
    }

    pub fn activates(&self) -> bool {
        self.relu.is_some()
    }
}

impl<T> Module<T> for ConvTLayer<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        let x = self.conv_t.forward(input)?;
        let x = self.norm.forward(&x)?;
        match &self.relu {
            Some(relu) => relu.forward(&x),
            None => Ok(x),
        }
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let shape = self.conv_t.output_shape(input_shape)?;
        self.norm.output_shape(&shape)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ConvTLayer"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        let mut params = self.conv_t.parameters();
        params.extend(self.norm.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        let mut params = self.conv_t.parameters_mut();
        params.extend(self.norm.parameters_mut());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::layers::norm::DEFAULT_EPS;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_conv_layer_with_and_without_activation() {
        let mut rng = StdRng::seed_from_u64(2);
        let input = Tensor::<f64>::rand_uniform(&[1, 3, 8, 8], -1.0, 1.0, &mut rng).unwrap();

        let with_relu = ConvLayer::<f64>::new(
            "a",
            3,
            4,
            3,
            2,
            Padding::Same,
            true,
            DEFAULT_EPS,
            Initializer::GlorotUniform,
            &mut rng,
        )
        .unwrap();
        let out = with_relu.forward(&input).unwrap();
        assert_eq!(out.shape(), &[1, 4, 4, 4]);
        assert!(out.min_value().unwrap() >= 0.0);

        let linear = ConvLayer::<f64>::new(
            "b",
            3,
            4,
            3,
            2,
            Padding::Same,
            false,
            DEFAULT_EPS,
            Initializer::GlorotUniform,
            &mut rng,
        )
        .unwrap();
        assert!(!linear.activates());
        let out = linear.forward(&input).unwrap();
        // Instance norm output without relu has negative values and zero channel means.
        assert!(out.min_value().unwrap() < 0.0);
        for plane in out.to_vec().chunks(16) {
            assert_abs_diff_eq!(plane.iter().sum::<f64>() / 16.0, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_conv_layer_parameter_names() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = ConvLayer::<f32>::new(
            "conv_1",
            3,
            32,
            9,
            1,
            Padding::Same,
            true,
            DEFAULT_EPS,
            Initializer::GlorotUniform,
            &mut rng,
        )
        .unwrap();

        let names: Vec<&str> = layer.parameters().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["conv_1.conv.weight", "conv_1.norm.gamma", "conv_1.norm.beta"]
        );
        assert_eq!(layer.num_parameters(), 32 * 3 * 81 + 64);
    }

    #[test]
    fn test_res_block_with_zero_branch_is_identity() {
        // Zero weights make both convolutions output zeros; with beta at zero the
        // branch contributes nothing and the shortcut passes the input through.
        let mut rng = StdRng::seed_from_u64(0);
        let block =
            ResBlock::<f64>::new("res_1", 4, 3, DEFAULT_EPS, Initializer::Zeros, &mut rng).unwrap();
        let input = Tensor::rand_uniform(&[2, 4, 5, 5], -3.0, 3.0, &mut rng).unwrap();

        let out = block.forward(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_res_block_adds_branch_to_input() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut block =
            ResBlock::<f64>::new("res_1", 2, 3, DEFAULT_EPS, Initializer::Zeros, &mut rng).unwrap();
        // Shift the second unit's output by a per-channel constant through beta.
        block.conv2.norm.bias.set_data(Tensor::from_vec(vec![1.0, -2.0], &[2]).unwrap()).unwrap();

        let input = Tensor::<f64>::zeros(&[1, 2, 3, 3]);
        let out = block.forward(&input).unwrap().to_vec();
        assert!(out[..9].iter().all(|&v| v == 1.0));
        assert!(out[9..].iter().all(|&v| v == -2.0));
    }

    #[test]
    fn test_res_block_shape_and_names() {
        let mut rng = StdRng::seed_from_u64(0);
        let block =
            ResBlock::<f32>::new("res_3", 8, 3, DEFAULT_EPS, Initializer::GlorotUniform, &mut rng)
                .unwrap();

        assert_eq!(block.channels(), 8);
        assert_eq!(block.conv1.name(), "res_3_conv_1");
        assert_eq!(block.conv2.name(), "res_3_conv_2");
        assert!(block.conv1.activates());
        assert!(!block.conv2.activates());
        assert_eq!(block.output_shape(&[1, 8, 7, 5]).unwrap(), vec![1, 8, 7, 5]);
        assert_eq!(block.num_parameters(), 2 * (8 * 8 * 9 + 16));
    }

    #[test]
    fn test_conv_t_layer_upsamples() {
        let mut rng = StdRng::seed_from_u64(8);
        let layer = ConvTLayer::<f64>::new(
            "conv_t_1",
            6,
            3,
            3,
            2,
            Padding::Same,
            true,
            DEFAULT_EPS,
            Initializer::GlorotUniform,
            &mut rng,
        )
        .unwrap();
        let input = Tensor::rand_uniform(&[1, 6, 4, 3], -1.0, 1.0, &mut rng).unwrap();

        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), &[1, 3, 8, 6]);
        assert_eq!(layer.output_shape(input.shape()).unwrap(), out.shape());
        assert!(out.min_value().unwrap() >= 0.0);
        assert_eq!(layer.parameters()[0].name(), "conv_t_1.conv_t.weight");
    }
}
