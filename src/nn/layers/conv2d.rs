// src/nn/layers/conv2d.rs
// 2D convolution layers: regular (downsampling) and transposed (upsampling).
// Neither carries a bias.

use crate::backend::Float;
use crate::error::{Result, TransformError};
use crate::nn::Module;
use crate::nn::initializers::Initializer;
use crate::nn::parameter::Parameter;
use crate::ops::{self, Padding, check_size, conv_geometry, conv_transpose_geometry};
use crate::tensor::Tensor;
use rand::Rng;

/// Rejects zero channel counts, kernel sizes and strides at construction time.
fn check_hyperparameters(
    name: &str,
    in_channels: usize,
    out_channels: usize,
    kernel_size: (usize, usize),
    stride: (usize, usize),
) -> Result<()> {
    if in_channels == 0 || out_channels == 0 {
        return Err(TransformError::InvalidArgument(format!(
            "{name}: channel counts must be positive, got {in_channels} -> {out_channels}"
        )));
    }
    if kernel_size.0 == 0 || kernel_size.1 == 0 {
        return Err(TransformError::InvalidArgument(format!(
            "{name}: kernel size must be positive, got {kernel_size:?}"
        )));
    }
    if stride.0 == 0 || stride.1 == 0 {
        return Err(TransformError::InvalidArgument(format!(
            "{name}: stride must be positive, got {stride:?}"
        )));
    }
    check_size(
        &[out_channels, in_channels, kernel_size.0, kernel_size.1],
        &format!("{name} weight"),
    )
}

/// Validates a `[batch, channels, height, width]` input shape against the layer's channels.
pub(crate) fn check_nchw(name: &str, input_shape: &[usize], channels: usize) -> Result<()> {
    if input_shape.len() != 4 {
        return Err(TransformError::rank_mismatch(name, 4, input_shape));
    }
    if input_shape[1] != channels {
        return Err(TransformError::shape_mismatch(
            format!("{name} input channels"),
            &[channels],
            &[input_shape[1]],
        ));
    }
    Ok(())
}

/// 2D convolution layer without bias.
/// Weight tensor has shape [out_channels, in_channels, kernel_height, kernel_width].
#[derive(Debug, Clone)]
pub struct Conv2d<T>
where
    T: Float,
{
    pub weight: Parameter<T>,
    pub in_channels: usize,
    pub out_channels: usize,
    /// Kernel size (height, width)
    pub kernel_size: (usize, usize),
    /// Stride (height, width)
    pub stride: (usize, usize),
    pub padding: Padding,
    name: String,
}

impl<T> Conv2d<T>
where
    T: Float,
{
    /// Creates a convolution layer with an initialized kernel.
    ///
    /// # Arguments
    ///
    /// * `name` - Layer name; the kernel parameter is `{name}.weight`
    /// * `in_channels` - Number of input channels
    /// * `out_channels` - Number of output channels (filters)
    /// * `kernel_size` - Kernel (height, width)
    /// * `stride` - Stride (height, width)
    /// * `padding` - Spatial padding policy
    /// * `initializer` - Scheme the kernel is drawn with
    /// * `rng` - Generator the kernel is drawn from
    ///
    /// Fails on zero channels, kernel or stride, and on kernels too large to allocate.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R>(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let name = name.into();
        check_hyperparameters(&name, in_channels, out_channels, kernel_size, stride)?;

        let shape = [out_channels, in_channels, kernel_size.0, kernel_size.1];
        let weight = Parameter::new(format!("{name}.weight"), initializer.init(&shape, rng)?);

        Ok(Self {
            weight,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            name,
        })
    }
}

impl<T> Module<T> for Conv2d<T>
where
    T: Float,
{
    /// Input shape: [batch, in_channels, height, width]
    /// Output shape: [batch, out_channels, out_height, out_width]
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        check_nchw(&self.name, input.shape(), self.in_channels)?;
        ops::conv2d(input, self.weight.data(), self.stride, self.padding)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        check_nchw(&self.name, input_shape, self.in_channels)?;
        let rows = conv_geometry(input_shape[2], self.kernel_size.0, self.stride.0, self.padding)?;
        let cols = conv_geometry(input_shape[3], self.kernel_size.1, self.stride.1, self.padding)?;
        Ok(vec![input_shape[0], self.out_channels, rows.output, cols.output])
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Conv2d"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        vec![&self.weight]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        vec![&mut self.weight]
    }
}

/// 2D transposed convolution layer without bias.
/// Weight tensor has shape [in_channels, out_channels, kernel_height, kernel_width].
#[derive(Debug, Clone)]
pub struct ConvTranspose2d<T>
where
    T: Float,
{
    pub weight: Parameter<T>,
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: (usize, usize),
    pub stride: (usize, usize),
    pub padding: Padding,
    name: String,
}

impl<T> ConvTranspose2d<T>
where
    T: Float,
{
    /// Creates a transposed convolution layer with an initialized kernel.
    ///
    /// # Arguments
    ///
    /// * `name` - Layer name; the kernel parameter is `{name}.weight`
    /// * `in_channels` - Number of input channels
    /// * `out_channels` - Number of output channels
    /// * `kernel_size` - Kernel (height, width)
    /// * `stride` - Upsampling factor (height, width)
    /// * `padding` - Spatial padding policy
    /// * `initializer` - Scheme the kernel is drawn with
    /// * `rng` - Generator the kernel is drawn from
    #[allow(clippy::too_many_arguments)]
    pub fn new<R>(
        name: impl Into<String>,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let name = name.into();
        check_hyperparameters(&name, in_channels, out_channels, kernel_size, stride)?;

        let shape = [in_channels, out_channels, kernel_size.0, kernel_size.1];
        let weight = Parameter::new(format!("{name}.weight"), initializer.init(&shape, rng)?);

        Ok(Self {
            weight,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            name,
        })
    }
}

impl<T> Module<T> for ConvTranspose2d<T>
where
    T: Float,
{
    fn forward(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
        check_nchw(&self.name, input.shape(), self.in_channels)?;
        ops::conv_transpose2d(input, self.weight.data(), self.stride, self.padding)
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        check_nchw(&self.name, input_shape, self.in_channels)?;
        let rows = conv_transpose_geometry(
            input_shape[2],
            self.kernel_size.0,
            self.stride.0,
            self.padding,
        )?;
        let cols = conv_transpose_geometry(
            input_shape[3],
            self.kernel_size.1,
            self.stride.1,
            self.padding,
        )?;
        Ok(vec![input_shape[0], self.out_channels, rows.output, cols.output])
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ConvTranspose2d"
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        vec![&self.weight]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        vec![&mut self.weight]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn test_conv2d_weight_shape_and_name() {
        let conv = Conv2d::<f32>::new(
            "conv_1",
            3,
            32,
            (9, 9),
            (1, 1),
            Padding::Same,
            Initializer::GlorotUniform,
            &mut rng(),
        )
        .unwrap();

        assert_eq!(conv.weight.shape(), &[32, 3, 9, 9]);
        assert_eq!(conv.weight.name(), "conv_1.weight");
        assert_eq!(conv.num_parameters(), 7776);
    }

    #[test]
    fn test_conv2d_forward_matches_output_shape() {
        let conv = Conv2d::<f64>::new(
            "conv_2",
            4,
            6,
            (3, 3),
            (2, 2),
            Padding::Same,
            Initializer::GlorotUniform,
            &mut rng(),
        )
        .unwrap();

        let input = Tensor::rand_uniform(&[2, 4, 7, 9], 0.0, 1.0, &mut rng()).unwrap();
        let out = conv.forward(&input).unwrap();
        assert_eq!(out.shape(), &[2, 6, 4, 5]);
        assert_eq!(conv.output_shape(input.shape()).unwrap(), out.shape());
    }

    #[test]
    fn test_conv2d_rejects_bad_hyperparameters_and_inputs() {
        let zero_stride = Conv2d::<f32>::new(
            "c",
            3,
            8,
            (3, 3),
            (0, 1),
            Padding::Same,
            Initializer::Zeros,
            &mut rng(),
        );
        assert!(zero_stride.is_err());

        let huge_kernel = Conv2d::<f32>::new(
            "c",
            3,
            8,
            (1 << 40, 1 << 40),
            (1, 1),
            Padding::Same,
            Initializer::Zeros,
            &mut rng(),
        );
        assert!(matches!(huge_kernel, Err(TransformError::InvalidArgument(_))));

        let conv = Conv2d::<f32>::new(
            "c",
            3,
            8,
            (3, 3),
            (1, 1),
            Padding::Same,
            Initializer::Zeros,
            &mut rng(),
        )
        .unwrap();
        assert!(conv.output_shape(&[1, 4, 8, 8]).is_err());
        assert!(conv.output_shape(&[3, 8, 8]).is_err());
        assert!(conv.forward(&Tensor::zeros(&[1, 4, 8, 8])).is_err());
    }

    #[test]
    fn test_conv_transpose2d_doubles_resolution() {
        let convt = ConvTranspose2d::<f64>::new(
            "conv_t_1",
            8,
            4,
            (3, 3),
            (2, 2),
            Padding::Same,
            Initializer::GlorotUniform,
            &mut rng(),
        )
        .unwrap();

        assert_eq!(convt.weight.shape(), &[8, 4, 3, 3]);
        let input = Tensor::rand_uniform(&[1, 8, 3, 5], -1.0, 1.0, &mut rng()).unwrap();
        let out = convt.forward(&input).unwrap();
        assert_eq!(out.shape(), &[1, 4, 6, 10]);
        assert_eq!(convt.output_shape(&[1, 8, 3, 5]).unwrap(), vec![1, 4, 6, 10]);
    }

    #[test]
    fn test_set_weight_then_forward() {
        let mut conv = Conv2d::<f64>::new(
            "c",
            1,
            1,
            (1, 1),
            (1, 1),
            Padding::Valid,
            Initializer::Zeros,
            &mut rng(),
        )
        .unwrap();
        conv.parameters_mut()[0]
            .set_data(Tensor::full(&[1, 1, 1, 1], 3.0))
            .unwrap();

        let out = conv.forward(&Tensor::full(&[1, 1, 2, 2], 2.0)).unwrap();
        assert_eq!(out.to_vec(), vec![6.0; 4]);
    }
}
