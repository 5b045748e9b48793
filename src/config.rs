//! Network configuration.
//!
//! [`TransformNetConfig::default`] is the standard fast style transfer generator:
//! three downsampling units (32, 64, 128 channels), five residual units, two
//! upsampling units (64, 32 channels) and a 9x9 output convolution to RGB.
//! Configurations can be loaded from and written to TOML.

use crate::error::{Result, TransformError};
use crate::nn::initializers::Initializer;
use crate::nn::layers::norm::DEFAULT_EPS;
use crate::ops::Padding;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One convolution unit of the network (regular or transposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Output channels.
    pub channels: usize,
    /// Square kernel size.
    pub kernel_size: usize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub padding: Padding,
    /// Apply ReLU after the normalization.
    #[serde(default = "default_activate")]
    pub activate: bool,
}

fn default_stride() -> usize {
    1
}

fn default_activate() -> bool {
    true
}

impl StageConfig {
    pub fn new(channels: usize, kernel_size: usize, stride: usize) -> Self {
        Self {
            channels,
            kernel_size,
            stride,
            padding: Padding::Same,
            activate: true,
        }
    }

    pub fn without_activation(mut self) -> Self {
        self.activate = false;
        self
    }

    fn validate(&self, what: &str) -> Result<()> {
        if self.channels == 0 {
            return Err(TransformError::InvalidConfig(format!(
                "{what}: channels must be positive"
            )));
        }
        if self.kernel_size == 0 {
            return Err(TransformError::InvalidConfig(format!(
                "{what}: kernel_size must be positive"
            )));
        }
        if self.stride == 0 {
            return Err(TransformError::InvalidConfig(format!(
                "{what}: stride must be positive"
            )));
        }
        Ok(())
    }
}

/// Residual section: `blocks` units at the width of the last downsampling stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualConfig {
    pub blocks: usize,
    pub channels: usize,
    pub kernel_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformNetConfig {
    /// Channels of the input image.
    pub in_channels: usize,
    /// Epsilon of every instance normalization.
    pub norm_eps: f64,
    /// Kernel initializer of every convolution.
    pub initializer: Initializer,
    /// Convolution units before the residual section, named `conv_1`, `conv_2`, ...
    pub downsample: Vec<StageConfig>,
    /// Residual units, named `res_1`, `res_2`, ...
    pub residual: ResidualConfig,
    /// Transposed convolution units, named `conv_t_1`, `conv_t_2`, ...
    pub upsample: Vec<StageConfig>,
    /// Final convolution unit; its channels are the output image channels.
    pub output: StageConfig,
}

impl Default for TransformNetConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            norm_eps: DEFAULT_EPS,
            initializer: Initializer::GlorotUniform,
            downsample: vec![
                StageConfig::new(32, 9, 1),
                StageConfig::new(64, 3, 2),
                StageConfig::new(128, 3, 2),
            ],
            residual: ResidualConfig {
                blocks: 5,
                channels: 128,
                kernel_size: 3,
            },
            upsample: vec![StageConfig::new(64, 3, 2), StageConfig::new(32, 3, 2)],
            output: StageConfig::new(3, 9, 1).without_activation(),
        }
    }
}

impl TransformNetConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TransformError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Channels entering the residual section.
    pub fn bottleneck_channels(&self) -> usize {
        self.downsample
            .last()
            .map_or(self.in_channels, |stage| stage.channels)
    }

    pub fn validate(&self) -> Result<()> {
        if self.in_channels == 0 {
            return Err(TransformError::InvalidConfig(
                "in_channels must be positive".to_string(),
            ));
        }
        for (i, stage) in self.downsample.iter().enumerate() {
            stage.validate(&format!("downsample[{i}]"))?;
        }
        for (i, stage) in self.upsample.iter().enumerate() {
            stage.validate(&format!("upsample[{i}]"))?;
        }
        self.output.validate("output")?;

        if self.residual.blocks > 0 {
            if self.residual.kernel_size == 0 {
                return Err(TransformError::InvalidConfig(
                    "residual.kernel_size must be positive".to_string(),
                ));
            }
            if self.residual.channels != self.bottleneck_channels() {
                return Err(TransformError::InvalidConfig(format!(
                    "residual.channels is {} but the downsampling path ends with {} channels",
                    self.residual.channels,
                    self.bottleneck_channels()
                )));
            }
        }

        if !self.norm_eps.is_finite() || self.norm_eps <= 0.0 {
            return Err(TransformError::InvalidConfig(format!(
                "norm_eps must be positive and finite, got {}",
                self.norm_eps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TransformNetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bottleneck_channels(), 128);
        assert!(!config.output.activate);
        assert_eq!(config.norm_eps, 1e-3);
    }

    #[test]
    fn test_toml_round_trip_preserves_default() {
        let config = TransformNetConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("glorot_uniform"));
        assert_eq!(TransformNetConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let text = r#"
            norm_eps = 1e-5
            initializer = "he_normal"

            [residual]
            blocks = 2
            channels = 128
            kernel_size = 3
        "#;
        let config = TransformNetConfig::from_toml_str(text).unwrap();
        assert_eq!(config.residual.blocks, 2);
        assert_eq!(config.initializer, Initializer::HeNormal);
        assert_eq!(config.downsample, TransformNetConfig::default().downsample);
    }

    #[test]
    fn test_stage_defaults_in_toml() {
        let text = r#"
            [output]
            channels = 1
            kernel_size = 5
        "#;
        let config = TransformNetConfig::from_toml_str(text).unwrap();
        assert_eq!(config.output.stride, 1);
        assert_eq!(config.output.padding, Padding::Same);
        // Omitted `activate` means true, as for every other stage.
        assert!(config.output.activate);
    }

    #[test]
    fn test_rejects_residual_width_mismatch() {
        let mut config = TransformNetConfig::default();
        config.residual.channels = 64;
        assert!(matches!(
            config.validate(),
            Err(TransformError::InvalidConfig(_))
        ));

        // No residual blocks: the width is irrelevant.
        config.residual.blocks = 0;
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let mut config = TransformNetConfig::default();
        config.upsample[1].stride = 0;
        assert!(config.validate().is_err());

        let mut config = TransformNetConfig::default();
        config.norm_eps = 0.0;
        assert!(config.validate().is_err());

        let mut config = TransformNetConfig::default();
        config.in_channels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_errors_are_reported() {
        assert!(matches!(
            TransformNetConfig::from_toml_str("in_channels = \"three\""),
            Err(TransformError::ConfigParse(_))
        ));
        assert!(matches!(
            TransformNetConfig::from_file("/nonexistent/transformnet.toml"),
            Err(TransformError::ConfigIo { .. })
        ));
    }
}
