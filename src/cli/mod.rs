// Command line front end. Parses arguments with clap and routes each
// subcommand to the library; nothing here computes on tensors directly.

pub mod commands;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Commands, ForwardArgs, SummaryArgs};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::time::Instant;
use transformnet::nn::Module;
use transformnet::{Tensor, TransformNet, TransformNetConfig};

#[derive(Parser, Debug)]
#[command(
    name = "transformnet",
    version,
    about = "Inspect and run the fast style transfer image transformation network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Summary(args) => run_summary(args),
            Commands::Forward(args) => run_forward(args),
            Commands::Config => run_config(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TransformNetConfig> {
    match path {
        Some(path) => TransformNetConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(TransformNetConfig::default()),
    }
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let net = TransformNet::<f32>::seeded(&config, 0)?;

    let summary = net.summary(&[1, net.config().in_channels, args.height, args.width])?;
    println!("{summary}");
    Ok(())
}

fn run_forward(args: ForwardArgs) -> Result<()> {
    if args.batch == 0 || args.height == 0 || args.width == 0 {
        bail!("batch, height and width must be positive");
    }
    let config = load_config(args.config.as_deref())?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let net = TransformNet::<f32>::new(&config, &mut rng)?;
    let shape = [args.batch, config.in_channels, args.height, args.width];
    let input = Tensor::<f32>::rand_uniform(&shape, 0.0, 255.0, &mut rng)?;

    tracing::info!("Running forward pass on {:?}", shape);
    let start = Instant::now();
    let output = net.forward(&input).context("forward pass failed")?;
    tracing::info!("Forward pass finished in {:?}", start.elapsed());

    let min = output.min_value().context("empty output")?;
    let max = output.max_value().context("empty output")?;
    let mean = output.mean_value().context("empty output")?;
    println!("output shape: {:?}", output.shape());
    println!("min: {min:.4}  mean: {mean:.4}  max: {max:.4}");
    Ok(())
}

fn run_config() -> Result<()> {
    print!("{}", TransformNetConfig::default().to_toml_string()?);
    Ok(())
}
