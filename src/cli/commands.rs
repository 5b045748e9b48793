// Subcommands of the transformnet binary and their flags.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the layer table of the network
    Summary(SummaryArgs),

    /// Build a seeded network and push a random image batch through it
    Forward(ForwardArgs),

    /// Print the default configuration as TOML
    Config,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// TOML configuration; the default architecture when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Input image height
    #[arg(long, default_value_t = 256)]
    pub height: usize,

    /// Input image width
    #[arg(long, default_value_t = 256)]
    pub width: usize,
}

#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// TOML configuration; the default architecture when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub height: usize,

    #[arg(long)]
    pub width: usize,

    /// Images per batch
    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Seed for both the parameters and the input image
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
