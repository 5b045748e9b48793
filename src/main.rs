mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("transformnet=info".parse()?),
        )
        .init();

    Cli::parse().run()
}
