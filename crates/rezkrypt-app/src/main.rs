use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod portal;
mod proctor;
mod screen;

use config::{Config, LogFormat, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = Config::load(&args.config)?;
    init_logging(&config.logging);
    tracing::debug!(path = %args.config, "configuration loaded");

    match args.command {
        cli::Command::Interview(opts) => screen::run(&config.media, opts).await,
        cli::Command::Portal(opts) => portal::run(opts),
        cli::Command::Proctor(opts) => proctor::run(&config.proctor, opts).await,
    }
}

// stdout carries the screen output, so logs go to stderr.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
