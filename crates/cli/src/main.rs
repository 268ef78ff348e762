//! sitebridge: bridges a static-site generator build with serverless
//! hosting, one subcommand per build-platform lifecycle hook.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// Bridge a static-site generator build with serverless hosting
#[derive(Parser)]
#[command(name = "sitebridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate configuration and restore caches before the generator runs
  PreBuild(cmd::ContextArgs),

  /// Provision entry-points and rewrite generated config after the generator runs
  Build(cmd::BuildArgs),

  /// Save caches and verify packaged bundles
  PostBuild(cmd::ContextArgs),

  /// Pre-warm deployed entry-points after a successful deploy
  Success(cmd::ContextArgs),

  /// Show cached state for a site
  Status(cmd::ContextArgs),
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::PreBuild(args) => cmd::pre_build::run(&args),
    Commands::Build(args) => cmd::build::run(&args),
    Commands::PostBuild(args) => cmd::post_build::run(&args),
    Commands::Success(args) => cmd::success::run(&args),
    Commands::Status(args) => cmd::status::run(&args),
  }
}
