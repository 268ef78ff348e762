//! CLI subcommands, one per lifecycle phase.

pub mod build;
pub mod post_build;
pub mod pre_build;
pub mod status;
pub mod success;

use std::path::PathBuf;

use sitebridge_lib::context::BuildContext;

/// Arguments shared by every phase subcommand, mapping one-to-one onto the
/// library's `BuildContext`.
#[derive(Debug, clap::Args)]
pub struct ContextArgs {
  /// Directory the generator publishes the site into
  #[arg(long, default_value = "public")]
  pub publish_dir: PathBuf,

  /// Directory holding user-authored function sources
  #[arg(long, default_value = "functions")]
  pub functions_src: PathBuf,

  /// Platform-internal directory for generated wrappers
  #[arg(long)]
  pub internal_functions_src: Option<PathBuf>,

  /// Directory the platform packages function bundles into
  #[arg(long, default_value = "functions-dist")]
  pub functions_dist: PathBuf,

  /// Public URL of the deployed site
  #[arg(long, env = "DEPLOY_URL")]
  pub deploy_url: Option<String>,

  /// Exclude the datastore from function bundles and serve it from the site
  #[arg(long, env = "SHARED_DATASTORE")]
  pub shared_datastore: bool,

  /// Disable pre-warm requests after deploy
  #[arg(long)]
  pub no_prewarm: bool,

  /// Timeout for each pre-warm request
  #[arg(long, default_value = "5s")]
  pub prewarm_timeout: humantime::Duration,
}

impl ContextArgs {
  pub fn to_context(&self) -> BuildContext {
    let mut ctx = BuildContext::new(&self.publish_dir);
    ctx.functions_src = self.functions_src.clone();
    ctx.internal_functions_src = self.internal_functions_src.clone();
    ctx.functions_dist = self.functions_dist.clone();
    ctx.deploy_url = self.deploy_url.clone();
    ctx.shared_datastore = self.shared_datastore;
    ctx.prewarm = !self.no_prewarm;
    ctx.prewarm_timeout = self.prewarm_timeout.into();
    ctx
  }
}

/// Arguments for the build phase, which additionally owns the routing
/// configuration file.
#[derive(Debug, clap::Args)]
pub struct BuildArgs {
  #[command(flatten)]
  pub context: ContextArgs,

  /// Routing configuration JSON maintained across phases
  #[arg(long, default_value = "routing.json")]
  pub routing_config: PathBuf,
}
