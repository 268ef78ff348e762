//! Implementation of the `sitebridge build` command.
//!
//! The CLI owns the routing configuration file: it is loaded before the
//! phase, handed to the library mutably, and written back after. The library
//! only ever appends entries it owns.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use sitebridge_lib::lifecycle;
use sitebridge_lib::routing::RoutingConfig;

use crate::cmd::BuildArgs;
use crate::output;

/// Execute the build phase: resolve needed entry-points, provision wrappers,
/// and rewrite the generated config regions.
pub fn run(args: &BuildArgs) -> Result<()> {
  let ctx = args.context.to_context();

  let mut routing = load_routing(&args.routing_config)?;
  let result = lifecycle::build(&ctx, &mut routing)?;
  save_routing(&args.routing_config, &routing)?;
  info!(path = %args.routing_config.display(), "routing config saved");

  output::print_success("Build complete");
  println!("  Needed functions:       {}", output::format_kinds(&result.needed));
  println!("  Stale wrappers deleted: {}", result.wrappers_deleted);
  println!("  Redirects registered:   {}", routing.redirects.len());
  if let Some(name) = &result.staged_datastore {
    println!("  Staged datastore:       {}", name);
  }

  Ok(())
}

fn load_routing(path: &Path) -> Result<RoutingConfig> {
  match fs::read_to_string(path) {
    Ok(content) => serde_json::from_str(&content)
      .with_context(|| format!("failed to parse routing config {}", path.display())),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RoutingConfig::default()),
    Err(e) => Err(e).with_context(|| format!("failed to read routing config {}", path.display())),
  }
}

fn save_routing(path: &Path, routing: &RoutingConfig) -> Result<()> {
  let content = serde_json::to_string_pretty(routing).context("failed to serialize routing config")?;
  fs::write(path, content).with_context(|| format!("failed to write routing config {}", path.display()))
}
