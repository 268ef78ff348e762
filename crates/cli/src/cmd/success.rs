//! Implementation of the `sitebridge success` command.

use anyhow::{Context, Result};

use sitebridge_lib::lifecycle;

use crate::cmd::ContextArgs;
use crate::output;

/// Execute the success phase: send pre-warm requests to the deployed
/// entry-points. Pre-warming is best-effort; only phase-ordering and state
/// failures can make this command fail.
pub fn run(args: &ContextArgs) -> Result<()> {
  let ctx = args.to_context();

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let result = rt.block_on(lifecycle::success(&ctx))?;

  output::print_success("Success phase complete");
  println!("  Needed functions:    {}", output::format_kinds(&result.needed));
  println!("  Pre-warm requests:   {}/{} completed", result.completed, result.attempted);

  Ok(())
}
