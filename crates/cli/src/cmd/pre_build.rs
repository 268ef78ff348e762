//! Implementation of the `sitebridge pre-build` command.

use anyhow::Result;

use sitebridge_lib::lifecycle;

use crate::cmd::ContextArgs;
use crate::output;

/// Execute the pre-build phase: validate the publish directory and restore
/// cached trees from previous builds.
pub fn run(args: &ContextArgs) -> Result<()> {
  let ctx = args.to_context();
  let result = lifecycle::pre_build(&ctx)?;

  output::print_success("Pre-build complete");
  println!("  Publish cache restored:   {}", yes_no(result.publish_restored));
  println!("  Generator cache restored: {}", yes_no(result.generator_cache_restored));

  Ok(())
}

fn yes_no(value: bool) -> &'static str {
  if value { "yes" } else { "no" }
}
