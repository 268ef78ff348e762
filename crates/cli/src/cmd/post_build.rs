//! Implementation of the `sitebridge post-build` command.

use anyhow::Result;

use sitebridge_lib::lifecycle;

use crate::cmd::ContextArgs;
use crate::output;

/// Execute the post-build phase: save caches and verify every needed
/// entry-point's packaged bundle against the size limit.
pub fn run(args: &ContextArgs) -> Result<()> {
  let ctx = args.to_context();
  let result = lifecycle::post_build(&ctx)?;

  output::print_success("Post-build complete");
  println!("  Needed functions: {}", output::format_kinds(&result.needed));
  for (kind, size) in &result.bundle_sizes {
    println!("  Bundle __{}: {}", kind.slug(), output::format_bytes(*size));
  }

  Ok(())
}
