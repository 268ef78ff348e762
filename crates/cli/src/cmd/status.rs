//! Implementation of the `sitebridge status` command.

use anyhow::Result;

use sitebridge_lib::cache::CacheStore;
use sitebridge_lib::functions;
use sitebridge_lib::lifecycle::PhaseTracker;

use crate::cmd::ContextArgs;
use crate::output;

/// Show the persisted state for a site: cache root, last completed phase,
/// and the cached needed-function set if one exists.
pub fn run(args: &ContextArgs) -> Result<()> {
  let ctx = args.to_context();
  let store = CacheStore::new(&ctx.publish_dir);
  let tracker = PhaseTracker::new(store.root());

  println!("sitebridge v{}", env!("CARGO_PKG_VERSION"));
  println!();
  println!("  Cache root:       {}", store.root().display());

  let last = tracker.last_completed()?;
  println!(
    "  Last phase:       {}",
    last.map(|phase| phase.name()).unwrap_or("none")
  );

  match functions::load(&ctx) {
    Some(kinds) => println!("  Needed functions: {}", output::format_kinds(&kinds)),
    None => println!("  Needed functions: not resolved"),
  }

  Ok(())
}
