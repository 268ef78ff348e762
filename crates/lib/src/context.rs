//! Per-invocation build context.
//!
//! A [`BuildContext`] is assembled once by the caller (the CLI, or whatever
//! drives the lifecycle hooks) and passed read-only into each phase. All
//! process-wide switches are explicit fields here rather than ambient
//! environment reads, so phases stay independently testable.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for a single pre-warm request.
pub const DEFAULT_PREWARM_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory name of the generator's incremental cache, relative to the
/// site root.
const GENERATOR_CACHE_DIR: &str = ".cache";

/// Immutable configuration for one lifecycle invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
  /// Directory the generator publishes the built site into.
  pub publish_dir: PathBuf,

  /// Directory holding user-authored function sources.
  pub functions_src: PathBuf,

  /// Platform-internal functions directory; when set, generated wrappers go
  /// here instead of `functions_src`.
  pub internal_functions_src: Option<PathBuf>,

  /// Directory the platform packages function bundles into.
  pub functions_dist: PathBuf,

  /// Public URL of the deployed site, when known.
  pub deploy_url: Option<String>,

  /// The datastore is excluded from function bundles and served from the
  /// deployed site instead.
  pub shared_datastore: bool,

  /// Whether to send pre-warm requests after a successful deploy.
  pub prewarm: bool,

  /// Timeout applied independently to each pre-warm request.
  pub prewarm_timeout: Duration,
}

impl BuildContext {
  /// Create a context for the given publish directory, with the remaining
  /// paths at their conventional locations relative to the site root.
  pub fn new(publish_dir: impl Into<PathBuf>) -> Self {
    let publish_dir = publish_dir.into();
    let site_root = publish_dir.parent().unwrap_or(&publish_dir).to_path_buf();

    Self {
      functions_src: site_root.join("functions"),
      internal_functions_src: None,
      functions_dist: site_root.join("functions-dist"),
      deploy_url: None,
      shared_datastore: false,
      prewarm: true,
      prewarm_timeout: DEFAULT_PREWARM_TIMEOUT,
      publish_dir,
    }
  }

  /// The site root: parent of the publish directory.
  pub fn site_root(&self) -> &Path {
    self.publish_dir.parent().unwrap_or(&self.publish_dir)
  }

  /// The generator's incremental cache directory.
  pub fn generator_cache_dir(&self) -> PathBuf {
    self.site_root().join(GENERATOR_CACHE_DIR)
  }

  /// Directory generated wrappers are written to.
  pub fn wrapper_dir(&self) -> &Path {
    self.internal_functions_src.as_deref().unwrap_or(&self.functions_src)
  }

  /// The environment-variable file maintained via splicing.
  pub fn env_file(&self) -> PathBuf {
    self.site_root().join(".env.production")
  }

  /// The request-redirects file maintained via splicing.
  pub fn redirects_file(&self) -> PathBuf {
    self.publish_dir.join("_redirects")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_paths_hang_off_site_root() {
    let ctx = BuildContext::new("/site/public");

    assert_eq!(ctx.site_root(), Path::new("/site"));
    assert_eq!(ctx.generator_cache_dir(), PathBuf::from("/site/.cache"));
    assert_eq!(ctx.env_file(), PathBuf::from("/site/.env.production"));
    assert_eq!(ctx.redirects_file(), PathBuf::from("/site/public/_redirects"));
    assert_eq!(ctx.functions_src, PathBuf::from("/site/functions"));
  }

  #[test]
  fn wrapper_dir_prefers_internal_functions() {
    let mut ctx = BuildContext::new("/site/public");
    assert_eq!(ctx.wrapper_dir(), Path::new("/site/functions"));

    ctx.internal_functions_src = Some(PathBuf::from("/site/.internal-functions"));
    assert_eq!(ctx.wrapper_dir(), Path::new("/site/.internal-functions"));
  }
}
