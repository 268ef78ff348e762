//! Lifecycle orchestration across the four build phases.
//!
//! This module provides the entry points the build platform's hooks map
//! onto, in their fixed order:
//!
//! 1. `pre_build`: validate configuration, restore caches
//! 2. `build`: resolve needed functions, provision wrappers, rewrite
//!    generated config regions
//! 3. `post_build`: save caches, verify packaged bundles
//! 4. `success`: pre-warm the deployed entry-points
//!
//! Phases may run in separate process invocations; everything a later phase
//! depends on is on disk before the earlier phase returns, and the ordering
//! itself is enforced through the persisted [`state::PhaseTracker`].

pub mod state;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::consts::{APP_NAME, BUNDLE_SIZE_LIMIT, FUNCTIONS_URL_BASE, SPLICE_END_MARKER, SPLICE_START_MARKER};
use crate::context::BuildContext;
use crate::datastore::{DatastoreError, stage_shared_datastore};
use crate::functions::provision::{
  ProvisionError, delete_wrappers, redirects_block, register_routes, write_wrappers,
};
use crate::functions::resolve::{ResolveError, resolve};
use crate::functions::types::{FunctionKind, NeededFunctionSet};
use crate::patch::{ENGINE_BUNDLE_RELATIVE, PatchError, patch_engine_db_path};
use crate::prewarm::prewarm;
use crate::routing::RoutingConfig;
use crate::splice::{SpliceError, splice_file};
use crate::verify::{VerifyError, verify_bundle};

pub use state::{Phase, PhaseTracker, StateError};

/// Cache entry holding the previous publish directory.
const CACHE_KEY_PUBLISH: &str = "publish";

/// Cache entry holding the previous generator cache directory.
const CACHE_KEY_GENERATOR: &str = "generator-cache";

/// Errors that fail the build.
///
/// Recoverable conditions (cache misses, pre-warm failures) never surface
/// here; they are logged inside the owning component.
#[derive(Debug, Error)]
pub enum LifecycleError {
  /// The publish directory is unset or points at the working directory,
  /// which would silently break packaging.
  #[error(
    "the publish directory is set to \"{publish}\", which is not a dedicated output directory; \
     set it to the generator's output directory (for example \"public\")"
  )]
  Misconfigured { publish: String },

  /// A phase ran out of order.
  #[error("phase {phase} cannot run: it requires {expected} to have completed, but the last completed phase was {last:?}")]
  PhaseOrder {
    phase: Phase,
    expected: Phase,
    last: Option<Phase>,
  },

  /// The working directory could not be resolved.
  #[error("failed to resolve the working directory: {0}")]
  Cwd(#[source] std::io::Error),

  /// Phase state persistence failed.
  #[error(transparent)]
  State(#[from] StateError),

  /// Needed-function resolution failed.
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  /// Wrapper provisioning failed.
  #[error(transparent)]
  Provision(#[from] ProvisionError),

  /// Splicing a generated config region failed.
  #[error(transparent)]
  Splice(#[from] SpliceError),

  /// Datastore staging failed.
  #[error(transparent)]
  Datastore(#[from] DatastoreError),

  /// Patching the engine bundle failed.
  #[error(transparent)]
  Patch(#[from] PatchError),

  /// A packaged bundle failed verification.
  #[error(transparent)]
  Verify(#[from] VerifyError),
}

/// Result of the pre-build phase.
#[derive(Debug)]
pub struct PreBuildResult {
  /// Whether a cached publish directory was restored.
  pub publish_restored: bool,

  /// Whether a cached generator cache directory was restored.
  pub generator_cache_restored: bool,
}

/// Result of the build phase.
#[derive(Debug)]
pub struct BuildResult {
  /// Entry-point kinds this build needs.
  pub needed: NeededFunctionSet,

  /// Stale wrappers deleted before provisioning.
  pub wrappers_deleted: usize,

  /// Staged datastore file name, when a shared datastore was configured.
  pub staged_datastore: Option<String>,

  /// Whether the engine bundle patch fired.
  pub engine_patched: bool,
}

/// Result of the post-build phase.
#[derive(Debug)]
pub struct PostBuildResult {
  /// Entry-point kinds this build needs.
  pub needed: NeededFunctionSet,

  /// Verified bundle sizes in bytes, per kind.
  pub bundle_sizes: BTreeMap<FunctionKind, u64>,
}

/// Result of the success phase.
#[derive(Debug)]
pub struct SuccessResult {
  /// Entry-point kinds this build needs.
  pub needed: NeededFunctionSet,

  /// Pre-warm requests attempted.
  pub attempted: usize,

  /// Pre-warm requests that completed.
  pub completed: usize,
}

/// Pre-build phase: validate configuration and restore caches.
pub fn pre_build(ctx: &BuildContext) -> Result<PreBuildResult, LifecycleError> {
  check_publish_dir(ctx)?;

  let store = CacheStore::new(&ctx.publish_dir);
  let tracker = PhaseTracker::new(store.root());
  check_order(&tracker, Phase::PreBuild)?;

  let publish_restored = store.restore(CACHE_KEY_PUBLISH, &ctx.publish_dir);
  let generator_cache_restored = store.restore(CACHE_KEY_GENERATOR, &ctx.generator_cache_dir());

  // Wrappers now land in the platform-internal directory; a directory from
  // releases that generated into the user's functions dir causes conflicts.
  let legacy_dir = ctx.functions_src.join(APP_NAME);
  if ctx.internal_functions_src.is_some() && legacy_dir.exists() {
    warn!(
      path = %legacy_dir.display(),
      "found a function directory generated by an older release; delete it to avoid conflicts"
    );
  }

  tracker.record(Phase::PreBuild)?;
  info!(publish_restored, generator_cache_restored, "pre-build phase complete");

  Ok(PreBuildResult {
    publish_restored,
    generator_cache_restored,
  })
}

/// Build phase: provision entry-points and rewrite generated config.
pub fn build(ctx: &BuildContext, routing: &mut RoutingConfig) -> Result<BuildResult, LifecycleError> {
  let store = CacheStore::new(&ctx.publish_dir);
  let tracker = PhaseTracker::new(store.root());
  check_order(&tracker, Phase::Build)?;

  let needed = resolve(ctx)?;
  let wrappers_deleted = delete_wrappers(ctx)?;

  let mut staged_datastore = None;
  let mut engine_patched = false;
  if ctx.shared_datastore {
    staged_datastore = Some(stage_shared_datastore(ctx)?);
    engine_patched = patch_engine_db_path(&ctx.generator_cache_dir().join(ENGINE_BUNDLE_RELATIVE))?;
  }

  write_wrappers(ctx, &needed)?;
  register_routes(routing, &needed);

  splice_file(&ctx.env_file(), SPLICE_START_MARKER, SPLICE_END_MARKER, &env_block(ctx))?;
  splice_file(
    &ctx.redirects_file(),
    SPLICE_START_MARKER,
    SPLICE_END_MARKER,
    &redirects_block(&needed),
  )?;

  tracker.record(Phase::Build)?;
  info!(kinds = ?needed, "build phase complete");

  Ok(BuildResult {
    needed,
    wrappers_deleted,
    staged_datastore,
    engine_patched,
  })
}

/// Post-build phase: save caches and verify packaged bundles.
pub fn post_build(ctx: &BuildContext) -> Result<PostBuildResult, LifecycleError> {
  let store = CacheStore::new(&ctx.publish_dir);
  let tracker = PhaseTracker::new(store.root());
  check_order(&tracker, Phase::PostBuild)?;

  store.save(CACHE_KEY_PUBLISH, &ctx.publish_dir);
  store.save(CACHE_KEY_GENERATOR, &ctx.generator_cache_dir());

  let needed = resolve(ctx)?;

  let mut bundle_sizes = BTreeMap::new();
  for kind in &needed {
    let bundle = ctx.functions_dist.join(kind.bundle_file_name());
    let size = verify_bundle(&bundle, BUNDLE_SIZE_LIMIT)?;
    bundle_sizes.insert(*kind, size);
  }

  tracker.record(Phase::PostBuild)?;
  info!(bundles = bundle_sizes.len(), "post-build phase complete");

  Ok(PostBuildResult { needed, bundle_sizes })
}

/// Success phase: pre-warm the deployed entry-points.
pub async fn success(ctx: &BuildContext) -> Result<SuccessResult, LifecycleError> {
  let store = CacheStore::new(&ctx.publish_dir);
  let tracker = PhaseTracker::new(store.root());
  check_order(&tracker, Phase::Success)?;

  let needed = resolve(ctx)?;

  let (attempted, completed) = if !ctx.prewarm {
    info!("pre-warming disabled for this build mode");
    (0, 0)
  } else {
    match &ctx.deploy_url {
      Some(url) => {
        let completed = prewarm(&needed, url, ctx.prewarm_timeout).await;
        (needed.len(), completed)
      }
      None => {
        warn!("no deploy URL known, skipping pre-warm");
        (0, 0)
      }
    }
  };

  tracker.record(Phase::Success)?;
  info!(attempted, completed, "success phase complete");

  Ok(SuccessResult {
    needed,
    attempted,
    completed,
  })
}

/// Fail fast on a publish directory that would break packaging.
fn check_publish_dir(ctx: &BuildContext) -> Result<(), LifecycleError> {
  let publish = &ctx.publish_dir;
  if publish.as_os_str().is_empty() {
    return Err(LifecycleError::Misconfigured {
      publish: publish.display().to_string(),
    });
  }

  let cwd = std::env::current_dir().map_err(LifecycleError::Cwd)?;
  let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);
  let publish_abs = dunce::canonicalize(publish).unwrap_or_else(|_| cwd.join(publish));

  if publish_abs == cwd {
    return Err(LifecycleError::Misconfigured {
      publish: publish.display().to_string(),
    });
  }

  Ok(())
}

fn check_order(tracker: &PhaseTracker, phase: Phase) -> Result<(), LifecycleError> {
  let Some(expected) = phase.predecessor() else {
    return Ok(());
  };

  let last = tracker.last_completed()?;
  if last != Some(expected) {
    return Err(LifecycleError::PhaseOrder { phase, expected, last });
  }

  Ok(())
}

/// The generated block for the environment-variable file: the values the
/// generator and user functions need to address the deployed site.
fn env_block(ctx: &BuildContext) -> String {
  let mut block = String::from("\n");
  if let Some(url) = &ctx.deploy_url {
    block.push_str(&format!("SITE_URL={}\n", url));
  }
  block.push_str(&format!("FUNCTIONS_BASE={}\n", FUNCTIONS_URL_BASE));
  block
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::fs;
  use std::path::Path;
  use tempfile::TempDir;

  /// Run `f` with the cache root redirected into a temp directory.
  fn with_temp_cache<F, R>(f: F) -> R
  where
    F: FnOnce(&TempDir) -> R,
  {
    let temp = TempDir::new().unwrap();
    temp_env::with_vars(
      [
        ("XDG_CACHE_HOME", Some(temp.path().join("xdg-cache").to_str().unwrap())),
        ("HOME", Some(temp.path().to_str().unwrap())),
      ],
      || f(&temp),
    )
  }

  fn site_context(temp: &TempDir) -> BuildContext {
    let publish = temp.path().join("site").join("public");
    fs::create_dir_all(&publish).unwrap();
    let mut ctx = BuildContext::new(publish);
    ctx.prewarm = false;
    ctx
  }

  fn write_oracle(ctx: &BuildContext, manifest: &str, query_engine: bool) {
    let cache = ctx.generator_cache_dir();
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join("page-manifest.json"), manifest).unwrap();
    if query_engine {
      fs::create_dir_all(cache.join("query-engine")).unwrap();
    }
  }

  fn write_bundles(ctx: &BuildContext, kinds: &[FunctionKind]) {
    fs::create_dir_all(&ctx.functions_dist).unwrap();
    for kind in kinds {
      fs::write(ctx.functions_dist.join(kind.bundle_file_name()), b"zip").unwrap();
    }
  }

  #[test]
  #[serial]
  fn publish_dir_equal_to_cwd_fails_fast() {
    with_temp_cache(|_temp| {
      let cwd = std::env::current_dir().unwrap();
      let mut ctx = BuildContext::new(cwd);
      ctx.prewarm = false;

      let result = pre_build(&ctx);
      assert!(matches!(result, Err(LifecycleError::Misconfigured { .. })));
    });
  }

  #[test]
  #[serial]
  fn empty_publish_dir_fails_fast() {
    with_temp_cache(|_temp| {
      let ctx = BuildContext::new("");
      let result = pre_build(&ctx);
      assert!(matches!(result, Err(LifecycleError::Misconfigured { .. })));
    });
  }

  #[test]
  #[serial]
  fn misconfiguration_message_names_the_directory() {
    with_temp_cache(|_temp| {
      let cwd = std::env::current_dir().unwrap();
      let ctx = BuildContext::new(&cwd);

      let message = pre_build(&ctx).unwrap_err().to_string();
      assert!(message.contains(&cwd.display().to_string()));
      assert!(message.contains("publish directory"));
    });
  }

  #[test]
  #[serial]
  fn phases_enforce_their_order() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, "[]", false);
      let mut routing = RoutingConfig::default();

      // Build before pre-build is rejected.
      let result = build(&ctx, &mut routing);
      assert!(matches!(
        result,
        Err(LifecycleError::PhaseOrder {
          phase: Phase::Build,
          expected: Phase::PreBuild,
          last: None,
        })
      ));

      pre_build(&ctx).unwrap();
      build(&ctx, &mut routing).unwrap();

      // Re-entering a completed phase is rejected.
      let result = build(&ctx, &mut routing);
      assert!(matches!(result, Err(LifecycleError::PhaseOrder { .. })));

      post_build(&ctx).unwrap();

      let rt = tokio::runtime::Runtime::new().unwrap();
      rt.block_on(success(&ctx)).unwrap();
    });
  }

  #[test]
  #[serial]
  fn pre_build_resets_the_machine_for_the_next_build() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, "[]", false);
      let mut routing = RoutingConfig::default();

      pre_build(&ctx).unwrap();
      build(&ctx, &mut routing).unwrap();
      post_build(&ctx).unwrap();

      // The deploy failed: success never ran. The next build starts clean.
      pre_build(&ctx).unwrap();
      fs::remove_file(ctx.generator_cache_dir().join("functions.json")).ok();
      build(&ctx, &mut routing).unwrap();
    });
  }

  #[test]
  #[serial]
  fn needed_set_is_identical_across_phases() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, r#"[{"path": "/a", "mode": "SSR"}]"#, true);

      pre_build(&ctx).unwrap();

      let mut routing = RoutingConfig::default();
      let build_result = build(&ctx, &mut routing).unwrap();
      let expected: NeededFunctionSet = [FunctionKind::Api, FunctionKind::Ssr].into_iter().collect();
      assert_eq!(build_result.needed, expected);

      write_bundles(&ctx, &[FunctionKind::Api, FunctionKind::Ssr]);
      let post_result = post_build(&ctx).unwrap();
      assert_eq!(post_result.needed, expected);

      let rt = tokio::runtime::Runtime::new().unwrap();
      let success_result = rt.block_on(success(&ctx)).unwrap();
      assert_eq!(success_result.needed, expected);
    });
  }

  #[test]
  #[serial]
  fn second_build_trusts_the_restored_set() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, r#"[{"path": "/a", "mode": "SSR"}]"#, true);
      let mut routing = RoutingConfig::default();

      // First build: resolves {api, ssr} and saves the cache.
      pre_build(&ctx).unwrap();
      let first = build(&ctx, &mut routing).unwrap();
      write_bundles(&ctx, &[FunctionKind::Api, FunctionKind::Ssr]);
      post_build(&ctx).unwrap();

      // Second build from a fresh checkout: generator output is gone until
      // pre-build restores the cache.
      fs::remove_dir_all(ctx.generator_cache_dir()).unwrap();
      fs::remove_dir_all(&ctx.publish_dir).unwrap();
      fs::create_dir_all(&ctx.publish_dir).unwrap();

      pre_build(&ctx).unwrap();
      assert!(ctx.generator_cache_dir().join("functions.json").exists());

      // Even if the oracle now claims different kinds, the cached set wins.
      fs::write(
        ctx.generator_cache_dir().join("page-manifest.json"),
        r#"[{"path": "/a", "mode": "DSG"}]"#,
      )
      .unwrap();

      let mut routing = RoutingConfig::default();
      let second = build(&ctx, &mut routing).unwrap();
      assert_eq!(second.needed, first.needed);
      assert!(ctx.wrapper_dir().join("__api.js").exists());
      assert!(ctx.wrapper_dir().join("__ssr.js").exists());
      assert!(!ctx.wrapper_dir().join("__dsg.js").exists());
    });
  }

  #[test]
  #[serial]
  fn build_splices_env_and_redirects_files() {
    with_temp_cache(|temp| {
      let ctx = {
        let mut ctx = site_context(temp);
        ctx.deploy_url = Some("https://example.com".to_string());
        ctx
      };
      write_oracle(&ctx, r#"[{"path": "/a", "mode": "DSG"}]"#, false);

      // User content in both files must survive repeated builds.
      fs::write(ctx.redirects_file(), "# user rule\n/legacy /new 301\n").unwrap();
      fs::write(ctx.env_file(), "USER_VAR=keep\n").unwrap();

      pre_build(&ctx).unwrap();
      let mut routing = RoutingConfig::default();
      build(&ctx, &mut routing).unwrap();

      let redirects = fs::read_to_string(ctx.redirects_file()).unwrap();
      assert!(redirects.contains("# user rule\n/legacy /new 301\n"));
      assert!(redirects.contains("/*  /.functions/__dsg  200"));

      let env = fs::read_to_string(ctx.env_file()).unwrap();
      assert!(env.contains("USER_VAR=keep"));
      assert!(env.contains("SITE_URL=https://example.com"));

      // A rebuild of the same build would re-splice; the files stay stable.
      let redirects_before = redirects.clone();
      splice_file(
        &ctx.redirects_file(),
        SPLICE_START_MARKER,
        SPLICE_END_MARKER,
        &redirects_block(&[FunctionKind::Dsg].into_iter().collect()),
      )
      .unwrap();
      assert_eq!(fs::read_to_string(ctx.redirects_file()).unwrap(), redirects_before);
    });
  }

  #[test]
  #[serial]
  fn post_build_fails_on_oversized_bundle() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, r#"[{"path": "/a", "mode": "SSR"}]"#, false);

      pre_build(&ctx).unwrap();
      let mut routing = RoutingConfig::default();
      build(&ctx, &mut routing).unwrap();

      // No bundle was packaged at all.
      let result = post_build(&ctx);
      assert!(matches!(result, Err(LifecycleError::Verify(VerifyError::Missing { .. }))));
    });
  }

  #[test]
  #[serial]
  fn shared_datastore_build_stages_and_patches() {
    with_temp_cache(|temp| {
      let ctx = {
        let mut ctx = site_context(temp);
        ctx.shared_datastore = true;
        ctx
      };
      write_oracle(&ctx, "[]", true);

      let cache = ctx.generator_cache_dir();
      fs::create_dir_all(cache.join("data").join("datastore")).unwrap();
      fs::write(cache.join("data").join("datastore").join("data.mdb"), b"db").unwrap();
      fs::write(
        cache.join(ENGINE_BUNDLE_RELATIVE),
        r#"const dbPath = path.join(process.cwd(), ".cache", "data", "datastore");"#,
      )
      .unwrap();

      pre_build(&ctx).unwrap();
      let mut routing = RoutingConfig::default();
      let result = build(&ctx, &mut routing).unwrap();

      let staged = result.staged_datastore.expect("datastore should be staged");
      assert!(ctx.publish_dir.join(&staged).exists());
      assert!(ctx.publish_dir.join(".metadata.json").exists());
      assert!(result.engine_patched);
    });
  }

  #[test]
  #[serial]
  fn success_without_prewarm_still_records_phase() {
    with_temp_cache(|temp| {
      let ctx = site_context(temp);
      write_oracle(&ctx, "[]", false);

      pre_build(&ctx).unwrap();
      let mut routing = RoutingConfig::default();
      build(&ctx, &mut routing).unwrap();
      post_build(&ctx).unwrap();

      let rt = tokio::runtime::Runtime::new().unwrap();
      let result = rt.block_on(success(&ctx)).unwrap();
      assert_eq!(result.attempted, 0);

      let store = CacheStore::new(&ctx.publish_dir);
      let tracker = PhaseTracker::new(store.root());
      assert_eq!(tracker.last_completed().unwrap(), Some(Phase::Success));
    });
  }

  #[test]
  fn env_block_includes_deploy_url_when_known() {
    let mut ctx = BuildContext::new(Path::new("/site/public"));
    assert!(!env_block(&ctx).contains("SITE_URL"));

    ctx.deploy_url = Some("https://example.com".to_string());
    let block = env_block(&ctx);
    assert!(block.contains("SITE_URL=https://example.com\n"));
    assert!(block.contains("FUNCTIONS_BASE=/.functions/\n"));
  }
}
