//! Needed-function resolution.
//!
//! The generator's build output is the oracle for which entry-points a site
//! needs:
//! - a `query-engine/` directory in the generator cache means the site ships
//!   a synchronous API engine (`api`);
//! - `page-manifest.json` lists every page with its render mode; any `SSR`
//!   page needs `ssr`, any `DSG` page needs `dsg`. A missing manifest means
//!   a fully static site.
//!
//! The resolved set is persisted as a versioned JSON file inside the
//! generator cache directory, so later phases of the same build (which may
//! run in separate processes), and later builds that restore the cache,
//! read the identical set without recomputation.
//!
//! # Example State File
//!
//! ```json
//! {
//!   "version": 1,
//!   "kinds": ["api", "ssr"]
//! }
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::util::write_atomic;

use super::types::{FunctionKind, NeededFunctionSet};

/// State file name within the generator cache directory.
const STATE_FILENAME: &str = "functions.json";

/// Page manifest file name within the generator cache directory.
const PAGE_MANIFEST_FILENAME: &str = "page-manifest.json";

/// Directory marking the presence of the generator's query engine.
const QUERY_ENGINE_DIR: &str = "query-engine";

/// Current version of the persisted state format.
const FUNCTIONS_STATE_VERSION: u32 = 1;

/// Persisted needed-function set.
#[derive(Debug, Serialize, Deserialize)]
struct FunctionsState {
  version: u32,
  kinds: NeededFunctionSet,
}

/// One page record from the generator's page manifest. Only the render mode
/// matters here; the remaining fields are ignored.
#[derive(Debug, Deserialize)]
struct PageEntry {
  mode: String,
}

/// Errors from inspecting the generator's build output.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// Failed to read the page manifest.
  #[error("failed to read page manifest {}: {source}", .path.display())]
  ManifestRead {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The page manifest is not valid JSON.
  #[error("failed to parse page manifest {}: {source}", .path.display())]
  ManifestParse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

fn state_path(ctx: &BuildContext) -> PathBuf {
  ctx.generator_cache_dir().join(STATE_FILENAME)
}

/// Load the persisted needed-function set, if one exists.
///
/// Returns `None` when no set has been persisted yet, as distinct from
/// `Some(empty)`, which means a fully static site was resolved. A corrupt or
/// version-mismatched state file is treated as absent: the file rides a
/// cross-build cache this module does not exclusively own, so damage costs a
/// recomputation, never the build.
pub fn load(ctx: &BuildContext) -> Option<NeededFunctionSet> {
  let path = state_path(ctx);

  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to read needed-function state, recomputing");
      return None;
    }
  };

  let state: FunctionsState = match serde_json::from_str(&content) {
    Ok(state) => state,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "corrupt needed-function state, recomputing");
      return None;
    }
  };

  if state.version != FUNCTIONS_STATE_VERSION {
    warn!(
      path = %path.display(),
      version = state.version,
      "needed-function state has unknown version, recomputing"
    );
    return None;
  }

  Some(state.kinds)
}

/// Determine which entry-point kinds this build needs.
///
/// A previously persisted set is trusted without recomputation, so every
/// phase of one build sees identical kinds. Otherwise the generator output
/// is inspected and the result persisted for the phases (and builds) that
/// follow.
pub fn resolve(ctx: &BuildContext) -> Result<NeededFunctionSet, ResolveError> {
  if let Some(kinds) = load(ctx) {
    debug!(?kinds, "using cached needed-function set");
    return Ok(kinds);
  }

  let kinds = inspect(ctx)?;
  info!(?kinds, "resolved needed functions from generator output");

  persist(ctx, &kinds);
  Ok(kinds)
}

fn inspect(ctx: &BuildContext) -> Result<NeededFunctionSet, ResolveError> {
  let cache_dir = ctx.generator_cache_dir();
  let mut kinds = NeededFunctionSet::new();

  if cache_dir.join(QUERY_ENGINE_DIR).is_dir() {
    kinds.insert(FunctionKind::Api);
  }

  let manifest_path = cache_dir.join(PAGE_MANIFEST_FILENAME);
  let pages: Vec<PageEntry> = match fs::read_to_string(&manifest_path) {
    Ok(content) => serde_json::from_str(&content).map_err(|e| ResolveError::ManifestParse {
      path: manifest_path.clone(),
      source: e,
    })?,
    Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
    Err(e) => {
      return Err(ResolveError::ManifestRead {
        path: manifest_path,
        source: e,
      });
    }
  };

  for page in &pages {
    match page.mode.as_str() {
      "SSR" => {
        kinds.insert(FunctionKind::Ssr);
      }
      "DSG" => {
        kinds.insert(FunctionKind::Dsg);
      }
      _ => {}
    }
  }

  Ok(kinds)
}

/// Persist the resolved set. Failure is logged, not raised: a lost state
/// file costs a recomputation in a later phase, which yields the same set
/// because the generator output does not change within a build.
fn persist(ctx: &BuildContext, kinds: &NeededFunctionSet) {
  let state = FunctionsState {
    version: FUNCTIONS_STATE_VERSION,
    kinds: kinds.clone(),
  };

  let content = match serde_json::to_string_pretty(&state) {
    Ok(content) => content,
    Err(e) => {
      warn!(error = %e, "failed to serialize needed-function state");
      return;
    }
  };

  let path = state_path(ctx);
  if let Err(e) = write_atomic(&path, &content) {
    warn!(path = %path.display(), error = %e, "failed to persist needed-function state");
  }
}
