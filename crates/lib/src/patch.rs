//! Path patch for the generator's engine bundle.
//!
//! The generator's query-engine bundle resolves its datastore relative to
//! the process working directory, which does not exist inside a function
//! sandbox (functions run from a read-only task root with only a scratch
//! directory writable). Until that is fixed upstream, the bundle gets a
//! single exact-substring rewrite pointing it at the scratch directory.
//!
//! The transform is guarded by a precondition (it only fires when the
//! expected substring is present), so an upstream fix turns it into a
//! logged no-op rather than corrupting the bundle. It is idempotent: the
//! needle disappears after the first application.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::util::write_atomic;

/// Engine bundle location relative to the generator cache directory.
pub const ENGINE_BUNDLE_RELATIVE: &str = "query-engine/index.js";

const DB_PATH_NEEDLE: &str = r#"path.join(process.cwd(), ".cache", "data", "datastore")"#;
const DB_PATH_REPLACEMENT: &str = r#"path.join(require("os").tmpdir(), "data", "datastore")"#;

/// Errors from patching the engine bundle.
#[derive(Debug, Error)]
pub enum PatchError {
  /// Failed to read the bundle.
  #[error("failed to read engine bundle {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write the patched bundle.
  #[error("failed to write engine bundle {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Rewrite the engine bundle's datastore path for the function sandbox.
///
/// Returns true when the patch was applied, false when the bundle is absent
/// or already carries no needle (both no-ops).
pub fn patch_engine_db_path(bundle: &Path) -> Result<bool, PatchError> {
  let content = match fs::read_to_string(bundle) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = %bundle.display(), "no engine bundle to patch");
      return Ok(false);
    }
    Err(e) => {
      return Err(PatchError::Read {
        path: bundle.to_path_buf(),
        source: e,
      });
    }
  };

  if !content.contains(DB_PATH_NEEDLE) {
    debug!(path = %bundle.display(), "engine bundle carries no datastore-path needle, skipping patch");
    return Ok(false);
  }

  let patched = content.replace(DB_PATH_NEEDLE, DB_PATH_REPLACEMENT);
  write_atomic(bundle, &patched).map_err(|e| PatchError::Write {
    path: bundle.to_path_buf(),
    source: e,
  })?;

  info!(path = %bundle.display(), "patched engine bundle datastore path");
  Ok(true)
}
