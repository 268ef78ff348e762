//! Wrapper provisioning and route registration.
//!
//! Provisioning is destructive by design: every generated wrapper is deleted
//! before the current build's wrappers are written, so a wrapper from a
//! previous build with a different needed set can never linger and route
//! traffic to a function that no longer exists. Filesystem errors here are
//! fatal: a missing or stale wrapper silently breaks routing.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::RESERVED_FUNCTION_PREFIX;
use crate::context::BuildContext;
use crate::routing::{Redirect, RoutingConfig};
use crate::util::write_atomic;

use super::templates::wrapper_source;
use super::types::{FunctionKind, NeededFunctionSet};

/// Errors from provisioning wrapper files.
#[derive(Debug, Error)]
pub enum ProvisionError {
  /// Failed to list the wrapper directory.
  #[error("failed to scan functions directory {}: {source}", .path.display())]
  Scan {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to delete a stale wrapper.
  #[error("failed to delete stale wrapper {}: {source}", .path.display())]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write a wrapper.
  #[error("failed to write wrapper {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Delete every generated wrapper in the wrapper directory.
///
/// Wrappers are identified by the reserved name prefix; user-authored
/// functions are never touched. Returns the number of files removed. A
/// missing wrapper directory is not an error; there is nothing stale in it.
pub fn delete_wrappers(ctx: &BuildContext) -> Result<usize, ProvisionError> {
  let dir = ctx.wrapper_dir();

  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
    Err(e) => {
      return Err(ProvisionError::Scan {
        path: dir.to_path_buf(),
        source: e,
      });
    }
  };

  let mut deleted = 0;
  for entry in entries {
    let entry = entry.map_err(|e| ProvisionError::Scan {
      path: dir.to_path_buf(),
      source: e,
    })?;

    let name = entry.file_name();
    let is_generated = name.to_string_lossy().starts_with(RESERVED_FUNCTION_PREFIX);
    if !is_generated || !entry.path().is_file() {
      continue;
    }

    fs::remove_file(entry.path()).map_err(|e| ProvisionError::Delete {
      path: entry.path(),
      source: e,
    })?;
    debug!(path = %entry.path().display(), "deleted stale wrapper");
    deleted += 1;
  }

  if deleted > 0 {
    info!(count = deleted, dir = %dir.display(), "deleted stale wrappers");
  }
  Ok(deleted)
}

/// Write one wrapper file per needed entry-point kind.
pub fn write_wrappers(ctx: &BuildContext, needed: &NeededFunctionSet) -> Result<(), ProvisionError> {
  let dir = ctx.wrapper_dir();

  for kind in needed {
    let path = dir.join(kind.wrapper_file_name());
    write_atomic(&path, &wrapper_source(*kind)).map_err(|e| ProvisionError::Write {
      path: path.clone(),
      source: e,
    })?;
    debug!(kind = %kind, path = %path.display(), "wrote wrapper");
  }

  info!(count = needed.len(), dir = %dir.display(), "wrote function wrappers");
  Ok(())
}

/// Register each needed entry-point on the routing configuration.
///
/// Every kind gets a function registration. The API kind is additionally
/// rewritten from `/api/*`, and when the deferred-render kind is present a
/// catch-all rewrite routes unmatched requests to it. The catch-all is added
/// last so specific rules win. All mutation is guarded, so re-running
/// provisioning within a build cannot duplicate entries.
pub fn register_routes(routing: &mut RoutingConfig, needed: &NeededFunctionSet) {
  for kind in needed {
    routing.register_function(kind.function_name(), kind.route());
  }

  if needed.contains(&FunctionKind::Api) {
    routing.add_redirect(Redirect {
      from: "/api/*".to_string(),
      to: FunctionKind::Api.route(),
      status: 200,
    });
  }

  if needed.contains(&FunctionKind::Dsg) {
    routing.add_redirect(Redirect {
      from: "/*".to_string(),
      to: FunctionKind::Dsg.route(),
      status: 200,
    });
  }
}

/// The generated block for the request-redirects file, mirroring the rules
/// added to the routing configuration.
pub fn redirects_block(needed: &NeededFunctionSet) -> String {
  let mut block = String::from("\n");

  if needed.contains(&FunctionKind::Api) {
    block.push_str(&format!("/api/*  {}  200\n", FunctionKind::Api.route()));
  }
  if needed.contains(&FunctionKind::Dsg) {
    block.push_str(&format!("/*  {}  200\n", FunctionKind::Dsg.route()));
  }

  block
}
