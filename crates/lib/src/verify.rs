//! Deployable bundle verification.
//!
//! Called once per needed entry-point after packaging. A bundle over the
//! platform's hard size limit would be rejected at deploy time with an
//! opaque error; failing here names the offending bundle and both sizes. A
//! missing bundle is a distinct failure: it means an earlier phase failed
//! silently, not that the site outgrew the limit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from verifying a packaged bundle.
#[derive(Debug, Error)]
pub enum VerifyError {
  /// The expected artifact was never produced.
  #[error("expected artifact not produced: {}", .path.display())]
  Missing { path: PathBuf },

  /// The bundle exceeds the platform's size limit.
  #[error(
    "bundle {} is {size} bytes, which is larger than the maximum supported size of {limit} bytes",
    .path.display()
  )]
  TooLarge { path: PathBuf, size: u64, limit: u64 },

  /// The bundle could not be inspected.
  #[error("failed to stat bundle {}: {source}", .path.display())]
  Stat {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Check one bundle against the size limit. Returns its size in bytes.
pub fn verify_bundle(path: &Path, limit: u64) -> Result<u64, VerifyError> {
  let metadata = match fs::metadata(path) {
    Ok(metadata) => metadata,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      return Err(VerifyError::Missing {
        path: path.to_path_buf(),
      });
    }
    Err(e) => {
      return Err(VerifyError::Stat {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  let size = metadata.len();
  if size > limit {
    return Err(VerifyError::TooLarge {
      path: path.to_path_buf(),
      size,
      limit,
    });
  }

  debug!(path = %path.display(), size, "bundle within size limit");
  Ok(size)
}
