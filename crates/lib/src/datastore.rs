//! Shared-datastore staging.
//!
//! When the datastore is excluded from function bundles (to keep them under
//! the bundle size limit), the deployed functions download it from the site
//! itself at cold start. Staging copies the datastore into the publish
//! directory under a content-hashed name (so deploys remain
//! immutable-cacheable) and records that name in a metadata file the
//! functions read to locate it.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::consts::DATASTORE_HASH_LEN;
use crate::context::BuildContext;
use crate::util::write_atomic;

/// Metadata file name within the publish directory.
const METADATA_FILENAME: &str = ".metadata.json";

/// Datastore file location relative to the generator cache directory.
const DATASTORE_RELATIVE: &str = "data/datastore/data.mdb";

/// Metadata the deployed functions read to locate the staged datastore.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DatastoreMetadata {
  #[serde(rename = "fileName")]
  pub file_name: String,
}

/// Errors from staging the shared datastore.
#[derive(Debug, Error)]
pub enum DatastoreError {
  /// The build was configured for a shared datastore but the generator
  /// produced none.
  #[error("datastore file not found at {}; the generator did not produce one", .path.display())]
  Missing { path: PathBuf },

  /// Failed to hash the datastore file.
  #[error("failed to hash datastore {}: {source}", .path.display())]
  Hash {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to copy the datastore into the publish directory.
  #[error("failed to copy datastore to {}: {source}", .path.display())]
  Copy {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write the metadata file.
  #[error("failed to write datastore metadata {}: {source}", .path.display())]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Stage the generator's datastore into the publish directory.
///
/// Returns the staged file name. Idempotent: unchanged datastore bytes hash
/// to the same name, so re-staging rewrites identical files.
pub fn stage_shared_datastore(ctx: &BuildContext) -> Result<String, DatastoreError> {
  let src = ctx.generator_cache_dir().join(DATASTORE_RELATIVE);
  if !src.is_file() {
    return Err(DatastoreError::Missing { path: src });
  }

  let hash = hash_file(&src).map_err(|e| DatastoreError::Hash {
    path: src.clone(),
    source: e,
  })?;
  let file_name = format!("data-{}.mdb", &hash[..DATASTORE_HASH_LEN]);

  let dest = ctx.publish_dir.join(&file_name);
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(|e| DatastoreError::Copy {
      path: dest.clone(),
      source: e,
    })?;
  }
  fs::copy(&src, &dest).map_err(|e| DatastoreError::Copy {
    path: dest.clone(),
    source: e,
  })?;

  let metadata = DatastoreMetadata {
    file_name: file_name.clone(),
  };
  let metadata_path = ctx.publish_dir.join(METADATA_FILENAME);
  let content = serde_json::to_string_pretty(&metadata).map_err(|e| DatastoreError::Metadata {
    path: metadata_path.clone(),
    source: io::Error::other(e),
  })?;
  write_atomic(&metadata_path, &content).map_err(|e| DatastoreError::Metadata {
    path: metadata_path,
    source: e,
  })?;

  info!(file_name = %file_name, "staged shared datastore");
  Ok(file_name)
}

fn hash_file(path: &Path) -> io::Result<String> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(format!("{:x}", hasher.finalize()))
}
