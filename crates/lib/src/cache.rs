//! Cross-build cache store.
//!
//! Build phases may run in separate process invocations, and consecutive
//! builds of the same site start from a fresh checkout. The cache store
//! persists named directory trees ("entries") between those invocations.
//!
//! # Storage Layout
//!
//! ```text
//! {cache_dir}/sitebridge/{hash(publish_dir)}/
//! ├── phase.json          # lifecycle phase state (see lifecycle::state)
//! ├── publish/            # entry: previous publish directory
//! └── generator-cache/    # entry: previous generator cache directory
//! ```
//!
//! The root is derived from the canonicalized publish directory so multiple
//! sites sharing build infrastructure never collide.
//!
//! Cache failures are never fatal: losing a cached tree only costs a cold
//! rebuild, so every error here is logged and swallowed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::consts::CACHE_DIR_HASH_LEN;
use crate::platform::paths::cache_dir;
use crate::util::copy_tree;

/// Persists named directory trees between build invocations.
#[derive(Debug, Clone)]
pub struct CacheStore {
  /// Root directory holding this site's cache entries.
  root: PathBuf,
}

impl CacheStore {
  /// Create a store rooted at the deterministic location for `publish_dir`.
  pub fn new(publish_dir: &Path) -> Self {
    let canonical = dunce::canonicalize(publish_dir).unwrap_or_else(|_| publish_dir.to_path_buf());

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());

    Self {
      root: cache_dir().join(&digest[..CACHE_DIR_HASH_LEN]),
    }
  }

  /// Create a store at an explicit root.
  pub fn with_root(root: PathBuf) -> Self {
    Self { root }
  }

  /// Root directory of this store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn entry_path(&self, key: &str) -> PathBuf {
    self.root.join(key)
  }

  /// Materialize the cached tree named `key` at `dest`.
  ///
  /// Returns true when a cached tree existed and was copied out. Returns
  /// false (and leaves `dest` untouched) when no entry exists or the copy
  /// fails.
  pub fn restore(&self, key: &str, dest: &Path) -> bool {
    let entry = self.entry_path(key);

    if !entry.is_dir() {
      debug!(key, "no cached entry to restore");
      return false;
    }

    match copy_tree(&entry, dest) {
      Ok(()) => {
        info!(key, dest = %dest.display(), "restored cache entry");
        true
      }
      Err(e) => {
        warn!(key, error = %e, "failed to restore cache entry, continuing without it");
        false
      }
    }
  }

  /// Persist the tree at `src` under the name `key`, replacing any prior
  /// version.
  ///
  /// The copy lands in a temp sibling first and is swapped in by rename, so
  /// an interrupted save leaves either the old tree or the new one at the
  /// published path, never a partial copy.
  pub fn save(&self, key: &str, src: &Path) {
    if !src.is_dir() {
      debug!(key, src = %src.display(), "nothing to save");
      return;
    }

    if let Err(e) = self.save_inner(key, src) {
      warn!(key, error = %e, "failed to save cache entry, continuing");
    } else {
      info!(key, src = %src.display(), "saved cache entry");
    }
  }

  fn save_inner(&self, key: &str, src: &Path) -> io::Result<()> {
    let entry = self.entry_path(key);
    let temp = self.root.join(format!("{}.tmp", key));
    let old = self.root.join(format!("{}.old", key));

    // Leftovers from an interrupted previous save.
    remove_dir_if_exists(&temp)?;
    remove_dir_if_exists(&old)?;

    copy_tree(src, &temp)?;

    if entry.is_dir() {
      fs::rename(&entry, &old)?;
    }
    fs::rename(&temp, &entry)?;
    remove_dir_if_exists(&old)?;

    Ok(())
  }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}
