//! Filesystem helpers shared across modules.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Write `content` to `path` atomically.
///
/// Writes to a temp sibling, then renames over the target, so a crash
/// mid-write cannot leave a half-written file. Creates parent directories
/// as needed.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }

  let file_name = path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| "file".to_string());
  let temp_path = path.with_file_name(format!("{}.tmp", file_name));

  fs::write(&temp_path, content)?;
  fs::rename(&temp_path, path)?;

  Ok(())
}

/// Recursively copy a directory tree from `src` to `dest`.
///
/// Existing files at `dest` are overwritten; files present only at `dest`
/// are left in place.
pub fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
  fs::create_dir_all(dest)?;

  for entry in WalkDir::new(src) {
    let entry = entry.map_err(io::Error::other)?;
    let rel_path = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    if rel_path.as_os_str().is_empty() {
      continue;
    }

    let dest_path = dest.join(rel_path);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&dest_path)?;
    } else {
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::copy(entry.path(), &dest_path)?;
    }
  }

  Ok(())
}
