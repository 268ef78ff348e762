//! Idempotent marker-delimited splicing of generated text files.
//!
//! Target files (redirect rules, env files) have no parser here: everything
//! outside the marker pair is opaque text and is never touched. The region
//! between the markers is owned by this module and rewritten wholesale.
//!
//! Invariant: at most one region per marker pair per file, and applying the
//! same splice twice yields a byte-identical file. Markers must not occur
//! inside `content`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::util::write_atomic;

/// Errors from splicing a file on disk.
#[derive(Debug, Error)]
pub enum SpliceError {
  /// Failed to read the target file.
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write the target file.
  #[error("failed to write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Replace the marked region of `existing` with `start + content + end`.
///
/// When both markers are present (start before end), the whole region
/// including the markers is rewritten in place. When neither is present a
/// fresh region is appended. An orphaned marker from a corrupted prior edit
/// is left in place and a fresh region appended; the search anchors on the
/// last start marker so repeated applications converge on the appended
/// region rather than swallowing unrelated text.
pub fn splice_text(existing: &str, start: &str, end: &str, content: &str) -> String {
  if let Some(start_idx) = existing.rfind(start) {
    let search_from = start_idx + start.len();
    if let Some(rel_end) = existing[search_from..].find(end) {
      let end_idx = search_from + rel_end + end.len();

      let mut out = String::with_capacity(existing.len() + content.len());
      out.push_str(&existing[..start_idx]);
      out.push_str(start);
      out.push_str(content);
      out.push_str(end);
      out.push_str(&existing[end_idx..]);
      return out;
    }
  }

  let mut out = String::with_capacity(existing.len() + start.len() + content.len() + end.len() + 2);
  out.push_str(existing);
  out.push('\n');
  out.push_str(start);
  out.push_str(content);
  out.push_str(end);
  out.push('\n');
  out
}

/// Splice `content` into the marked region of the file at `path`.
///
/// A missing file is treated as empty. The rewrite is atomic
/// (write-then-rename), so a crash mid-write cannot corrupt the file.
pub fn splice_file(path: &Path, start: &str, end: &str, content: &str) -> Result<(), SpliceError> {
  let existing = match fs::read_to_string(path) {
    Ok(existing) => existing,
    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
    Err(e) => {
      return Err(SpliceError::Read {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  let updated = splice_text(&existing, start, end, content);
  if updated == existing {
    debug!(path = %path.display(), "spliced region already up to date");
    return Ok(());
  }

  write_atomic(path, &updated).map_err(|e| SpliceError::Write {
    path: path.to_path_buf(),
    source: e,
  })?;

  info!(path = %path.display(), "spliced generated region");
  Ok(())
}
