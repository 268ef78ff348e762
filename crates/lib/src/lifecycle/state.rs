//! Durable phase-ordering state.
//!
//! The four lifecycle phases run in separate process invocations, so the
//! ordering guarantee cannot live in memory: the last completed phase is
//! recorded in a versioned JSON file at the cache root and re-read at the
//! start of the next phase.
//!
//! # Storage Layout
//!
//! ```text
//! {cache root}/phase.json
//! ```
//!
//! # Example State File
//!
//! ```json
//! {
//!   "version": 1,
//!   "last_completed": "build"
//! }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::write_atomic;

/// State file name within the cache root.
const STATE_FILENAME: &str = "phase.json";

/// Current version of the persisted state format.
const PHASE_STATE_VERSION: u32 = 1;

/// One of the four ordered lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
  PreBuild,
  Build,
  PostBuild,
  Success,
}

impl Phase {
  /// The phase that must have completed immediately before this one.
  ///
  /// `PreBuild` has no predecessor: it is admissible from any recorded
  /// state and resets the machine for a new build.
  pub fn predecessor(self) -> Option<Phase> {
    match self {
      Phase::PreBuild => None,
      Phase::Build => Some(Phase::PreBuild),
      Phase::PostBuild => Some(Phase::Build),
      Phase::Success => Some(Phase::PostBuild),
    }
  }

  /// Hyphenated phase name, matching the CLI subcommands.
  pub fn name(self) -> &'static str {
    match self {
      Phase::PreBuild => "pre-build",
      Phase::Build => "build",
      Phase::PostBuild => "post-build",
      Phase::Success => "success",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// Persisted phase state.
#[derive(Debug, Serialize, Deserialize)]
struct PhaseState {
  version: u32,
  last_completed: Option<Phase>,
}

/// Errors from persisting phase state.
///
/// Unlike cache entries, the phase file is required for correctness (it
/// carries the ordering guarantee), so failures here are surfaced.
#[derive(Debug, Error)]
pub enum StateError {
  /// Failed to read the phase state file.
  #[error("failed to read phase state: {0}")]
  Read(#[source] io::Error),

  /// Failed to write the phase state file.
  #[error("failed to write phase state: {0}")]
  Write(#[source] io::Error),

  /// Failed to serialize phase state.
  #[error("failed to serialize phase state: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Reads and records the last completed phase for one site.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
  path: PathBuf,
}

impl PhaseTracker {
  /// Create a tracker storing its state at the given cache root.
  pub fn new(cache_root: &Path) -> Self {
    Self {
      path: cache_root.join(STATE_FILENAME),
    }
  }

  /// The last phase recorded as completed, if any.
  ///
  /// A corrupt or version-mismatched file reads as `None`: the machine then
  /// only admits `PreBuild`, which is the safe direction to fail in.
  pub fn last_completed(&self) -> Result<Option<Phase>, StateError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(StateError::Read(e)),
    };

    let state: PhaseState = match serde_json::from_str(&content) {
      Ok(state) => state,
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "corrupt phase state, treating as fresh");
        return Ok(None);
      }
    };

    if state.version != PHASE_STATE_VERSION {
      warn!(
        path = %self.path.display(),
        version = state.version,
        "phase state has unknown version, treating as fresh"
      );
      return Ok(None);
    }

    Ok(state.last_completed)
  }

  /// Record `phase` as the last completed phase.
  ///
  /// Written atomically so the next invocation reads either the old record
  /// or the new one, never a torn file.
  pub fn record(&self, phase: Phase) -> Result<(), StateError> {
    let state = PhaseState {
      version: PHASE_STATE_VERSION,
      last_completed: Some(phase),
    };

    let content = serde_json::to_string_pretty(&state).map_err(StateError::Serialize)?;
    write_atomic(&self.path, &content).map_err(StateError::Write)?;

    debug!(phase = %phase, "recorded completed phase");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn fresh_tracker_has_no_completed_phase() {
    let temp = TempDir::new().unwrap();
    let tracker = PhaseTracker::new(temp.path());
    assert_eq!(tracker.last_completed().unwrap(), None);
  }

  #[test]
  fn record_and_read_roundtrip() {
    let temp = TempDir::new().unwrap();
    let tracker = PhaseTracker::new(temp.path());

    tracker.record(Phase::Build).unwrap();

    assert_eq!(tracker.last_completed().unwrap(), Some(Phase::Build));
  }

  #[test]
  fn record_overwrites_previous_phase() {
    let temp = TempDir::new().unwrap();
    let tracker = PhaseTracker::new(temp.path());

    tracker.record(Phase::PreBuild).unwrap();
    tracker.record(Phase::Build).unwrap();

    assert_eq!(tracker.last_completed().unwrap(), Some(Phase::Build));
  }

  #[test]
  fn corrupt_state_reads_as_fresh() {
    let temp = TempDir::new().unwrap();
    let tracker = PhaseTracker::new(temp.path());
    fs::write(temp.path().join(STATE_FILENAME), "{{{ not json").unwrap();

    assert_eq!(tracker.last_completed().unwrap(), None);
  }

  #[test]
  fn unknown_version_reads_as_fresh() {
    let temp = TempDir::new().unwrap();
    let tracker = PhaseTracker::new(temp.path());
    fs::write(
      temp.path().join(STATE_FILENAME),
      r#"{"version": 99, "last_completed": "build"}"#,
    )
    .unwrap();

    assert_eq!(tracker.last_completed().unwrap(), None);
  }

  #[test]
  fn phase_names_match_cli_subcommands() {
    assert_eq!(Phase::PreBuild.name(), "pre-build");
    assert_eq!(Phase::Build.name(), "build");
    assert_eq!(Phase::PostBuild.name(), "post-build");
    assert_eq!(Phase::Success.name(), "success");
  }

  #[test]
  fn predecessors_form_the_fixed_order() {
    assert_eq!(Phase::PreBuild.predecessor(), None);
    assert_eq!(Phase::Build.predecessor(), Some(Phase::PreBuild));
    assert_eq!(Phase::PostBuild.predecessor(), Some(Phase::Build));
    assert_eq!(Phase::Success.predecessor(), Some(Phase::PostBuild));
  }
}
