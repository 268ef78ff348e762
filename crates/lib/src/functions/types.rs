//! Entry-point kinds and the needed-function set.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{FUNCTIONS_URL_BASE, RESERVED_FUNCTION_PREFIX};

/// One of the fixed serverless entry-point roles a site can need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
  /// Synchronous API path backed by the generator's query engine.
  Api,

  /// On-demand server-side render path.
  Ssr,

  /// Deferred render path: pages generated on first request and cached.
  Dsg,
}

/// The set of entry-point kinds one build requires.
///
/// Computed once per build and treated as immutable for the build's
/// remaining phases.
pub type NeededFunctionSet = BTreeSet<FunctionKind>;

impl FunctionKind {
  /// All kinds, in routing order.
  pub const ALL: [FunctionKind; 3] = [FunctionKind::Api, FunctionKind::Ssr, FunctionKind::Dsg];

  /// Lowercase identifier used in file and route names.
  pub fn slug(self) -> &'static str {
    match self {
      FunctionKind::Api => "api",
      FunctionKind::Ssr => "ssr",
      FunctionKind::Dsg => "dsg",
    }
  }

  /// Deployed function name, e.g. `__api`.
  pub fn function_name(self) -> String {
    format!("{}{}", RESERVED_FUNCTION_PREFIX, self.slug())
  }

  /// File name of the generated wrapper, e.g. `__api.js`.
  pub fn wrapper_file_name(self) -> String {
    format!("{}.js", self.function_name())
  }

  /// File name of the packaged bundle, e.g. `__api.zip`.
  pub fn bundle_file_name(self) -> String {
    format!("{}.zip", self.function_name())
  }

  /// Routed URL path, e.g. `/.functions/__api`.
  pub fn route(self) -> String {
    format!("{}{}", FUNCTIONS_URL_BASE, self.function_name())
  }
}

impl fmt::Display for FunctionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.slug())
  }
}
