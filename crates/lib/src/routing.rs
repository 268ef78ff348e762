//! Hosting-platform routing configuration.
//!
//! The [`RoutingConfig`] is owned by the orchestrator's caller and handed in
//! mutably for the build phase. This module only appends entries it owns
//! (redirect rules and function registrations) and never replaces the object
//! or touches fields it did not write.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
  /// Request path pattern, e.g. `/api/*`.
  pub from: String,

  /// Target path, e.g. `/.functions/__api`.
  pub to: String,

  /// HTTP status served with the redirect (200 for rewrites).
  pub status: u16,
}

/// The platform's routing configuration for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
  /// Redirect rules, evaluated in order; catch-alls belong at the end.
  #[serde(default)]
  pub redirects: Vec<Redirect>,

  /// Registered functions: name to routed path.
  #[serde(default)]
  pub functions: BTreeMap<String, String>,
}

impl RoutingConfig {
  /// Append a redirect unless an identical rule is already present.
  ///
  /// Returns true when the rule was added. The guard keeps repeated
  /// provisioning within one build from duplicating entries.
  pub fn add_redirect(&mut self, redirect: Redirect) -> bool {
    if self.redirects.contains(&redirect) {
      return false;
    }
    self.redirects.push(redirect);
    true
  }

  /// Register a function route, overwriting a prior registration of the
  /// same name.
  pub fn register_function(&mut self, name: impl Into<String>, route: impl Into<String>) {
    self.functions.insert(name.into(), route.into());
  }
}
