//! Source templates for generated function wrappers.
//!
//! Each needed entry-point kind gets one wrapper file that hands the request
//! to the site's render engine. Wrappers are regenerated on every build, so
//! the header warns against editing them in place.

use super::types::FunctionKind;

/// Render the wrapper source for one entry-point kind.
pub fn wrapper_source(kind: FunctionKind) -> String {
  let slug = kind.slug();
  let engine = match kind {
    FunctionKind::Api => "createApiHandler",
    FunctionKind::Ssr | FunctionKind::Dsg => "createPageHandler",
  };

  format!(
    r#"// Generated by sitebridge. Rewritten on every build; do not edit.
const {{ {engine} }} = require("./render");

exports.handler = {engine}("{slug}");
"#
  )
}
