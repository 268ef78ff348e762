//! CLI output formatting utilities.

use owo_colors::{OwoColorize, Stream};
use sitebridge_lib::functions::NeededFunctionSet;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_kinds(kinds: &NeededFunctionSet) -> String {
  if kinds.is_empty() {
    return "none".to_string();
  }
  kinds.iter().map(|kind| kind.slug()).collect::<Vec<_>>().join(", ")
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}
