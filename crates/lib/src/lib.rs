//! sitebridge-lib: Core types and logic for sitebridge
//!
//! This crate bridges a static-site generator's build output with a
//! serverless hosting platform. It provides:
//! - `BuildContext`: immutable per-invocation configuration
//! - `CacheStore`: directory trees persisted between build invocations
//! - `FunctionKind` / needed-function resolution: which serverless
//!   entry-points a site requires
//! - `splice`: idempotent marker-delimited edits to generated text files
//! - `lifecycle`: the four ordered build phases tying it all together

pub mod cache;
pub mod consts;
pub mod context;
pub mod datastore;
pub mod functions;
pub mod lifecycle;
pub mod patch;
pub mod platform;
pub mod prewarm;
pub mod routing;
pub mod splice;
pub mod util;
pub mod verify;
