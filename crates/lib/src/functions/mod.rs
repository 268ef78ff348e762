//! Serverless entry-point kinds: resolution, wrapper provisioning, and route
//! registration.

pub mod provision;
pub mod resolve;
pub mod templates;
pub mod types;

pub use provision::{ProvisionError, delete_wrappers, redirects_block, register_routes, write_wrappers};
pub use resolve::{ResolveError, load, resolve};
pub use types::{FunctionKind, NeededFunctionSet};
