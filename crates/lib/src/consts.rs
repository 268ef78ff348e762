//! Shared constants.

/// Application name, used for cache paths and splice markers.
pub const APP_NAME: &str = "sitebridge";

/// File-name prefix reserved for generated function wrappers, so they can
/// never collide with user-authored functions.
pub const RESERVED_FUNCTION_PREFIX: &str = "__";

/// URL base path under which generated entry-points are routed.
pub const FUNCTIONS_URL_BASE: &str = "/.functions/";

/// Hard limit on a deployable function bundle, in bytes (50 MiB).
pub const BUNDLE_SIZE_LIMIT: u64 = 50 * 1024 * 1024;

/// Start marker for spliced regions in `#`-commented files.
pub const SPLICE_START_MARKER: &str = "# sitebridge start";

/// End marker for spliced regions in `#`-commented files.
pub const SPLICE_END_MARKER: &str = "# sitebridge end";

/// Hex characters of the publish-dir hash used to name a site's cache root.
pub const CACHE_DIR_HASH_LEN: usize = 16;

/// Hex characters of the content hash used in staged datastore file names.
pub const DATASTORE_HASH_LEN: usize = 12;
