//! Cached environment variable lookups for debug tracing
//! Checked once and cached so per-read hot paths never call getenv

use std::sync::OnceLock;

static DEBUG_FIELDS_CACHE: OnceLock<bool> = OnceLock::new();
/// Trace every decoded field (`RRC_DEBUG_FIELDS`)
pub fn debug_fields() -> bool {
    *DEBUG_FIELDS_CACHE.get_or_init(|| std::env::var("RRC_DEBUG_FIELDS").is_ok())
}

static DEBUG_MERGE_CACHE: OnceLock<bool> = OnceLock::new();
/// Trace merge engine steps (`RRC_DEBUG_MERGE`)
pub fn debug_merge() -> bool {
    *DEBUG_MERGE_CACHE.get_or_init(|| std::env::var("RRC_DEBUG_MERGE").is_ok())
}
