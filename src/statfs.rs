//! Debug filesystem surface for the probe counters.
//!
//! The probe exposes exactly two numeric files under one directory; the
//! host supplies the filesystem through [`DebugFs`] and serves reads by
//! loading the registered counters on demand. Writes through the surface
//! are permitted by some hosts but are not meaningful to the probe.

use core::sync::atomic::AtomicU64;

/// Directory holding the probe's stat files.
pub const STATS_DIR: &str = "stackcache";

/// File exposing attempts that reached the scoring stage.
pub const LOOKUP_COUNT_FILE: &str = "lookup_count";

/// File exposing attempts where a candidate covered the access.
pub const LOOKUP_SUCCESS_FILE: &str = "lookup_success";

/// Capability interface to the host's debug/introspection filesystem.
pub trait DebugFs {
    /// Host-specific directory handle.
    type Dir;

    /// Create a directory at the filesystem root. Returns `None` if the
    /// directory could not be created; registration aborts in that case.
    fn create_dir(&mut self, name: &'static str) -> Option<Self::Dir>;

    /// Create a numeric file inside `dir` whose content is loaded from
    /// `value` on every read. The reference is retained for the life of
    /// the process.
    fn create_u64(&mut self, dir: &Self::Dir, name: &'static str, value: &'static AtomicU64);
}
