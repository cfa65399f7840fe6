//! External stack-cache contract.
//!
//! The probe never sees the cache's internal representation; it only writes
//! through [`StackCache::insert`] and reads through [`StackCache::lookup`]
//! and [`StackCache::has_history_before`]. The storage engine (eviction,
//! LRU policy, the range-to-trace map) lives behind this trait.

/// Maximum number of candidates a single lookup may return.
pub const MAX_LOOKUP_RESPONSES: usize = 8;

/// Circumstance under which a stack trace was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum TraceKind {
    /// Object allocation.
    Alloc = 0,
    /// Generic save event (object touched or re-recorded).
    Save = 1,
}

/// One candidate entry returned by a cache lookup.
///
/// Valid only for the duration of the lookup call that produced it; the
/// scoring path reads it in place and retains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheQueryResponse {
    /// Start address of the recorded region.
    pub object: usize,
    /// Recorded extent length in bytes.
    pub size: usize,
    /// Number of stack frames recorded; zero means the address is known
    /// but no full trace is available.
    pub entry_count: u32,
}

impl CacheQueryResponse {
    /// An empty slot, used to build the reusable response buffer.
    pub const EMPTY: Self = Self {
        object: 0,
        size: 0,
        entry_count: 0,
    };
}

/// Descriptor for an allocation cache whose objects all share one size.
///
/// Stands in for the allocator's own cache descriptor; the convenience
/// save path derives the object size from it.
#[derive(Debug, Clone, Copy)]
pub struct AllocCacheDesc {
    /// Human-readable cache name.
    pub name: &'static str,
    /// Configured per-object size in bytes.
    pub object_size: usize,
}

/// Capability interface to the external stack cache.
///
/// Implementations provide their own internal synchronization; the probe
/// assumes every method is safe to call concurrently and never blocks on
/// the probe's own locks.
pub trait StackCache {
    /// Record `frames` as the stack trace for the region starting at
    /// `addr` with the given extent.
    fn insert(&self, addr: usize, size: usize, kind: TraceKind, frames: &[usize]);

    /// Populate `out` with candidate entries for the queried region,
    /// ordered by the cache's own recency policy. Returns the number of
    /// populated slots, at most `out.len()`.
    fn lookup(&self, addr: usize, size: usize, out: &mut [CacheQueryResponse]) -> usize;

    /// Whether the cache holds history for `addr` recorded before the
    /// probe subsystem finished initializing.
    fn has_history_before(&self, addr: usize) -> bool;
}
