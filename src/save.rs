//! Save path: record a stack trace for a newly significant object.
//!
//! Invoked from object-creation hot paths. Deliberately takes none of the
//! sampler's locks; the write side and the read side of the cache have
//! different latency budgets and must not contend with each other.

use crate::cache::{AllocCacheDesc, StackCache, TraceKind};
use crate::capture::{self, MAX_TRACE_DEPTH, TraceCapture};

/// Capture the current call stack and record it for `[addr, addr + size)`.
///
/// Insertion failures (cache full, eviction in progress) are the cache's
/// concern and are not signaled here.
pub fn save<T: TraceCapture, C: StackCache>(
    cache: &C,
    kind: TraceKind,
    addr: usize,
    size: usize,
) {
    let mut frames = [0usize; MAX_TRACE_DEPTH];
    let nr = capture::capture_trace::<T>(&mut frames);

    cache.insert(addr, size, kind, &frames[..nr]);
}

/// [`save`] variant deriving the extent from an allocation-cache
/// descriptor's configured object size.
pub fn save_from_desc<T: TraceCapture, C: StackCache>(
    cache: &C,
    kind: TraceKind,
    addr: usize,
    desc: &AllocCacheDesc,
) {
    save::<T, C>(cache, kind, addr, desc.object_size);
}
