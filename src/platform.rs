//! Platform abstraction layer for execution-environment queries.
//!
//! The sampler needs three answers from its host: whether the current
//! context permits taking a lock at all, whether an address is backed by
//! the allocation-cache subsystem, and a source of cheap randomness. This
//! module abstracts those behind a trait to allow testing in user space.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Platform operations trait.
///
/// Abstracts over kernel-specific queries to enable mock testing. Every
/// method is called on the memory-access hot path and must be O(1).
pub trait PlatformOps {
    /// Whether the current execution context is an ordinary task context.
    ///
    /// Interrupt-like contexts return false; the sampler rejects the
    /// access rather than risk adding latency there.
    fn in_task() -> bool;

    /// Whether `addr` resolves to memory managed by the allocation-cache
    /// subsystem. Non-heap accesses are of no interest to the probe.
    fn is_heap_addr(addr: usize) -> bool;

    /// Cheap pseudo-random word for query-address perturbation.
    fn random_u32() -> u32;
}

// =============================================================================
// Mock Implementation (test environment)
// =============================================================================

/// Mock in-task flag for testing.
static MOCK_IN_TASK: AtomicBool = AtomicBool::new(true);

/// Mock heap range for testing (inclusive start, exclusive end).
static MOCK_HEAP_START: AtomicUsize = AtomicUsize::new(0);
static MOCK_HEAP_END: AtomicUsize = AtomicUsize::new(usize::MAX);

/// Mock random value for testing. The default of 32 makes the derived
/// query offset zero, so lookups probe the exact access address.
static MOCK_RANDOM: AtomicU32 = AtomicU32::new(32);

/// Mock platform operations for testing.
pub struct MockPlatform;

impl PlatformOps for MockPlatform {
    fn in_task() -> bool {
        MOCK_IN_TASK.load(Ordering::Relaxed)
    }

    fn is_heap_addr(addr: usize) -> bool {
        let start = MOCK_HEAP_START.load(Ordering::Relaxed);
        let end = MOCK_HEAP_END.load(Ordering::Relaxed);
        addr >= start && addr < end
    }

    fn random_u32() -> u32 {
        MOCK_RANDOM.load(Ordering::Relaxed)
    }
}

/// Set the mock execution context for testing.
pub fn set_mock_in_task(in_task: bool) {
    MOCK_IN_TASK.store(in_task, Ordering::Relaxed);
}

/// Restrict the mock heap to `[start, end)` for testing.
pub fn set_mock_heap_range(start: usize, end: usize) {
    MOCK_HEAP_START.store(start, Ordering::Relaxed);
    MOCK_HEAP_END.store(end, Ordering::Relaxed);
}

/// Pin the mock random source to a fixed value for testing.
pub fn set_mock_random(value: u32) {
    MOCK_RANDOM.store(value, Ordering::Relaxed);
}

// =============================================================================
// Tests
// =============================================================================
