//! Integration tests for registration, lifecycle, and the stat surface.

use std::sync::atomic::{AtomicU64, Ordering};

use stackcache_hitrate::platform::MockPlatform;
use stackcache_hitrate::sampler::{Error, ProbeLifecycle, ProbeState, SAMPLING_PERIOD};
use stackcache_hitrate::statfs::{DebugFs, LOOKUP_COUNT_FILE, LOOKUP_SUCCESS_FILE, STATS_DIR};
use stackcache_hitrate::{CacheQueryResponse, StackCache, TraceKind};

// =============================================================================
// Test Fixtures
// =============================================================================

/// In-memory debug filesystem recording directories and counter files.
#[derive(Default)]
struct MockDebugFs {
    fail_dir: bool,
    dirs: Vec<&'static str>,
    files: Vec<(&'static str, &'static str, &'static AtomicU64)>,
}

impl MockDebugFs {
    fn read_u64(&self, dir: &str, name: &str) -> Option<u64> {
        self.files
            .iter()
            .find(|(d, n, _)| *d == dir && *n == name)
            .map(|(_, _, v)| v.load(Ordering::Relaxed))
    }
}

impl DebugFs for MockDebugFs {
    type Dir = &'static str;

    fn create_dir(&mut self, name: &'static str) -> Option<&'static str> {
        if self.fail_dir {
            return None;
        }
        self.dirs.push(name);
        Some(name)
    }

    fn create_u64(&mut self, dir: &&'static str, name: &'static str, value: &'static AtomicU64) {
        self.files.push((*dir, name, value));
    }
}

/// Cache holding one covering entry.
struct OneEntryCache;

impl StackCache for OneEntryCache {
    fn insert(&self, _addr: usize, _size: usize, _kind: TraceKind, _frames: &[usize]) {}

    fn lookup(&self, _addr: usize, _size: usize, out: &mut [CacheQueryResponse]) -> usize {
        out[0] = CacheQueryResponse {
            object: 0x1000,
            size: 0x20,
            entry_count: 3,
        };
        1
    }

    fn has_history_before(&self, _addr: usize) -> bool {
        true
    }
}

fn leaked_probe() -> &'static ProbeState {
    Box::leak(Box::new(ProbeState::new()))
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_creates_stat_surface() {
    let probe = leaked_probe();
    let mut fs = MockDebugFs::default();

    assert_eq!(probe.register(&mut fs), Ok(()));
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Registered);

    assert_eq!(fs.dirs, vec![STATS_DIR]);
    assert_eq!(fs.read_u64(STATS_DIR, LOOKUP_COUNT_FILE), Some(0));
    assert_eq!(fs.read_u64(STATS_DIR, LOOKUP_SUCCESS_FILE), Some(0));
}

#[test]
fn test_register_twice_fails() {
    let probe = leaked_probe();
    let mut fs = MockDebugFs::default();

    assert_eq!(probe.register(&mut fs), Ok(()));
    assert_eq!(probe.register(&mut fs), Err(Error::AlreadyRegistered));
}

#[test]
fn test_register_failure_leaves_probe_inert() {
    let probe = leaked_probe();
    let mut fs = MockDebugFs {
        fail_dir: true,
        ..Default::default()
    };

    assert_eq!(probe.register(&mut fs), Err(Error::StatDirCreateFailed));
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Uninitialized);
    assert!(fs.files.is_empty());

    // Enable is refused and the sampler permanently no-ops.
    assert_eq!(probe.enable(), Err(Error::NotRegistered));
    for _ in 0..SAMPLING_PERIOD {
        probe.on_memory_access::<MockPlatform, _>(&OneEntryCache, 0x1000, 8);
    }
    assert_eq!(probe.stats().lookup_count, 0);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_lifecycle_transitions_in_order() {
    let probe = leaked_probe();
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Uninitialized);

    probe.register(&mut MockDebugFs::default()).unwrap();
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Registered);

    probe.enable().unwrap();
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Active);
}

#[test]
fn test_enable_before_register_fails() {
    let probe = ProbeState::new();
    assert_eq!(probe.enable(), Err(Error::NotRegistered));
}

#[test]
fn test_enable_twice_fails() {
    let probe = leaked_probe();
    probe.register(&mut MockDebugFs::default()).unwrap();

    assert_eq!(probe.enable(), Ok(()));
    assert_eq!(probe.enable(), Err(Error::AlreadyEnabled));
    // Still Active; the failed second enable changes nothing.
    assert_eq!(probe.lifecycle(), ProbeLifecycle::Active);
}

// =============================================================================
// Exposure Tests
// =============================================================================

#[test]
fn test_stat_files_observe_counters() {
    let probe = leaked_probe();
    let mut fs = MockDebugFs::default();
    probe.register(&mut fs).unwrap();
    probe.enable().unwrap();

    for _ in 0..2 * SAMPLING_PERIOD {
        probe.on_memory_access::<MockPlatform, _>(&OneEntryCache, 0x1000, 0x10);
    }

    // The registered files read the live counters, not copies.
    assert_eq!(fs.read_u64(STATS_DIR, LOOKUP_COUNT_FILE), Some(2));
    assert_eq!(fs.read_u64(STATS_DIR, LOOKUP_SUCCESS_FILE), Some(2));
}

#[test]
fn test_hit_permille() {
    use stackcache_hitrate::ProbeStats;

    let none = ProbeStats {
        lookup_count: 0,
        lookup_success: 0,
    };
    assert_eq!(none.hit_permille(), 0);

    let half = ProbeStats {
        lookup_count: 4,
        lookup_success: 2,
    };
    assert_eq!(half.hit_permille(), 500);
}
