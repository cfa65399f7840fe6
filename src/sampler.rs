//! Sampled lookup-and-score probe.
//!
//! [`ProbeState`] owns the shared mutable state of the probe: the lifecycle
//! word, the decimation counter, the two exposed counters, and the reusable
//! response buffer. The entry point [`ProbeState::on_memory_access`] is
//! meant to be invoked on every instrumented memory access, so its
//! rejection ladder is ordered cheapest check first and the expensive
//! lookup runs for only one in [`SAMPLING_PERIOD`] qualifying accesses.
//!
//! Concurrency discipline: the response buffer is guarded by a spin mutex
//! that is only ever try-acquired on the access path. A contended sample
//! is dropped, never waited for; dropping samples costs accuracy we can
//! afford, waiting costs latency we cannot.

use core::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use spin::Mutex;

use crate::cache::{CacheQueryResponse, MAX_LOOKUP_RESPONSES, StackCache};
use crate::platform::PlatformOps;
use crate::statfs::{DebugFs, LOOKUP_COUNT_FILE, LOOKUP_SUCCESS_FILE, STATS_DIR};

/// One full lookup is dispatched per this many qualifying accesses.
///
/// Periodic decimation, not random sampling: overhead is bounded to one
/// probe per period regardless of call volume.
pub const SAMPLING_PERIOD: u64 = 1 << 19;

/// Bound on the query-address perturbation; offsets are drawn uniformly
/// from `[-MAX_QUERY_OFFSET, +MAX_QUERY_OFFSET)`.
pub const MAX_QUERY_OFFSET: u32 = 32;

/// Probe lifecycle. Transitions are one-directional and happen once during
/// startup; there is no teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProbeLifecycle {
    /// Nothing set up yet; the sampler refuses all work.
    Uninitialized = 0,
    /// Stat surface created, sampling not yet live.
    Registered = 1,
    /// Sampling live.
    Active = 2,
}

/// Error types for probe lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The debug filesystem refused to create the stats directory.
    StatDirCreateFailed,
    /// The stat surface has already been registered.
    AlreadyRegistered,
    /// Enable was requested before the stat surface was registered.
    NotRegistered,
    /// The probe is already live.
    AlreadyEnabled,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StatDirCreateFailed => write!(f, "failed to create stats directory"),
            Self::AlreadyRegistered => write!(f, "stat surface already registered"),
            Self::NotRegistered => write!(f, "stat surface not registered"),
            Self::AlreadyEnabled => write!(f, "probe already enabled"),
        }
    }
}

impl core::error::Error for Error {}

/// Point-in-time snapshot of the probe counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStats {
    /// Attempts that reached the scoring stage.
    pub lookup_count: u64,
    /// Attempts where a candidate covered the accessed interval.
    pub lookup_success: u64,
}

impl ProbeStats {
    /// Hit rate in thousandths, zero when no lookups have been dispatched.
    pub fn hit_permille(&self) -> u64 {
        if self.lookup_count > 0 {
            self.lookup_success * 1000 / self.lookup_count
        } else {
            0
        }
    }
}

/// Shared state of the hit-rate probe.
///
/// Const-constructible so hosts can place it in a `static`; registration
/// requires a `'static` reference because the exposure layer retains
/// pointers to the counters for the life of the process.
pub struct ProbeState {
    lifecycle: AtomicU8,
    /// Decimation counter; incremented lock-free on every call, meaningful
    /// only modulo [`SAMPLING_PERIOD`].
    skip_access: AtomicU64,
    lookup_count: AtomicU64,
    lookup_success: AtomicU64,
    /// Reusable response buffer. Holding this lock is what serializes
    /// populate/score cycles; the counters above are only written while
    /// it is held.
    scratch: Mutex<[CacheQueryResponse; MAX_LOOKUP_RESPONSES]>,
}

impl ProbeState {
    /// Create a probe in the Uninitialized state.
    pub const fn new() -> Self {
        Self {
            lifecycle: AtomicU8::new(ProbeLifecycle::Uninitialized as u8),
            skip_access: AtomicU64::new(0),
            lookup_count: AtomicU64::new(0),
            lookup_success: AtomicU64::new(0),
            scratch: Mutex::new([CacheQueryResponse::EMPTY; MAX_LOOKUP_RESPONSES]),
        }
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> ProbeLifecycle {
        match self.lifecycle.load(Ordering::SeqCst) {
            1 => ProbeLifecycle::Registered,
            2 => ProbeLifecycle::Active,
            _ => ProbeLifecycle::Uninitialized,
        }
    }

    /// Create the stat surface: a `stackcache` directory holding the two
    /// counter files.
    ///
    /// On failure the probe stays Uninitialized and the sampler permanently
    /// no-ops; the host keeps running without measurement.
    pub fn register<F: DebugFs>(&'static self, fs: &mut F) -> Result<(), Error> {
        if self.lifecycle() != ProbeLifecycle::Uninitialized {
            return Err(Error::AlreadyRegistered);
        }

        let Some(dir) = fs.create_dir(STATS_DIR) else {
            warn!("stackcache hitrate: failed to create {} stats dir", STATS_DIR);
            return Err(Error::StatDirCreateFailed);
        };

        fs.create_u64(&dir, LOOKUP_COUNT_FILE, &self.lookup_count);
        fs.create_u64(&dir, LOOKUP_SUCCESS_FILE, &self.lookup_success);

        self.lifecycle
            .store(ProbeLifecycle::Registered as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Transition Registered → Active, exactly once. After this the
    /// sampler starts doing real work.
    pub fn enable(&self) -> Result<(), Error> {
        match self.lifecycle.compare_exchange(
            ProbeLifecycle::Registered as u8,
            ProbeLifecycle::Active as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Ok(()),
            Err(cur) if cur == ProbeLifecycle::Active as u8 => Err(Error::AlreadyEnabled),
            Err(_) => Err(Error::NotRegistered),
        }
    }

    /// Snapshot the exposed counters.
    ///
    /// Loads are individually atomic; `lookup_success` is read first so the
    /// pair never observes more successes than attempts.
    pub fn stats(&self) -> ProbeStats {
        let lookup_success = self.lookup_success.load(Ordering::Relaxed);
        let lookup_count = self.lookup_count.load(Ordering::Relaxed);
        ProbeStats {
            lookup_count,
            lookup_success,
        }
    }

    /// Probe entry point, invoked on (potentially) every memory access of
    /// `size` bytes starting at `addr`.
    ///
    /// Safe to call from any context: every rejection is an ordinary early
    /// return and the only lock involved is try-acquired. An access either
    /// becomes a scored lookup or is dropped instantaneously.
    pub fn on_memory_access<P: PlatformOps, C: StackCache>(
        &self,
        cache: &C,
        addr: usize,
        size: usize,
    ) {
        // It's too early.
        if self.lifecycle.load(Ordering::SeqCst) != ProbeLifecycle::Active as u8 {
            return;
        }

        // Don't introduce delays to interrupt handlers.
        if !P::in_task() {
            return;
        }

        // Only accesses to dynamic memory are of interest.
        if !P::is_heap_addr(addr) {
            return;
        }

        // Periodic decimation: one probe per SAMPLING_PERIOD accesses.
        let seen = self.skip_access.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if seen % SAMPLING_PERIOD != 0 {
            return;
        }

        // Skip objects whose provenance predates instrumentation.
        if !cache.has_history_before(addr) {
            return;
        }

        // One lookup at a time; a contended sample is dropped, not waited
        // for. The guard releases on every exit path below.
        let Some(mut responses) = self.scratch.try_lock() else {
            return;
        };

        let query = addr.wrapping_add_signed(query_jitter::<P>() as isize);
        let nr = cache.lookup(query, size, &mut responses[..]);

        self.lookup_count.fetch_add(1, Ordering::Relaxed);

        if covered(addr, size, &responses[..nr.min(MAX_LOOKUP_RESPONSES)]) {
            self.lookup_success.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for ProbeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed query-address perturbation, uniform in
/// `[-MAX_QUERY_OFFSET, +MAX_QUERY_OFFSET)`.
///
/// Probes whether entries recorded for a nearby address still cover the
/// true one, approximating the cache's bounds robustness rather than only
/// its exact-match behavior.
pub fn query_jitter<P: PlatformOps>() -> i32 {
    (P::random_u32() % (2 * MAX_QUERY_OFFSET)) as i32 - MAX_QUERY_OFFSET as i32
}

/// Whether any candidate covers the full accessed interval
/// `[addr, addr + size)`. The first qualifying entry wins; entries are
/// pre-ordered by the cache's own relevance policy.
fn covered(addr: usize, size: usize, responses: &[CacheQueryResponse]) -> bool {
    for resp in responses {
        // No full stack trace attached.
        if resp.entry_count == 0 {
            continue;
        }

        // The entry cannot cover an access starting before its region.
        if addr < resp.object {
            continue;
        }

        // addr >= object here, so the difference cannot wrap.
        let dist = (addr - resp.object) + size;
        if dist <= resp.size {
            return true;
        }
    }
    false
}

// =============================================================================
// Tests
// =============================================================================
