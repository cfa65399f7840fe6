//! Stackcache hit-rate probe.
//!
//! A statistically sampled probe estimating how often an allocation-site
//! stack-trace cache still covers the memory regions the host actually
//! touches. The write side ([`save`]) records a call stack for each newly
//! significant object; the read side ([`ProbeState::on_memory_access`])
//! decimates the memory-access stream, perturbs one access per period by a
//! small random offset, asks the cache for candidates, and scores them
//! against the true accessed interval. Two counters come out:
//! `lookup_count` and `lookup_success`.
//!
//! The cache itself, stack walking, and the stats filesystem are external
//! collaborators consumed through the [`StackCache`], [`TraceCapture`] and
//! [`DebugFs`] traits.
//!
//! # Quick Start
//!
//! ```ignore
//! // During boot, after the stack cache is up:
//! stackcache_hitrate::init(&mut my_debugfs)?;
//! stackcache_hitrate::enable()?;
//!
//! // From allocation paths:
//! save::save::<HostCapture, _>(&cache, TraceKind::Alloc, addr, size);
//!
//! // From memory-access instrumentation:
//! stackcache_hitrate::probe().on_memory_access::<HostPlatform, _>(&cache, addr, size);
//! ```

#![no_std]

#[macro_use]
extern crate log;

use axerrno::{AxResult, ax_err};

pub mod cache;
pub mod capture;
pub mod platform;
pub mod save;
pub mod sampler;
pub mod statfs;

// Re-export key types for convenience
pub use cache::{AllocCacheDesc, CacheQueryResponse, MAX_LOOKUP_RESPONSES, StackCache, TraceKind};
pub use capture::{MAX_TRACE_DEPTH, TraceCapture};
pub use platform::PlatformOps;
pub use sampler::{
    MAX_QUERY_OFFSET, ProbeLifecycle, ProbeState, ProbeStats, SAMPLING_PERIOD,
};
pub use statfs::DebugFs;

// =============================================================================
// Global probe instance
// =============================================================================

static PROBE: ProbeState = ProbeState::new();

/// The process-wide probe instance.
pub fn probe() -> &'static ProbeState {
    &PROBE
}

// =============================================================================
// Initialization
// =============================================================================

/// Register the global probe's stat surface.
///
/// Call once during startup, before [`enable`]. On failure the probe stays
/// inert: the host keeps running, just without hit-rate measurement.
pub fn init<F: DebugFs>(fs: &mut F) -> AxResult<()> {
    info!("Initializing stackcache hitrate probe...");

    match PROBE.register(fs) {
        Ok(()) => {
            info!("  - stat surface registered under {}/", statfs::STATS_DIR);
            Ok(())
        }
        Err(sampler::Error::StatDirCreateFailed) => {
            ax_err!(Io, "failed to create stackcache stats directory")
        }
        Err(e) => {
            warn!("stackcache hitrate: init failed: {}", e);
            ax_err!(BadState)
        }
    }
}

/// Flip the global probe live.
///
/// Call once, after [`init`] succeeded and the external cache has begun
/// recording history.
pub fn enable() -> AxResult<()> {
    match PROBE.enable() {
        Ok(()) => {
            info!("stackcache hitrate probe enabled");
            Ok(())
        }
        Err(e) => {
            warn!("stackcache hitrate: enable failed: {}", e);
            ax_err!(BadState)
        }
    }
}
