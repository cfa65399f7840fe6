//! Trace capture adapter.
//!
//! Wraps the external stack-walking primitive behind [`TraceCapture`] and
//! bounds every recorded trace to [`MAX_TRACE_DEPTH`] frames. Stack walking
//! itself (frame unwinding, interrupt-frame detection) is the host's job.

/// Maximum number of frames recorded per save event.
pub const MAX_TRACE_DEPTH: usize = 64;

/// Capability interface to the host's stack-walking primitive.
pub trait TraceCapture {
    /// Capture the current call stack into `frames`, most recent frame
    /// first. Returns the number of frames written, at most `frames.len()`.
    fn capture(frames: &mut [usize]) -> usize;

    /// Return the length of `frames` with trailing interrupt-entry frames
    /// removed. Frames below an interrupt entry belong to whatever code
    /// was preempted and would pollute the recorded trace.
    fn filter_irq_frames(frames: &[usize]) -> usize;
}

/// Capture a bounded, interrupt-filtered call stack into `buf`.
///
/// Returns the usable frame count.
pub fn capture_trace<T: TraceCapture>(buf: &mut [usize; MAX_TRACE_DEPTH]) -> usize {
    let nr = T::capture(buf);
    T::filter_irq_frames(&buf[..nr])
}
