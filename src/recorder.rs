use std::time::Duration;

/// Observation hook for manager operations.
///
/// Every manager method reports its name, latency, and outcome here.
/// Metrics backends (counters, histograms) implement this trait outside
/// the crate; the resolution logic itself stays free of telemetry state.
pub trait Recorder: Send + Sync {
    /// Records one completed operation.
    fn record(&self, method: &'static str, elapsed: Duration, ok: bool);
}

/// No-op recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRecorder;

impl Recorder for NoRecorder {
    fn record(&self, _method: &'static str, _elapsed: Duration, _ok: bool) {}
}
