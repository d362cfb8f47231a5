use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Scoped timer for one phase of a simulation tick.
///
/// Emits `trace!` records on entry and exit and, when given a slot, adds the
/// elapsed time to it so the [`StepProfiler`](super::profiling::StepProfiler)
/// can report it.
pub struct PhaseTimer<'a> {
    label: &'static str,
    start: Instant,
    slot: Option<&'a mut Duration>,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(label: &'static str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            slot: None,
        }
    }

    pub fn recording(label: &'static str, slot: &'a mut Duration) -> Self {
        let mut timer = Self::new(label);
        timer.slot = Some(slot);
        timer
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(slot) = self.slot.as_mut() {
            **slot += elapsed;
        }
        if log_enabled!(Level::Trace) {
            log::trace!("⏱️ end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Warns when a call to `step` took longer than the configured budget.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("Simulation step exceeded budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
        true
    } else {
        false
    }
}
