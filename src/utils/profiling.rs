use std::time::Duration;

/// Timing and size figures for the most recent simulation tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfiler {
    pub force_time: Duration,
    pub coupling_force_time: Duration,
    pub integrate_time: Duration,
    pub coupling_update_time: Duration,
    pub trigger_time: Duration,
    pub prop_time: Duration,
    pub total_tick_time: Duration,

    pub vehicle_count: usize,
    pub node_count: usize,
    pub beam_count: usize,
    pub active_couplings: usize,
    pub event_count: usize,
}

impl StepProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One-line summary suitable for a `debug!` record.
    pub fn summary(&self) -> String {
        let total_us = self.total_tick_time.as_micros().max(1) as f32;
        let share = |d: Duration| d.as_micros() as f32 / total_us * 100.0;
        format!(
            "vehicles={} nodes={} beams={} couplings={} events={} tick={:.3}ms \
             [forces {:.0}% couplings {:.0}% integrate {:.0}% locks {:.0}% triggers {:.0}% props {:.0}%]",
            self.vehicle_count,
            self.node_count,
            self.beam_count,
            self.active_couplings,
            self.event_count,
            self.total_tick_time.as_secs_f32() * 1000.0,
            share(self.force_time),
            share(self.coupling_force_time),
            share(self.integrate_time),
            share(self.coupling_update_time),
            share(self.trigger_time),
            share(self.prop_time),
        )
    }

    pub fn log_summary(&self) {
        log::debug!("{}", self.summary());
    }
}
