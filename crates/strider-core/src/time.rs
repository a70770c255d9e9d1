//! Time Management
//!
//! Fixed-step simulation driven by variable-length frames. Frame time
//! accumulates, and each frame runs as many whole steps as fit, up to a cap.

/// Longest frame accepted; anything longer is treated as a hitch
const MAX_FRAME_TIME: f64 = 0.25;

/// Fixed time step configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimeStep {
    /// Seconds per step
    pub step: f64,
    /// Steps allowed per frame before the backlog is dropped
    pub max_updates: u32,
}

impl Default for FixedTimeStep {
    fn default() -> Self {
        Self::from_hz(60.0)
    }
}

impl FixedTimeStep {
    pub fn from_hz(hz: f64) -> Self {
        Self::from_step(1.0 / hz)
    }

    pub fn from_step(step: f64) -> Self {
        Self { step, max_updates: 8 }
    }

    pub fn with_max_updates(mut self, max: u32) -> Self {
        self.max_updates = max;
        self
    }
}

/// Accumulates frame time and hands out fixed steps
#[derive(Debug, Clone, Default)]
pub struct TimeManager {
    total_time: f64,
    accumulator: f64,
    fixed_update_count: u64,
    paused: bool,
}

impl TimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame of `delta_time` seconds
    pub fn update(&mut self, delta_time: f64) {
        if self.paused {
            return;
        }
        let dt = delta_time.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += dt;
        self.accumulator += dt;
    }

    /// Whether a whole step is waiting
    pub fn should_run_fixed_update(&self, fixed_step: f64) -> bool {
        fixed_step > 0.0 && self.accumulator >= fixed_step
    }

    /// Mark one step as run
    pub fn consume_fixed_update(&mut self, fixed_step: f64) {
        self.accumulator -= fixed_step;
        self.fixed_update_count += 1;
    }

    /// Drop whole steps still pending after the per-frame cap was hit,
    /// keeping only the sub-step remainder.
    pub fn discard_backlog(&mut self, fixed_step: f64) {
        if fixed_step > 0.0 {
            self.accumulator %= fixed_step;
        }
    }

    /// Steps to run this frame, capped at `config.max_updates`
    pub fn fixed_updates_needed(&self, config: &FixedTimeStep) -> u32 {
        if config.step <= 0.0 {
            return 0;
        }
        let updates = (self.accumulator / config.step) as u32;
        updates.min(config.max_updates)
    }

    /// How far the accumulator is into the next step, in `[0, 1]`
    pub fn fixed_interpolation(&self, fixed_step: f64) -> f64 {
        (self.accumulator / fixed_step).clamp(0.0, 1.0)
    }

    /// Simulated seconds so far
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn fixed_update_count(&self) -> u64 {
        self.fixed_update_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}
