/// Slack for frame deltas that arrive as `f32` and widen to just under the
/// step length.
const STEP_TOLERANCE: f64 = 1e-7;

/// Fixed-timestep accumulator decoupling simulation ticks from frame rate.
///
/// Frame time is added each frame; every whole step it contains yields one
/// tick. At most `max_steps` ticks run per frame and any remaining backlog is
/// dropped, so a long stall does not trigger a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct FixedTicker {
    step: f64,
    accumulator: f64,
    max_steps: u32,
    total: u64,
}

impl FixedTicker {
    pub const DEFAULT_MAX_STEPS: u32 = 8;

    /// `rate_hz` must be positive; configuration validation enforces it.
    pub fn new(rate_hz: f32) -> Self {
        Self {
            step: 1.0 / f64::from(rate_hz.max(f32::EPSILON)),
            accumulator: 0.0,
            max_steps: Self::DEFAULT_MAX_STEPS,
            total: 0,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Add `dt` seconds and return how many ticks are now due.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += f64::from(dt);
        }
        let mut due = 0;
        while self.accumulator + STEP_TOLERANCE >= self.step {
            self.accumulator = (self.accumulator - self.step).max(0.0);
            due += 1;
            if due == self.max_steps {
                if self.accumulator >= self.step {
                    tracing::debug!(
                        dropped = self.accumulator,
                        "fixed ticker behind; dropping backlog"
                    );
                }
                self.accumulator = 0.0;
                break;
            }
        }
        self.total += u64::from(due);
        due
    }

    pub fn step_seconds(&self) -> f64 {
        self.step
    }

    /// Ticks run since creation.
    pub fn total_ticks(&self) -> u64 {
        self.total
    }

    /// Fraction of the next step already accumulated, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tick_per_step() {
        let mut t = FixedTicker::new(60.0);
        assert_eq!(t.advance(1.0 / 60.0), 1);
        assert_eq!(t.advance(1.0 / 60.0), 1);
        assert_eq!(t.total_ticks(), 2);
    }

    #[test]
    fn fast_frames_accumulate() {
        let mut t = FixedTicker::new(60.0);
        let mut ticks = 0;
        for _ in 0..240 {
            ticks += t.advance(1.0 / 240.0);
        }
        assert_eq!(ticks, 60);
    }

    #[test]
    fn slow_frame_runs_several_ticks() {
        let mut t = FixedTicker::new(60.0);
        assert_eq!(t.advance(3.0 / 60.0), 3);
    }

    #[test]
    fn stall_is_capped() {
        let mut t = FixedTicker::new(60.0).with_max_steps(4);
        assert_eq!(t.advance(2.0), 4);
        assert!(t.alpha() < 1.0);
        assert_eq!(t.advance(0.0), 0);
    }

    #[test]
    fn invalid_deltas_are_ignored() {
        let mut t = FixedTicker::new(60.0);
        assert_eq!(t.advance(-1.0), 0);
        assert_eq!(t.advance(f32::NAN), 0);
        assert_eq!(t.total_ticks(), 0);
    }
}
