//! Time management utilities

/// Fixed-timestep accumulator
///
/// Converts variable frame deltas into a whole number of fixed simulation
/// steps. Time that cannot fill a step carries over to the next frame; time
/// beyond `max_substeps` steps is dropped so a long stall cannot trigger a
/// spiral of catch-up steps.
#[derive(Debug, Clone)]
pub struct FixedStepAccumulator {
    fixed_timestep: f32,
    max_substeps: u32,
    accumulator: f32,
    total_steps: u64,
}

impl FixedStepAccumulator {
    /// Create a new accumulator
    pub fn new(fixed_timestep: f32, max_substeps: u32) -> Self {
        Self {
            fixed_timestep,
            max_substeps,
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    /// Feed a frame delta and return how many fixed steps to run
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        if self.fixed_timestep.is_nan() || self.fixed_timestep <= 0.0 || !delta_time.is_finite() || delta_time <= 0.0 {
            return 0;
        }

        self.accumulator += delta_time;

        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep && steps < self.max_substeps {
            self.accumulator -= self.fixed_timestep;
            steps += 1;
        }

        if steps == self.max_substeps && self.accumulator >= self.fixed_timestep {
            log::trace!(
                "Dropping {:.4}s of simulation time after {} substeps",
                self.accumulator,
                steps
            );
            self.accumulator %= self.fixed_timestep;
        }

        self.total_steps += u64::from(steps);
        steps
    }

    /// The fixed step duration in seconds
    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep
    }

    /// Time carried over to the next frame
    pub fn remainder(&self) -> f32 {
        self.accumulator
    }

    /// Total number of fixed steps produced so far
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Drop any carried-over time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
