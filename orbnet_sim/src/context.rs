//! Simulation context - the only state the update loop carries between ticks.

use crate::error::SimError;

/// Simulated clock of one update-loop run.
///
/// Time is derived from the tick count rather than accumulated, so tick `N`
/// always sees exactly `start_time + N * time_step`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimContext {
    /// Simulated time of tick 0 (seconds)
    start_time: f64,

    /// Simulated seconds between ticks
    time_step: f64,

    /// Total simulated seconds to cover after `start_time`
    simulation_length: f64,

    /// Ticks executed so far
    ticks: u64,
}

impl SimContext {
    /// Creates a context positioned at tick 0.
    ///
    /// # Errors
    /// [`SimError::InvalidLoopParameters`] for a non-finite start, a
    /// non-positive step or a negative length.
    pub fn new(start_time: f64, time_step: f64, simulation_length: f64) -> Result<Self, SimError> {
        if !start_time.is_finite() {
            return Err(SimError::invalid_parameters(format!("start_time must be finite, got {}", start_time)));
        }
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(SimError::invalid_parameters(format!("time_step must be positive, got {}", time_step)));
        }
        if !simulation_length.is_finite() || simulation_length < 0.0 {
            return Err(SimError::invalid_parameters(format!(
                "simulation_length must be non-negative, got {}",
                simulation_length
            )));
        }
        Ok(Self {
            start_time,
            time_step,
            simulation_length,
            ticks: 0,
        })
    }

    /// Simulated time of the current tick.
    pub fn now(&self) -> f64 {
        self.time_at(self.ticks)
    }

    /// Simulated time of tick `n`.
    pub fn time_at(&self, n: u64) -> f64 {
        self.start_time + n as f64 * self.time_step
    }

    /// Simulated time the next tick will use.
    pub fn next_time(&self) -> f64 {
        self.time_at(self.ticks + 1)
    }

    /// Moves to the next tick and returns its time.
    pub fn advance(&mut self) -> f64 {
        self.ticks += 1;
        self.now()
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Total ticks the run will execute.
    ///
    /// The ratio is nudged up by a few ulps so that lengths which are an
    /// exact multiple of a decimal step (0.3 / 0.1) keep their last tick.
    pub fn total_ticks(&self) -> u64 {
        let ratio = self.simulation_length / self.time_step;
        (ratio * (1.0 + 4.0 * f64::EPSILON)).floor() as u64
    }

    /// True once accumulated time has reached the simulation length.
    pub fn is_finished(&self) -> bool {
        self.ticks >= self.total_ticks()
    }

    /// Simulated seconds elapsed since `start_time`.
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * self.time_step
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn simulation_length(&self) -> f64 {
        self.simulation_length
    }
}
