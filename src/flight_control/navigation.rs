use super::common::{Coordinate, distance_meters};
use std::time::Duration;

/// Result of a single navigation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavStep {
    /// Position after the tick.
    pub position: Coordinate,
    /// Speed derived from the displacement of this tick in m/s.
    pub speed: f64,
    /// Whether the target was reached (and cleared) during this tick.
    pub arrived: bool,
}

/// Constant ground speed integrator moving the vehicle towards its target.
///
/// The simulator is the only owner of the current position and the target.
#[derive(Debug, Clone)]
pub struct NavigationSimulator {
    current_pos: Coordinate,
    target: Option<Coordinate>,
    current_speed: f64,
    ground_speed: f64,
}

impl NavigationSimulator {
    pub fn new(start: Coordinate, ground_speed: f64) -> Self {
        Self { current_pos: start, target: None, current_speed: 0.0, ground_speed }
    }

    pub fn current_speed(&self) -> f64 { self.current_speed }

    pub fn target(&self) -> Option<Coordinate> { self.target }

    pub fn has_target(&self) -> bool { self.target.is_some() }

    pub fn set_target(&mut self, target: Coordinate) { self.target = Some(target); }

    pub fn clear_target(&mut self) { self.target = None; }

    /// Places the vehicle at `pos`, dropping any target and zeroing the speed.
    pub fn reset(&mut self, pos: Coordinate) {
        self.current_pos = pos;
        self.target = None;
        self.current_speed = 0.0;
    }

    /// Advances the vehicle by one tick.
    ///
    /// Travel covers `ground_speed * dt` meters along the straight
    /// latitude/longitude delta. A target that lies within that step is snapped
    /// to exactly, reported as `arrived` and cleared. The returned speed is the
    /// great-circle distance actually covered divided by `dt`.
    ///
    /// # Arguments
    /// - `dt`: The tick duration. A zero duration never moves the vehicle.
    ///
    /// # Returns
    /// A `NavStep` describing the new position, speed and arrival flag.
    pub fn advance(&mut self, dt: Duration) -> NavStep {
        let Some(target) = self.target else {
            self.current_speed = 0.0;
            return self.step_result(false);
        };

        let dt_secs = dt.as_secs_f64();
        let dist = distance_meters(&self.current_pos, &target);
        let step_m = self.ground_speed * dt_secs;

        if dist <= step_m {
            self.current_pos = target;
            self.current_speed = 0.0;
            self.target = None;
            return self.step_result(true);
        }
        if dt_secs <= 0.0 {
            self.current_speed = 0.0;
            return self.step_result(false);
        }

        let next_pos = self.current_pos.lerp_towards(&target, step_m / dist);
        let moved = distance_meters(&self.current_pos, &next_pos);
        self.current_pos = next_pos;
        self.current_speed = moved / dt_secs;
        self.step_result(false)
    }

    fn step_result(&self, arrived: bool) -> NavStep {
        NavStep { position: self.current_pos, speed: self.current_speed, arrived }
    }
}
