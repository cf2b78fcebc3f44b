/// Per-tick battery depletion depending on whether the vehicle is under way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    moving_drain: f64,
    idle_drain: f64,
}

impl PowerModel {
    pub const MIN_BATTERY: f64 = 0.0;
    pub const MAX_BATTERY: f64 = 100.0;

    pub fn new(moving_drain: f64, idle_drain: f64) -> Self {
        Self { moving_drain: moving_drain.max(0.0), idle_drain: idle_drain.max(0.0) }
    }

    /// Returns the battery level after one tick, floored at zero.
    pub fn drain(&self, has_active_target: bool, current_battery: f64) -> f64 {
        let drain = if has_active_target { self.moving_drain } else { self.idle_drain };
        (current_battery - drain).clamp(Self::MIN_BATTERY, Self::MAX_BATTERY)
    }
}
