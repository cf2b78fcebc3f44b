use super::common::Coordinate;
use rand::Rng;

/// Vehicle telemetry as seen by presentation. Replaced as a whole once per
/// tick, never patched in place by readers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub altitude_m: f64,
    pub speed_mps: f64,
    pub battery: f64,
    pub pos: Coordinate,
    pub jitter_ms: f64,
}

impl TelemetrySnapshot {
    pub fn initial(pos: Coordinate, altitude_m: f64, battery: f64, jitter_ms: f64) -> Self {
        Self { altitude_m, speed_mps: 0.0, battery, pos, jitter_ms }
    }
}

/// Link quality model. Stable mode pins the jitter, otherwise it is sampled
/// uniformly from `[0, max_ms)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkJitter {
    stable: bool,
    stable_ms: f64,
    max_ms: f64,
}

impl LinkJitter {
    pub fn new(stable: bool, stable_ms: f64, max_ms: f64) -> Self { Self { stable, stable_ms, max_ms } }

    pub fn is_stable(&self) -> bool { self.stable }

    pub fn toggle(&mut self) -> bool {
        self.stable = !self.stable;
        self.stable
    }

    /// Jitter reported right after connecting.
    pub fn baseline(&self) -> f64 { if self.stable { self.stable_ms } else { 0.0 } }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.stable {
            self.stable_ms
        } else if self.max_ms <= 0.0 {
            0.0
        } else {
            rng.random_range(0.0..self.max_ms)
        }
    }
}
