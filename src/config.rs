use crate::flight_control::common::Coordinate;
use std::{env, net::SocketAddr, time::Duration};
use strum_macros::Display;

/// Fixed physical and policy constants of one simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    /// Launch position and return-to-launch destination.
    pub home: Coordinate,
    /// Center of the circular geofence.
    pub fence_center: Coordinate,
    /// Geofence radius in meters.
    pub fence_radius_m: f64,
    /// Constant ground speed while a target is active.
    pub ground_speed_mps: f64,
    /// Period of the navigation/battery/geofence tick.
    pub tick: Duration,
    /// Period of the link jitter re-sampling timer.
    pub jitter_period: Duration,
    /// Reported altitude, never changes.
    pub altitude_m: f64,
    /// Battery level after connecting.
    pub initial_battery: f64,
    /// Battery drain per tick while a target is active.
    pub moving_drain: f64,
    /// Battery drain per tick while idle.
    pub idle_drain: f64,
    /// Jitter while stable-link mode is on.
    pub stable_jitter_ms: f64,
    /// Upper (exclusive) bound of the sampled jitter while the link is unstable.
    pub max_jitter_ms: f64,
    /// Return-home requests are rejected at or above this speed.
    pub return_home_max_speed: f64,
    /// Battery level below which the low-battery flag is raised.
    pub low_battery_threshold: f64,
}

impl SimParams {
    pub const HOME: Coordinate = Coordinate::from_const(26.9239, 75.8267);
    pub const FENCE_RADIUS_M: f64 = 200.0;
    pub const GROUND_SPEED_MPS: f64 = 10.0;
    pub const TICK: Duration = Duration::from_millis(100);
    pub const JITTER_PERIOD: Duration = Duration::from_secs(1);
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            home: Self::HOME,
            fence_center: Self::HOME,
            fence_radius_m: Self::FENCE_RADIUS_M,
            ground_speed_mps: Self::GROUND_SPEED_MPS,
            tick: Self::TICK,
            jitter_period: Self::JITTER_PERIOD,
            altitude_m: 200.0,
            initial_battery: 90.0,
            moving_drain: 0.02,
            idle_drain: 0.005,
            stable_jitter_ms: 10.0,
            max_jitter_ms: 120.0,
            return_home_max_speed: 0.5,
            low_battery_threshold: 10.0,
        }
    }
}

#[derive(Debug, Display)]
pub enum ConfigError {
    InvalidAddress(String),
    InvalidFlag(String),
    InvalidPeriod(String),
}

impl std::error::Error for ConfigError {}

/// Process level configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    relay_addr: SocketAddr,
    console_addr: SocketAddr,
    stable_link: bool,
    sim: SimParams,
}

impl GcsConfig {
    const DEF_RELAY_ADDR: &'static str = "0.0.0.0:9090";
    const DEF_CONSOLE_ADDR: &'static str = "0.0.0.0:1337";

    /// Reads `GCS_RELAY_ADDR`, `GCS_CONSOLE_ADDR`, `GCS_STABLE_LINK`,
    /// `GCS_TICK_MS` and `GCS_JITTER_MS`, falling back to defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`GcsConfig::from_env`] but with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&str) -> Option<String> {
        let relay_addr = Self::parse_addr(lookup("GCS_RELAY_ADDR"), Self::DEF_RELAY_ADDR)?;
        let console_addr = Self::parse_addr(lookup("GCS_CONSOLE_ADDR"), Self::DEF_CONSOLE_ADDR)?;
        let stable_link = match lookup("GCS_STABLE_LINK") {
            None => false,
            Some(v) => Self::parse_flag(&v)?,
        };
        let mut sim = SimParams::default();
        if let Some(tick) = Self::parse_period(lookup("GCS_TICK_MS"))? {
            sim.tick = tick;
        }
        if let Some(jitter) = Self::parse_period(lookup("GCS_JITTER_MS"))? {
            sim.jitter_period = jitter;
        }
        Ok(Self { relay_addr, console_addr, stable_link, sim })
    }

    fn parse_addr(value: Option<String>, default: &str) -> Result<SocketAddr, ConfigError> {
        let raw = value.as_deref().unwrap_or(default);
        raw.parse().map_err(|_| ConfigError::InvalidAddress(raw.to_string()))
    }

    fn parse_flag(value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidFlag(value.to_string())),
        }
    }

    fn parse_period(value: Option<String>) -> Result<Option<Duration>, ConfigError> {
        let Some(raw) = value else { return Ok(None) };
        match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
            _ => Err(ConfigError::InvalidPeriod(raw)),
        }
    }

    pub fn relay_addr(&self) -> SocketAddr { self.relay_addr }
    pub fn console_addr(&self) -> SocketAddr { self.console_addr }
    pub fn stable_link(&self) -> bool { self.stable_link }
    pub fn sim(&self) -> &SimParams { &self.sim }
}
