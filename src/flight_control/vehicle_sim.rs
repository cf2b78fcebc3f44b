use super::{
    common::Coordinate,
    geofence::{FenceStatus, Geofence, GeofenceLogEntry, GeofenceMonitor},
    link_state::{ArrivalOutcome, ConnectionLifecycle, ConnectionState, IntentRejection},
    navigation::{NavStep, NavigationSimulator},
    power_model::PowerModel,
    telemetry::{LinkJitter, TelemetrySnapshot},
};
use crate::config::SimParams;
use rand::Rng;
use strum_macros::Display;

/// Commands an operator can issue from the console.
#[derive(Debug, Display, PartialEq, Clone, Copy)]
pub enum OperatorIntent {
    SetTarget(Coordinate),
    ReturnHome,
    Connect,
    Disconnect,
    ToggleStableLink,
}

/// Everything presentation needs to draw one frame, except the unbounded
/// path history and geofence log which are queried separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSnapshot {
    pub telemetry: TelemetrySnapshot,
    pub link: ConnectionState,
    pub target: Option<Coordinate>,
    pub home: Coordinate,
    pub outside_fence: bool,
    pub stable_link: bool,
    pub battery_low: bool,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub nav: NavStep,
    pub fence: FenceStatus,
    pub arrival: ArrivalOutcome,
}

/// Single vehicle simulation: navigation, power, geofence and session
/// lifecycle composed into one telemetry snapshot.
///
/// All mutation happens through `&mut self`, one tick or intent at a time.
#[derive(Debug, Clone)]
pub struct VehicleSim {
    params: SimParams,
    nav: NavigationSimulator,
    power: PowerModel,
    fence: GeofenceMonitor,
    lifecycle: ConnectionLifecycle,
    jitter: LinkJitter,
    telemetry: TelemetrySnapshot,
    path: Vec<Coordinate>,
    ticks: u64,
}

impl VehicleSim {
    pub fn new(params: SimParams, stable_link: bool) -> Self {
        let jitter = LinkJitter::new(stable_link, params.stable_jitter_ms, params.max_jitter_ms);
        Self {
            nav: NavigationSimulator::new(params.home, params.ground_speed_mps),
            power: PowerModel::new(params.moving_drain, params.idle_drain),
            fence: GeofenceMonitor::new(Geofence::new(params.fence_center, params.fence_radius_m)),
            lifecycle: ConnectionLifecycle::new(params.home, params.return_home_max_speed),
            telemetry: TelemetrySnapshot::initial(
                params.home,
                params.altitude_m,
                params.initial_battery,
                jitter.baseline(),
            ),
            jitter,
            path: Vec::new(),
            ticks: 0,
            params,
        }
    }

    pub fn params(&self) -> &SimParams { &self.params }

    pub fn state(&self) -> ConnectionState { self.lifecycle.state() }

    pub fn is_connected(&self) -> bool { self.lifecycle.state().is_connected() }

    pub fn telemetry(&self) -> &TelemetrySnapshot { &self.telemetry }

    pub fn path_history(&self) -> &[Coordinate] { &self.path }

    pub fn geofence_log(&self) -> &[GeofenceLogEntry] { self.fence.log() }

    pub fn last_geofence_entry(&self) -> Option<&GeofenceLogEntry> { self.fence.last_entry() }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            telemetry: self.telemetry,
            link: self.lifecycle.state(),
            target: self.nav.target(),
            home: self.lifecycle.home(),
            outside_fence: self.fence.is_outside(),
            stable_link: self.jitter.is_stable(),
            battery_low: self.telemetry.battery < self.params.low_battery_threshold,
            tick: self.ticks,
        }
    }

    /// Applies one operator intent.
    pub fn apply(&mut self, intent: OperatorIntent) -> Result<(), IntentRejection> {
        match intent {
            OperatorIntent::SetTarget(target) => self.lifecycle.request_target(&mut self.nav, target),
            OperatorIntent::ReturnHome => self.lifecycle.request_return_home(&mut self.nav),
            OperatorIntent::Connect => self.connect(),
            OperatorIntent::Disconnect => self.lifecycle.request_disconnect(&mut self.nav),
            OperatorIntent::ToggleStableLink => {
                self.toggle_stable_link();
                Ok(())
            }
        }
    }

    /// Starts a new session with a fully reinitialised telemetry snapshot.
    fn connect(&mut self) -> Result<(), IntentRejection> {
        self.lifecycle.connect(&mut self.nav)?;
        let home = self.params.home;
        self.nav.reset(home);
        self.fence.reset();
        self.fence.check(home);
        self.path.clear();
        self.path.push(home);
        self.telemetry = TelemetrySnapshot::initial(
            home,
            self.params.altitude_m,
            self.params.initial_battery,
            self.jitter.baseline(),
        );
        self.ticks = 0;
        Ok(())
    }

    fn toggle_stable_link(&mut self) {
        let stable = self.jitter.toggle();
        if stable && self.is_connected() {
            self.telemetry.jitter_ms = self.params.stable_jitter_ms;
        }
    }

    /// Runs one navigation tick. Returns `None` without touching any state
    /// while disconnected.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.is_connected() {
            return None;
        }
        let had_target = self.nav.has_target();
        let nav = self.nav.advance(self.params.tick);
        let battery = self.power.drain(had_target, self.telemetry.battery);
        let fence = self.fence.check(nav.position);
        self.path.push(nav.position);
        let arrival = if nav.arrived {
            self.lifecycle.on_arrival(&mut self.nav, nav.position)
        } else {
            ArrivalOutcome::Unchanged
        };

        self.telemetry = TelemetrySnapshot {
            speed_mps: nav.speed,
            battery,
            pos: nav.position,
            ..self.telemetry
        };
        self.ticks += 1;
        Some(TickReport { nav, fence, arrival })
    }

    /// Draws a new link jitter value. Returns the value that was applied, or
    /// `None` while disconnected.
    pub fn resample_jitter<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<f64> {
        if !self.is_connected() {
            return None;
        }
        self.telemetry.jitter_ms = self.jitter.sample(rng);
        Some(self.telemetry.jitter_ms)
    }
}
