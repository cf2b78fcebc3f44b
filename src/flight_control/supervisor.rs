use super::{
    common::Coordinate,
    geofence::GeofenceLogEntry,
    link_state::{ArrivalOutcome, IntentRejection},
    scheduler::{TickScheduler, TimerEvent},
    vehicle_sim::{OperatorIntent, SimSnapshot, VehicleSim},
};
use crate::config::SimParams;
use crate::{event, geo, info, log};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

pub enum SimRequest {
    Intent(OperatorIntent, oneshot::Sender<Result<(), IntentRejection>>),
    GeofenceLog(oneshot::Sender<Vec<GeofenceLogEntry>>),
    PathHistory(oneshot::Sender<Vec<Coordinate>>),
}

/// Simulation actor. Owns the vehicle state and the session timers and
/// processes timer events and operator requests strictly one after another.
pub struct Supervisor {
    sim: VehicleSim,
    scheduler: TickScheduler,
    req_rx: mpsc::Receiver<SimRequest>,
    snapshot_tx: watch::Sender<SimSnapshot>,
    geofence_tx: broadcast::Sender<GeofenceLogEntry>,
    rng: StdRng,
}

/// Cloneable access point to a running `Supervisor`.
#[derive(Clone)]
pub struct SupervisorHandle {
    req_tx: mpsc::Sender<SimRequest>,
    snapshot_rx: watch::Receiver<SimSnapshot>,
    geofence_tx: broadcast::Sender<GeofenceLogEntry>,
}

impl Supervisor {
    /// Capacity of the operator request queue
    const REQ_BUFFER: usize = 32;
    /// Capacity of the geofence event hub
    const GEOFENCE_BUFFER: usize = 64;

    /// Creates a new, disconnected simulation and a handle to talk to it.
    pub fn new(params: SimParams, stable_link: bool) -> (Supervisor, SupervisorHandle) {
        let sim = VehicleSim::new(params, stable_link);
        let (req_tx, req_rx) = mpsc::channel(Self::REQ_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(sim.snapshot());
        let geofence_tx = broadcast::Sender::new(Self::GEOFENCE_BUFFER);
        let handle = SupervisorHandle { req_tx, snapshot_rx, geofence_tx: geofence_tx.clone() };
        let supervisor = Self {
            scheduler: TickScheduler::new(params.tick, params.jitter_period),
            sim,
            req_rx,
            snapshot_tx,
            geofence_tx,
            rng: StdRng::from_os_rng(),
        };
        (supervisor, handle)
    }

    /// Runs until cancelled or until every handle is dropped.
    pub async fn run(mut self, c_tok: CancellationToken) {
        info!("Simulation ready, home at {}.", self.sim.params().home);
        loop {
            tokio::select! {
                () = c_tok.cancelled() => {
                    log!("Simulation cancelled. Stopping.");
                    break;
                }
                req = self.req_rx.recv() => {
                    let Some(req) = req else {
                        log!("All simulation handles dropped. Stopping.");
                        break;
                    };
                    self.handle_request(req);
                }
                timer_ev = self.scheduler.next_event() => self.handle_timer(timer_ev),
            }
        }
        self.scheduler.stop();
    }

    fn handle_request(&mut self, req: SimRequest) {
        match req {
            SimRequest::Intent(intent, reply) => {
                let res = self.apply_intent(intent);
                let _ = reply.send(res);
            }
            SimRequest::GeofenceLog(reply) => {
                let _ = reply.send(self.sim.geofence_log().to_vec());
            }
            SimRequest::PathHistory(reply) => {
                let _ = reply.send(self.sim.path_history().to_vec());
            }
        }
    }

    fn apply_intent(&mut self, intent: OperatorIntent) -> Result<(), IntentRejection> {
        let res = self.sim.apply(intent);
        match res {
            Ok(()) => event!("Applied {intent}, link is {}.", self.sim.state()),
            Err(e) => event!("Ignoring {intent} while {}: {e}.", self.sim.state()),
        }
        if self.sim.is_connected() && !self.scheduler.is_running() {
            self.scheduler.start();
            info!("Session started at {}.", self.sim.telemetry().pos);
        }
        self.publish();
        res
    }

    fn handle_timer(&mut self, timer_ev: TimerEvent) {
        match timer_ev {
            TimerEvent::Tick => {
                let Some(report) = self.sim.tick() else {
                    self.scheduler.stop();
                    return;
                };
                let crossed = report.fence.crossing.and_then(|_| self.sim.last_geofence_entry().copied());
                if let Some(entry) = crossed {
                    geo!("{} at {}.", entry.kind(), entry.pos());
                    let _ = self.geofence_tx.send(entry);
                }
                match report.arrival {
                    ArrivalOutcome::Disconnected => {
                        self.scheduler.stop();
                        info!("Vehicle is home, session closed.");
                    }
                    ArrivalOutcome::ReachedHome => info!("Vehicle returned home."),
                    ArrivalOutcome::Unchanged if report.nav.arrived => {
                        log!("Target reached at {}.", report.nav.position);
                    }
                    ArrivalOutcome::Unchanged => (),
                }
            }
            TimerEvent::Jitter => {
                if self.sim.resample_jitter(&mut self.rng).is_none() {
                    self.scheduler.stop();
                    return;
                }
            }
        }
        self.publish();
    }

    fn publish(&self) { self.snapshot_tx.send_replace(self.sim.snapshot()); }
}

impl SupervisorHandle {
    /// Submits an operator intent and waits for its verdict.
    pub async fn send_intent(&self, intent: OperatorIntent) -> Result<(), IntentRejection> {
        let (tx, rx) = oneshot::channel();
        if self.req_tx.send(SimRequest::Intent(intent, tx)).await.is_err() {
            return Err(IntentRejection::SimulationStopped);
        }
        rx.await.unwrap_or(Err(IntentRejection::SimulationStopped))
    }

    /// Every geofence crossing of the current session, oldest first.
    pub async fn geofence_log(&self) -> Vec<GeofenceLogEntry> {
        let (tx, rx) = oneshot::channel();
        if self.req_tx.send(SimRequest::GeofenceLog(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Every position visited in the current session, oldest first.
    pub async fn path_history(&self) -> Vec<Coordinate> {
        let (tx, rx) = oneshot::channel();
        if self.req_tx.send(SimRequest::PathHistory(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub fn snapshot(&self) -> SimSnapshot { *self.snapshot_rx.borrow() }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<SimSnapshot> { self.snapshot_rx.clone() }

    pub fn subscribe_geofence(&self) -> broadcast::Receiver<GeofenceLogEntry> { self.geofence_tx.subscribe() }
}
