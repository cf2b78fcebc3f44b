use crate::console_communication::console_endpoint::{ConsoleEndpoint, ConsoleEvent};
use crate::console_communication::gcs_messages::{self, DownstreamContent, UpstreamContent};
use crate::flight_control::{
    GeofenceLogEntry, IntentRejection, OperatorIntent, SimSnapshot, SupervisorHandle, common::Coordinate,
};
use crate::{event, log, warn};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Bridges operator consoles and the simulation: upstream messages become
/// intents and queries, snapshots and geofence crossings go downstream.
pub(crate) struct ConsoleMessenger {
    endpoint: Arc<ConsoleEndpoint>,
}

impl ConsoleMessenger {
    pub(crate) async fn start(
        addr: SocketAddr,
        sim: SupervisorHandle,
        c_tok: CancellationToken,
    ) -> Result<Self, std::io::Error> {
        let endpoint = Arc::new(ConsoleEndpoint::start(addr).await?);
        log!("Operator console listening on {}.", endpoint.local_addr());

        // subscribe before spawning so nothing sent after `start` returns is missed
        let upstream_rx = endpoint.upstream_event_receiver().resubscribe();
        let snapshot_rx = sim.subscribe_snapshot();
        let geofence_rx = sim.subscribe_geofence();
        tokio::spawn(Self::run_upstream(Arc::clone(&endpoint), sim, upstream_rx, c_tok.clone()));
        tokio::spawn(Self::run_telemetry(Arc::clone(&endpoint), snapshot_rx, c_tok.clone()));
        tokio::spawn(Self::run_geofence(Arc::clone(&endpoint), geofence_rx, c_tok));

        Ok(Self { endpoint })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr { self.endpoint.local_addr() }

    /// Translates one upstream message into an intent. Queries and pings are
    /// not intents and yield `None`.
    pub(crate) fn to_intent(content: &UpstreamContent) -> Option<Result<OperatorIntent, IntentRejection>> {
        match content {
            UpstreamContent::SetTarget(t) => Some(
                Coordinate::new(t.lat, t.lon)
                    .map(OperatorIntent::SetTarget)
                    .map_err(|_| IntentRejection::InvalidCoordinate),
            ),
            UpstreamContent::ReturnHome(_) => Some(Ok(OperatorIntent::ReturnHome)),
            UpstreamContent::Connect(_) => Some(Ok(OperatorIntent::Connect)),
            UpstreamContent::Disconnect(_) => Some(Ok(OperatorIntent::Disconnect)),
            UpstreamContent::ToggleStableLink(_) => Some(Ok(OperatorIntent::ToggleStableLink)),
            UpstreamContent::Ping(_)
            | UpstreamContent::GetGeofenceLog(_)
            | UpstreamContent::GetPathHistory(_) => None,
        }
    }

    async fn handle_upstream(endpoint: &ConsoleEndpoint, sim: &SupervisorHandle, content: UpstreamContent) {
        if let Some(intent) = Self::to_intent(&content) {
            let res = match intent {
                Ok(intent) => sim.send_intent(intent).await,
                Err(e) => Err(e),
            };
            if let Err(e) = res {
                event!("Console intent rejected: {e}.");
            }
            endpoint.send_downstream(DownstreamContent::IntentAck(res.into()));
            return;
        }
        match content {
            UpstreamContent::Ping(ping) => {
                endpoint.send_downstream(DownstreamContent::Pong(gcs_messages::Pong { echo: ping.echo }));
            }
            UpstreamContent::GetGeofenceLog(_) => {
                let entries = sim.geofence_log().await.iter().map(gcs_messages::GeofenceEvent::from).collect();
                endpoint.send_downstream(DownstreamContent::GeofenceLog(gcs_messages::GeofenceLog { entries }));
            }
            UpstreamContent::GetPathHistory(_) => {
                let points = sim.path_history().await.into_iter().map(gcs_messages::Position::from).collect();
                endpoint.send_downstream(DownstreamContent::PathHistory(gcs_messages::PathHistory { points }));
            }
            _ => (),
        }
    }

    async fn run_upstream(
        endpoint: Arc<ConsoleEndpoint>,
        sim: SupervisorHandle,
        mut receiver: broadcast::Receiver<ConsoleEvent>,
        c_tok: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                () = c_tok.cancelled() => break,
                event = receiver.recv() => event,
            };
            match event {
                Ok(ConsoleEvent::Message(content)) => Self::handle_upstream(&endpoint, &sim, content).await,
                Ok(ConsoleEvent::Connected) => {
                    // fresh consoles get the current state right away
                    let snapshot = sim.snapshot();
                    endpoint.send_downstream(DownstreamContent::Telemetry(
                        gcs_messages::Telemetry::from_snapshot(&snapshot, Utc::now().timestamp_millis()),
                    ));
                }
                Ok(ConsoleEvent::Disconnected) => (),
                Err(RecvError::Lagged(n)) => warn!("Console messenger skipped {n} upstream events."),
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn run_telemetry(
        endpoint: Arc<ConsoleEndpoint>,
        mut snapshot_rx: watch::Receiver<SimSnapshot>,
        c_tok: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = c_tok.cancelled() => break,
                changed = snapshot_rx.changed() => if changed.is_err() { break },
            }
            let snapshot = *snapshot_rx.borrow_and_update();
            if !endpoint.is_console_connected() {
                continue;
            }
            endpoint.send_downstream(DownstreamContent::Telemetry(gcs_messages::Telemetry::from_snapshot(
                &snapshot,
                Utc::now().timestamp_millis(),
            )));
        }
    }

    async fn run_geofence(
        endpoint: Arc<ConsoleEndpoint>,
        mut geofence_rx: broadcast::Receiver<GeofenceLogEntry>,
        c_tok: CancellationToken,
    ) {
        loop {
            let entry = tokio::select! {
                () = c_tok.cancelled() => break,
                entry = geofence_rx.recv() => entry,
            };
            match entry {
                Ok(entry) => endpoint.send_downstream(DownstreamContent::GeofenceEvent((&entry).into())),
                Err(RecvError::Lagged(n)) => warn!("Console messenger skipped {n} geofence events."),
                Err(RecvError::Closed) => break,
            }
        }
    }
}
