use super::{common::Coordinate, navigation::NavigationSimulator};
use strum_macros::Display;

/// Session state of the operator link to the vehicle.
///
/// `ReturningHome { pending_disconnect: true }` is the deferred disconnect:
/// the session ends only once the vehicle is back at home.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    ReturningHome { pending_disconnect: bool },
}

impl ConnectionState {
    pub fn is_connected(self) -> bool { !matches!(self, ConnectionState::Disconnected) }
}

/// Reason an operator intent was not applied.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum IntentRejection {
    NotConnected,
    AlreadyConnected,
    ReturningHome,
    MovingTooFast,
    InvalidCoordinate,
    SimulationStopped,
}

impl std::error::Error for IntentRejection {}

/// What happened to the session when the vehicle reached its target.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArrivalOutcome {
    /// Arrival had no effect on the session.
    Unchanged,
    /// A return-to-launch finished, the session stays up.
    ReachedHome,
    /// A deferred disconnect completed.
    Disconnected,
}

/// Connect / disconnect / return-to-launch state machine.
///
/// The lifecycle never owns the target. It only sets or clears it through the
/// navigation simulator handed to each transition.
#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    home: Coordinate,
    return_home_max_speed: f64,
}

impl ConnectionLifecycle {
    pub fn new(home: Coordinate, return_home_max_speed: f64) -> Self {
        Self { state: ConnectionState::Disconnected, home, return_home_max_speed }
    }

    pub fn state(&self) -> ConnectionState { self.state }

    pub fn home(&self) -> Coordinate { self.home }

    /// Starts a fresh session. Only valid while disconnected.
    pub fn connect(&mut self, nav: &mut NavigationSimulator) -> Result<(), IntentRejection> {
        if self.state.is_connected() {
            return Err(IntentRejection::AlreadyConnected);
        }
        nav.clear_target();
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Sends the vehicle home and ends the session once it arrives there.
    pub fn request_disconnect(&mut self, nav: &mut NavigationSimulator) -> Result<(), IntentRejection> {
        if !self.state.is_connected() {
            return Err(IntentRejection::NotConnected);
        }
        nav.set_target(self.home);
        self.state = ConnectionState::ReturningHome { pending_disconnect: true };
        Ok(())
    }

    /// Commands return-to-launch without ending the session. Rejected while
    /// the vehicle still moves at or above the configured speed limit.
    pub fn request_return_home(&mut self, nav: &mut NavigationSimulator) -> Result<(), IntentRejection> {
        match self.state {
            ConnectionState::Disconnected => return Err(IntentRejection::NotConnected),
            ConnectionState::ReturningHome { .. } => return Err(IntentRejection::ReturningHome),
            ConnectionState::Connected => (),
        }
        if nav.current_speed() >= self.return_home_max_speed {
            return Err(IntentRejection::MovingTooFast);
        }
        nav.set_target(self.home);
        self.state = ConnectionState::ReturningHome { pending_disconnect: false };
        Ok(())
    }

    /// Points the vehicle at an operator chosen destination.
    pub fn request_target(
        &mut self,
        nav: &mut NavigationSimulator,
        target: Coordinate,
    ) -> Result<(), IntentRejection> {
        match self.state {
            ConnectionState::Disconnected => Err(IntentRejection::NotConnected),
            ConnectionState::ReturningHome { .. } => Err(IntentRejection::ReturningHome),
            ConnectionState::Connected => {
                nav.set_target(target);
                Ok(())
            }
        }
    }

    /// Reacts to the navigation simulator reaching `arrived_at`.
    pub fn on_arrival(&mut self, nav: &mut NavigationSimulator, arrived_at: Coordinate) -> ArrivalOutcome {
        if arrived_at != self.home {
            return ArrivalOutcome::Unchanged;
        }
        match self.state {
            ConnectionState::ReturningHome { pending_disconnect: true } => {
                nav.clear_target();
                self.state = ConnectionState::Disconnected;
                ArrivalOutcome::Disconnected
            }
            ConnectionState::ReturningHome { pending_disconnect: false } => {
                self.state = ConnectionState::Connected;
                ArrivalOutcome::ReachedHome
            }
            _ => ArrivalOutcome::Unchanged,
        }
    }
}
