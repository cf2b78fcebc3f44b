//! Single vehicle simulation core: geo math, constant speed navigation, the
//! power model, the geofence monitor, the connection lifecycle and the actor
//! driving them from two session timers.

pub(crate) mod common;
mod geofence;
mod link_state;
mod navigation;
mod power_model;
mod scheduler;
mod supervisor;
mod telemetry;
mod vehicle_sim;

pub use geofence::{CrossingKind, GeofenceLogEntry};
pub use link_state::{ConnectionState, IntentRejection};
pub use supervisor::{Supervisor, SupervisorHandle};
pub use vehicle_sim::{OperatorIntent, SimSnapshot};
