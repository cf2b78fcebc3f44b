use super::common::{Coordinate, distance_meters};
use chrono::{DateTime, Utc};
use strum_macros::Display;

/// Fixed circular boundary around a center coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    center: Coordinate,
    radius_m: f64,
}

impl Geofence {
    pub fn new(center: Coordinate, radius_m: f64) -> Self { Self { center, radius_m } }

    /// A point exactly on the boundary counts as inside.
    pub fn is_outside(&self, pos: &Coordinate) -> bool {
        distance_meters(pos, &self.center) > self.radius_m
    }
}

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum CrossingKind {
    #[strum(serialize = "ENTER")]
    Enter,
    #[strum(serialize = "EXIT")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceLogEntry {
    timestamp: DateTime<Utc>,
    kind: CrossingKind,
    pos: Coordinate,
}

impl GeofenceLogEntry {
    pub fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
    pub fn kind(&self) -> CrossingKind { self.kind }
    pub fn pos(&self) -> Coordinate { self.pos }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceStatus {
    pub is_outside: bool,
    pub crossing: Option<CrossingKind>,
}

/// Tracks boundary membership between ticks and records every crossing.
///
/// The first evaluation after a reset only establishes the baseline and never
/// produces a log entry, even if the vehicle starts outside the fence.
#[derive(Debug, Clone)]
pub struct GeofenceMonitor {
    fence: Geofence,
    was_outside: Option<bool>,
    log: Vec<GeofenceLogEntry>,
}

impl GeofenceMonitor {
    pub fn new(fence: Geofence) -> Self { Self { fence, was_outside: None, log: Vec::new() } }

    pub fn log(&self) -> &[GeofenceLogEntry] { &self.log }

    pub fn is_outside(&self) -> bool { self.was_outside.unwrap_or(false) }

    /// Forgets the baseline membership and drops the log.
    pub fn reset(&mut self) {
        self.was_outside = None;
        self.log.clear();
    }

    /// Classifies `pos` and appends a log entry if membership changed since the
    /// previous call.
    pub fn check(&mut self, pos: Coordinate) -> FenceStatus {
        let is_outside = self.fence.is_outside(&pos);
        let crossing = match self.was_outside {
            Some(false) if is_outside => Some(CrossingKind::Exit),
            Some(true) if !is_outside => Some(CrossingKind::Enter),
            _ => None,
        };
        self.was_outside = Some(is_outside);
        if let Some(kind) = crossing {
            self.log.push(GeofenceLogEntry { timestamp: Utc::now(), kind, pos });
        }
        FenceStatus { is_outside, crossing }
    }

    /// The entry appended by the most recent crossing.
    pub fn last_entry(&self) -> Option<&GeofenceLogEntry> { self.log.last() }
}
