use crate::flight_control::{
    ConnectionState, CrossingKind, GeofenceLogEntry, IntentRejection, SimSnapshot,
    common::Coordinate,
};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Upstream {
    #[prost(oneof = "UpstreamContent", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub content: Option<UpstreamContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Downstream {
    #[prost(oneof = "DownstreamContent", tags = "1, 2, 3, 4, 5, 6")]
    pub content: Option<DownstreamContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {
    #[prost(string, optional, tag = "1")]
    pub echo: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pong {
    #[prost(string, optional, tag = "1")]
    pub echo: Option<String>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Position {
    #[prost(double, tag = "1")]
    pub lat: f64,
    #[prost(double, tag = "2")]
    pub lon: f64,
}

impl From<Coordinate> for Position {
    fn from(value: Coordinate) -> Self { Self { lat: value.lat(), lon: value.lon() } }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetTarget {
    #[prost(double, tag = "1")]
    pub lat: f64,
    #[prost(double, tag = "2")]
    pub lon: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ReturnHome {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Connect {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Disconnect {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ToggleStableLink {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetGeofenceLog {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetPathHistory {}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum UpstreamContent {
    #[prost(message, tag = "1")]
    Ping(Ping),
    #[prost(message, tag = "2")]
    SetTarget(SetTarget),
    #[prost(message, tag = "3")]
    ReturnHome(ReturnHome),
    #[prost(message, tag = "4")]
    Connect(Connect),
    #[prost(message, tag = "5")]
    Disconnect(Disconnect),
    #[prost(message, tag = "6")]
    ToggleStableLink(ToggleStableLink),
    #[prost(message, tag = "7")]
    GetGeofenceLog(GetGeofenceLog),
    #[prost(message, tag = "8")]
    GetPathHistory(GetPathHistory),
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Telemetry {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(enumeration = "LinkState", tag = "2")]
    pub link: i32,
    #[prost(message, optional, tag = "3")]
    pub position: Option<Position>,
    #[prost(double, tag = "4")]
    pub altitude: f64,
    #[prost(double, tag = "5")]
    pub speed: f64,
    #[prost(double, tag = "6")]
    pub battery: f64,
    #[prost(double, tag = "7")]
    pub jitter: f64,
    #[prost(message, optional, tag = "8")]
    pub target: Option<Position>,
    #[prost(message, optional, tag = "9")]
    pub home: Option<Position>,
    #[prost(bool, tag = "10")]
    pub outside_fence: bool,
    #[prost(bool, tag = "11")]
    pub stable_link: bool,
    #[prost(bool, tag = "12")]
    pub battery_low: bool,
}

impl Telemetry {
    pub(crate) fn from_snapshot(snapshot: &SimSnapshot, timestamp: i64) -> Self {
        let tel = &snapshot.telemetry;
        Self {
            timestamp,
            link: LinkState::from(snapshot.link) as i32,
            position: Some(tel.pos.into()),
            altitude: tel.altitude_m,
            speed: tel.speed_mps,
            battery: tel.battery,
            jitter: tel.jitter_ms,
            target: snapshot.target.map(Position::from),
            home: Some(snapshot.home.into()),
            outside_fence: snapshot.outside_fence,
            stable_link: snapshot.stable_link,
            battery_low: snapshot.battery_low,
        }
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GeofenceEvent {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(enumeration = "Crossing", tag = "2")]
    pub kind: i32,
    #[prost(message, optional, tag = "3")]
    pub position: Option<Position>,
}

impl From<&GeofenceLogEntry> for GeofenceEvent {
    fn from(entry: &GeofenceLogEntry) -> Self {
        Self {
            timestamp: entry.timestamp().timestamp_millis(),
            kind: Crossing::from(entry.kind()) as i32,
            position: Some(entry.pos().into()),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeofenceLog {
    #[prost(message, repeated, tag = "1")]
    pub entries: Vec<GeofenceEvent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PathHistory {
    #[prost(message, repeated, tag = "1")]
    pub points: Vec<Position>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntentAck {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
    #[prost(string, optional, tag = "2")]
    pub reason: Option<String>,
}

impl From<Result<(), IntentRejection>> for IntentAck {
    fn from(value: Result<(), IntentRejection>) -> Self {
        match value {
            Ok(()) => Self { accepted: true, reason: None },
            Err(e) => Self { accepted: false, reason: Some(e.to_string()) },
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum DownstreamContent {
    #[prost(message, tag = "1")]
    Pong(Pong),
    #[prost(message, tag = "2")]
    Telemetry(Telemetry),
    #[prost(message, tag = "3")]
    GeofenceEvent(GeofenceEvent),
    #[prost(message, tag = "4")]
    GeofenceLog(GeofenceLog),
    #[prost(message, tag = "5")]
    PathHistory(PathHistory),
    #[prost(message, tag = "6")]
    IntentAck(IntentAck),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum LinkState {
    Disconnected = 0,
    Connected = 1,
    ReturningHome = 2,
    PendingDisconnect = 3,
}

impl From<ConnectionState> for LinkState {
    fn from(value: ConnectionState) -> Self {
        match value {
            ConnectionState::Disconnected => LinkState::Disconnected,
            ConnectionState::Connected => LinkState::Connected,
            ConnectionState::ReturningHome { pending_disconnect: false } => LinkState::ReturningHome,
            ConnectionState::ReturningHome { pending_disconnect: true } => LinkState::PendingDisconnect,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Crossing {
    Enter = 0,
    Exit = 1,
}

impl From<CrossingKind> for Crossing {
    fn from(value: CrossingKind) -> Self {
        match value {
            CrossingKind::Enter => Crossing::Enter,
            CrossingKind::Exit => Crossing::Exit,
        }
    }
}
