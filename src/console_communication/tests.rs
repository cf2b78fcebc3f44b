use super::framing::{MAX_FRAME_LEN, read_frame, write_frame};
use super::gcs_messages::{
    self, Crossing, Downstream, DownstreamContent, LinkState, Upstream, UpstreamContent,
};
use super::relay_endpoint::RelayFrame;
use super::{ConsoleMessenger, RelayEndpoint};
use crate::config::SimParams;
use crate::flight_control::{IntentRejection, OperatorIntent, Supervisor};
use prost::Message;
use std::io::{Cursor, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE: Duration = Duration::from_millis(150);

fn local_any() -> SocketAddr { SocketAddr::from(([127, 0, 0, 1], 0)) }

async fn wait_for_peers(relay: &RelayEndpoint, count: usize) {
    timeout(RECV_TIMEOUT, async {
        while relay.peer_count() != count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_relay_fans_out_to_all_other_peers() {
    const PEERS: usize = 4;
    let relay = RelayEndpoint::start(local_any()).await.unwrap();
    let mut peers = Vec::new();
    for _ in 0..PEERS {
        peers.push(TcpStream::connect(relay.local_addr()).await.unwrap());
    }
    wait_for_peers(&relay, PEERS).await;

    let payload = br#"{"type":"offer","sdp":"v=0"}"#.to_vec();
    write_frame(&mut peers[1], &payload).await.unwrap();

    for (i, peer) in peers.iter_mut().enumerate() {
        if i == 1 {
            assert!(timeout(SILENCE, read_frame(peer)).await.is_err(), "sender got its own frame back");
        } else {
            let got = timeout(RECV_TIMEOUT, read_frame(peer)).await.unwrap().unwrap();
            assert_eq!(got, payload);
        }
    }
}

#[tokio::test]
async fn test_relay_keeps_send_order_and_drops_closed_peers() {
    let relay = RelayEndpoint::start(local_any()).await.unwrap();
    let mut sender = TcpStream::connect(relay.local_addr()).await.unwrap();
    let mut receiver = TcpStream::connect(relay.local_addr()).await.unwrap();
    let leaver = TcpStream::connect(relay.local_addr()).await.unwrap();
    wait_for_peers(&relay, 3).await;

    drop(leaver);
    wait_for_peers(&relay, 2).await;

    for i in 0u8..5 {
        write_frame(&mut sender, &[i; 3]).await.unwrap();
    }
    for i in 0u8..5 {
        let got = timeout(RECV_TIMEOUT, read_frame(&mut receiver)).await.unwrap().unwrap();
        assert_eq!(got, vec![i; 3]);
    }
}

#[tokio::test]
async fn test_relay_drops_peer_sending_oversized_frame() {
    let relay = RelayEndpoint::start(local_any()).await.unwrap();
    let mut rogue = TcpStream::connect(relay.local_addr()).await.unwrap();
    let _other = TcpStream::connect(relay.local_addr()).await.unwrap();
    wait_for_peers(&relay, 2).await;

    let too_long = u32::try_from(MAX_FRAME_LEN + 1).unwrap();
    rogue.write_u32(too_long).await.unwrap();
    wait_for_peers(&relay, 1).await;
}

#[tokio::test]
async fn test_relay_skips_own_frames_and_closes_lagging_peer() {
    let (sender, mut receiver) = broadcast::channel(8);
    sender.send(RelayFrame { origin: 1, payload: Arc::new(vec![1]) }).unwrap();
    sender.send(RelayFrame { origin: 0, payload: Arc::new(vec![2]) }).unwrap();
    drop(sender);
    let mut sink = Vec::new();
    RelayEndpoint::handle_peer_tx(&mut sink, 1, &mut receiver).await.unwrap();
    assert_eq!(sink, [0u8, 0, 0, 1, 2]);

    let (sender, mut receiver) = broadcast::channel(2);
    for i in 0u8..5 {
        sender.send(RelayFrame { origin: 0, payload: Arc::new(vec![i]) }).unwrap();
    }
    let mut sink = Vec::new();
    let err = RelayEndpoint::handle_peer_tx(&mut sink, 1, &mut receiver).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_frame_round_trip_over_buffer() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, b"relay").await.unwrap();
    assert_eq!(&buffer[..4], &5u32.to_be_bytes());
    let got = read_frame(&mut Cursor::new(buffer)).await.unwrap();
    assert_eq!(got, b"relay");
}

#[test]
fn test_set_target_with_invalid_coordinate_is_rejected() {
    let content = UpstreamContent::SetTarget(gcs_messages::SetTarget { lat: 91.0, lon: 0.0 });
    assert_eq!(ConsoleMessenger::to_intent(&content), Some(Err(IntentRejection::InvalidCoordinate)));
    let ping = UpstreamContent::Ping(gcs_messages::Ping { echo: None });
    assert_eq!(ConsoleMessenger::to_intent(&ping), None);
    assert_eq!(
        ConsoleMessenger::to_intent(&UpstreamContent::Connect(gcs_messages::Connect {})),
        Some(Ok(OperatorIntent::Connect))
    );
}

async fn send_upstream(stream: &mut TcpStream, content: UpstreamContent) {
    let bytes = Upstream { content: Some(content) }.encode_to_vec();
    write_frame(stream, &bytes).await.unwrap();
}

/// Reads downstream messages until `pick` accepts one.
async fn recv_until<T, F>(stream: &mut TcpStream, mut pick: F) -> T
where F: FnMut(DownstreamContent) -> Option<T> {
    timeout(RECV_TIMEOUT, async {
        loop {
            let frame = read_frame(stream).await.unwrap();
            let msg = Downstream::decode(&mut Cursor::new(frame)).unwrap();
            if let Some(found) = msg.content.and_then(&mut pick) {
                return found;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_console_drives_a_session() {
    let params = SimParams { tick: Duration::from_millis(5), ..SimParams::default() };
    let (supervisor, handle) = Supervisor::new(params, false);
    let c_tok = CancellationToken::new();
    tokio::spawn(supervisor.run(c_tok.clone()));
    let messenger = ConsoleMessenger::start(local_any(), handle, c_tok.clone()).await.unwrap();
    let mut console = TcpStream::connect(messenger.local_addr()).await.unwrap();

    let first = recv_until(&mut console, |c| match c {
        DownstreamContent::Telemetry(t) => Some(t),
        _ => None,
    })
    .await;
    assert_eq!(first.link, LinkState::Disconnected as i32);

    send_upstream(&mut console, UpstreamContent::Ping(gcs_messages::Ping { echo: Some("hi".into()) })).await;
    let pong = recv_until(&mut console, |c| match c {
        DownstreamContent::Pong(p) => Some(p),
        _ => None,
    })
    .await;
    assert_eq!(pong.echo.as_deref(), Some("hi"));

    send_upstream(&mut console, UpstreamContent::ReturnHome(gcs_messages::ReturnHome {})).await;
    let ack = recv_until(&mut console, |c| match c {
        DownstreamContent::IntentAck(a) => Some(a),
        _ => None,
    })
    .await;
    assert!(!ack.accepted);
    assert_eq!(ack.reason, Some(IntentRejection::NotConnected.to_string()));

    send_upstream(&mut console, UpstreamContent::Connect(gcs_messages::Connect {})).await;
    let ack = recv_until(&mut console, |c| match c {
        DownstreamContent::IntentAck(a) => Some(a),
        _ => None,
    })
    .await;
    assert!(ack.accepted);

    let home = SimParams::HOME;
    let target = gcs_messages::SetTarget { lat: home.lat() + 0.00002, lon: home.lon() };
    send_upstream(&mut console, UpstreamContent::SetTarget(target)).await;
    let arrived = recv_until(&mut console, |c| match c {
        DownstreamContent::Telemetry(t) if t.target.is_none() && t.position.is_some_and(|p| p.lat > home.lat()) => {
            Some(t)
        }
        _ => None,
    })
    .await;
    assert_eq!(arrived.link, LinkState::Connected as i32);
    let pos = arrived.position.unwrap();
    assert!((pos.lat - target.lat).abs() < 1e-12);

    send_upstream(&mut console, UpstreamContent::GetPathHistory(gcs_messages::GetPathHistory {})).await;
    let path = recv_until(&mut console, |c| match c {
        DownstreamContent::PathHistory(p) => Some(p),
        _ => None,
    })
    .await;
    assert!(path.points.len() >= 2);
    assert_eq!(path.points.first().map(|p| p.lat), Some(home.lat()));

    send_upstream(&mut console, UpstreamContent::GetGeofenceLog(gcs_messages::GetGeofenceLog {})).await;
    let log = recv_until(&mut console, |c| match c {
        DownstreamContent::GeofenceLog(l) => Some(l),
        _ => None,
    })
    .await;
    assert!(log.entries.is_empty());

    c_tok.cancel();
}

#[tokio::test]
async fn test_console_receives_geofence_events() {
    let params = SimParams {
        tick: Duration::from_millis(2),
        fence_radius_m: 1.0,
        ..SimParams::default()
    };
    let (supervisor, handle) = Supervisor::new(params, false);
    let c_tok = CancellationToken::new();
    tokio::spawn(supervisor.run(c_tok.clone()));
    let messenger = ConsoleMessenger::start(local_any(), handle.clone(), c_tok.clone()).await.unwrap();
    let mut console = TcpStream::connect(messenger.local_addr()).await.unwrap();
    recv_until(&mut console, |c| matches!(c, DownstreamContent::Telemetry(_)).then_some(())).await;

    handle.send_intent(OperatorIntent::Connect).await.unwrap();
    let home = SimParams::HOME;
    let target = crate::flight_control::common::Coordinate::new(home.lat() + 0.00003, home.lon()).unwrap();
    handle.send_intent(OperatorIntent::SetTarget(target)).await.unwrap();

    let crossing = recv_until(&mut console, |c| match c {
        DownstreamContent::GeofenceEvent(e) => Some(e),
        _ => None,
    })
    .await;
    assert_eq!(crossing.kind, Crossing::Exit as i32);
    c_tok.cancel();
}
