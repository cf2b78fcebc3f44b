use super::framing::{read_frame, write_frame};
use crate::{info, log, warn};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::ReadHalf;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

/// One payload together with the peer that sent it.
#[derive(Debug, Clone)]
pub(super) struct RelayFrame {
    pub(super) origin: usize,
    pub(super) payload: Arc<Vec<u8>>,
}

/// Pass-through broadcast group. Every frame a peer sends is forwarded
/// verbatim to all other open peers, never echoed back to its sender.
pub(crate) struct RelayEndpoint {
    frame_sender: broadcast::Sender<RelayFrame>,
    close_oneshot_sender: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl RelayEndpoint {
    const FRAME_BUFFER: usize = 1024;

    async fn handle_peer_rx(
        socket: &mut ReadHalf<'_>,
        origin: usize,
        frame_sender: &broadcast::Sender<RelayFrame>,
    ) -> Result<(), std::io::Error> {
        loop {
            let payload = Arc::new(read_frame(socket).await?);
            let _ = frame_sender.send(RelayFrame { origin, payload });
        }
    }

    /// Forwards every frame not sent by `own_id`. A peer that falls behind the
    /// buffer is closed instead of silently missing frames.
    pub(super) async fn handle_peer_tx<W>(
        socket: &mut W,
        own_id: usize,
        frame_receiver: &mut broadcast::Receiver<RelayFrame>,
    ) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            match frame_receiver.recv().await {
                Ok(frame) if frame.origin == own_id => (),
                Ok(frame) => write_frame(socket, &frame.payload).await?,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(std::io::Error::other(format!("lagged behind by {n} frames")));
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Binds `addr` and starts relaying between accepted peers.
    pub(crate) async fn start(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let frame_sender = broadcast::Sender::new(Self::FRAME_BUFFER);
        let (close_oneshot_sender, mut close_oneshot_receiver) = oneshot::channel();
        let inst = Self {
            frame_sender: frame_sender.clone(),
            close_oneshot_sender: Some(close_oneshot_sender),
            local_addr,
        };
        info!("Relay listening on {local_addr}.");

        let next_id = AtomicUsize::new(0);
        tokio::spawn(async move {
            loop {
                let accept = tokio::select! {
                    accept = listener.accept() => accept,
                    _ = &mut close_oneshot_receiver => break
                };
                let Ok((mut socket, peer)) = accept else { break };

                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let mut frame_receiver = frame_sender.subscribe();
                let frame_sender_local = frame_sender.clone();
                log!("Relay peer {id} connected from {peer}, {} in group.", frame_sender.receiver_count());

                tokio::spawn(async move {
                    let (mut rx_socket, mut tx_socket) = socket.split();
                    let result = tokio::select! {
                        res = RelayEndpoint::handle_peer_tx(&mut tx_socket, id, &mut frame_receiver) => res,
                        res = RelayEndpoint::handle_peer_rx(&mut rx_socket, id, &frame_sender_local) => res
                    };
                    drop(frame_receiver);

                    match result {
                        Err(e)
                            if e.kind() == ErrorKind::UnexpectedEof
                                || e.kind() == ErrorKind::ConnectionReset
                                || e.kind() == ErrorKind::ConnectionAborted => (),
                        Err(e) => warn!("Dropping relay peer {id} due to {e:?}"),
                        Ok(()) => (),
                    }
                    log!("Relay peer {id} disconnected, {} in group.", frame_sender_local.receiver_count());
                    let _ = socket.shutdown().await;
                });
            }
        });
        Ok(inst)
    }

    /// Number of peers currently in the group.
    pub(crate) fn peer_count(&self) -> usize { self.frame_sender.receiver_count() }

    pub(crate) fn local_addr(&self) -> SocketAddr { self.local_addr }
}

impl Drop for RelayEndpoint {
    fn drop(&mut self) {
        if let Some(close) = self.close_oneshot_sender.take() {
            let _ = close.send(());
        }
    }
}
