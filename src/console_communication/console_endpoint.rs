use super::framing::{read_frame, write_frame};
use super::gcs_messages;
use crate::{event, warn};
use prost::Message;
use std::io::{Cursor, ErrorKind};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{ReadHalf, WriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Connected,
    Disconnected,
    Message(gcs_messages::UpstreamContent),
}

/// TCP endpoint operator consoles attach to. Every connected console receives
/// every downstream message; upstream messages from all consoles are merged
/// into one event stream.
pub(crate) struct ConsoleEndpoint {
    downstream_sender: broadcast::Sender<Option<Vec<u8>>>,
    upstream_event_receiver: broadcast::Receiver<ConsoleEvent>,
    close_oneshot_sender: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl ConsoleEndpoint {
    const DOWNSTREAM_BUFFER: usize = 64;
    const UPSTREAM_BUFFER: usize = 32;

    async fn handle_connection_rx(
        socket: &mut ReadHalf<'_>,
        upstream_event_sender: &broadcast::Sender<ConsoleEvent>,
    ) -> Result<(), std::io::Error> {
        loop {
            let buffer = read_frame(socket).await?;
            match gcs_messages::Upstream::decode(&mut Cursor::new(buffer)) {
                Ok(gcs_messages::Upstream { content: Some(content) }) => {
                    let _ = upstream_event_sender.send(ConsoleEvent::Message(content));
                }
                Ok(_) => event!("Dropping empty console message."),
                Err(e) => warn!("Dropping undecodable console message: {e}"),
            }
        }
    }

    async fn handle_connection_tx(
        socket: &mut WriteHalf<'_>,
        downstream_receiver: &mut broadcast::Receiver<Option<Vec<u8>>>,
    ) -> Result<(), std::io::Error> {
        loop {
            match downstream_receiver.recv().await {
                Ok(Some(message_buffer)) => write_frame(socket, &message_buffer).await?,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Console fell behind, skipped {n} messages.");
                }
                Ok(None) | Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Binds `addr` and starts accepting consoles in the background.
    pub(crate) async fn start(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let downstream_sender = broadcast::Sender::new(Self::DOWNSTREAM_BUFFER);
        let upstream_event_sender = broadcast::Sender::new(Self::UPSTREAM_BUFFER);
        let (close_oneshot_sender, mut close_oneshot_receiver) = oneshot::channel();
        let inst = Self {
            downstream_sender: downstream_sender.clone(),
            upstream_event_receiver: upstream_event_sender.subscribe(),
            close_oneshot_sender: Some(close_oneshot_sender),
            local_addr,
        };

        tokio::spawn(async move {
            loop {
                let accept = tokio::select! {
                    accept = listener.accept() => accept,
                    _ = &mut close_oneshot_receiver => break
                };

                let Ok((mut socket, peer)) = accept else { break };
                event!("Console {peer} attached.");
                let mut downstream_receiver = downstream_sender.subscribe();
                let _ = upstream_event_sender.send(ConsoleEvent::Connected);
                let upstream_event_sender_local = upstream_event_sender.clone();

                tokio::spawn(async move {
                    let (mut rx_socket, mut tx_socket) = socket.split();

                    let result = tokio::select! {
                        res = ConsoleEndpoint::handle_connection_tx(&mut tx_socket, &mut downstream_receiver) => res,
                        res = ConsoleEndpoint::handle_connection_rx(&mut rx_socket, &upstream_event_sender_local) => res
                    };

                    let _ = upstream_event_sender_local.send(ConsoleEvent::Disconnected);
                    match result {
                        Err(e)
                            if e.kind() == ErrorKind::UnexpectedEof
                                || e.kind() == ErrorKind::ConnectionReset
                                || e.kind() == ErrorKind::ConnectionAborted =>
                        {
                            event!("Console {peer} detached.");
                            return;
                        }
                        Err(e) => {
                            warn!("Closing connection to console {peer} due to {e:?}");
                        }
                        _ => {}
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });
        Ok(inst)
    }

    pub(crate) fn send_downstream(&self, msg: gcs_messages::DownstreamContent) {
        let _ = self.downstream_sender.send(Some(
            gcs_messages::Downstream { content: Some(msg) }.encode_to_vec(),
        ));
    }

    pub(crate) fn is_console_connected(&self) -> bool { self.downstream_sender.receiver_count() > 0 }

    pub(crate) fn upstream_event_receiver(&self) -> &broadcast::Receiver<ConsoleEvent> {
        &self.upstream_event_receiver
    }

    pub(crate) fn local_addr(&self) -> SocketAddr { self.local_addr }
}

impl Drop for ConsoleEndpoint {
    fn drop(&mut self) {
        if let Some(close) = self.close_oneshot_sender.take() {
            let _ = close.send(());
        }
        let _ = self.downstream_sender.send(None);
    }
}
