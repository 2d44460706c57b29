use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::protocol::Frame;

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Frame(Frame),
    Closed,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Socket(ConnectionId, SocketEvent),
    ReconnectDue,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

#[derive(Debug, Clone)]
pub struct SocketEvents {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl SocketEvents {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn emit(&self, event: SocketEvent) -> bool {
        self.tx.send(DriverEvent::Socket(self.id, event)).is_ok()
    }

    pub fn opened(&self) -> bool {
        self.emit(SocketEvent::Opened)
    }

    pub fn frame(&self, frame: Frame) -> bool {
        self.emit(SocketEvent::Frame(frame))
    }

    pub fn closed(&self) -> bool {
        self.emit(SocketEvent::Closed)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(SocketEvent::Error(message.into()))
    }
}

pub trait SocketHandle {
    /// Queues a binary frame. Returns false when the socket is already gone.
    fn send(&self, payload: Vec<u8>) -> bool;

    fn close(&mut self);
}

pub trait Connector {
    type Handle: SocketHandle;

    fn open(&mut self, url: &str, events: SocketEvents) -> Self::Handle;
}

#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    handshake_timeout: Option<Duration>,
}

impl WsConnector {
    pub fn new(handshake_timeout: Option<Duration>) -> Self {
        Self { handshake_timeout }
    }
}

impl Connector for WsConnector {
    type Handle = WsHandle;

    fn open(&mut self, url: &str, events: SocketEvents) -> WsHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(
            url.to_string(),
            self.handshake_timeout,
            events,
            outbound_rx,
        ));

        WsHandle {
            outbound: Some(outbound_tx),
        }
    }
}

#[derive(Debug)]
pub struct WsHandle {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl SocketHandle for WsHandle {
    fn send(&self, payload: Vec<u8>) -> bool {
        self.outbound
            .as_ref()
            .is_some_and(|outbound| outbound.send(payload).is_ok())
    }

    fn close(&mut self) {
        self.outbound = None;
    }
}

async fn run_socket(
    url: String,
    handshake_timeout: Option<Duration>,
    events: SocketEvents,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let stream = match open_stream(&url, handshake_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            log::debug!("Connection {} to {} failed: {}", events.id(), url, e);
            events.error(e.to_string());
            events.closed();
            return;
        }
    };

    events.opened();

    let (mut sink, mut stream) = stream.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    events.frame(Frame::Text(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    events.frame(Frame::Binary(data));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.error(e.to_string());
                    break;
                }
            },
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if let Err(e) = sink.send(Message::Binary(payload)).await {
                        events.error(e.to_string());
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }

    events.closed();
}

async fn open_stream(
    url: &str,
    handshake_timeout: Option<Duration>,
) -> Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    TransportError,
> {
    let connect = tokio_tungstenite::connect_async(url);
    let (stream, _response) = match handshake_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| TransportError::HandshakeTimeout(limit))??,
        None => connect.await?,
    };
    Ok(stream)
}
