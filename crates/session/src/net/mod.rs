mod client;
mod config;
mod connection;
mod protocol;
mod transport;

pub use client::{MoveOutcome, SessionClient};
pub use config::{ClientConfig, DEFAULT_HANDSHAKE_TIMEOUT_MS};
pub use connection::{ConnectionManager, ConnectionStatus, Directive};
pub use protocol::{
    ClientCommand, ClientId, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SERVER_URL, Frame, FrameHeader,
    PROTOCOL_MAGIC, PROTOCOL_VERSION, ProtocolError, ServerEvent, SessionId, UnitId,
    decode_command, decode_event, encode_command, encode_event,
};
pub use transport::{
    ConnectionId, Connector, DriverEvent, SocketEvent, SocketEvents, SocketHandle,
    TransportError, WsConnector, WsHandle,
};
