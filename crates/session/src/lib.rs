pub mod net;
pub mod session;

pub use net::{
    ClientCommand, ClientConfig, ClientId, ConnectionManager, ConnectionStatus, Connector, Frame,
    MoveOutcome, ProtocolError, ServerEvent, SessionClient, SessionId, UnitId, WsConnector,
    decode_event, encode_command,
};
pub use session::{
    EventDispatcher, GameOutcome, LatLon, Roster, ScenarioUnit, SessionReady, SessionStore,
    StoreChange, UnitSide, can_control_unit,
};
