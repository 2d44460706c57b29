use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

pub const PROTOCOL_MAGIC: u32 = 0x534B524D;
pub const PROTOCOL_VERSION: u16 = 1;
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:9999/ws";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

pub type ClientId = String;
pub type SessionId = String;
pub type UnitId = String;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u16,
}

impl FrameHeader {
    pub fn new() -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
        }
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        if self.magic != PROTOCOL_MAGIC {
            return Err(ProtocolError::BadMagic(self.magic));
        }
        if self.version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientCommand {
    MoveUnit {
        session_id: SessionId,
        unit_id: UnitId,
        target_lat: f64,
        target_lon: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerEvent {
    SessionReady {
        session_id: SessionId,
        opponent_id: ClientId,
    },
    GameStarted {
        session_id: SessionId,
    },
    GameEnded {
        session_id: SessionId,
        winner_id: ClientId,
        reason: String,
    },
    UnitMoved {
        unit_id: UnitId,
        target_lat: f64,
        target_lon: f64,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionReady { .. } => "session_ready",
            Self::GameStarted { .. } => "game_started",
            Self::GameEnded { .. } => "game_ended",
            Self::UnitMoved { .. } => "unit_moved",
        }
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
struct CommandFrame {
    header: FrameHeader,
    command: ClientCommand,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
struct EventFrame {
    header: FrameHeader,
    event: ServerEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("bad frame magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u16),
}

pub fn encode_command(command: &ClientCommand) -> Result<Vec<u8>, ProtocolError> {
    let frame = CommandFrame {
        header: FrameHeader::new(),
        command: command.clone(),
    };
    rkyv::to_bytes::<rancor::Error>(&frame)
        .map(|aligned| aligned.into_vec())
        .map_err(ProtocolError::Serialize)
}

pub fn decode_command(data: &[u8]) -> Result<ClientCommand, ProtocolError> {
    let aligned = align(data);
    let frame = rkyv::from_bytes::<CommandFrame, rancor::Error>(&aligned)
        .map_err(ProtocolError::Deserialize)?;
    frame.header.validate()?;
    Ok(frame.command)
}

pub fn encode_event(event: &ServerEvent) -> Result<Vec<u8>, ProtocolError> {
    let frame = EventFrame {
        header: FrameHeader::new(),
        event: event.clone(),
    };
    rkyv::to_bytes::<rancor::Error>(&frame)
        .map(|aligned| aligned.into_vec())
        .map_err(ProtocolError::Serialize)
}

pub fn decode_event(data: &[u8]) -> Result<ServerEvent, ProtocolError> {
    let aligned = align(data);
    let frame = rkyv::from_bytes::<EventFrame, rancor::Error>(&aligned)
        .map_err(ProtocolError::Deserialize)?;
    frame.header.validate()?;
    Ok(frame.event)
}

// Transport buffers carry no alignment guarantee; archives need one.
fn align(data: &[u8]) -> AlignedVec<16> {
    let mut aligned = AlignedVec::<16>::with_capacity(data.len());
    aligned.extend_from_slice(data);
    aligned
}
