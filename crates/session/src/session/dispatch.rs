use super::roster::LatLon;
use super::store::{GameOutcome, SessionReady, SessionStore};
use crate::net::{Frame, ProtocolError, ServerEvent, decode_event};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub frames: u64,
    pub identity_frames: u64,
    pub events_applied: u64,
    pub frames_rejected: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Identity { accepted: bool },
    Event(ServerEvent),
    Rejected,
}

#[derive(Debug, Default)]
pub struct EventDispatcher {
    stats: DispatchStats,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn on_frame(&mut self, frame: Frame, store: &mut SessionStore) -> Dispatched {
        self.stats.frames += 1;

        match frame {
            Frame::Text(text) => self.on_identity(&text, store),
            Frame::Binary(data) => match decode_event(&data) {
                Ok(event) => {
                    self.apply(&event, store);
                    Dispatched::Event(event)
                }
                Err(e) => self.reject(data.len(), e),
            },
        }
    }

    fn on_identity(&mut self, text: &str, store: &mut SessionStore) -> Dispatched {
        self.stats.identity_frames += 1;

        if text.trim().is_empty() {
            log::warn!("Ignoring empty identity frame");
            return Dispatched::Identity { accepted: false };
        }

        Dispatched::Identity {
            accepted: store.assign_identity(text),
        }
    }

    fn apply(&mut self, event: &ServerEvent, store: &mut SessionStore) {
        self.stats.events_applied += 1;
        log::debug!("Applying {}", event.name());

        match event {
            ServerEvent::SessionReady {
                session_id,
                opponent_id,
            } => {
                log::info!("Session {} ready, opponent {}", session_id, opponent_id);
                store.set_session_ready(SessionReady {
                    session_id: session_id.clone(),
                    opponent_id: opponent_id.clone(),
                });
            }
            ServerEvent::GameStarted { session_id } => {
                log::info!("Session {} started", session_id);
                store.set_game_started(session_id);
            }
            ServerEvent::GameEnded {
                session_id,
                winner_id,
                reason,
            } => {
                log::info!(
                    "Session {} ended, winner {} ({})",
                    session_id,
                    winner_id,
                    reason
                );
                store.set_game_ended(GameOutcome {
                    session_id: session_id.clone(),
                    winner_id: winner_id.clone(),
                    reason: reason.clone(),
                });
            }
            ServerEvent::UnitMoved {
                unit_id,
                target_lat,
                target_lon,
            } => {
                store.move_unit(unit_id, LatLon::new(*target_lat, *target_lon));
            }
        }
    }

    fn reject(&mut self, len: usize, error: ProtocolError) -> Dispatched {
        self.stats.frames_rejected += 1;
        log::warn!("Discarding {} byte frame: {}", len, error);
        Dispatched::Rejected
    }
}
