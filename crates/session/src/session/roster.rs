use serde::{Deserialize, Serialize};

use crate::net::{ClientId, SessionId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSide {
    #[default]
    Unspecified,
    Blue,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioUnit {
    pub id: UnitId,
    pub side: UnitSide,
    pub position: LatLon,
}

impl ScenarioUnit {
    pub fn new(id: impl Into<UnitId>, side: UnitSide, position: LatLon) -> Self {
        Self {
            id: id.into(),
            side,
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    session_id: SessionId,
    player1: Option<ClientId>,
    player2: Option<ClientId>,
}

impl Roster {
    pub fn new(
        session_id: impl Into<SessionId>,
        player1: Option<ClientId>,
        player2: Option<ClientId>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            player1,
            player2,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn player1(&self) -> Option<&str> {
        self.player1.as_deref()
    }

    pub fn player2(&self) -> Option<&str> {
        self.player2.as_deref()
    }

    pub fn holder(&self, side: UnitSide) -> Option<&str> {
        match side {
            UnitSide::Blue => self.player1(),
            UnitSide::Red => self.player2(),
            UnitSide::Unspecified => None,
        }
    }

    pub fn side_of(&self, client_id: &str) -> Option<UnitSide> {
        [UnitSide::Blue, UnitSide::Red]
            .into_iter()
            .find(|&side| self.holder(side) == Some(client_id))
    }

    pub fn is_full(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }
}

/// Blue belongs to player one, Red to player two; anything else is denied.
pub fn can_control_unit(unit: &ScenarioUnit, client_id: &str, roster: &Roster) -> bool {
    if client_id.is_empty() {
        return false;
    }
    roster.holder(unit.side) == Some(client_id)
}
