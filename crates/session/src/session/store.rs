use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::roster::{LatLon, ScenarioUnit};
use crate::net::{ClientId, ConnectionStatus, SessionId, UnitId};

pub type SubscriptionId = u64;

type Observer = Box<dyn FnMut(&StoreChange)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReady {
    pub session_id: SessionId,
    pub opponent_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub session_id: SessionId,
    pub winner_id: ClientId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Status(ConnectionStatus),
    Identity(ClientId),
    SessionReady(SessionReady),
    GameStarted(SessionId),
    GameEnded(GameOutcome),
    UnitMoved { unit_id: UnitId, position: LatLon },
    SessionCleared,
}

pub struct SessionStore {
    status: ConnectionStatus,
    client_id: Option<ClientId>,
    session_ready: Option<SessionReady>,
    game_started: Option<SessionId>,
    game_ended: Option<GameOutcome>,
    positions: HashMap<UnitId, LatLon>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
    disposed: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            client_id: None,
            session_ready: None,
            game_started: None,
            game_ended: None,
            positions: HashMap::new(),
            observers: Vec::new(),
            next_subscription: 1,
            disposed: false,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn session_ready(&self) -> Option<&SessionReady> {
        self.session_ready.as_ref()
    }

    pub fn game_started(&self) -> Option<&str> {
        self.game_started.as_deref()
    }

    pub fn game_ended(&self) -> Option<&GameOutcome> {
        self.game_ended.as_ref()
    }

    pub fn positions(&self) -> &HashMap<UnitId, LatLon> {
        &self.positions
    }

    pub fn position(&self, unit_id: &str) -> Option<LatLon> {
        self.positions.get(unit_id).copied()
    }

    /// Live position when one was received, the snapshot position otherwise.
    pub fn resolve_position(&self, unit: &ScenarioUnit) -> LatLon {
        self.position(&unit.id).unwrap_or(unit.position)
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;

        if self.disposed {
            log::warn!("Subscription {} ignored, store is disposed", id);
            return id;
        }

        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn dispose(&mut self) {
        self.observers.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Identity and connection status survive.
    pub fn leave_session(&mut self) {
        let had_state = self.session_ready.is_some()
            || self.game_started.is_some()
            || self.game_ended.is_some()
            || !self.positions.is_empty();

        self.session_ready = None;
        self.game_started = None;
        self.game_ended = None;
        self.positions.clear();

        if had_state {
            self.notify(StoreChange::SessionCleared);
        }
    }

    pub(crate) fn set_status(&mut self, status: ConnectionStatus) -> bool {
        if self.status == status {
            return false;
        }
        log::debug!("Connection status {} -> {}", self.status, status);
        self.status = status;
        self.notify(StoreChange::Status(status));
        true
    }

    /// First write wins; later values are ignored even when they differ.
    pub(crate) fn assign_identity(&mut self, client_id: &str) -> bool {
        match self.client_id.as_deref() {
            Some(current) => {
                if current != client_id {
                    log::warn!(
                        "Ignoring identity {}, already known as {}",
                        client_id,
                        current
                    );
                }
                false
            }
            None => {
                log::info!("Assigned client identity {}", client_id);
                self.client_id = Some(client_id.to_string());
                self.notify(StoreChange::Identity(client_id.to_string()));
                true
            }
        }
    }

    pub(crate) fn set_session_ready(&mut self, ready: SessionReady) -> bool {
        if self.session_ready.as_ref() == Some(&ready) {
            return false;
        }
        self.session_ready = Some(ready.clone());
        self.notify(StoreChange::SessionReady(ready));
        true
    }

    pub(crate) fn set_game_started(&mut self, session_id: &str) -> bool {
        if self.game_started.as_deref() == Some(session_id) {
            return false;
        }
        self.game_started = Some(session_id.to_string());
        self.notify(StoreChange::GameStarted(session_id.to_string()));
        true
    }

    pub(crate) fn set_game_ended(&mut self, outcome: GameOutcome) -> bool {
        if let Some(current) = &self.game_ended {
            if current.session_id == outcome.session_id {
                log::warn!(
                    "Session {} already ended, ignoring second result",
                    outcome.session_id
                );
                return false;
            }
        }
        self.game_ended = Some(outcome.clone());
        self.notify(StoreChange::GameEnded(outcome));
        true
    }

    pub(crate) fn move_unit(&mut self, unit_id: &str, position: LatLon) {
        self.positions.insert(unit_id.to_string(), position);
        self.notify(StoreChange::UnitMoved {
            unit_id: unit_id.to_string(),
            position,
        });
    }

    fn notify(&mut self, change: StoreChange) {
        for (_, observer) in &mut self.observers {
            observer(&change);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("status", &self.status)
            .field("client_id", &self.client_id)
            .field("session_ready", &self.session_ready)
            .field("game_started", &self.game_started)
            .field("game_ended", &self.game_ended)
            .field("positions", &self.positions.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::session::roster::UnitSide;

    fn recorder(store: &mut SessionStore) -> Rc<RefCell<Vec<StoreChange>>> {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        store.subscribe(move |change| sink.borrow_mut().push(change.clone()));
        changes
    }

    #[test]
    fn test_identity_first_write_wins() {
        let mut store = SessionStore::new();

        assert!(store.assign_identity("U-7"));
        assert!(!store.assign_identity("U-8"));
        assert!(!store.assign_identity("U-7"));
        assert_eq!(store.client_id(), Some("U-7"));
    }

    #[test]
    fn test_status_notifies_only_on_change() {
        let mut store = SessionStore::new();
        let changes = recorder(&mut store);

        assert!(store.set_status(ConnectionStatus::Connecting));
        assert!(!store.set_status(ConnectionStatus::Connecting));
        assert!(store.set_status(ConnectionStatus::Connected));

        assert_eq!(
            *changes.borrow(),
            vec![
                StoreChange::Status(ConnectionStatus::Connecting),
                StoreChange::Status(ConnectionStatus::Connected),
            ]
        );
    }

    #[test]
    fn test_overlay_replaces_previous_position() {
        let mut store = SessionStore::new();

        store.move_unit("u-1", LatLon::new(1.0, 1.0));
        store.move_unit("u-1", LatLon::new(2.0, 3.0));

        assert_eq!(store.position("u-1"), Some(LatLon::new(2.0, 3.0)));
        assert_eq!(store.positions().len(), 1);
    }

    #[test]
    fn test_resolve_position_falls_back_to_snapshot() {
        let mut store = SessionStore::new();
        let moved = ScenarioUnit::new("u-1", UnitSide::Blue, LatLon::new(10.0, 10.0));
        let idle = ScenarioUnit::new("u-2", UnitSide::Red, LatLon::new(20.0, 20.0));

        store.move_unit("u-1", LatLon::new(11.0, 12.0));

        assert_eq!(store.resolve_position(&moved), LatLon::new(11.0, 12.0));
        assert_eq!(store.resolve_position(&idle), LatLon::new(20.0, 20.0));
    }

    #[test]
    fn test_game_ended_once_per_session() {
        let mut store = SessionStore::new();
        let first = GameOutcome {
            session_id: "S1".to_string(),
            winner_id: "U-1".to_string(),
            reason: "objectives held".to_string(),
        };
        let second = GameOutcome {
            winner_id: "U-2".to_string(),
            ..first.clone()
        };

        assert!(store.set_game_ended(first.clone()));
        assert!(!store.set_game_ended(second));
        assert_eq!(store.game_ended(), Some(&first));
    }

    #[test]
    fn test_leave_session_keeps_identity() {
        let mut store = SessionStore::new();
        store.assign_identity("U-7");
        store.set_status(ConnectionStatus::Connected);
        store.set_session_ready(SessionReady {
            session_id: "S1".to_string(),
            opponent_id: "U-9".to_string(),
        });
        store.set_game_started("S1");
        store.move_unit("u-1", LatLon::new(1.0, 2.0));
        let changes = recorder(&mut store);

        store.leave_session();

        assert_eq!(store.client_id(), Some("U-7"));
        assert_eq!(store.status(), ConnectionStatus::Connected);
        assert!(store.session_ready().is_none());
        assert!(store.game_started().is_none());
        assert!(store.positions().is_empty());
        assert_eq!(*changes.borrow(), vec![StoreChange::SessionCleared]);

        store.leave_session();
        assert_eq!(changes.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_and_dispose() {
        let mut store = SessionStore::new();
        let changes = recorder(&mut store);
        let other = store.subscribe(|_| {});

        assert!(store.unsubscribe(other));
        assert!(!store.unsubscribe(other));
        assert_eq!(store.observer_count(), 1);

        store.dispose();
        store.subscribe(|_| panic!("observer registered after dispose"));
        store.set_game_started("S1");

        assert!(store.is_disposed());
        assert_eq!(store.observer_count(), 0);
        assert!(changes.borrow().is_empty());
        assert_eq!(store.game_started(), Some("S1"));
    }
}
