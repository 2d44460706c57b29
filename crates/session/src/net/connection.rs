use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::transport::{ConnectionId, SocketEvent};
use crate::session::{DispatchStats, EventDispatcher, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Open(ConnectionId),
    ScheduleReconnect(Duration),
}

/// Sans-IO lifecycle; the driver executes the returned [`Directive`]s.
#[derive(Debug)]
pub struct ConnectionManager {
    reconnect_delay: Duration,
    current: Option<ConnectionId>,
    has_connected: bool,
    reconnect_pending: bool,
    next_id: ConnectionId,
    dispatcher: EventDispatcher,
}

impl ConnectionManager {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            current: None,
            has_connected: false,
            reconnect_pending: false,
            next_id: 1,
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn current(&self) -> Option<ConnectionId> {
        self.current
    }

    pub fn has_connected(&self) -> bool {
        self.has_connected
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// No-op while a connection handle exists.
    pub fn connect(&mut self, store: &mut SessionStore) -> Option<Directive> {
        if let Some(id) = self.current {
            log::debug!("Connect ignored, connection {} already active", id);
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.current = Some(id);

        store.set_status(ConnectionStatus::Connecting);
        Some(Directive::Open(id))
    }

    pub fn on_socket_event(
        &mut self,
        id: ConnectionId,
        event: SocketEvent,
        store: &mut SessionStore,
    ) -> Option<Directive> {
        if self.current != Some(id) {
            log::debug!("Dropping {:?} from stale connection {}", event, id);
            return None;
        }

        match event {
            SocketEvent::Opened => {
                self.on_open(id, store);
                None
            }
            SocketEvent::Frame(frame) => {
                self.dispatcher.on_frame(frame, store);
                None
            }
            SocketEvent::Error(message) => {
                log::error!("Connection {} error: {}", id, message);
                store.set_status(ConnectionStatus::Error);
                None
            }
            SocketEvent::Closed => self.on_close(id, store),
        }
    }

    pub fn on_reconnect_due(&mut self, store: &mut SessionStore) -> Option<Directive> {
        self.reconnect_pending = false;
        log::info!("Reconnecting");
        self.connect(store)
    }

    pub fn release(&mut self, store: &mut SessionStore) -> Option<ConnectionId> {
        self.reconnect_pending = false;
        let released = self.current.take();
        if released.is_some() {
            store.set_status(ConnectionStatus::Disconnected);
        }
        released
    }

    fn on_open(&mut self, id: ConnectionId, store: &mut SessionStore) {
        self.has_connected = true;
        store.set_status(ConnectionStatus::Connected);

        match store.client_id() {
            Some(client_id) => log::info!("Connection {} open, resuming as {}", id, client_id),
            None => log::info!("Connection {} open, awaiting identity", id),
        }
    }

    fn on_close(&mut self, id: ConnectionId, store: &mut SessionStore) -> Option<Directive> {
        self.current = None;

        // Latched by the first successful open; retries never clear it.
        if !self.has_connected {
            log::warn!("Connection {} closed before opening", id);
            store.set_status(ConnectionStatus::Error);
            return None;
        }

        log::warn!("Connection {} closed", id);
        store.set_status(ConnectionStatus::Disconnected);

        if self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = true;
        Some(Directive::ScheduleReconnect(self.reconnect_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Frame;

    const DELAY: Duration = Duration::from_millis(3000);

    fn open(manager: &mut ConnectionManager, store: &mut SessionStore) -> ConnectionId {
        let Some(Directive::Open(id)) = manager.connect(store) else {
            panic!("expected an open directive");
        };
        manager.on_socket_event(id, SocketEvent::Opened, store);
        id
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);

        assert_eq!(manager.connect(&mut store), Some(Directive::Open(1)));
        assert_eq!(manager.connect(&mut store), None);
        assert_eq!(store.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_open_marks_connected() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);

        open(&mut manager, &mut store);

        assert_eq!(store.status(), ConnectionStatus::Connected);
        assert!(manager.has_connected());
    }

    #[test]
    fn test_close_before_open_is_terminal() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let Some(Directive::Open(id)) = manager.connect(&mut store) else {
            panic!("expected an open directive");
        };

        let error = manager.on_socket_event(id, SocketEvent::Error("refused".into()), &mut store);
        let close = manager.on_socket_event(id, SocketEvent::Closed, &mut store);

        assert_eq!(error, None);
        assert_eq!(close, None);
        assert_eq!(store.status(), ConnectionStatus::Error);
        assert!(store.client_id().is_none());
        assert!(!manager.reconnect_pending());
        assert_eq!(manager.current(), None);
    }

    #[test]
    fn test_close_after_open_schedules_single_reconnect() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let id = open(&mut manager, &mut store);

        let first = manager.on_socket_event(id, SocketEvent::Closed, &mut store);
        let repeated = manager.on_socket_event(id, SocketEvent::Closed, &mut store);

        assert_eq!(first, Some(Directive::ScheduleReconnect(DELAY)));
        assert_eq!(repeated, None);
        assert_eq!(store.status(), ConnectionStatus::Disconnected);

        assert_eq!(
            manager.on_reconnect_due(&mut store),
            Some(Directive::Open(id + 1))
        );
        assert_eq!(store.status(), ConnectionStatus::Connecting);
        assert!(!manager.reconnect_pending());
    }

    #[test]
    fn test_error_then_close_while_open_still_retries() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let id = open(&mut manager, &mut store);

        manager.on_socket_event(id, SocketEvent::Error("reset".into()), &mut store);
        assert_eq!(store.status(), ConnectionStatus::Error);

        let directive = manager.on_socket_event(id, SocketEvent::Closed, &mut store);

        assert_eq!(directive, Some(Directive::ScheduleReconnect(DELAY)));
        assert_eq!(store.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_failed_retry_keeps_retrying() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let first = open(&mut manager, &mut store);
        manager.on_socket_event(first, SocketEvent::Closed, &mut store);

        for _ in 0..3 {
            let Some(Directive::Open(retry)) = manager.on_reconnect_due(&mut store) else {
                panic!("expected an open directive");
            };
            manager.on_socket_event(retry, SocketEvent::Error("refused".into()), &mut store);
            let directive = manager.on_socket_event(retry, SocketEvent::Closed, &mut store);

            assert_eq!(directive, Some(Directive::ScheduleReconnect(DELAY)));
            assert_eq!(store.status(), ConnectionStatus::Disconnected);
        }
    }

    #[test]
    fn test_manual_connect_during_backoff_makes_timer_a_noop() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let id = open(&mut manager, &mut store);
        manager.on_socket_event(id, SocketEvent::Closed, &mut store);

        assert!(manager.connect(&mut store).is_some());
        assert_eq!(manager.on_reconnect_due(&mut store), None);
    }

    #[test]
    fn test_identity_survives_reconnect() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let first = open(&mut manager, &mut store);
        manager.on_socket_event(first, SocketEvent::Frame(Frame::Text("U-7".into())), &mut store);
        manager.on_socket_event(first, SocketEvent::Closed, &mut store);

        let Some(Directive::Open(second)) = manager.on_reconnect_due(&mut store) else {
            panic!("expected an open directive");
        };
        manager.on_socket_event(second, SocketEvent::Opened, &mut store);

        assert_eq!(store.status(), ConnectionStatus::Connected);
        assert_eq!(store.client_id(), Some("U-7"));
    }

    #[test]
    fn test_stale_connection_events_are_ignored() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let first = open(&mut manager, &mut store);
        manager.on_socket_event(first, SocketEvent::Closed, &mut store);
        let second = open(&mut manager, &mut store);

        let late = manager.on_socket_event(first, SocketEvent::Closed, &mut store);
        manager.on_socket_event(first, SocketEvent::Frame(Frame::Text("U-1".into())), &mut store);

        assert_eq!(late, None);
        assert_eq!(manager.current(), Some(second));
        assert_eq!(store.status(), ConnectionStatus::Connected);
        assert!(store.client_id().is_none());
    }

    #[test]
    fn test_release_forgets_connection() {
        let mut store = SessionStore::new();
        let mut manager = ConnectionManager::new(DELAY);
        let id = open(&mut manager, &mut store);

        assert_eq!(manager.release(&mut store), Some(id));
        assert_eq!(store.status(), ConnectionStatus::Disconnected);
        assert_eq!(manager.on_socket_event(id, SocketEvent::Closed, &mut store), None);
        assert_eq!(manager.release(&mut store), None);
        assert!(!manager.reconnect_pending());
    }
}
