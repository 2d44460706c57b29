use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::ClientConfig;
use super::connection::{ConnectionManager, ConnectionStatus, Directive};
use super::protocol::{ClientCommand, encode_command};
use super::transport::{Connector, DriverEvent, SocketEvents, SocketHandle, WsConnector};
use crate::session::{
    DispatchStats, LatLon, Roster, ScenarioUnit, SessionStore, can_control_unit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Sent,
    Denied,
    Dropped,
}

pub struct SessionClient<C: Connector = WsConnector> {
    config: ClientConfig,
    connector: C,
    manager: ConnectionManager,
    store: SessionStore,
    socket: Option<C::Handle>,
    reconnect_timer: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    events_rx: mpsc::UnboundedReceiver<DriverEvent>,
}

impl SessionClient<WsConnector> {
    pub fn new(config: ClientConfig) -> Self {
        let connector = WsConnector::new(config.handshake_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> SessionClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            manager: ConnectionManager::new(config.reconnect_delay),
            store: SessionStore::new(),
            socket: None,
            reconnect_timer: None,
            events_tx,
            events_rx,
            connector,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn status(&self) -> ConnectionStatus {
        self.store.status()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.manager.dispatch_stats()
    }

    pub fn is_reconnect_scheduled(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn has_connection(&self) -> bool {
        self.manager.current().is_some()
    }

    /// Only an explicit `connect()` moves a settled client on.
    pub fn is_settled(&self) -> bool {
        !self.has_connection() && !self.is_reconnect_scheduled()
    }

    pub fn connect(&mut self) {
        let directive = self.manager.connect(&mut self.store);
        self.execute(directive);
    }

    pub async fn next_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            processed += 1;
        }
        processed
    }

    pub fn send_move_unit(
        &mut self,
        session_id: &str,
        unit: &ScenarioUnit,
        target_lat: f64,
        target_lon: f64,
        acting_id: &str,
        roster: &Roster,
    ) -> MoveOutcome {
        if !can_control_unit(unit, acting_id, roster) {
            log::debug!("{} may not move unit {}", acting_id, unit.id);
            return MoveOutcome::Denied;
        }

        let socket = match (&self.socket, self.store.status()) {
            (Some(socket), ConnectionStatus::Connected) => socket,
            (_, status) => {
                log::debug!("Dropping move for unit {} while {}", unit.id, status);
                return MoveOutcome::Dropped;
            }
        };

        let command = ClientCommand::MoveUnit {
            session_id: session_id.to_string(),
            unit_id: unit.id.clone(),
            target_lat,
            target_lon,
        };

        let payload = match encode_command(&command) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to encode move for unit {}: {}", unit.id, e);
                return MoveOutcome::Dropped;
            }
        };

        if socket.send(payload) {
            log::debug!(
                "Sent move for unit {} to {:?}",
                unit.id,
                LatLon::new(target_lat, target_lon)
            );
            MoveOutcome::Sent
        } else {
            log::debug!("Socket rejected move for unit {}", unit.id);
            MoveOutcome::Dropped
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        if let Some(id) = self.manager.release(&mut self.store) {
            log::info!("Connection {} closed on shutdown", id);
        }
        while self.events_rx.try_recv().is_ok() {}
    }

    fn handle(&mut self, event: DriverEvent) {
        let directive = match event {
            DriverEvent::Socket(id, socket_event) => {
                let directive = self
                    .manager
                    .on_socket_event(id, socket_event, &mut self.store);
                if self.manager.current().is_none() {
                    self.socket = None;
                }
                directive
            }
            DriverEvent::ReconnectDue => {
                self.reconnect_timer = None;
                self.manager.on_reconnect_due(&mut self.store)
            }
        };
        self.execute(directive);
    }

    fn execute(&mut self, directive: Option<Directive>) {
        match directive {
            Some(Directive::Open(id)) => {
                log::info!("Opening connection {} to {}", id, self.config.server_url);
                let events = SocketEvents::new(id, self.events_tx.clone());
                let socket = self.connector.open(&self.config.server_url, events);
                self.socket = Some(socket);
            }
            Some(Directive::ScheduleReconnect(delay)) => self.schedule_reconnect(delay),
            None => {}
        }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        log::info!("Reconnecting in {} ms", delay.as_millis());

        let tx = self.events_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(DriverEvent::ReconnectDue);
        });

        if let Some(previous) = self.reconnect_timer.replace(timer) {
            previous.abort();
        }
    }
}

impl<C: Connector> Drop for SessionClient<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
