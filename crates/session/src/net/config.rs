use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::protocol::{DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SERVER_URL};

pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect_delay: Duration,
    /// `None` waits on the transport's own failure.
    pub handshake_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            handshake_timeout: Some(Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS)),
        }
    }
}
