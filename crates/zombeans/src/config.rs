//! Server configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use zombeans_room::RoomConfig;

use crate::ZombeansError;

/// Everything a server needs to start: where to listen and how every
/// room it creates behaves.
///
/// Can be loaded from a JSON file; missing fields keep their defaults.
///
/// ```json
/// { "bind": "0.0.0.0:9000", "room": { "min_players": 2, "sim": { "max_ticks": 3000 } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to. Default: `127.0.0.1:8080`.
    pub bind: String,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ZombeansError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
