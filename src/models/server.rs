// src/models/server.rs
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_PLAYERS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSource {
    Rcon,
    Fallback,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayersInfo {
    pub online: u32,
    pub max: u32,
    pub list: Vec<String>,
}

impl PlayersInfo {
    pub fn empty(max: u32) -> Self {
        Self { online: 0, max, list: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online: bool,
    pub players: PlayersInfo,
    pub version: String,
    pub source: StatusSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /players`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerList {
    pub online: u32,
    pub max: u32,
    pub players: Vec<String>,
}

impl From<PlayersInfo> for PlayerList {
    fn from(info: PlayersInfo) -> Self {
        Self { online: info.online, max: info.max, players: info.list }
    }
}
