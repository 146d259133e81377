//! Server -> Client message building.

use serde::Serialize;

use crate::{ProtocolError, Rgb};

/// Message sent from the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// One-time identity assignment after connect.
    Welcome(Welcome),
    /// Full world state, broadcast every tick.
    State(Snapshot),
}

impl ServerMessage {
    /// Encode to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub id: u32,
    pub world_size: f32,
}

/// Complete world snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub foods: Vec<FoodState>,
    pub viruses: Vec<VirusState>,
    pub players: Vec<PlayerState>,
    /// Top players by score, highest first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Rgb,
    pub vx: f32,
    pub vy: f32,
    pub is_ejected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VirusState {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub id: u32,
    pub name: String,
    pub skin: u32,
    pub color: Rgb,
    pub score: u64,
    pub cells: Vec<CellState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub vx: f32,
    pub vy: f32,
    pub merge_timer: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
}
