//! Shared protocol crate for cellwar.
//!
//! This crate contains:
//! - Client -> server message decoding
//! - Server -> client message types and encoding
//! - Shared types (Rgb)

mod error;
pub mod packets;

pub use error::ProtocolError;
pub use packets::{
    CellState, ClientMessage, FoodState, LeaderboardEntry, PlayerState, ServerMessage, Snapshot,
    VirusState, Welcome,
};

/// RGB color with components in `0.0..=1.0`. Purely cosmetic.
pub type Rgb = [f32; 3];
