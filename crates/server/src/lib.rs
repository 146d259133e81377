//! Authoritative simulation core for the cellwar arena.

pub mod actions;
pub mod ai;
pub mod collision;
pub mod config;
pub mod entity;
pub mod movement;
pub mod server;
pub mod snapshot;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{Command, GameState, run};
