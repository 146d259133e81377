//! Game entities.
//!
//! Area is the conserved quantity; radius is derived from it through
//! [`area`] and [`radius_for_area`].

mod cell;
mod food;
mod player;
mod player_cell;
mod virus;

pub use cell::{area, radius_for_area};
pub use food::Food;
pub use player::Player;
pub use player_cell::PlayerCell;
pub use virus::Virus;
pub use protocol::Rgb;
