//! Spatial indexing utilities.
//!
//! Region QuadTree used as the broad phase for every interaction pass.

mod quadtree;

pub use quadtree::{Bounds, QuadItem, QuadTree};
