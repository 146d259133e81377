//! Message definitions for the cellwar protocol.
//!
//! Every frame is a JSON object whose `type` field selects the message.

mod client;
mod server;

pub use client::*;
pub use server::*;
