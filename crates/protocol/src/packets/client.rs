//! Client -> Server message decoding.

use serde::Deserialize;

use crate::{ProtocolError, Rgb};

/// Decoded client message.
///
/// Shapes are trusted after decoding; value ranges are validated by the
/// server when the message is applied.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Update display identity.
    Join {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        skin: Option<u32>,
        #[serde(default)]
        color: Option<Rgb>,
    },
    /// Desired movement direction.
    Input { dir: [f32; 2] },
    /// Split every eligible cell.
    Split,
    /// Eject mass from every eligible cell.
    Eject,
    /// Any other `type`. Ignored by the server.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }
}
