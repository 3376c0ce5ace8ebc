//! Value types decoded from module output.

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ProtocolResult};

/// Prefix the passive-tag role puts in front of tag codes.
pub const TAG_ID_PREFIX: &str = "DW";

/// Relative tolerance used by [`Position::approx_eq`].
pub const POSITION_REL_TOLERANCE: f64 = 1e-9;

/// Absolute tolerance used by [`Position::approx_eq`], for coordinates at or near zero.
pub const POSITION_ABS_TOLERANCE: f64 = 1e-12;

/// A position estimate reported by the module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in meters.
    pub x_m: f64,
    /// Y coordinate in meters.
    pub y_m: f64,
    /// Z coordinate in meters.
    pub z_m: f64,
    /// Quality factor reported by the module (0-100).
    pub quality: u8,
}

impl Position {
    /// Create a new position.
    pub fn new(x_m: f64, y_m: f64, z_m: f64, quality: u8) -> Self {
        Position { x_m, y_m, z_m, quality }
    }

    /// Compare two positions with tolerance on the coordinates and exact
    /// equality on quality.
    pub fn approx_eq(&self, other: &Position) -> bool {
        is_close(self.x_m, other.x_m)
            && is_close(self.y_m, other.y_m)
            && is_close(self.z_m, other.z_m)
            && self.quality == other.quality
    }
}

fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff <= POSITION_REL_TOLERANCE * a.abs().max(b.abs()) || diff <= POSITION_ABS_TOLERANCE
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x={:.3}m y={:.3}m z={:.3}m q={}",
            self.x_m, self.y_m, self.z_m, self.quality
        )
    }
}

/// Identifier of a tag in multi-tag (listener) reports.
///
/// Never empty. Tags appear either as the raw short code sent by the module
/// or as the same code with a `DW` prefix; both denote the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Create a tag identifier from a raw code.
    pub fn new(code: impl Into<String>) -> ProtocolResult<TagId> {
        let code = code.into();
        if code.is_empty() {
            return Err(ParseError::EmptyIdentifier);
        }
        Ok(TagId(code))
    }

    /// Get the `DW`-prefixed presentation of this identifier.
    pub fn prefixed(&self) -> TagId {
        TagId(format!("{}{}", TAG_ID_PREFIX, self.0))
    }

    /// Get the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TagId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Static identity values read from the `si` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// UWB address, with the leading zero the module omits restored.
    pub uwb_address: String,
    /// Node label.
    pub label: String,
}
