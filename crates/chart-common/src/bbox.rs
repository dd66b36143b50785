//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// `min_x`/`max_x` are longitudes, `min_y`/`max_y` latitudes, matching the
/// `west,south,east,north` order of the MBTiles `bounds` metadata value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse an MBTiles `bounds` value: "lonmin,latmin,lonmax,latmax"
    pub fn from_bounds_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            min_x: parse(parts[0])?,
            min_y: parse(parts[1])?,
            max_x: parse(parts[2])?,
            max_y: parse(parts[3])?,
        })
    }

    /// Format as an MBTiles `bounds` value with six decimals.
    ///
    /// Rounds outward, so the formatted box always covers this one.
    pub fn to_bounds_string(&self) -> String {
        let down = |v: f64| (v * 1e6).floor() / 1e6;
        let up = |v: f64| (v * 1e6).ceil() / 1e6;
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            down(self.min_x),
            down(self.min_y),
            up(self.max_x),
            up(self.max_y)
        )
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if another bbox lies entirely inside this one, within `epsilon`.
    ///
    /// Formatted bounds round outward, so an `epsilon` of zero is enough for them.
    pub fn contains_bbox(&self, other: &BoundingBox, epsilon: f64) -> bool {
        other.min_x >= self.min_x - epsilon
            && other.max_x <= self.max_x + epsilon
            && other.min_y >= self.min_y - epsilon
            && other.max_y <= self.max_y + epsilon
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounds format: {0}. Expected 'lonmin,latmin,lonmax,latmax'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),
}
