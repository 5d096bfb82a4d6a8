//! Extent types and operations.

use serde::{Deserialize, Serialize};

/// A coordinate pair `[x, y]` in some projection's units.
pub type Coordinate = [f64; 2];

/// An axis-aligned rectangle in a projection's coordinate space.
///
/// The empty extent is represented with inverted infinite bounds so that
/// [`Extent::extend`] can grow it from nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Create a new extent from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create an extent, rejecting inverted or non-finite bounds.
    pub fn try_new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, ExtentParseError> {
        let extent = Self::new(min_x, min_y, max_x, max_y);
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(ExtentParseError::NonFinite(extent.to_string()));
        }
        if min_x > max_x || min_y > max_y {
            return Err(ExtentParseError::Inverted(extent.to_string()));
        }
        Ok(extent)
    }

    /// The empty extent, the identity for [`Extent::extend`].
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Smallest extent containing all the given coordinates.
    pub fn bounding(coords: &[Coordinate]) -> Self {
        let mut extent = Self::empty();
        for coord in coords {
            extent.extend_coordinate(*coord);
        }
        extent
    }

    /// Parse a "minx,miny,maxx,maxy" string.
    pub fn from_csv(s: &str) -> Result<Self, ExtentParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ExtentParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| ExtentParseError::InvalidNumber(part.to_string()))?;
        }
        Self::try_new(values[0], values[1], values[2], values[3])
    }

    /// True when min exceeds max on either axis.
    pub fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    /// Width of the extent in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the extent in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    pub fn center(&self) -> Coordinate {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    pub fn top_left(&self) -> Coordinate {
        [self.min_x, self.max_y]
    }

    pub fn top_right(&self) -> Coordinate {
        [self.max_x, self.max_y]
    }

    pub fn bottom_left(&self) -> Coordinate {
        [self.min_x, self.min_y]
    }

    pub fn bottom_right(&self) -> Coordinate {
        [self.max_x, self.min_y]
    }

    /// Check if this extent intersects another (touching edges count).
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Compute the intersection of two extents.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }

        Some(Extent {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Grow this extent to include another.
    pub fn extend(&mut self, other: &Extent) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Grow this extent to include a coordinate.
    pub fn extend_coordinate(&mut self, coord: Coordinate) {
        self.min_x = self.min_x.min(coord[0]);
        self.min_y = self.min_y.min(coord[1]);
        self.max_x = self.max_x.max(coord[0]);
        self.max_y = self.max_y.max(coord[1]);
    }

    /// Check if a point is contained within this extent.
    pub fn contains_coordinate(&self, coord: Coordinate) -> bool {
        coord[0] >= self.min_x
            && coord[0] <= self.max_x
            && coord[1] >= self.min_y
            && coord[1] <= self.max_y
    }

    /// True when all four bounds are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.min_y.is_finite() && self.max_x.is_finite() && self.max_y.is_finite()
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtentParseError {
    #[error("Invalid extent format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in extent: {0}")]
    InvalidNumber(String),

    #[error("Extent has min greater than max: {0}")]
    Inverted(String),

    #[error("Extent has non-finite bounds: {0}")]
    NonFinite(String),
}
