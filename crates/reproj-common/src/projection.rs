//! Projection identifiers and definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extent::Extent;

/// Mean earth radius used for degree/metre conversion (Clarke 1866 authalic).
pub const DEGREE_RADIUS: f64 = 6370997.0;

/// Projection codes. Well-known codes are parsed from their aliases; anything
/// else is kept verbatim as a custom projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// Any other code, e.g. a pixel projection for a static image.
    Custom(String),
}

impl ProjectionCode {
    /// Parse a projection code.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326", "CRS:84", "urn:ogc:def:crs:EPSG::4326"
    /// - "EPSG:3857", "EPSG:900913", "EPSG:102100"
    /// - anything else non-empty as a custom code
    pub fn parse(s: &str) -> Result<Self, ProjectionParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ProjectionParseError::Empty);
        }

        let normalized = trimmed.to_uppercase();
        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" | "URN:OGC:DEF:CRS:EPSG::4326" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" => {
                Ok(ProjectionCode::Epsg4326)
            }
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" | "EPSG:102113" | "URN:OGC:DEF:CRS:EPSG::3857" => {
                Ok(ProjectionCode::Epsg3857)
            }
            _ => Ok(ProjectionCode::Custom(trimmed.to_string())),
        }
    }
}

impl fmt::Display for ProjectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionCode::Epsg4326 => write!(f, "EPSG:4326"),
            ProjectionCode::Epsg3857 => write!(f, "EPSG:3857"),
            ProjectionCode::Custom(code) => write!(f, "{}", code),
        }
    }
}

/// Units of a projection's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    Degrees,
    Meters,
    Feet,
    Pixels,
}

impl Units {
    /// Meters per unit, or `None` for units with no ground size.
    pub fn meters_per_unit(&self) -> Option<f64> {
        match self {
            Units::Degrees => Some(2.0 * std::f64::consts::PI * DEGREE_RADIUS / 360.0),
            Units::Meters => Some(1.0),
            Units::Feet => Some(0.3048),
            Units::Pixels => None,
        }
    }
}

/// A projection definition: identifier, optional validity extent and units.
///
/// Immutable once built; cloned freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub code: ProjectionCode,
    /// Domain of validity, if bounded.
    pub extent: Option<Extent>,
    pub units: Units,
    /// Whether the projection covers the whole globe (and may wrap in x).
    pub global: bool,
}

impl Projection {
    pub fn new(code: ProjectionCode, extent: Option<Extent>, units: Units) -> Self {
        Self {
            code,
            extent,
            units,
            global: false,
        }
    }

    /// Mark the projection as covering the whole globe.
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// A custom pixel projection, as used for un-georeferenced static images.
    pub fn pixels(code: &str, extent: Extent) -> Self {
        Self::new(ProjectionCode::Custom(code.to_string()), Some(extent), Units::Pixels)
    }

    pub fn meters_per_unit(&self) -> Option<f64> {
        self.units.meters_per_unit()
    }

    /// Global projections with a known extent can wrap around in x.
    pub fn can_wrap_x(&self) -> bool {
        self.global && self.extent.is_some()
    }

    /// Width of the world in projection units, when bounded.
    pub fn world_width(&self) -> Option<f64> {
        self.extent.map(|e| e.width())
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionParseError {
    #[error("Empty projection code")]
    Empty,
}
