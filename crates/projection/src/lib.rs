//! Coordinate reference system transformations and mesh construction.
//!
//! Projection math is implemented from scratch without external dependencies:
//! the registry knows geographic (EPSG:4326) and Web Mercator (EPSG:3857)
//! out of the box and accepts custom projections with user-supplied
//! transforms.

pub mod mercator;
pub mod registry;
pub mod resolution;
pub mod triangulation;

pub use registry::{CoordTransform, ProjectionRegistry};
pub use resolution::{calculate_source_resolution, get_point_resolution};
pub use triangulation::{Triangle, Triangulation};
