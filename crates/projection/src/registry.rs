//! Projection registry: known projections, equivalence and coordinate transforms.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reproj_common::{Coordinate, Extent, Projection, ProjectionCode, ReprojError, ReprojResult, Units};

use crate::mercator;

/// A coordinate transform between two projections.
#[derive(Clone)]
pub enum CoordTransform {
    /// Coordinates pass through unchanged.
    Identity,
    Function(Arc<dyn Fn(Coordinate) -> Coordinate + Send + Sync>),
}

impl CoordTransform {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Coordinate) -> Coordinate + Send + Sync + 'static,
    {
        CoordTransform::Function(Arc::new(f))
    }

    #[inline]
    pub fn apply(&self, coord: Coordinate) -> Coordinate {
        match self {
            CoordTransform::Identity => coord,
            CoordTransform::Function(f) => f(coord),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, CoordTransform::Identity)
    }
}

impl fmt::Debug for CoordTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordTransform::Identity => write!(f, "Identity"),
            CoordTransform::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Registry of projection definitions and the transforms between them.
#[derive(Debug, Clone)]
pub struct ProjectionRegistry {
    projections: HashMap<ProjectionCode, Projection>,
    transforms: HashMap<(ProjectionCode, ProjectionCode), CoordTransform>,
}

impl ProjectionRegistry {
    /// An empty registry with no projections or transforms.
    pub fn empty() -> Self {
        Self {
            projections: HashMap::new(),
            transforms: HashMap::new(),
        }
    }

    /// A registry with EPSG:4326 and EPSG:3857 and the transforms between them.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.add_projection(
            Projection::new(
                ProjectionCode::Epsg4326,
                Some(Extent::new(-180.0, -90.0, 180.0, 90.0)),
                Units::Degrees,
            )
            .with_global(true),
        );
        registry.add_projection(
            Projection::new(ProjectionCode::Epsg3857, Some(mercator::extent()), Units::Meters)
                .with_global(true),
        );
        registry.add_transforms(
            &ProjectionCode::Epsg4326,
            &ProjectionCode::Epsg3857,
            CoordTransform::from_fn(mercator::from_lon_lat),
            CoordTransform::from_fn(mercator::to_lon_lat),
        );

        registry
    }

    /// Register (or replace) a projection definition.
    pub fn add_projection(&mut self, projection: Projection) {
        self.projections.insert(projection.code.clone(), projection);
    }

    pub fn get(&self, code: &ProjectionCode) -> Option<&Projection> {
        self.projections.get(code)
    }

    /// Parse a code string and look up its definition.
    pub fn resolve(&self, code: &str) -> ReprojResult<Projection> {
        let code = ProjectionCode::parse(code)?;
        self.get(&code)
            .cloned()
            .ok_or_else(|| ReprojError::UnknownProjection(code.to_string()))
    }

    /// Register a forward/inverse transform pair between two projections.
    pub fn add_transforms(
        &mut self,
        source: &ProjectionCode,
        destination: &ProjectionCode,
        forward: CoordTransform,
        inverse: CoordTransform,
    ) {
        self.transforms
            .insert((source.clone(), destination.clone()), forward);
        self.transforms
            .insert((destination.clone(), source.clone()), inverse);
    }

    /// Declare a set of codes as describing the same coordinate system.
    pub fn add_equivalent(&mut self, codes: &[ProjectionCode]) {
        for a in codes {
            for b in codes {
                if a != b {
                    self.transforms
                        .insert((a.clone(), b.clone()), CoordTransform::Identity);
                }
            }
        }
    }

    /// Transform from `source` to `destination`, if one is known.
    pub fn transform_fn(&self, source: &Projection, destination: &Projection) -> Option<CoordTransform> {
        if source.code == destination.code {
            return Some(CoordTransform::Identity);
        }
        self.transforms
            .get(&(source.code.clone(), destination.code.clone()))
            .cloned()
    }

    /// Like [`ProjectionRegistry::transform_fn`], but a missing transform is an error.
    pub fn require_transform(&self, source: &Projection, destination: &Projection) -> ReprojResult<CoordTransform> {
        self.transform_fn(source, destination)
            .ok_or_else(|| ReprojError::NoTransform {
                from: source.code.to_string(),
                to: destination.code.to_string(),
            })
    }

    /// Two projections are equivalent when they share a code, or share units
    /// and are linked by an identity transform.
    pub fn is_equivalent(&self, a: &Projection, b: &Projection) -> bool {
        if a.code == b.code {
            return true;
        }
        if a.units != b.units {
            return false;
        }
        self.transform_fn(a, b)
            .map(|t| t.is_identity())
            .unwrap_or(false)
    }

    /// The domain of validity of a projection, if bounded.
    pub fn bounds_of(&self, projection: &Projection) -> Option<Extent> {
        projection
            .extent
            .or_else(|| self.get(&projection.code).and_then(|p| p.extent))
    }

    /// Transform a single coordinate.
    pub fn transform(&self, coord: Coordinate, source: &Projection, destination: &Projection) -> ReprojResult<Coordinate> {
        Ok(self.require_transform(source, destination)?.apply(coord))
    }

    /// Transform an extent, sampling `stops` extra points along each edge.
    pub fn transform_extent(
        &self,
        extent: &Extent,
        source: &Projection,
        destination: &Projection,
        stops: usize,
    ) -> ReprojResult<Extent> {
        let transform = self.require_transform(source, destination)?;
        let mut result = Extent::empty();
        let segments = (stops + 1) as f64;

        for i in 0..=stops + 1 {
            let t = i as f64 / segments;
            let x = extent.min_x + t * extent.width();
            let y = extent.min_y + t * extent.height();
            for coord in [
                [x, extent.min_y],
                [x, extent.max_y],
                [extent.min_x, y],
                [extent.max_x, y],
            ] {
                let projected = transform.apply(coord);
                if projected[0].is_finite() && projected[1].is_finite() {
                    result.extend_coordinate(projected);
                }
            }
        }

        if result.is_empty() {
            return Err(ReprojError::InvalidExtent(format!(
                "{} has no finite image in {}",
                extent, destination.code
            )));
        }
        Ok(result)
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
