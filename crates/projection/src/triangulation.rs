//! Triangle mesh approximating a reprojection.
//!
//! The target extent is recursively split into quads until the linear
//! interpolation of each quad's source corners predicts the transformed
//! centre within the error threshold. Each accepted quad becomes two
//! triangles whose source and target vertices are index-paired.
//!
//! The transform runs target → source, so every target vertex is exactly
//! representable and source vertices are whatever the projection produces
//! (possibly non-finite outside its domain).

use std::collections::HashMap;

use reproj_common::{Coordinate, Extent, Projection, ReprojResult};
use tracing::debug;

use crate::registry::{CoordTransform, ProjectionRegistry};

/// Base recursion depth of quad subdivision.
const MAX_SUBDIVISION: u32 = 10;

/// Maximum fraction of the world width one triangle may span in a global projection.
const MAX_TRIANGLE_WIDTH: f64 = 0.25;

/// One mesh element: vertex `i` of `source` corresponds to vertex `i` of `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub source: [Coordinate; 3],
    pub target: [Coordinate; 3],
}

/// A triangulated approximation of the target → source transform.
#[derive(Debug, Clone)]
pub struct Triangulation {
    triangles: Vec<Triangle>,
    wraps_x_in_source: bool,
}

impl Triangulation {
    /// Build the mesh for `target_extent`.
    ///
    /// # Arguments
    /// * `max_source_extent` - quads entirely outside it are dropped
    /// * `error_threshold` - maximum centre error in source units
    /// * `destination_resolution` - deepens subdivision for large outputs
    pub fn new(
        registry: &ProjectionRegistry,
        source: &Projection,
        target: &Projection,
        target_extent: &Extent,
        max_source_extent: Option<Extent>,
        error_threshold: f64,
        destination_resolution: Option<f64>,
    ) -> ReprojResult<Self> {
        let transform_inv = registry.require_transform(target, source)?;

        let source_world_width = registry.bounds_of(source).map(|e| e.width());
        let target_world_width = registry.bounds_of(target).map(|e| e.width());
        let can_wrap_x_in_source = source.can_wrap_x()
            && match (max_source_extent, source_world_width) {
                (Some(max), Some(world)) => max.width() >= world,
                _ => false,
            };

        let mut builder = MeshBuilder {
            transform_inv,
            cache: HashMap::new(),
            source_global: source.global,
            target_global: target.global,
            max_source_extent,
            error_threshold_squared: error_threshold * error_threshold,
            can_wrap_x_in_source,
            source_world_width,
            target_world_width,
            wraps_x_in_source: false,
            triangles: Vec::new(),
        };

        let destination_top_left = target_extent.top_left();
        let destination_top_right = target_extent.top_right();
        let destination_bottom_right = target_extent.bottom_right();
        let destination_bottom_left = target_extent.bottom_left();
        let source_top_left = builder.transform(destination_top_left);
        let source_top_right = builder.transform(destination_top_right);
        let source_bottom_right = builder.transform(destination_bottom_right);
        let source_bottom_left = builder.transform(destination_bottom_left);

        let extra_depth = destination_resolution
            .map(|res| {
                let tiles = target_extent.area() / (res * res * 256.0 * 256.0);
                tiles.log2().ceil().max(0.0) as u32
            })
            .unwrap_or(0);

        builder.add_quad(
            [
                destination_top_left,
                destination_top_right,
                destination_bottom_right,
                destination_bottom_left,
            ],
            [
                source_top_left,
                source_top_right,
                source_bottom_right,
                source_bottom_left,
            ],
            MAX_SUBDIVISION + extra_depth,
        );

        if builder.wraps_x_in_source {
            if let Some(world) = builder.source_world_width {
                unwrap_source_x(&mut builder.triangles, world);
            }
        }

        debug!(
            triangles = builder.triangles.len(),
            wraps_x = builder.wraps_x_in_source,
            source = %source.code,
            target = %target.code,
            "Built reprojection mesh"
        );

        Ok(Self {
            triangles: builder.triangles,
            wraps_x_in_source: builder.wraps_x_in_source,
        })
    }

    /// Build a mesh directly from triangles, e.g. for tests or precomputed meshes.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self {
            triangles,
            wraps_x_in_source: false,
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Whether the mesh crosses the antimeridian of a global source.
    pub fn wraps_x_in_source(&self) -> bool {
        self.wraps_x_in_source
    }

    /// The minimal source region the mesh needs (empty when the mesh is).
    pub fn calculate_source_extent(&self) -> Extent {
        let mut extent = Extent::empty();
        for triangle in &self.triangles {
            for vertex in &triangle.source {
                extent.extend_coordinate(*vertex);
            }
        }
        extent
    }
}

struct MeshBuilder {
    transform_inv: CoordTransform,
    cache: HashMap<(u64, u64), Coordinate>,
    source_global: bool,
    target_global: bool,
    max_source_extent: Option<Extent>,
    error_threshold_squared: f64,
    can_wrap_x_in_source: bool,
    source_world_width: Option<f64>,
    target_world_width: Option<f64>,
    wraps_x_in_source: bool,
    triangles: Vec<Triangle>,
}

impl MeshBuilder {
    /// Target → source, memoized since quad corners are shared.
    fn transform(&mut self, coord: Coordinate) -> Coordinate {
        let key = (coord[0].to_bits(), coord[1].to_bits());
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }
        let projected = self.transform_inv.apply(coord);
        self.cache.insert(key, projected);
        projected
    }

    /// Quad corners in order: top-left, top-right, bottom-right, bottom-left.
    fn add_quad(&mut self, target: [Coordinate; 4], source: [Coordinate; 4], max_subdivision: u32) {
        let [a, b, c, d] = target;
        let [a_src, b_src, c_src, d_src] = source;

        let source_quad_extent = Extent::bounding(&source);
        let source_coverage_x = self
            .source_world_width
            .map(|world| source_quad_extent.width() / world);
        let wraps_x = self.can_wrap_x_in_source
            && source_coverage_x.map(|c| c > 0.5 && c < 1.0).unwrap_or(false);

        let mut needs_subdivision = false;

        if max_subdivision > 0 {
            if self.target_global {
                if let Some(world) = self.target_world_width {
                    let target_coverage_x = Extent::bounding(&target).width() / world;
                    needs_subdivision |= target_coverage_x > MAX_TRIANGLE_WIDTH;
                }
            }
            if !wraps_x && self.source_global {
                if let Some(coverage) = source_coverage_x.filter(|c| *c != 0.0) {
                    needs_subdivision |= coverage > MAX_TRIANGLE_WIDTH;
                }
            }
        }

        if !needs_subdivision {
            if let Some(max_source) = self.max_source_extent {
                if source_quad_extent.is_finite() && !source_quad_extent.intersects(&max_source) {
                    // whole quad lies outside the source domain
                    return;
                }
            }
        }

        let mut not_finite_mask = 0u8;
        if !needs_subdivision && !source.iter().all(|s| s[0].is_finite() && s[1].is_finite()) {
            if max_subdivision > 0 {
                needs_subdivision = true;
            } else {
                // bit 3 = a, bit 2 = b, bit 1 = c, bit 0 = d
                for (bit, s) in [(8u8, a_src), (4, b_src), (2, c_src), (1, d_src)] {
                    if !(s[0].is_finite() && s[1].is_finite()) {
                        not_finite_mask |= bit;
                    }
                }
                if !matches!(not_finite_mask, 1 | 2 | 4 | 8) {
                    return;
                }
            }
        }

        if max_subdivision > 0 {
            if !needs_subdivision {
                let center = [(a[0] + c[0]) / 2.0, (a[1] + c[1]) / 2.0];
                let center_src = self.transform(center);

                let dx = match (wraps_x, self.source_world_width) {
                    (true, Some(world)) => {
                        (modulo(a_src[0], world) + modulo(c_src[0], world)) / 2.0
                            - modulo(center_src[0], world)
                    }
                    _ => (a_src[0] + c_src[0]) / 2.0 - center_src[0],
                };
                let dy = (a_src[1] + c_src[1]) / 2.0 - center_src[1];
                let center_error_squared = dx * dx + dy * dy;
                needs_subdivision = center_error_squared > self.error_threshold_squared;
            }

            if needs_subdivision {
                if (a[0] - c[0]).abs() <= (a[1] - c[1]).abs() {
                    // taller than wide: split top/bottom
                    let bc = midpoint(b, c);
                    let bc_src = self.transform(bc);
                    let da = midpoint(d, a);
                    let da_src = self.transform(da);

                    self.add_quad([a, b, bc, da], [a_src, b_src, bc_src, da_src], max_subdivision - 1);
                    self.add_quad([da, bc, c, d], [da_src, bc_src, c_src, d_src], max_subdivision - 1);
                } else {
                    // wider than tall: split left/right
                    let ab = midpoint(a, b);
                    let ab_src = self.transform(ab);
                    let cd = midpoint(c, d);
                    let cd_src = self.transform(cd);

                    self.add_quad([a, ab, cd, d], [a_src, ab_src, cd_src, d_src], max_subdivision - 1);
                    self.add_quad([ab, b, c, cd], [ab_src, b_src, c_src, cd_src], max_subdivision - 1);
                }
                return;
            }
        }

        if wraps_x {
            if !self.can_wrap_x_in_source {
                return;
            }
            self.wraps_x_in_source = true;
        }

        if not_finite_mask & 0xb == 0 {
            self.add_triangle([a, c, d], [a_src, c_src, d_src]);
        }
        if not_finite_mask & 0xe == 0 {
            self.add_triangle([a, c, b], [a_src, c_src, b_src]);
        }
        if not_finite_mask != 0 {
            if not_finite_mask & 0xd == 0 {
                self.add_triangle([b, d, a], [b_src, d_src, a_src]);
            }
            if not_finite_mask & 0x7 == 0 {
                self.add_triangle([b, d, c], [b_src, d_src, c_src]);
            }
        }
    }

    fn add_triangle(&mut self, target: [Coordinate; 3], source: [Coordinate; 3]) {
        self.triangles.push(Triangle { source, target });
    }
}

/// Shift source vertices of triangles straddling the antimeridian by one world width.
fn unwrap_source_x(triangles: &mut [Triangle], world_width: f64) {
    let left_bound = triangles
        .iter()
        .flat_map(|t| t.source.iter().map(|s| s[0]))
        .fold(f64::INFINITY, f64::min);
    let half = world_width / 2.0;

    for triangle in triangles.iter_mut() {
        let max_x = triangle.source.iter().map(|s| s[0]).fold(f64::NEG_INFINITY, f64::max);
        if max_x - left_bound <= half {
            continue;
        }

        let mut shifted = triangle.source;
        for vertex in shifted.iter_mut() {
            if vertex[0] - left_bound > half {
                vertex[0] -= world_width;
            }
        }
        let min_x = shifted.iter().map(|s| s[0]).fold(f64::INFINITY, f64::min);
        let max_x = shifted.iter().map(|s| s[0]).fold(f64::NEG_INFINITY, f64::max);
        if max_x - min_x < half {
            triangle.source = shifted;
        }
    }
}

fn midpoint(p: Coordinate, q: Coordinate) -> Coordinate {
    [(p[0] + q[0]) / 2.0, (p[1] + q[1]) / 2.0]
}

/// Euclidean modulo with the sign of the divisor.
fn modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r * b < 0.0 {
        r + b
    } else {
        r
    }
}
