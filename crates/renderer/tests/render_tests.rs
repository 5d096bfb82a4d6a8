//! Tests for the reprojection renderer.

use projection::{CoordTransform, ProjectionRegistry, Triangle, Triangulation};
use renderer::{render, RenderRequest, SourceTile, TriangleAffine};
use reproj_common::{Extent, Projection, Raster, ReprojError};
use test_utils::{assert_coords_approx_eq, create_position_rgba, quad_colors_rgba, rgba_at};

// ============================================================================
// Helpers
// ============================================================================

/// Two pixel projections linked by a non-identity (but linear) transform.
fn identity_like_mesh(extent: Extent) -> Triangulation {
    let mut registry = ProjectionRegistry::new();
    let source = Projection::pixels("source-px", extent);
    let target = Projection::pixels("target-px", extent);
    registry.add_transforms(
        &source.code,
        &target.code,
        CoordTransform::from_fn(|c| c),
        CoordTransform::from_fn(|c| c),
    );
    Triangulation::new(&registry, &source, &target, &extent, source.extent, 0.5, Some(1.0)).unwrap()
}

fn request<'a>(
    tiles: &'a [SourceTile<'a>],
    mesh: &'a Triangulation,
    extent: Extent,
    pixel_ratio: f64,
    interpolate: bool,
) -> RenderRequest<'a> {
    RenderRequest {
        source_tiles: tiles,
        triangulation: mesh,
        source_resolution: 1.0,
        target_resolution: 1.0,
        target_extent: extent,
        pixel_ratio,
        interpolate,
        gutter: 0,
    }
}

// ============================================================================
// End-to-end rendering
// ============================================================================

#[test]
fn test_identity_2x2_nearest_reproduces_source() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];
    let mesh = identity_like_mesh(extent);
    assert_eq!(mesh.triangles().len(), 2);

    let output = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap();

    assert_eq!((output.raster.width(), output.raster.height()), (2, 2));
    assert_eq!(output.raster, source);
    assert_eq!(output.stats.triangles_drawn, 2);
    assert_eq!(output.stats.degenerate_triangles, 0);
}

#[test]
fn test_identity_2x2_bilinear_reproduces_source() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];
    let mesh = identity_like_mesh(extent);

    let output = render(&request(&tiles, &mesh, extent, 1.0, true)).unwrap();
    assert_eq!(output.raster, source);
}

#[test]
fn test_identity_larger_raster_has_no_seams() {
    let extent = Extent::new(0.0, 0.0, 16.0, 8.0);
    let data = create_position_rgba(16, 8);
    let source = Raster::from_rgba(16, 8, data.clone()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];
    let mesh = identity_like_mesh(extent);

    let output = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap();
    let rgba = output.raster.to_rgba();
    for row in 0..8 {
        for col in 0..16 {
            assert_eq!(rgba_at(&rgba, 16, col, row), rgba_at(&data, 16, col, row));
        }
    }
}

#[test]
fn test_pixel_ratio_doubles_output() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];
    let mesh = identity_like_mesh(extent);

    let output = render(&request(&tiles, &mesh, extent, 2.0, false)).unwrap();
    assert_eq!((output.raster.width(), output.raster.height()), (4, 4));
    for row in 0..4u32 {
        for col in 0..4u32 {
            assert_eq!(output.raster.pixel(col, row), source.pixel(col / 2, row / 2));
        }
    }
}

#[test]
fn test_two_tiles_are_stitched() {
    let extent = Extent::new(0.0, 0.0, 4.0, 2.0);
    let left = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let right = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [
        SourceTile::new(Extent::new(0.0, 0.0, 2.0, 2.0), &left),
        SourceTile::new(Extent::new(2.0, 0.0, 4.0, 2.0), &right),
    ];
    let mesh = identity_like_mesh(extent);

    let output = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap();
    for row in 0..2u32 {
        for col in 0..4u32 {
            assert_eq!(output.raster.pixel(col, row), left.pixel(col % 2, row));
        }
    }
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn test_empty_sources_give_blank_raster() {
    let extent = Extent::new(0.0, 0.0, 3.0, 2.0);
    let mesh = identity_like_mesh(extent);
    let output = render(&request(&[], &mesh, extent, 1.0, true)).unwrap();
    assert_eq!((output.raster.width(), output.raster.height()), (3, 2));
    assert!(output.raster.is_blank());
}

#[test]
fn test_sub_pixel_target_is_invalid_extent() {
    let extent = Extent::new(0.0, 0.0, 0.4, 2.0);
    let mesh = Triangulation::from_triangles(Vec::new());

    let err = render(&request(&[], &mesh, extent, 1.0, false)).unwrap_err();
    assert!(matches!(err, ReprojError::InvalidExtent(_)));

    // Zero-width extents are valid rectangles but still cover no pixel
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(Extent::new(0.0, 0.0, 2.0, 2.0), &source)];
    let line = Extent::new(1.0, 0.0, 1.0, 2.0);
    let err = render(&request(&tiles, &mesh, line, 1.0, false)).unwrap_err();
    assert!(matches!(err, ReprojError::InvalidExtent(_)));
}

#[test]
fn test_empty_mesh_gives_blank_raster() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];
    let mesh = Triangulation::from_triangles(Vec::new());
    let output = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap();
    assert!(output.raster.is_blank());
    assert_eq!(output.stats.triangles_drawn, 0);
}

#[test]
fn test_collinear_triangle_is_skipped() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(extent, &source)];

    let mut triangles = vec![Triangle {
        source: [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
        target: [[0.0, 2.0], [2.0, 2.0], [0.0, 0.0]],
    }];
    triangles.extend_from_slice(identity_like_mesh(extent).triangles());
    let mesh = Triangulation::from_triangles(triangles);

    let output = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap();
    assert_eq!(output.stats.degenerate_triangles, 1);
    assert_eq!(output.stats.triangles_drawn, 2);
    assert_eq!(output.raster, source);
}

#[test]
fn test_oversized_output_is_allocation_failure() {
    let extent = Extent::new(0.0, 0.0, 1_000_000_000.0, 1.0);
    let source = Raster::from_rgba(2, 2, quad_colors_rgba()).unwrap();
    let tiles = [SourceTile::new(Extent::new(0.0, 0.0, 2.0, 1.0), &source)];
    let mesh = Triangulation::from_triangles(Vec::new());

    let err = render(&request(&tiles, &mesh, extent, 1.0, false)).unwrap_err();
    assert!(matches!(err, ReprojError::AllocationFailure { width: 1_000_000_000, height: 1 }));
}

#[test]
fn test_invalid_resolution_rejected() {
    let extent = Extent::new(0.0, 0.0, 2.0, 2.0);
    let mesh = Triangulation::from_triangles(Vec::new());
    let mut req = request(&[], &mesh, extent, 1.0, false);
    req.target_resolution = 0.0;
    assert!(matches!(render(&req), Err(ReprojError::InvalidExtent(_))));
}

// ============================================================================
// Mesh properties
// ============================================================================

#[test]
fn test_mercator_mesh_affines_reproduce_vertices() {
    let registry = ProjectionRegistry::new();
    let geographic = registry.resolve("EPSG:4326").unwrap();
    let mercator = registry.resolve("EPSG:3857").unwrap();
    let target_extent = Extent::new(-5_000_000.0, -3_000_000.0, 5_000_000.0, 7_000_000.0);
    let resolution = 20_000.0;

    let mesh = Triangulation::new(
        &registry,
        &geographic,
        &mercator,
        &target_extent,
        geographic.extent,
        0.05,
        Some(resolution),
    )
    .unwrap();
    assert!(!mesh.is_empty());

    let top_left = target_extent.top_left();
    for triangle in mesh.triangles() {
        let pixels = triangle.target.map(|t| {
            [(t[0] - top_left[0]) / resolution, -(t[1] - top_left[1]) / resolution]
        });
        if let Some(affine) = TriangleAffine::fit(&triangle.source, &pixels) {
            for i in 0..3 {
                assert_coords_approx_eq!(affine.apply(triangle.source[i]), pixels[i], 1e-6);
            }
        }
    }
}
