//! Raster reprojection renderer.
//!
//! Resamples source tiles into a target projection using a triangle mesh:
//! - Stitch all source tiles into one working buffer
//! - Fit an affine transform per mesh triangle
//! - Warp the stitched buffer triangle by triangle into the output
//!
//! The renderer is a pure function of its [`RenderRequest`]; it owns no state
//! between calls.

pub mod affine;
pub mod stitch;
pub mod warp;

use projection::Triangulation;
use reproj_common::{Extent, Raster, ReprojError, ReprojResult};
use tracing::{debug, info};

pub use affine::{pixel_round, TriangleAffine};
pub use stitch::{SourceTile, Stitched};
pub use warp::PreparedTriangle;

/// Everything one render pass needs.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Source rasters and the extents they cover.
    pub source_tiles: &'a [SourceTile<'a>],
    /// Mesh mapping target coordinates to source coordinates.
    pub triangulation: &'a Triangulation,
    /// Source units per source pixel.
    pub source_resolution: f64,
    /// Target units per output pixel.
    pub target_resolution: f64,
    pub target_extent: Extent,
    /// Device pixels per logical pixel, applied to both buffers.
    pub pixel_ratio: f64,
    /// Bilinear filtering when true, nearest-neighbour otherwise.
    pub interpolate: bool,
    /// Border pixels dropped from each tile side while stitching.
    pub gutter: u32,
}

/// Counters describing one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub triangles_drawn: usize,
    /// Triangles whose affine system was singular.
    pub degenerate_triangles: usize,
    /// Tiles with no pixels left after removing the gutter.
    pub skipped_tiles: usize,
}

/// A rendered raster and how it was produced.
#[derive(Debug)]
pub struct RenderOutput {
    pub raster: Raster,
    pub stats: RenderStats,
}

/// Output size in device pixels for `extent` at `resolution`.
pub fn output_size(extent: &Extent, resolution: f64, pixel_ratio: f64) -> (u32, u32) {
    let width = (pixel_ratio * extent.width() / resolution).round();
    let height = (pixel_ratio * extent.height() / resolution).round();
    (to_dimension(width), to_dimension(height))
}

fn to_dimension(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn check_positive(name: &str, value: f64) -> ReprojResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ReprojError::InvalidExtent(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

/// Render the reprojected raster described by `request`.
///
/// An empty tile list or mesh yields a transparent raster. A target extent
/// that rounds to zero device pixels is an [`ReprojError::InvalidExtent`].
/// Failure to allocate the output or stitch buffer is returned as
/// [`ReprojError::AllocationFailure`].
pub fn render(request: &RenderRequest<'_>) -> ReprojResult<RenderOutput> {
    check_positive("source resolution", request.source_resolution)?;
    check_positive("target resolution", request.target_resolution)?;
    check_positive("pixel ratio", request.pixel_ratio)?;
    if request.target_extent.is_empty() || !request.target_extent.is_finite() {
        return Err(ReprojError::InvalidExtent(request.target_extent.to_string()));
    }

    let pixel_ratio = request.pixel_ratio;
    let (width, height) = output_size(&request.target_extent, request.target_resolution, pixel_ratio);
    if width == 0 || height == 0 {
        return Err(ReprojError::InvalidExtent(format!(
            "{} is {}x{} device pixels at resolution {}",
            request.target_extent, width, height, request.target_resolution
        )));
    }
    let mut output = Raster::new(width, height)?;
    let mut stats = RenderStats::default();

    if request.source_tiles.is_empty() {
        debug!(width, height, "No source tiles, returning blank raster");
        return Ok(RenderOutput { raster: output, stats });
    }

    let stitched = match stitch::stitch(
        request.source_tiles,
        request.source_resolution,
        pixel_ratio,
        request.gutter,
        request.interpolate,
        &mut stats,
    )? {
        Some(stitched) => stitched,
        None => return Ok(RenderOutput { raster: output, stats }),
    };

    let target_top_left = request.target_extent.top_left();
    let stitch_top_left = stitched.extent.top_left();
    let mut prepared = Vec::with_capacity(request.triangulation.triangles().len());

    for (index, triangle) in request.triangulation.triangles().iter().enumerate() {
        let pixels = triangle.target.map(|t| {
            [
                pixel_round((t[0] - target_top_left[0]) / request.target_resolution, pixel_ratio),
                pixel_round(-(t[1] - target_top_left[1]) / request.target_resolution, pixel_ratio),
            ]
        });

        let affine = match TriangleAffine::fit(&triangle.source, &pixels) {
            Some(affine) => affine,
            None => {
                stats.degenerate_triangles += 1;
                debug!(triangle = index, source = ?triangle.source, "Skipping degenerate triangle");
                continue;
            }
        };

        stats.triangles_drawn += 1;
        if let Some(p) = PreparedTriangle::new(
            &affine,
            &pixels,
            stitch_top_left,
            request.source_resolution,
            pixel_ratio,
            width as usize,
            height as usize,
        ) {
            prepared.push(p);
        }
    }

    warp::warp(&mut output, &stitched.raster, &prepared, request.interpolate);

    info!(
        width,
        height,
        triangles = stats.triangles_drawn,
        degenerate = stats.degenerate_triangles,
        skipped_tiles = stats.skipped_tiles,
        "Rendered reprojected raster"
    );

    Ok(RenderOutput { raster: output, stats })
}
