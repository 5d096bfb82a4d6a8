//! Stitching of source tiles into one working buffer.
//!
//! Tiles are composited at `pixel_ratio / source_resolution` pixels per
//! source unit, offset by their position inside the union extent. Tiles that
//! already sit on the stitch grid at 1:1 scale are blitted directly; all
//! others go through `tiny_skia::Pixmap::draw_pixmap`.

use reproj_common::{Extent, Raster, ReprojResult};
use tiny_skia::{FilterQuality, IntRect, Pixmap, PixmapPaint, PixmapRef, Transform};
use tracing::{debug, warn};

use crate::RenderStats;

/// Tolerance for treating a tile as aligned to the stitch grid.
const GRID_EPSILON: f64 = 1e-9;

/// One source raster and the extent it covers.
///
/// Borrowed for the duration of a single render call.
#[derive(Debug, Clone, Copy)]
pub struct SourceTile<'a> {
    pub extent: Extent,
    pub raster: &'a Raster,
}

impl<'a> SourceTile<'a> {
    pub fn new(extent: Extent, raster: &'a Raster) -> Self {
        Self { extent, raster }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }
}

/// The stitched working buffer and the source extent it covers.
#[derive(Debug)]
pub struct Stitched {
    pub raster: Raster,
    pub extent: Extent,
}

/// Union extent of all tiles, empty when there are none.
pub fn union_extent(tiles: &[SourceTile<'_>]) -> Extent {
    let mut extent = Extent::empty();
    for tile in tiles {
        extent.extend(&tile.extent);
    }
    extent
}

/// Composite `tiles` into a single buffer.
///
/// Returns `Ok(None)` when there is nothing to stitch (no tiles, or a union
/// extent smaller than one stitch pixel).
pub fn stitch(
    tiles: &[SourceTile<'_>],
    source_resolution: f64,
    pixel_ratio: f64,
    gutter: u32,
    interpolate: bool,
    stats: &mut RenderStats,
) -> ReprojResult<Option<Stitched>> {
    let extent = union_extent(tiles);
    if extent.is_empty() {
        return Ok(None);
    }

    let stitch_scale = pixel_ratio / source_resolution;
    let width = (extent.width() * stitch_scale).round();
    let height = (extent.height() * stitch_scale).round();
    if !(width >= 1.0 && height >= 1.0) {
        debug!(%extent, width, height, "Source extent smaller than one stitch pixel");
        return Ok(None);
    }
    let mut raster = Raster::new(to_dimension(width), to_dimension(height))?;

    let quality = if interpolate {
        FilterQuality::Bilinear
    } else {
        FilterQuality::Nearest
    };

    for (index, tile) in tiles.iter().enumerate() {
        let src_width = tile.width() as i64 - 2 * gutter as i64;
        let src_height = tile.height() as i64 - 2 * gutter as i64;
        if src_width <= 0 || src_height <= 0 {
            stats.skipped_tiles += 1;
            warn!(
                tile = index,
                width = tile.width(),
                height = tile.height(),
                gutter,
                "Skipping degenerate source tile"
            );
            continue;
        }

        let cropped;
        let source: PixmapRef<'_> = if gutter > 0 {
            let rect = IntRect::from_xywh(
                gutter as i32,
                gutter as i32,
                src_width as u32,
                src_height as u32,
            );
            match rect.and_then(|r| tile.raster.pixmap().clone_rect(r)) {
                Some(pixmap) => {
                    cropped = pixmap;
                    cropped.as_ref()
                }
                None => {
                    stats.skipped_tiles += 1;
                    warn!(tile = index, gutter, "Failed to crop tile gutter");
                    continue;
                }
            }
        } else {
            tile.raster.pixmap().as_ref()
        };

        let x_pos = (tile.extent.min_x - extent.min_x) * stitch_scale;
        let y_pos = (extent.max_y - tile.extent.max_y) * stitch_scale;
        let scale_x = tile.extent.width() * stitch_scale / src_width as f64;
        let scale_y = tile.extent.height() * stitch_scale / src_height as f64;

        let aligned = (scale_x - 1.0).abs() < GRID_EPSILON
            && (scale_y - 1.0).abs() < GRID_EPSILON
            && (x_pos - x_pos.round()).abs() < GRID_EPSILON
            && (y_pos - y_pos.round()).abs() < GRID_EPSILON;

        if aligned {
            blit(
                raster.pixmap_mut(),
                source,
                x_pos.round() as i64,
                y_pos.round() as i64,
            );
        } else {
            let paint = PixmapPaint {
                quality,
                ..PixmapPaint::default()
            };
            let transform = Transform::from_row(
                scale_x as f32,
                0.0,
                0.0,
                scale_y as f32,
                x_pos as f32,
                y_pos as f32,
            );
            raster
                .pixmap_mut()
                .draw_pixmap(0, 0, source, &paint, transform, None);
        }
    }

    debug!(
        tiles = tiles.len(),
        width = raster.width(),
        height = raster.height(),
        "Stitched source tiles"
    );

    Ok(Some(Stitched { raster, extent }))
}

/// Clamp a rounded, positive dimension into `u32`.
fn to_dimension(value: f64) -> u32 {
    value.min(u32::MAX as f64) as u32
}

/// Source-over copy of `src` into `dst` at an integer offset.
fn blit(dst: &mut Pixmap, src: PixmapRef<'_>, x: i64, y: i64) {
    let dst_width = dst.width() as i64;
    let dst_height = dst.height() as i64;
    let src_width = src.width() as i64;

    let col_start = (-x).max(0);
    let col_end = src_width.min(dst_width - x);
    if col_start >= col_end {
        return;
    }

    let src_data = src.data();
    let dst_data = dst.data_mut();
    for row in 0..src.height() as i64 {
        let dst_row = y + row;
        if dst_row < 0 || dst_row >= dst_height {
            continue;
        }
        let src_off = ((row * src_width + col_start) * 4) as usize;
        let dst_off = ((dst_row * dst_width + x + col_start) * 4) as usize;
        let len = ((col_end - col_start) * 4) as usize;
        let src_px = &src_data[src_off..src_off + len];
        let dst_px = &mut dst_data[dst_off..dst_off + len];
        for (d, s) in dst_px.chunks_exact_mut(4).zip(src_px.chunks_exact(4)) {
            source_over(d, s);
        }
    }
}

/// Premultiplied source-over of one pixel.
#[inline]
fn source_over(dst: &mut [u8], src: &[u8]) {
    match src[3] {
        255 => dst.copy_from_slice(src),
        0 => {}
        alpha => {
            let inv = 255 - alpha as u32;
            for i in 0..4 {
                let blended = src[i] as u32 + (dst[i] as u32 * inv + 127) / 255;
                dst[i] = blended.min(255) as u8;
            }
        }
    }
}
