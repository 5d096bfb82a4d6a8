//! Per-triangle warping of the stitched buffer into the output raster.
//!
//! Every triangle owns the device pixels whose centres fall inside it.
//! Pixel centres exactly on a shared edge are assigned to one side only, so
//! adjacent triangles neither overlap nor leave gaps. Each owned pixel is
//! mapped back into the stitch buffer through the inverse of the triangle's
//! affine transform, sampled, and added to the output ("lighter" blending).
//!
//! Rows are independent, so they are processed in parallel with rayon.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use reproj_common::{Coordinate, Raster};

use crate::affine::TriangleAffine;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// A triangle ready for rasterization: device-pixel vertices in positive
/// orientation, the device → stitch transform, and its pixel bounds.
#[derive(Debug, Clone)]
pub struct PreparedTriangle {
    vertices: [Coordinate; 3],
    device_to_stitch: Matrix3<f64>,
    cols: (usize, usize),
    rows: (usize, usize),
}

impl PreparedTriangle {
    /// Prepare a fitted triangle for an output of `width` x `height` device pixels.
    ///
    /// `pixels` are the logical output-pixel vertices the affine was fit to.
    /// Returns `None` when the triangle covers no output pixel.
    pub fn new(
        affine: &TriangleAffine,
        pixels: &[Coordinate; 3],
        stitch_top_left: Coordinate,
        source_resolution: f64,
        pixel_ratio: f64,
        width: usize,
        height: usize,
    ) -> Option<Self> {
        let device = |p: Coordinate| [p[0] * pixel_ratio, p[1] * pixel_ratio];
        let mut vertices = [device(pixels[0]), device(pixels[1]), device(pixels[2])];

        let area = edge(vertices[0], vertices[1], vertices[2]);
        if area == 0.0 || !area.is_finite() {
            return None;
        }
        if area < 0.0 {
            vertices.swap(1, 2);
        }

        let device_to_stitch = affine
            .stitch_to_device(stitch_top_left, source_resolution, pixel_ratio)
            .try_inverse()?;

        let min_x = vertices.iter().map(|v| v[0]).fold(f64::INFINITY, f64::min);
        let max_x = vertices.iter().map(|v| v[0]).fold(f64::NEG_INFINITY, f64::max);
        let min_y = vertices.iter().map(|v| v[1]).fold(f64::INFINITY, f64::min);
        let max_y = vertices.iter().map(|v| v[1]).fold(f64::NEG_INFINITY, f64::max);

        let cols = pixel_span(min_x, max_x, width)?;
        let rows = pixel_span(min_y, max_y, height)?;

        Some(Self {
            vertices,
            device_to_stitch,
            cols,
            rows,
        })
    }

    /// Whether the centre of device pixel (col, row) belongs to this triangle.
    #[inline]
    pub fn owns_pixel(&self, col: usize, row: usize) -> bool {
        let p = [col as f64 + 0.5, row as f64 + 0.5];
        let [v0, v1, v2] = self.vertices;
        inside(v0, v1, p) && inside(v1, v2, p) && inside(v2, v0, p)
    }

    /// Continuous stitch-buffer coordinate of a device pixel centre.
    #[inline]
    fn stitch_coordinate(&self, col: usize, row: usize) -> (f64, f64) {
        let p = self.device_to_stitch * Vector3::new(col as f64 + 0.5, row as f64 + 0.5, 1.0);
        (p.x, p.y)
    }
}

/// Draw all triangles from `stitch` into `output`.
pub fn warp(output: &mut Raster, stitch: &Raster, triangles: &[PreparedTriangle], interpolate: bool) {
    let width = output.width() as usize;
    let row_bytes = width * 4;

    output
        .data_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(row, pixels)| {
            for triangle in triangles {
                if row < triangle.rows.0 || row >= triangle.rows.1 {
                    continue;
                }
                for col in triangle.cols.0..triangle.cols.1 {
                    if !triangle.owns_pixel(col, row) {
                        continue;
                    }
                    let (fx, fy) = triangle.stitch_coordinate(col, row);
                    let sample = if interpolate {
                        sample_bilinear(stitch, fx, fy)
                    } else {
                        sample_nearest(stitch, fx, fy)
                    };
                    add_lighter(&mut pixels[col * 4..col * 4 + 4], &sample);
                }
            }
        });
}

/// Edge function: twice the signed area of (a, b, p).
#[inline]
fn edge(a: Coordinate, b: Coordinate, p: Coordinate) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Inside test for one edge of a positively oriented triangle.
///
/// Points exactly on the edge count only for edges pointing "up" or
/// horizontally "right". A shared edge is traversed in opposite directions
/// by its two triangles, so exactly one of them takes such points.
#[inline]
fn inside(a: Coordinate, b: Coordinate, p: Coordinate) -> bool {
    let w = edge(a, b, p);
    if w != 0.0 {
        return w > 0.0;
    }
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

/// Device pixels whose centres may fall within `[min, max]`, clamped to `limit`.
fn pixel_span(min: f64, max: f64, limit: usize) -> Option<(usize, usize)> {
    let start = (min - 0.5).ceil().max(0.0);
    let end = ((max - 0.5).floor() + 1.0).min(limit as f64);
    if start >= end {
        return None;
    }
    Some((start as usize, end as usize))
}

#[inline]
fn texel(raster: &Raster, x: usize, y: usize) -> [u8; 4] {
    let idx = (y * raster.width() as usize + x) * 4;
    let d = raster.data();
    [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]]
}

fn in_bounds(raster: &Raster, fx: f64, fy: f64) -> bool {
    fx >= 0.0 && fy >= 0.0 && fx < raster.width() as f64 && fy < raster.height() as f64
}

/// Nearest-neighbour sample; transparent outside the buffer.
fn sample_nearest(raster: &Raster, fx: f64, fy: f64) -> [u8; 4] {
    if !in_bounds(raster, fx, fy) {
        return TRANSPARENT;
    }
    texel(raster, fx as usize, fy as usize)
}

/// Bilinear sample between texel centres, clamped at the buffer edges;
/// transparent outside the buffer.
fn sample_bilinear(raster: &Raster, fx: f64, fy: f64) -> [u8; 4] {
    if !in_bounds(raster, fx, fy) {
        return TRANSPARENT;
    }
    let max_x = raster.width() as i64 - 1;
    let max_y = raster.height() as i64 - 1;

    let sx = fx - 0.5;
    let sy = fy - 0.5;
    let x0 = sx.floor();
    let y0 = sy.floor();
    let tx = sx - x0;
    let ty = sy - y0;

    let clamp_x = |x: i64| x.clamp(0, max_x) as usize;
    let clamp_y = |y: i64| y.clamp(0, max_y) as usize;
    let (xa, xb) = (clamp_x(x0 as i64), clamp_x(x0 as i64 + 1));
    let (ya, yb) = (clamp_y(y0 as i64), clamp_y(y0 as i64 + 1));

    let p00 = texel(raster, xa, ya);
    let p10 = texel(raster, xb, ya);
    let p01 = texel(raster, xa, yb);
    let p11 = texel(raster, xb, yb);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = p00[i] as f64 * (1.0 - tx) + p10[i] as f64 * tx;
        let bottom = p01[i] as f64 * (1.0 - tx) + p11[i] as f64 * tx;
        out[i] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Additive blend of premultiplied pixels.
#[inline]
fn add_lighter(dst: &mut [u8], src: &[u8; 4]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = d.saturating_add(*s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_edge_has_one_owner() {
        // Two triangles splitting a 4x4 square along the diagonal
        let upper = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]];
        let lower = [[0.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        let make = |px: [Coordinate; 3]| {
            let affine = TriangleAffine::fit(&px, &px).unwrap();
            PreparedTriangle::new(&affine, &px, [0.0, 0.0], 1.0, 1.0, 4, 4).unwrap()
        };
        let a = make(upper);
        let b = make(lower);

        for row in 0..4 {
            for col in 0..4 {
                let owners = a.owns_pixel(col, row) as u8 + b.owns_pixel(col, row) as u8;
                assert_eq!(owners, 1, "pixel ({}, {}) has {} owners", col, row, owners);
            }
        }
    }

    #[test]
    fn test_zero_area_is_skipped() {
        let px = [[0.0, 0.0], [2.0, 2.0], [4.0, 4.0]];
        let source = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let affine = TriangleAffine::fit(&source, &px).unwrap();
        assert!(PreparedTriangle::new(&affine, &px, [0.0, 0.0], 1.0, 1.0, 4, 4).is_none());
    }

    #[test]
    fn test_off_canvas_is_skipped() {
        let px = [[10.0, 10.0], [20.0, 10.0], [10.0, 20.0]];
        let affine = TriangleAffine::fit(&px, &px).unwrap();
        assert!(PreparedTriangle::new(&affine, &px, [0.0, 0.0], 1.0, 1.0, 4, 4).is_none());
    }

    #[test]
    fn test_pixel_span() {
        assert_eq!(pixel_span(0.0, 2.0, 10), Some((0, 2)));
        assert_eq!(pixel_span(0.6, 1.4, 10), None);
        assert_eq!(pixel_span(-3.0, 20.0, 10), Some((0, 10)));
    }

    #[test]
    fn test_bilinear_at_texel_centre_is_exact() {
        let raster = Raster::from_rgba(2, 1, vec![10, 20, 30, 255, 200, 100, 50, 255]).unwrap();
        assert_eq!(sample_bilinear(&raster, 0.5, 0.5), [10, 20, 30, 255]);
        assert_eq!(sample_bilinear(&raster, 1.5, 0.5), [200, 100, 50, 255]);
        assert_eq!(sample_bilinear(&raster, 1.0, 0.5), [105, 60, 40, 255]);
        assert_eq!(sample_bilinear(&raster, 2.5, 0.5), TRANSPARENT);
    }

    #[test]
    fn test_add_lighter_saturates() {
        let mut dst = [200, 0, 10, 255];
        add_lighter(&mut dst, &[100, 5, 10, 255]);
        assert_eq!(dst, [255, 5, 20, 255]);
    }
}
