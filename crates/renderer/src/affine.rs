//! Per-triangle affine fitting.
//!
//! Each mesh triangle is mapped from source coordinates to output pixels by a
//! locally-fit affine transform. The source vertices are shifted so vertex 0
//! sits at the origin, which keeps the 4x4 system well conditioned and makes
//! the translation part known up front.

use nalgebra::{Matrix3, Matrix4, Vector4};
use reproj_common::Coordinate;

/// Snap a logical pixel coordinate to the device pixel grid.
#[inline]
pub fn pixel_round(value: f64, pixel_ratio: f64) -> f64 {
    (value * pixel_ratio).round() / pixel_ratio
}

/// Affine map from shifted source coordinates to logical output pixels:
///
/// ```text
/// u = u0 + a * (x - x0) + b * (y - y0)
/// v = v0 + c * (x - x0) + d * (y - y0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleAffine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    /// Source vertex 0, the numerical shift.
    pub source_origin: Coordinate,
    /// Output vertex 0 in logical pixels.
    pub pixel_origin: Coordinate,
}

impl TriangleAffine {
    /// Fit the affine mapping `source[i]` onto `pixels[i]`.
    ///
    /// Returns `None` when the source triangle is degenerate (collinear or
    /// coincident vertices), since the system is then singular.
    pub fn fit(source: &[Coordinate; 3], pixels: &[Coordinate; 3]) -> Option<Self> {
        let [x0, y0] = source[0];
        let x1 = source[1][0] - x0;
        let y1 = source[1][1] - y0;
        let x2 = source[2][0] - x0;
        let y2 = source[2][1] - y0;
        let [u0, v0] = pixels[0];

        #[rustfmt::skip]
        let system = Matrix4::new(
            x1,  y1,  0.0, 0.0,
            x2,  y2,  0.0, 0.0,
            0.0, 0.0, x1,  y1,
            0.0, 0.0, x2,  y2,
        );
        let rhs = Vector4::new(
            pixels[1][0] - u0,
            pixels[2][0] - u0,
            pixels[1][1] - v0,
            pixels[2][1] - v0,
        );

        let coefs = system.lu().solve(&rhs)?;
        if !coefs.iter().all(|c| c.is_finite()) {
            return None;
        }

        Some(Self {
            a: coefs[0],
            b: coefs[1],
            c: coefs[2],
            d: coefs[3],
            source_origin: [x0, y0],
            pixel_origin: [u0, v0],
        })
    }

    /// Map a source coordinate to logical output pixels.
    pub fn apply(&self, coord: Coordinate) -> Coordinate {
        let dx = coord[0] - self.source_origin[0];
        let dy = coord[1] - self.source_origin[1];
        [
            self.pixel_origin[0] + self.a * dx + self.b * dy,
            self.pixel_origin[1] + self.c * dx + self.d * dy,
        ]
    }

    /// Compose the full stitch-pixel → device-pixel transform.
    ///
    /// The stitch buffer's pixel (i, j) covers source coordinate
    /// `(left + i * res / ratio, top - j * res / ratio)`, where `top_left` is
    /// the stitch extent's top-left corner and `res` the source resolution.
    pub fn stitch_to_device(
        &self,
        stitch_top_left: Coordinate,
        source_resolution: f64,
        pixel_ratio: f64,
    ) -> Matrix3<f64> {
        let step = source_resolution / pixel_ratio;
        let device_scale = scale(pixel_ratio, pixel_ratio);
        let to_origin = translate(self.pixel_origin[0], self.pixel_origin[1]);
        #[rustfmt::skip]
        let linear = Matrix3::new(
            self.a, self.b, 0.0,
            self.c, self.d, 0.0,
            0.0,    0.0,    1.0,
        );
        let shift = translate(
            stitch_top_left[0] - self.source_origin[0],
            stitch_top_left[1] - self.source_origin[1],
        );
        let stitch_scale = scale(step, -step);

        device_scale * to_origin * linear * shift * stitch_scale
    }
}

fn translate(tx: f64, ty: f64) -> Matrix3<f64> {
    #[rustfmt::skip]
    let m = Matrix3::new(
        1.0, 0.0, tx,
        0.0, 1.0, ty,
        0.0, 0.0, 1.0,
    );
    m
}

fn scale(sx: f64, sy: f64) -> Matrix3<f64> {
    Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    #[test]
    fn test_pixel_round() {
        assert_eq!(pixel_round(1.26, 1.0), 1.0);
        assert_eq!(pixel_round(1.26, 2.0), 1.5);
        assert_eq!(pixel_round(-0.4, 1.0), 0.0);
    }

    #[test]
    fn test_fit_identity_like() {
        // Map y-up source units to y-down pixels over a 2x2 extent
        let source = [[0.0, 2.0], [2.0, 0.0], [0.0, 0.0]];
        let pixels = [[0.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let affine = TriangleAffine::fit(&source, &pixels).unwrap();
        assert_approx_eq!(affine.a, 1.0, 1e-12);
        assert_approx_eq!(affine.b, 0.0, 1e-12);
        assert_approx_eq!(affine.c, 0.0, 1e-12);
        assert_approx_eq!(affine.d, -1.0, 1e-12);
    }

    #[test]
    fn test_fit_reproduces_vertices() {
        let source = [[10.5, -3.25], [42.0, 7.75], [-8.0, 19.0]];
        let pixels = [[3.0, 4.0], [120.0, 9.5], [17.0, 88.0]];
        let affine = TriangleAffine::fit(&source, &pixels).unwrap();
        for i in 0..3 {
            assert_coords_approx_eq!(affine.apply(source[i]), pixels[i], 1e-9);
        }
    }

    #[test]
    fn test_collinear_is_degenerate() {
        let source = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let pixels = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert!(TriangleAffine::fit(&source, &pixels).is_none());

        let coincident = [[5.0, 5.0], [5.0, 5.0], [6.0, 7.0]];
        assert!(TriangleAffine::fit(&coincident, &pixels).is_none());
    }

    #[test]
    fn test_stitch_to_device_maps_corners() {
        // Stitch covers (0,0)-(2,2) at resolution 1, pixel ratio 2
        let source = [[0.0, 2.0], [2.0, 0.0], [0.0, 0.0]];
        let pixels = [[0.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let affine = TriangleAffine::fit(&source, &pixels).unwrap();
        let m = affine.stitch_to_device([0.0, 2.0], 1.0, 2.0);

        // Stitch buffer is 4x4 device pixels, output is 4x4 device pixels
        let corner = m * Vector3::new(4.0, 4.0, 1.0);
        assert_coords_approx_eq!([corner.x, corner.y], [4.0, 4.0], 1e-12);
        let origin = m * Vector3::new(0.0, 0.0, 1.0);
        assert_coords_approx_eq!([origin.x, origin.y], [0.0, 0.0], 1e-12);
    }
}
