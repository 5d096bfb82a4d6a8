//! Common test fixtures for reprojection tests.

/// Common extents for testing, as (min_x, min_y, max_x, max_y).
pub mod extent {
    /// Whole world in degrees
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Web Mercator's usable latitude band in degrees
    pub const MERCATOR_BAND: (f64, f64, f64, f64) = (-180.0, -85.0, 180.0, 85.0);

    /// Europe in degrees
    pub const EUROPE: (f64, f64, f64, f64) = (-15.0, 35.0, 45.0, 72.0);

    /// Unit-resolution 2x2 pixel extent
    pub const PIXELS_2X2: (f64, f64, f64, f64) = (0.0, 0.0, 2.0, 2.0);

    /// Unit-resolution 4x4 pixel extent
    pub const PIXELS_4X4: (f64, f64, f64, f64) = (0.0, 0.0, 4.0, 4.0);

    /// Crosses antimeridian (Pacific-centric)
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);
}

/// Common colors, straight-alpha RGBA.
pub mod color {
    pub const RED: [u8; 4] = [255, 0, 0, 255];
    pub const GREEN: [u8; 4] = [0, 255, 0, 255];
    pub const BLUE: [u8; 4] = [0, 0, 255, 255];
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];
    pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];
}

/// The four opaque colors of a 2x2 test image, row-major from the top-left.
pub fn quad_colors_rgba() -> Vec<u8> {
    [color::RED, color::GREEN, color::BLUE, color::WHITE].concat()
}
