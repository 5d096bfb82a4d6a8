//! Test raster generators.
//!
//! Generators return straight-alpha RGBA8 bytes in row-major order, ready to
//! be wrapped by `Raster::from_rgba`.

/// Creates a raster filled with one color.
pub fn solid_rgba(width: usize, height: usize, color: [u8; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for _ in 0..width * height {
        data.extend_from_slice(&color);
    }
    data
}

/// Creates a raster whose every pixel encodes its own position.
///
/// Pixel (col, row) is `[col, row, 255 - col, 255]` (wrapping at 256), which
/// makes it easy to verify where a resampled pixel came from.
///
/// # Example
///
/// ```
/// use test_utils::create_position_rgba;
///
/// let data = create_position_rgba(3, 2);
/// assert_eq!(data.len(), 3 * 2 * 4);
/// assert_eq!(&data[4..8], &[1, 0, 254, 255]);   // col=1, row=0
/// assert_eq!(&data[12..16], &[0, 1, 255, 255]); // col=0, row=1
/// ```
pub fn create_position_rgba(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        for col in 0..width {
            let c = (col % 256) as u8;
            let r = (row % 256) as u8;
            data.extend_from_slice(&[c, r, 255 - c, 255]);
        }
    }
    data
}

/// Creates a checkerboard of two colors with square cells of `cell` pixels.
pub fn create_checkerboard_rgba(
    width: usize,
    height: usize,
    cell: usize,
    a: [u8; 4],
    b: [u8; 4],
) -> Vec<u8> {
    let cell = cell.max(1);
    let mut data = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        for col in 0..width {
            let color = if (row / cell + col / cell) % 2 == 0 { a } else { b };
            data.extend_from_slice(&color);
        }
    }
    data
}

/// Creates an opaque horizontal gradient from black (left) to red (right).
pub fn create_gradient_rgba(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for _row in 0..height {
        for col in 0..width {
            let v = (col * 255 / width.saturating_sub(1).max(1)) as u8;
            data.extend_from_slice(&[v, 0, 0, 255]);
        }
    }
    data
}

/// Read pixel (col, row) from straight RGBA data of the given width.
pub fn rgba_at(data: &[u8], width: usize, col: usize, row: usize) -> [u8; 4] {
    let idx = (row * width + col) * 4;
    [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
}
