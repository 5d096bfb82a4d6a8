//! Owned RGBA pixel buffers.
//!
//! A [`Raster`] wraps a `tiny_skia::Pixmap`, so pixels are stored as
//! premultiplied RGBA8 in row-major order. Allocation goes through
//! `Pixmap::new`, which refuses zero-sized or oversized buffers; both are
//! reported as [`ReprojError::AllocationFailure`].

use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{ReprojError, ReprojResult};

#[derive(Clone)]
pub struct Raster {
    pixmap: Pixmap,
}

impl Raster {
    /// Allocate a transparent raster.
    pub fn new(width: u32, height: u32) -> ReprojResult<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or(ReprojError::AllocationFailure { width, height })?;
        Ok(Self { pixmap })
    }

    /// Build a raster from straight (non-premultiplied) RGBA8 bytes.
    pub fn from_rgba(width: u32, height: u32, mut data: Vec<u8>) -> ReprojResult<Self> {
        for px in data.chunks_exact_mut(4) {
            let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            px.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Self::from_premultiplied(width, height, data)
    }

    /// Build a raster from premultiplied RGBA8 bytes.
    pub fn from_premultiplied(width: u32, height: u32, data: Vec<u8>) -> ReprojResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ReprojError::InvalidRaster(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        let size = IntSize::from_wh(width, height)
            .ok_or(ReprojError::AllocationFailure { width, height })?;
        let pixmap = Pixmap::from_vec(data, size)
            .ok_or(ReprojError::AllocationFailure { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_mut()
    }

    /// Premultiplied RGBA of a single pixel, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let idx = (y as usize * self.width() as usize + x as usize) * 4;
        let d = self.data();
        Some([d[idx], d[idx + 1], d[idx + 2], d[idx + 3]])
    }

    /// Straight-alpha RGBA8 copy of the pixels, e.g. for PNG encoding.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data().chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }
}

impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width() && self.height() == other.height() && self.data() == other.data()
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
