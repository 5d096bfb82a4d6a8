//! The image interface shared by source images and reprojected images.

use std::rc::Rc;

use reproj_common::{Extent, LoadState, Raster, ReprojResult};

use crate::events::Subscription;

/// A raster image that loads asynchronously and reports state changes.
///
/// Implementations are single-threaded: listeners run on the thread that
/// drives the image, never concurrently with it.
pub trait LayerImage {
    fn state(&self) -> LoadState;

    /// The pixels, available once the image is [`LoadState::Loaded`].
    fn raster(&self) -> Option<Rc<Raster>>;

    fn extent(&self) -> Extent;

    /// Units per pixel, if known.
    fn resolution(&self) -> Option<f64>;

    fn pixel_ratio(&self) -> f64;

    /// Start loading. A no-op unless the image is [`LoadState::Idle`].
    fn load(&self) -> ReprojResult<()>;

    /// Register a change listener.
    fn subscribe(&self, listener: Box<dyn Fn()>) -> Subscription;
}

/// Whether two image handles point at the same image.
pub fn same_image(a: &Rc<dyn LayerImage>, b: &Rc<dyn LayerImage>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
