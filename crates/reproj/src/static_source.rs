//! A raster source backed by a single georeferenced image.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use reproj_common::{Extent, Projection, Raster};
use tracing::debug;

use crate::image::LayerImage;
use crate::source::{RasterFuture, SourceImage};

/// A source of images in its own projection.
pub trait RasterSource {
    fn projection(&self) -> &Projection;

    /// Bumped whenever the source's content changes.
    fn revision(&self) -> u64;

    /// Whether the source prefers bilinear resampling.
    fn interpolate(&self) -> bool;

    /// The image covering `extent` in the source projection, if any.
    fn image_internal(&self, extent: &Extent, resolution: f64, pixel_ratio: f64) -> Option<Rc<dyn LayerImage>>;
}

/// Shared factory for the image fetch, reusable across refreshes.
pub type SharedLoader = Rc<dyn Fn() -> RasterFuture>;

/// One image with a fixed extent and projection.
pub struct StaticImageSource {
    projection: Projection,
    image_extent: Extent,
    interpolate: bool,
    revision: Cell<u64>,
    loader: RefCell<Option<SharedLoader>>,
    image: RefCell<Rc<SourceImage>>,
}

impl StaticImageSource {
    /// A source whose image is fetched by `loader` on first load.
    pub fn new<F>(projection: Projection, image_extent: Extent, interpolate: bool, loader: F) -> Self
    where
        F: Fn() -> RasterFuture + 'static,
    {
        let loader: SharedLoader = Rc::new(loader);
        let image = Self::idle_image(image_extent, &loader);
        Self {
            projection,
            image_extent,
            interpolate,
            revision: Cell::new(0),
            loader: RefCell::new(Some(loader)),
            image: RefCell::new(image),
        }
    }

    /// A source around an already decoded raster.
    pub fn from_raster(projection: Projection, image_extent: Extent, interpolate: bool, raster: Raster) -> Self {
        Self {
            projection,
            image_extent,
            interpolate,
            revision: Cell::new(0),
            loader: RefCell::new(None),
            image: RefCell::new(SourceImage::from_raster(image_extent, None, 1.0, raster)),
        }
    }

    fn idle_image(extent: Extent, loader: &SharedLoader) -> Rc<SourceImage> {
        let loader = loader.clone();
        SourceImage::new(extent, None, 1.0, move || loader())
    }

    pub fn image_extent(&self) -> Extent {
        self.image_extent
    }

    /// The current underlying image.
    pub fn image(&self) -> Rc<SourceImage> {
        self.image.borrow().clone()
    }

    /// Replace the fetch and start over with a fresh, idle image.
    pub fn set_loader<F>(&self, loader: F)
    where
        F: Fn() -> RasterFuture + 'static,
    {
        let loader: SharedLoader = Rc::new(loader);
        *self.image.borrow_mut() = Self::idle_image(self.image_extent, &loader);
        *self.loader.borrow_mut() = Some(loader);
        self.changed();
    }

    /// Replace the image with a decoded raster.
    pub fn set_raster(&self, raster: Raster) {
        *self.image.borrow_mut() = SourceImage::from_raster(self.image_extent, None, 1.0, raster);
        *self.loader.borrow_mut() = None;
        self.changed();
    }

    /// Re-fetch the image with the current loader.
    ///
    /// Sources built from a raster keep their image but still bump the
    /// revision, so reprojected copies are rebuilt.
    pub fn refresh(&self) {
        let loader = self.loader.borrow().clone();
        if let Some(loader) = loader {
            *self.image.borrow_mut() = Self::idle_image(self.image_extent, &loader);
        }
        self.changed();
    }

    fn changed(&self) {
        let revision = self.revision.get() + 1;
        self.revision.set(revision);
        debug!(revision, projection = %self.projection.code, "Static image source changed");
    }
}

impl RasterSource for StaticImageSource {
    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn interpolate(&self) -> bool {
        self.interpolate
    }

    fn image_internal(&self, extent: &Extent, _resolution: f64, _pixel_ratio: f64) -> Option<Rc<dyn LayerImage>> {
        if !extent.intersects(&self.image_extent) {
            return None;
        }
        let image: Rc<dyn LayerImage> = self.image();
        Some(image)
    }
}

impl fmt::Debug for StaticImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticImageSource")
            .field("projection", &self.projection.code)
            .field("image_extent", &self.image_extent)
            .field("revision", &self.revision.get())
            .finish()
    }
}
