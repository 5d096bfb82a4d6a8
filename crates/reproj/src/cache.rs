//! Single-entry reprojection cache.
//!
//! Holds the most recent reprojected image of a source. A request with the
//! same source revision, an equivalent target projection, the same
//! resolution and the same extent gets that image back; anything else
//! disposes it and builds a new one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use projection::ProjectionRegistry;
use reproj_common::{Extent, Projection, ReprojResult};
use tracing::{debug, info};

use crate::config::ReprojConfig;
use crate::image::LayerImage;
use crate::reproj_image::{ReprojectedImage, ReprojectionParams};
use crate::static_source::RasterSource;

struct CacheEntry {
    revision: u64,
    image: Rc<ReprojectedImage>,
}

/// Counters for cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served by the source directly.
    pub bypassed: u64,
    pub hits: u64,
    /// Reprojected images built.
    pub misses: u64,
}

/// Memoizes the latest reprojected image of `source`.
pub struct ReprojectionCache<S: RasterSource> {
    source: Rc<S>,
    registry: Rc<ProjectionRegistry>,
    config: ReprojConfig,
    entry: RefCell<Option<CacheEntry>>,
    stats: Cell<CacheStats>,
}

impl<S: RasterSource> ReprojectionCache<S> {
    pub fn new(source: Rc<S>, registry: Rc<ProjectionRegistry>, config: ReprojConfig) -> Self {
        Self {
            source,
            registry,
            config,
            entry: RefCell::new(None),
            stats: Cell::new(CacheStats::default()),
        }
    }

    pub fn source(&self) -> &Rc<S> {
        &self.source
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// The currently cached reprojected image.
    pub fn cached_image(&self) -> Option<Rc<ReprojectedImage>> {
        self.entry.borrow().as_ref().map(|e| e.image.clone())
    }

    /// An image of `extent` at `resolution` in `projection`.
    ///
    /// Equivalent projections (or disabled reprojection) go straight to the
    /// source; otherwise a cached or freshly built reprojected image is
    /// returned.
    pub fn get_image(
        &self,
        extent: &Extent,
        resolution: f64,
        pixel_ratio: f64,
        projection: &Projection,
    ) -> ReprojResult<Option<Rc<dyn LayerImage>>> {
        let source_projection = self.source.projection();

        if !self.config.enabled || self.registry.is_equivalent(source_projection, projection) {
            self.bump(|s| s.bypassed += 1);
            return Ok(self.source.image_internal(extent, resolution, pixel_ratio));
        }

        let revision = self.source.revision();
        if let Some(image) = self.lookup(revision, extent, resolution, projection) {
            self.bump(|s| s.hits += 1);
            debug!(revision, %extent, resolution, "Reprojection cache hit");
            return Ok(Some(image));
        }

        // Dispose before building the replacement
        if let Some(previous) = self.entry.borrow_mut().take() {
            debug!(revision = previous.revision, "Disposing superseded reprojected image");
            previous.image.dispose();
        }

        let params = ReprojectionParams {
            registry: &self.registry,
            source_projection,
            target_projection: projection,
            target_extent: *extent,
            target_resolution: resolution,
            pixel_ratio,
            interpolate: self.config.interpolate_for(self.source.interpolate()),
            error_threshold: self.config.error_threshold,
            gutter: self.config.gutter,
        };
        let source = &self.source;
        let image = ReprojectedImage::new(&params, |source_extent, source_resolution, source_pixel_ratio| {
            Ok(source.image_internal(&source_extent, source_resolution, source_pixel_ratio))
        })?;

        self.bump(|s| s.misses += 1);
        info!(
            revision,
            %extent,
            resolution,
            source = %source_projection.code,
            target = %projection.code,
            "Created reprojected image"
        );

        *self.entry.borrow_mut() = Some(CacheEntry {
            revision,
            image: image.clone(),
        });
        Ok(Some(image))
    }

    /// Dispose and forget the cached image.
    pub fn clear(&self) {
        if let Some(entry) = self.entry.borrow_mut().take() {
            entry.image.dispose();
        }
    }

    fn lookup(
        &self,
        revision: u64,
        extent: &Extent,
        resolution: f64,
        projection: &Projection,
    ) -> Option<Rc<dyn LayerImage>> {
        let entry = self.entry.borrow();
        let entry = entry.as_ref()?;
        let matches = entry.revision == revision
            && self.registry.is_equivalent(entry.image.projection(), projection)
            && entry.image.resolution() == Some(resolution)
            && entry.image.extent() == *extent;
        if matches {
            let image: Rc<dyn LayerImage> = entry.image.clone();
            Some(image)
        } else {
            None
        }
    }

    fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl<S: RasterSource> Drop for ReprojectionCache<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<S: RasterSource> fmt::Debug for ReprojectionCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReprojectionCache")
            .field("projection", &self.source.projection().code)
            .field("cached", &self.entry.borrow().is_some())
            .field("stats", &self.stats.get())
            .finish()
    }
}
