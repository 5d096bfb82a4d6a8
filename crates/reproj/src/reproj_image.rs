//! Reprojected image: drives a source image through the renderer.
//!
//! The mesh and the source region it needs are computed once, when the
//! image is created. `load()` then waits for the source to settle and
//! renders exactly once:
//!
//! ```text
//! Idle --load()--> Loading --source Loaded--> render --> Loaded
//!                          \-source Error----------->  Error
//! ```
//!
//! An image with nothing to show starts (and stays) [`LoadState::Empty`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use projection::{calculate_source_resolution, ProjectionRegistry, Triangulation};
use renderer::{output_size, RenderRequest, RenderStats, SourceTile};
use reproj_common::{Extent, LoadState, Projection, Raster, ReprojError, ReprojResult};
use tracing::{debug, error, info};

use crate::events::{ChangeNotifier, Subscription};
use crate::image::LayerImage;

/// Parameters of one reprojected image.
#[derive(Debug, Clone, Copy)]
pub struct ReprojectionParams<'a> {
    pub registry: &'a ProjectionRegistry,
    pub source_projection: &'a Projection,
    pub target_projection: &'a Projection,
    pub target_extent: Extent,
    pub target_resolution: f64,
    pub pixel_ratio: f64,
    pub interpolate: bool,
    /// Maximum mesh error in source pixels.
    pub error_threshold: f64,
    pub gutter: u32,
}

struct ImageState {
    state: LoadState,
    raster: Option<Rc<Raster>>,
    source_subscription: Option<Subscription>,
    stats: Option<RenderStats>,
    render_error: Option<String>,
    disposed: bool,
}

/// A source image resampled into another projection.
pub struct ReprojectedImage {
    target_projection: Projection,
    target_extent: Extent,
    target_resolution: f64,
    pixel_ratio: f64,
    interpolate: bool,
    gutter: u32,
    triangulation: Triangulation,
    source: Option<Rc<dyn LayerImage>>,
    inner: RefCell<ImageState>,
    notifier: ChangeNotifier,
    this: Weak<ReprojectedImage>,
}

impl ReprojectedImage {
    /// Build the mesh for `params` and request its source region.
    ///
    /// `get_image(extent, resolution, pixel_ratio)` fetches the source image
    /// in the source projection; `None` means there is nothing to show.
    pub fn new<F>(params: &ReprojectionParams<'_>, get_image: F) -> ReprojResult<Rc<Self>>
    where
        F: FnOnce(Extent, f64, f64) -> ReprojResult<Option<Rc<dyn LayerImage>>>,
    {
        let registry = params.registry;
        let source_projection = params.source_projection;
        let target_projection = params.target_projection;

        let max_source_extent = registry.bounds_of(source_projection);
        let (width, height) = output_size(&params.target_extent, params.target_resolution, params.pixel_ratio);
        let limited_target_extent = if width == 0 || height == 0 {
            debug!(
                extent = %params.target_extent,
                resolution = params.target_resolution,
                "Target extent smaller than one device pixel"
            );
            None
        } else {
            match registry.bounds_of(target_projection) {
                Some(max) => params.target_extent.intersection(&max),
                None => Some(params.target_extent),
            }
        };

        let (triangulation, source) = match limited_target_extent {
            Some(limited) => {
                let source_resolution = calculate_source_resolution(
                    registry,
                    source_projection,
                    target_projection,
                    limited.center(),
                    params.target_resolution,
                );
                let triangulation = Triangulation::new(
                    registry,
                    source_projection,
                    target_projection,
                    &limited,
                    max_source_extent,
                    source_resolution * params.error_threshold,
                    Some(params.target_resolution),
                )?;

                let source_extent = triangulation.calculate_source_extent();
                let source = if source_extent.is_empty() {
                    None
                } else {
                    get_image(source_extent, source_resolution, params.pixel_ratio)?
                };
                (triangulation, source)
            }
            None => {
                debug!(
                    extent = %params.target_extent,
                    projection = %target_projection.code,
                    "Nothing to reproject for target extent"
                );
                (Triangulation::from_triangles(Vec::new()), None)
            }
        };

        let state = if source.is_some() {
            LoadState::Idle
        } else {
            LoadState::Empty
        };
        let pixel_ratio = source.as_ref().map(|s| s.pixel_ratio()).unwrap_or(1.0);

        debug!(
            triangles = triangulation.triangles().len(),
            state = %state,
            source = %source_projection.code,
            target = %target_projection.code,
            "Created reprojected image"
        );

        Ok(Rc::new_cyclic(|this| Self {
            target_projection: target_projection.clone(),
            target_extent: params.target_extent,
            target_resolution: params.target_resolution,
            pixel_ratio,
            interpolate: params.interpolate,
            gutter: params.gutter,
            triangulation,
            source,
            inner: RefCell::new(ImageState {
                state,
                raster: None,
                source_subscription: None,
                stats: None,
                render_error: None,
                disposed: false,
            }),
            notifier: ChangeNotifier::new(),
            this: this.clone(),
        }))
    }

    pub fn projection(&self) -> &Projection {
        &self.target_projection
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// The image the pixels are taken from, unless the image is empty.
    pub fn source_image(&self) -> Option<&Rc<dyn LayerImage>> {
        self.source.as_ref()
    }

    /// Statistics of the completed render.
    pub fn render_stats(&self) -> Option<RenderStats> {
        self.inner.borrow().stats
    }

    /// Why rendering failed, if it did.
    pub fn render_error(&self) -> Option<String> {
        self.inner.borrow().render_error.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Release the raster and stop listening to the source.
    pub fn dispose(&self) {
        let subscription = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.source_subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.inner.borrow_mut().raster = None;
    }

    fn on_source_change(&self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        if self.is_disposed() || !source.state().is_terminal() {
            return;
        }
        self.unlisten_source();
        if let Err(e) = self.reproject() {
            error!(error = %e, "Reprojection failed");
        }
    }

    fn unlisten_source(&self) {
        let subscription = self.inner.borrow_mut().source_subscription.take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    /// Render from the settled source and notify listeners.
    fn reproject(&self) -> ReprojResult<()> {
        let source_state = self.source.as_ref().map(|s| s.state()).unwrap_or(LoadState::Error);
        let rendered = match source_state {
            LoadState::Loaded => Some(self.render()),
            _ => None,
        };

        let outcome = {
            let mut inner = self.inner.borrow_mut();
            match rendered {
                Some(Ok((raster, stats))) => {
                    inner.raster = Some(Rc::new(raster));
                    inner.stats = Some(stats);
                    inner.state = LoadState::Loaded;
                    Ok(())
                }
                Some(Err(e)) => {
                    inner.render_error = Some(e.to_string());
                    inner.state = LoadState::Error;
                    Err(e)
                }
                None => {
                    inner.state = source_state;
                    Ok(())
                }
            }
        };

        self.notifier.notify();
        outcome
    }

    fn render(&self) -> ReprojResult<(Raster, RenderStats)> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| ReprojError::InvalidRaster("no source image".to_string()))?;
        let raster = source
            .raster()
            .ok_or_else(|| ReprojError::InvalidRaster("source loaded without raster".to_string()))?;
        let source_extent = source.extent();
        let source_resolution = source
            .resolution()
            .unwrap_or_else(|| source_extent.height() / raster.height() as f64);

        let tiles = [SourceTile::new(source_extent, &raster)];
        let output = renderer::render(&RenderRequest {
            source_tiles: &tiles,
            triangulation: &self.triangulation,
            source_resolution,
            target_resolution: self.target_resolution,
            target_extent: self.target_extent,
            pixel_ratio: self.pixel_ratio,
            interpolate: self.interpolate,
            gutter: self.gutter,
        })?;

        info!(
            width = output.raster.width(),
            height = output.raster.height(),
            triangles = output.stats.triangles_drawn,
            projection = %self.target_projection.code,
            "Reprojected image rendered"
        );
        Ok((output.raster, output.stats))
    }
}

impl LayerImage for ReprojectedImage {
    fn state(&self) -> LoadState {
        self.inner.borrow().state
    }

    fn raster(&self) -> Option<Rc<Raster>> {
        let inner = self.inner.borrow();
        match inner.state {
            LoadState::Loaded => inner.raster.clone(),
            _ => None,
        }
    }

    fn extent(&self) -> Extent {
        self.target_extent
    }

    fn resolution(&self) -> Option<f64> {
        Some(self.target_resolution)
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Start loading the source, or render right away if it has settled.
    ///
    /// A render failure is returned here when rendering happens
    /// synchronously; otherwise it is logged and kept in
    /// [`ReprojectedImage::render_error`].
    fn load(&self) -> ReprojResult<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != LoadState::Idle || inner.disposed {
                return Ok(());
            }
            inner.state = LoadState::Loading;
        }

        let Some(source) = self.source.as_ref() else {
            return self.reproject();
        };

        let source_state = source.state();
        if source_state.is_terminal() || source_state == LoadState::Empty {
            return self.reproject();
        }

        let this = self.this.clone();
        let subscription = source.subscribe(Box::new(move || {
            if let Some(image) = this.upgrade() {
                image.on_source_change();
            }
        }));
        self.inner.borrow_mut().source_subscription = Some(subscription);
        source.load()
    }

    fn subscribe(&self, listener: Box<dyn Fn()>) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

impl fmt::Debug for ReprojectedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReprojectedImage")
            .field("projection", &self.target_projection.code)
            .field("extent", &self.target_extent)
            .field("resolution", &self.target_resolution)
            .field("state", &self.state())
            .finish()
    }
}
