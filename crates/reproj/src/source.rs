//! Source image loader.
//!
//! Wraps one asynchronous raster fetch. `load()` starts the fetch on the
//! current `tokio::task::LocalSet` and returns immediately; listeners are
//! notified once the fetch settles, never from inside `load()`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use reproj_common::{Extent, LoadState, Raster, ReprojError, ReprojResult};
use tracing::{debug, warn};

use crate::events::{ChangeNotifier, Subscription};
use crate::image::LayerImage;

/// Future resolving to a fetched raster.
pub type RasterFuture = LocalBoxFuture<'static, ReprojResult<Raster>>;

/// Produces the fetch for one load.
pub type RasterLoader = Box<dyn FnOnce() -> RasterFuture>;

struct SourceState {
    state: LoadState,
    raster: Option<Rc<Raster>>,
    resolution: Option<f64>,
    error: Option<String>,
    loader: Option<RasterLoader>,
}

/// A single raster fetched on demand.
pub struct SourceImage {
    extent: Extent,
    pixel_ratio: f64,
    inner: RefCell<SourceState>,
    notifier: ChangeNotifier,
    this: Weak<SourceImage>,
}

impl SourceImage {
    /// An idle image that runs `loader` on the first `load()`.
    ///
    /// When `resolution` is `None` it is derived from the fetched raster's
    /// height.
    pub fn new<F>(extent: Extent, resolution: Option<f64>, pixel_ratio: f64, loader: F) -> Rc<Self>
    where
        F: FnOnce() -> RasterFuture + 'static,
    {
        Self::with_state(
            extent,
            pixel_ratio,
            SourceState {
                state: LoadState::Idle,
                raster: None,
                resolution,
                error: None,
                loader: Some(Box::new(loader)),
            },
        )
    }

    /// An image that is already loaded.
    pub fn from_raster(extent: Extent, resolution: Option<f64>, pixel_ratio: f64, raster: Raster) -> Rc<Self> {
        let resolution = resolution.or_else(|| derive_resolution(&extent, &raster));
        Self::with_state(
            extent,
            pixel_ratio,
            SourceState {
                state: LoadState::Loaded,
                raster: Some(Rc::new(raster)),
                resolution,
                error: None,
                loader: None,
            },
        )
    }

    fn with_state(extent: Extent, pixel_ratio: f64, state: SourceState) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            extent,
            pixel_ratio,
            inner: RefCell::new(state),
            notifier: ChangeNotifier::new(),
            this: this.clone(),
        })
    }

    /// Message of the failed fetch, once in [`LoadState::Error`].
    pub fn error(&self) -> Option<String> {
        self.inner.borrow().error.clone()
    }

    fn finish(&self, result: ReprojResult<Raster>) {
        {
            let mut inner = self.inner.borrow_mut();
            match result {
                Ok(raster) => {
                    if inner.resolution.is_none() {
                        inner.resolution = derive_resolution(&self.extent, &raster);
                    }
                    debug!(
                        width = raster.width(),
                        height = raster.height(),
                        extent = %self.extent,
                        "Source image loaded"
                    );
                    inner.raster = Some(Rc::new(raster));
                    inner.state = LoadState::Loaded;
                }
                Err(e) => {
                    warn!(error = %e, extent = %self.extent, "Source image failed to load");
                    inner.error = Some(e.to_string());
                    inner.state = LoadState::Error;
                }
            }
        }
        self.notifier.notify();
    }
}

fn derive_resolution(extent: &Extent, raster: &Raster) -> Option<f64> {
    let resolution = extent.height() / raster.height() as f64;
    (resolution.is_finite() && resolution > 0.0).then_some(resolution)
}

impl LayerImage for SourceImage {
    fn state(&self) -> LoadState {
        self.inner.borrow().state
    }

    fn raster(&self) -> Option<Rc<Raster>> {
        self.inner.borrow().raster.clone()
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn resolution(&self) -> Option<f64> {
        self.inner.borrow().resolution
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Start the fetch. Must be called from within a `LocalSet`.
    fn load(&self) -> ReprojResult<()> {
        let loader = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != LoadState::Idle {
                return Ok(());
            }
            inner.state = LoadState::Loading;
            inner.loader.take()
        };

        let fetch: RasterFuture = match loader {
            Some(loader) => loader(),
            None => Box::pin(async { Err(ReprojError::Fetch("no loader".to_string())) }),
        };

        let this = self.this.clone();
        tokio::task::spawn_local(async move {
            let result = fetch.await;
            if let Some(image) = this.upgrade() {
                image.finish(result);
            }
        });
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn()>) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("extent", &self.extent)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use test_utils::{color, settle, solid_rgba};
    use tokio::sync::oneshot;
    use tokio::task::LocalSet;

    fn raster() -> Raster {
        Raster::from_rgba(4, 2, solid_rgba(4, 2, color::RED)).unwrap()
    }

    #[tokio::test]
    async fn test_load_transitions_and_notifies_once() {
        LocalSet::new()
            .run_until(async {
                let (tx, rx) = oneshot::channel::<ReprojResult<Raster>>();
                let image = SourceImage::new(Extent::new(0.0, 0.0, 8.0, 4.0), None, 1.0, move || {
                    Box::pin(async move { rx.await.unwrap_or_else(|_| Err(ReprojError::Fetch("dropped".into()))) })
                });

                let count = Rc::new(Cell::new(0));
                let c = count.clone();
                let _sub = image.subscribe(Box::new(move || c.set(c.get() + 1)));

                assert_eq!(image.state(), LoadState::Idle);
                image.load().unwrap();
                assert_eq!(image.state(), LoadState::Loading);
                assert_eq!(count.get(), 0);

                // Second load is a no-op
                image.load().unwrap();
                settle().await;
                assert_eq!(image.state(), LoadState::Loading);

                tx.send(Ok(raster())).unwrap();
                settle().await;

                assert_eq!(image.state(), LoadState::Loaded);
                assert_eq!(count.get(), 1);
                assert_eq!(image.resolution(), Some(2.0));
                assert!(image.raster().is_some());
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_fetch_is_error_state() {
        LocalSet::new()
            .run_until(async {
                let image = SourceImage::new(Extent::new(0.0, 0.0, 1.0, 1.0), Some(1.0), 1.0, || {
                    Box::pin(async { Err(ReprojError::Fetch("404".into())) })
                });
                image.load().unwrap();
                settle().await;

                assert_eq!(image.state(), LoadState::Error);
                assert!(image.raster().is_none());
                assert!(image.error().unwrap().contains("404"));
            })
            .await;
    }

    #[test]
    fn test_from_raster_is_loaded() {
        let image = SourceImage::from_raster(Extent::new(0.0, 0.0, 8.0, 4.0), None, 1.0, raster());
        assert_eq!(image.state(), LoadState::Loaded);
        assert_eq!(image.resolution(), Some(2.0));
        // Already loaded, so no task is spawned and no LocalSet is needed
        image.load().unwrap();
    }
}
