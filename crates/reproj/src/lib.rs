//! Triangulated raster reprojection.
//!
//! Ties the projection mesh and the renderer together into images that load
//! asynchronously:
//! - [`SourceImage`]: one raster fetch with a load state and change events
//! - [`ReprojectedImage`]: a source image resampled into another projection
//! - [`ReprojectionCache`]: memoizes the latest reprojected image of a source
//!
//! Everything here is single-threaded. Fetches run as `!Send` tasks on a
//! `tokio::task::LocalSet`, and listeners fire on that same thread after
//! `load()` has returned.

pub mod cache;
pub mod config;
pub mod events;
pub mod image;
pub mod reproj_image;
pub mod source;
pub mod static_source;

pub use cache::{CacheStats, ReprojectionCache};
pub use config::ReprojConfig;
pub use events::{ChangeNotifier, Subscription};
pub use image::{same_image, LayerImage};
pub use reproj_image::{ReprojectedImage, ReprojectionParams};
pub use source::{RasterFuture, RasterLoader, SourceImage};
pub use static_source::{RasterSource, SharedLoader, StaticImageSource};
