//! Common types shared by the raster reprojection crates.

pub mod error;
pub mod extent;
pub mod projection;
pub mod raster;
pub mod state;

pub use error::{ReprojError, ReprojResult};
pub use extent::{Coordinate, Extent};
pub use projection::{Projection, ProjectionCode, Units};
pub use raster::Raster;
pub use state::LoadState;
