//! PNG reprojection pipeline behind the `reproject-cli` binary.
//!
//! Reads an image through a [`StaticImageSource`], requests it in the
//! target projection from a [`ReprojectionCache`], waits for the load to
//! settle and writes the result as PNG.

pub mod config;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use image::{ImageOutputFormat, RgbaImage};
use projection::ProjectionRegistry;
use reproj::{LayerImage, RasterFuture, ReprojectionCache, StaticImageSource};
use reproj_common::{LoadState, Raster, ReprojError, ReprojResult};
use tokio::sync::Notify;
use tracing::{debug, info};

pub use config::{CliArgs, ReprojectOptions};

/// Number of points sampled per extent edge when deriving the target extent.
const EXTENT_STOPS: usize = 8;

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub width: u32,
    pub height: u32,
    pub resolution: f64,
}

/// Decode a PNG (or any format `image` recognizes) into a raster.
pub async fn load_raster(path: &Path) -> ReprojResult<Raster> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReprojError::Fetch(format!("{}: {}", path.display(), e)))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| ReprojError::InvalidRaster(format!("{}: {}", path.display(), e)))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    Raster::from_rgba(width, height, decoded.into_raw())
}

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    let image = RgbaImage::from_raw(raster.width(), raster.height(), raster.to_rgba())
        .ok_or_else(|| anyhow!("raster buffer does not match its dimensions"))?;
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageOutputFormat::Png)?;
    Ok(buffer.into_inner())
}

fn file_loader(path: PathBuf) -> impl Fn() -> RasterFuture {
    move || -> RasterFuture {
        let path = path.clone();
        Box::pin(async move { load_raster(&path).await })
    }
}

/// Wait until `image` leaves the idle/loading states.
async fn settled(image: &Rc<dyn LayerImage>) -> Result<LoadState> {
    let notify = Rc::new(Notify::new());
    let signal = notify.clone();
    let _subscription = image.subscribe(Box::new(move || signal.notify_one()));

    image.load()?;
    loop {
        let state = image.state();
        if state.is_terminal() || state == LoadState::Empty {
            return Ok(state);
        }
        notify.notified().await;
    }
}

/// Run one reprojection. Must be called within a `tokio::task::LocalSet`.
pub async fn run(options: ReprojectOptions) -> Result<RunSummary> {
    let registry = ProjectionRegistry::new();
    let source_projection = registry.resolve(&options.source_crs)?;
    let target_projection = registry.resolve(&options.target_crs)?;

    let target_extent = match options.target_extent {
        Some(extent) => extent,
        None => registry.transform_extent(
            &options.source_extent,
            &source_projection,
            &target_projection,
            EXTENT_STOPS,
        )?,
    };

    let resolution = match options.resolution {
        Some(resolution) => resolution,
        None => {
            let (width, _) = image::image_dimensions(&options.input)
                .with_context(|| format!("failed to read {}", options.input.display()))?;
            target_extent.width() / width as f64
        }
    };

    info!(
        input = %options.input.display(),
        source = %source_projection.code,
        target = %target_projection.code,
        %target_extent,
        resolution,
        "Reprojecting image"
    );

    let source = Rc::new(StaticImageSource::new(
        source_projection,
        options.source_extent,
        true,
        file_loader(options.input.clone()),
    ));
    let cache = ReprojectionCache::new(source, Rc::new(registry), options.reproj.clone());

    let image = cache
        .get_image(&target_extent, resolution, options.pixel_ratio, &target_projection)?
        .ok_or_else(|| anyhow!("the source image does not cover {}", target_extent))?;

    let state = settled(&image).await?;
    debug!(state = %state, "Image settled");

    let raster = match state {
        LoadState::Loaded => image
            .raster()
            .ok_or_else(|| anyhow!("loaded image has no raster"))?,
        LoadState::Empty => bail!("no source data within {}", target_extent),
        _ => {
            let reason = cache
                .cached_image()
                .and_then(|i| i.render_error())
                .or_else(|| cache.source().image().error())
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("reprojection failed: {}", reason);
        }
    };

    let png = encode_png(&raster)?;
    tokio::fs::write(&options.output, png)
        .await
        .with_context(|| format!("failed to write {}", options.output.display()))?;

    if let Some(stats) = cache.cached_image().and_then(|i| i.render_stats()) {
        info!(
            triangles = stats.triangles_drawn,
            degenerate = stats.degenerate_triangles,
            "Render statistics"
        );
    }
    info!(
        output = %options.output.display(),
        width = raster.width(),
        height = raster.height(),
        "Wrote reprojected image"
    );

    Ok(RunSummary {
        width: raster.width(),
        height: raster.height(),
        resolution,
    })
}
