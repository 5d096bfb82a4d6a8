//! Command-line arguments and the options they resolve to.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reproj::ReprojConfig;
use reproj_common::Extent;

#[derive(Parser, Debug)]
#[command(name = "reproject-cli")]
#[command(about = "Reproject a PNG image from one projection to another")]
pub struct CliArgs {
    /// Input PNG file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Projection of the input image (e.g. EPSG:4326)
    #[arg(long, env = "REPROJ_SOURCE_CRS", default_value = "EPSG:4326")]
    pub source_crs: String,

    /// Extent of the input image as "minx,miny,maxx,maxy"
    #[arg(long, allow_hyphen_values = true)]
    pub source_extent: String,

    /// Projection of the output image (e.g. EPSG:3857)
    #[arg(long, env = "REPROJ_TARGET_CRS", default_value = "EPSG:3857")]
    pub target_crs: String,

    /// Extent of the output image (default: the transformed source extent)
    #[arg(long, allow_hyphen_values = true)]
    pub target_extent: Option<String>,

    /// Output units per pixel (default: keep the input width)
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Device pixel ratio of the output
    #[arg(long, default_value = "1.0")]
    pub pixel_ratio: f64,

    /// Use nearest-neighbour instead of bilinear resampling
    #[arg(long)]
    pub no_interpolate: bool,

    /// Maximum mesh error in source pixels (overrides REPROJ_ERROR_THRESHOLD)
    #[arg(long)]
    pub error_threshold: Option<f64>,

    /// Output PNG file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Fully resolved options for one reprojection run.
#[derive(Debug, Clone)]
pub struct ReprojectOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source_crs: String,
    pub source_extent: Extent,
    pub target_crs: String,
    pub target_extent: Option<Extent>,
    pub resolution: Option<f64>,
    pub pixel_ratio: f64,
    pub reproj: ReprojConfig,
}

impl CliArgs {
    /// Resolve arguments against `base` (usually [`ReprojConfig::from_env`]).
    pub fn into_options(self, base: ReprojConfig) -> Result<ReprojectOptions> {
        let source_extent = Extent::from_csv(&self.source_extent)
            .with_context(|| format!("invalid --source-extent {}", self.source_extent))?;
        let target_extent = self
            .target_extent
            .as_deref()
            .map(|s| Extent::from_csv(s).with_context(|| format!("invalid --target-extent {}", s)))
            .transpose()?;

        if let Some(resolution) = self.resolution {
            anyhow::ensure!(
                resolution.is_finite() && resolution > 0.0,
                "--resolution must be positive, got {}",
                resolution
            );
        }
        anyhow::ensure!(
            self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0,
            "--pixel-ratio must be positive, got {}",
            self.pixel_ratio
        );

        let mut reproj = base;
        if let Some(threshold) = self.error_threshold {
            reproj.error_threshold = threshold;
        }
        if self.no_interpolate {
            reproj.interpolate = Some(false);
        }
        reproj.validate()?;

        Ok(ReprojectOptions {
            input: self.input,
            output: self.output,
            source_crs: self.source_crs,
            source_extent,
            target_crs: self.target_crs,
            target_extent,
            resolution: self.resolution,
            pixel_ratio: self.pixel_ratio,
            reproj,
        })
    }
}
