//! Raster reprojection command-line tool.
//!
//! Reprojects a PNG image between projections using a triangle mesh:
//! - Reads and decodes the input asynchronously
//! - Builds the mesh and warps the image triangle by triangle
//! - Writes the result as PNG

use anyhow::Result;
use clap::Parser;
use reproject_cli::{run, CliArgs};
use reproj::ReprojConfig;
use tokio::task::LocalSet;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let options = args.into_options(ReprojConfig::from_env()?)?;

    // Images and their listeners are !Send; drive them on one thread
    let summary = LocalSet::new().run_until(run(options)).await?;

    info!(
        width = summary.width,
        height = summary.height,
        resolution = summary.resolution,
        "Done"
    );
    Ok(())
}
