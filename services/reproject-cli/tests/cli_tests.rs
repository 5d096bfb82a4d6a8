//! End-to-end tests for the reprojection pipeline.

use std::path::Path;

use image::RgbaImage;
use reproj::ReprojConfig;
use reproj_common::Extent;
use reproject_cli::{run, ReprojectOptions};
use test_utils::create_checkerboard_rgba;
use tokio::task::LocalSet;

fn write_png(path: &Path, width: u32, height: u32) -> Vec<u8> {
    let data = create_checkerboard_rgba(width as usize, height as usize, 2, [230, 30, 30, 255], [30, 30, 230, 255]);
    RgbaImage::from_raw(width, height, data.clone()).unwrap().save(path).unwrap();
    data
}

fn options(dir: &Path, source_crs: &str, target_crs: &str) -> ReprojectOptions {
    ReprojectOptions {
        input: dir.join("input.png"),
        output: dir.join("output.png"),
        source_crs: source_crs.to_string(),
        source_extent: Extent::new(-180.0, -80.0, 180.0, 80.0),
        target_crs: target_crs.to_string(),
        target_extent: None,
        resolution: None,
        pixel_ratio: 1.0,
        reproj: ReprojConfig::default(),
    }
}

#[tokio::test]
async fn test_geographic_to_mercator() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("input.png"), 32, 16);
    let opts = options(dir.path(), "EPSG:4326", "EPSG:3857");
    let output = opts.output.clone();

    let summary = LocalSet::new().run_until(run(opts)).await.unwrap();

    assert_eq!(summary.width, 32);
    assert!(summary.height > 16, "mercator stretches high latitudes");
    let written = image::open(&output).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (summary.width, summary.height));
    // The centre of the world is covered by the source
    let centre = written.get_pixel(summary.width / 2, summary.height / 2);
    assert_eq!(centre[3], 255);
}

#[tokio::test]
async fn test_same_projection_copies_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(&dir.path().join("input.png"), 12, 6);
    let opts = options(dir.path(), "EPSG:4326", "CRS:84");
    let output = opts.output.clone();

    let summary = LocalSet::new().run_until(run(opts)).await.unwrap();

    assert_eq!((summary.width, summary.height), (12, 6));
    let written = image::open(&output).unwrap().to_rgba8();
    assert_eq!(written.into_raw(), input);
}

#[tokio::test]
async fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), "EPSG:4326", "EPSG:3857");
    opts.resolution = Some(100_000.0);

    let result = LocalSet::new().run_until(run(opts)).await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("reprojection failed"), "got: {}", message);
}

#[tokio::test]
async fn test_unknown_projection_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("input.png"), 4, 4);
    let opts = options(dir.path(), "EPSG:4326", "EPSG:27700");
    assert!(LocalSet::new().run_until(run(opts)).await.is_err());
}
