//! Tests for Extent operations.

use reproj_common::extent::{Extent, ExtentParseError};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_extent_new() {
    let extent = Extent::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(extent.min_x, -180.0);
    assert_eq!(extent.min_y, -90.0);
    assert_eq!(extent.max_x, 180.0);
    assert_eq!(extent.max_y, 90.0);
}

#[test]
fn test_try_new_rejects_inverted() {
    assert!(matches!(
        Extent::try_new(10.0, 10.0, 5.0, 5.0),
        Err(ExtentParseError::Inverted(_))
    ));
}

#[test]
fn test_try_new_rejects_nan() {
    assert!(matches!(
        Extent::try_new(f64::NAN, 0.0, 1.0, 1.0),
        Err(ExtentParseError::NonFinite(_))
    ));
}

#[test]
fn test_degenerate_extent_is_valid() {
    let extent = Extent::try_new(0.0, 0.0, 0.0, 0.0).unwrap();
    assert!(!extent.is_empty());
    assert_eq!(extent.area(), 0.0);
}

// ============================================================================
// from_csv tests
// ============================================================================

#[test]
fn test_parse_csv_with_spaces() {
    let extent = Extent::from_csv(" -180, -85 , 180,85").unwrap();
    assert_eq!(extent, Extent::new(-180.0, -85.0, 180.0, 85.0));
}

#[test]
fn test_parse_csv_scientific_notation() {
    let extent = Extent::from_csv("1e-6,2e-6,1e6,2e6").unwrap();
    assert!((extent.min_x - 1e-6).abs() < 1e-10);
    assert!((extent.max_y - 2e6).abs() < 0.001);
}

#[test]
fn test_parse_csv_wrong_count() {
    assert!(matches!(
        Extent::from_csv("0,0,1"),
        Err(ExtentParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_parse_csv_bad_number() {
    assert!(matches!(
        Extent::from_csv("0,0,abc,1"),
        Err(ExtentParseError::InvalidNumber(_))
    ));
}

// ============================================================================
// Geometry tests
// ============================================================================

#[test]
fn test_corners() {
    let extent = Extent::new(0.0, 0.0, 4.0, 2.0);
    assert_eq!(extent.top_left(), [0.0, 2.0]);
    assert_eq!(extent.top_right(), [4.0, 2.0]);
    assert_eq!(extent.bottom_left(), [0.0, 0.0]);
    assert_eq!(extent.bottom_right(), [4.0, 0.0]);
    assert_eq!(extent.center(), [2.0, 1.0]);
    assert_eq!(extent.width(), 4.0);
    assert_eq!(extent.height(), 2.0);
}

#[test]
fn test_touching_extents_intersect() {
    let a = Extent::new(0.0, 0.0, 1.0, 1.0);
    let b = Extent::new(1.0, 0.0, 2.0, 1.0);
    assert!(a.intersects(&b));
    assert_eq!(a.intersection(&b).unwrap().width(), 0.0);
}

#[test]
fn test_disjoint_has_no_intersection() {
    let a = Extent::new(0.0, 0.0, 1.0, 1.0);
    let b = Extent::new(5.0, 5.0, 6.0, 6.0);
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_bounding_coordinates() {
    let extent = Extent::bounding(&[[1.0, 5.0], [-2.0, 3.0], [4.0, -1.0]]);
    assert_eq!(extent, Extent::new(-2.0, -1.0, 4.0, 5.0));
    assert!(extent.contains_coordinate([0.0, 0.0]));
    assert!(!extent.contains_coordinate([5.0, 0.0]));
}

#[test]
fn test_bounding_nothing_is_empty() {
    let extent = Extent::bounding(&[]);
    assert!(extent.is_empty());
    assert!(!extent.is_finite());
    assert_eq!(extent.area(), 0.0);
}

#[test]
fn test_display_roundtrips_through_csv() {
    let extent = Extent::new(-1.5, 2.0, 3.25, 4.0);
    assert_eq!(Extent::from_csv(&extent.to_string()).unwrap(), extent);
}
