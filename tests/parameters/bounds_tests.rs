//! Tests for the Bounds implementation

use paramfit_rs::parameters::{Bounds, BoundsError, NestedBounds};

#[test]
fn test_bounds_json_format() {
    let bounds = Bounds::max_only(2.5);
    let json = serde_json::to_string(&bounds).unwrap();
    assert_eq!(json, "[null,2.5]");

    let back: Bounds = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bounds);

    let open: Bounds = serde_json::from_str("[null, null]").unwrap();
    assert!(open.is_unbounded());
}

#[test]
fn test_invalid_bounds_are_rejected() {
    assert_eq!(
        Bounds::new(2.0, 1.0),
        Err(BoundsError::InvalidBounds {
            lower: 2.0,
            upper: 1.0
        })
    );
    assert_eq!(
        Bounds::from_options(Some(f64::NAN), None),
        Err(BoundsError::NanBound)
    );
    assert!(serde_json::from_str::<NestedBounds>(r#"{"td": [5.0, 1.0]}"#).is_err());
}

#[test]
fn test_clamp_and_contains() {
    let bounds = Bounds::new(-1.0, 1.0).unwrap();
    assert_eq!(bounds.clamp(3.0), 1.0);
    assert_eq!(bounds.clamp(-3.0), -1.0);
    assert!(bounds.contains(0.5));
    assert!(!bounds.contains(1.5));

    let half_open = Bounds::min_only(0.0);
    assert_eq!(half_open.clamp(1e300), 1e300);
    assert_eq!(half_open.upper_or_inf(), f64::INFINITY);
    assert!(!half_open.is_finite());
}
