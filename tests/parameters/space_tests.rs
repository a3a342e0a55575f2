//! Tests for flattening, unflattening and key ordering

use paramfit_rs::error::FitError;
use paramfit_rs::parameters::{
    bounds_for, flatten, flatten_bounds, unflatten, Bounds, NestedBounds, NestedParams,
    ParamValue, ParameterSpace,
};
use ndarray::array;

const SCME_LIKE: &str = r#"{
    "te": 1.1045,
    "td": 7.5548,
    "dispersion": {"C6": 46.4, "C8": 1141.7, "C10": 33441.0},
    "repulsion": {"Ar_OO": 299.57, "Br_OO": -0.14651, "Cr_OO": -1.3785, "r_Br": 5.5}
}"#;

#[test]
fn test_round_trip_from_json() {
    let params: NestedParams = serde_json::from_str(SCME_LIKE).unwrap();
    let flat = flatten(&params).unwrap();

    assert_eq!(flat.len(), 9);
    assert_eq!(unflatten(&flat).unwrap(), params);
}

#[test]
fn test_depth_first_key_order() {
    let params: NestedParams = serde_json::from_str(SCME_LIKE).unwrap();
    let flat = flatten(&params).unwrap();

    assert_eq!(
        flat.keys,
        vec![
            "dispersion.C10",
            "dispersion.C6",
            "dispersion.C8",
            "repulsion.Ar_OO",
            "repulsion.Br_OO",
            "repulsion.Cr_OO",
            "repulsion.r_Br",
            "td",
            "te",
        ]
    );
    assert_eq!(flat.get("repulsion.r_Br"), Some(5.5));
}

#[test]
fn test_insertion_order_does_not_matter() {
    let forward = NestedParams::from_scalars([("a.x", 1.0), ("a.y", 2.0), ("b", 3.0)]).unwrap();
    let backward = NestedParams::from_scalars([("b", 3.0), ("a.y", 2.0), ("a.x", 1.0)]).unwrap();
    let from_json: NestedParams =
        serde_json::from_str(r#"{"b": 3.0, "a": {"y": 2.0, "x": 1.0}}"#).unwrap();

    assert_eq!(forward, backward);
    assert_eq!(forward, from_json);
    assert_eq!(flatten(&forward).unwrap(), flatten(&from_json).unwrap());
}

#[test]
fn test_non_scalar_leaf_is_rejected() {
    let params: NestedParams =
        serde_json::from_str(r#"{"td": 4.7, "model": {"name": "scme", "dms": true}}"#).unwrap();

    match flatten(&params) {
        Err(FitError::TypeMismatch { key, found }) => {
            assert_eq!(key, "model.dms");
            assert_eq!(found, "bool");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
    assert_eq!(params.get_leaf("model.name"), Some(&ParamValue::Text("scme".into())));
}

#[test]
fn test_empty_params() {
    let (space, x0) = ParameterSpace::from_initial(&NestedParams::new()).unwrap();
    assert_eq!(space.dimension(), 0);
    assert_eq!(x0.len(), 0);
    assert!(space.unflatten(&x0).unwrap().is_empty());
}

#[test]
fn test_space_maps_vectors_back() {
    let params: NestedParams = serde_json::from_str(SCME_LIKE).unwrap();
    let (space, x0) = ParameterSpace::from_initial(&params).unwrap();

    let doubled = &x0 * 2.0;
    let nested = space.unflatten(&doubled).unwrap();
    assert_eq!(nested.scalar("dispersion.C6"), Some(92.8));
    assert_eq!(nested.scalar("td"), Some(2.0 * 7.5548));

    assert!(matches!(
        space.unflatten(&array![1.0, 2.0]),
        Err(FitError::DimensionMismatch(_))
    ));
}

#[test]
fn test_bound_default_is_unbounded() {
    let bounds: NestedBounds =
        serde_json::from_str(r#"{"td": [0.0, 10.0], "dispersion": {"C6": [0.0, null]}}"#).unwrap();
    let flat = flatten_bounds(&bounds).unwrap();

    assert_eq!(bounds_for(&flat, "td"), Bounds::new(0.0, 10.0).unwrap());
    assert_eq!(bounds_for(&flat, "dispersion.C6"), Bounds::min_only(0.0));
    for key in ["te", "dispersion.C8", "not.a.parameter"] {
        assert_eq!(bounds_for(&flat, key), Bounds::unbounded());
    }
}

#[test]
fn test_align_bounds_reports_unmatched() {
    let params: NestedParams = serde_json::from_str(SCME_LIKE).unwrap();
    let (space, _) = ParameterSpace::from_initial(&params).unwrap();
    let bounds: NestedBounds =
        serde_json::from_str(r#"{"td": [0.0, 10.0], "tq": [0.0, 1.0]}"#).unwrap();

    let (aligned, unmatched) = space.align_bounds(&bounds).unwrap();
    assert_eq!(aligned.len(), space.dimension());
    assert_eq!(aligned[7], Bounds::new(0.0, 10.0).unwrap());
    assert!(aligned[..7].iter().all(Bounds::is_unbounded));
    assert_eq!(unmatched, vec!["tq".to_string()]);
}
