//! Saving and restoring fit sessions.

mod common;

use common::{evaluator, perturbed_catalog};
use welltest_fit::{FitError, FittingSession, ModelVariant, ParameterCatalog, SessionState};

#[test]
fn test_json_round_trip_is_lossless() {
    let mut session = FittingSession::new(evaluator());
    *session.catalog_mut() = perturbed_catalog();
    session.switch_variant(ModelVariant::ClosedChangingStorage);
    session.catalog_mut().get_mut().set_fit("reD", true).unwrap();
    session.catalog_mut().get_mut().set_value("reD", 37.25).unwrap();

    let json = session.save_json().unwrap();
    let mut restored = FittingSession::new(evaluator());
    restored.load_json(&json).unwrap();

    assert_eq!(restored.save_state(), session.save_state());
    assert_eq!(restored.catalog(), session.catalog());
}

#[test]
fn test_open_bounds_survive_round_trip() {
    let mut session = FittingSession::new(evaluator());
    {
        let set = session.catalog_mut().get_mut();
        set.get_mut("S")
            .unwrap()
            .set_bounds(f64::NEG_INFINITY, f64::INFINITY)
            .unwrap();
        set.get_mut("kf").unwrap().set_bounds(1e-6, f64::INFINITY).unwrap();
    }

    let json = session.save_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let skin = value["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "S")
        .unwrap();
    assert!(skin["min"].is_null() && skin["max"].is_null());

    let mut restored = FittingSession::new(evaluator());
    restored.load_json(&json).unwrap();
    assert_eq!(restored.save_state(), session.save_state());

    let kf = restored.catalog().get().get("kf").unwrap();
    assert_eq!((kf.min(), kf.max()), (1e-6, f64::INFINITY));
    let s = restored.catalog().get().get("S").unwrap();
    assert_eq!((s.min(), s.max()), (f64::NEG_INFINITY, f64::INFINITY));
}

#[test]
fn test_record_layout() {
    let state = ParameterCatalog::new(ModelVariant::InfiniteConstantStorage).to_state();
    let value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();

    assert_eq!(value["variant"], "infinite_constant_storage");
    let first = &value["parameters"][0];
    assert_eq!(first["name"], "phi");
    assert_eq!(first["isFit"], false);
    assert!(first["min"].is_number() && first["max"].is_number());
}

#[test]
fn test_unknown_variant_uses_fallback_order() {
    let json = r#"{
        "variant": "dual_lateral_fracture",
        "parameters": [
            {"name": "kf", "value": 3.0, "isFit": true, "min": 0.001, "max": 100.0}
        ]
    }"#;
    let state = SessionState::from_json(json).unwrap();
    assert_eq!(state.variant, ModelVariant::Unrecognized);

    let mut catalog = ParameterCatalog::from_state(&state).unwrap();
    assert_eq!(catalog.get().get("kf").unwrap().value(), 3.0);

    catalog.reset(state.variant);
    assert_eq!(catalog.get().names(), ModelVariant::Unrecognized.parameter_order());
}

#[test]
fn test_unknown_variant_id_is_kept_on_save() {
    let json = r#"{
        "variant": "dual_lateral_fracture",
        "parameters": [
            {"name": "kf", "value": 3.0, "isFit": true, "min": 0.001, "max": 100.0}
        ]
    }"#;
    let mut session = FittingSession::new(evaluator());
    session.load_json(json).unwrap();
    assert_eq!(session.catalog().variant(), ModelVariant::Unrecognized);

    let saved: serde_json::Value = serde_json::from_str(&session.save_json().unwrap()).unwrap();
    assert_eq!(saved["variant"], "dual_lateral_fracture");

    // Choosing a variant drops the foreign id
    session.switch_variant(ModelVariant::Unrecognized);
    assert_eq!(session.save_state().variant_id(), "unrecognized");
}

#[test]
fn test_out_of_range_value_is_clamped_on_load() {
    let json = r#"{
        "variant": "infinite_changing_storage",
        "parameters": [
            {"name": "S", "value": 80.0, "isFit": false, "min": -5.0, "max": 50.0}
        ]
    }"#;
    let mut session = FittingSession::new(evaluator());
    session.load_json(json).unwrap();
    assert_eq!(session.catalog().get().get("S").unwrap().value(), 50.0);
}

#[test]
fn test_malformed_records_are_rejected() {
    let mut session = FittingSession::new(evaluator());
    let before = session.save_state();

    assert!(matches!(session.load_json("{not json"), Err(FitError::Json(_))));

    let inverted = r#"{
        "variant": "infinite_changing_storage",
        "parameters": [
            {"name": "kf", "value": 1.0, "isFit": true, "min": 5.0, "max": 1.0}
        ]
    }"#;
    assert!(matches!(session.load_json(inverted), Err(FitError::Bounds(_))));
    assert_eq!(session.save_state(), before);
}
