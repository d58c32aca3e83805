//! Integration tests for the AutoMix entry points.
//!
//! Exercises: RulesConfig + BuiltinCatalog → AutoMix::{create, mix,
//! mix_variants} → validated Street
//!
//! Everything runs on the bundled data with seeded samplers.

use automix_logic::adjacency::upgrade_legacy_variant;
use automix_logic::catalog::{BuiltinCatalog, SegmentCatalog};
use automix_logic::context::MixContext;
use automix_logic::engine::AutoMix;
use automix_logic::error::AutomixError;
use automix_logic::rules::{RulesConfig, TypeSet};
use automix_logic::sampler::{Sampler, ScriptedSource};
use automix_logic::street::Street;
use automix_logic::validate;
use automix_logic::width::STANDARD;

// ── Helpers ────────────────────────────────────────────────────────────

fn catalog() -> BuiltinCatalog {
    BuiltinCatalog::bundled().unwrap()
}

fn street_of(catalog: &BuiltinCatalog, rules: &RulesConfig, width: f64, parts: &[(&str, &str, f64)]) -> Street {
    let ctx = MixContext::new(catalog, &STANDARD, rules);
    let mut sampler = Sampler::seeded(1234);
    let mut street = Street::new(width);
    for (t, v, w) in parts {
        let elevation = ctx.info(t).map_or(0, |i| i.default_elevation);
        street
            .segments
            .push(ctx.segment(&mut sampler, t, v, *w, elevation).unwrap());
    }
    ctx.recalculate(&mut street);
    street
}

fn assert_width_rules_hold(catalog: &BuiltinCatalog, street: &Street) {
    for segment in &street.segments {
        assert!(
            validate::segment(catalog, segment),
            "{}:{} at width {} breaks its width rule",
            segment.segment_type,
            segment.variant_string,
            segment.width
        );
        assert!(catalog
            .variant_array(&segment.segment_type, &segment.variant_string)
            .is_some());
    }
}

// ── Create ─────────────────────────────────────────────────────────────

#[test]
fn test_create_forty_foot_street_with_two_drive_lanes_max() {
    let catalog = catalog();
    let mut rules = RulesConfig::bundled().unwrap();
    rules.start = TypeSet::from(vec!["sidewalk".to_string()]);
    rules.end = TypeSet::from(vec!["sidewalk".to_string()]);
    rules.max_drive_lanes = Some(2);

    let mut created = 0;
    for seed in 0..30 {
        let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(seed)).unwrap();
        let mut street = Street::new(40.0);
        match automix.create(&mut street) {
            Ok(_) => {
                created += 1;
                assert_eq!(street.segments.first().unwrap().segment_type, "sidewalk");
                assert_eq!(street.segments.last().unwrap().segment_type, "sidewalk");
                assert!(street.count_of("drive-lane") <= 2);
                assert!((street.segments_width() - 40.0).abs() < 1e-6);
                assert!((street.segments_width() + street.remaining_width - street.width).abs() < 1e-6);
                assert_width_rules_hold(&catalog, &street);
            }
            Err(e) => assert!(matches!(e, AutomixError::CreationExhausted { iterations: 100 })),
        }
    }
    assert!(created > 0, "no seed produced a 40ft street");
}

#[test]
fn test_create_is_deterministic_for_a_seed() {
    let catalog = catalog();
    let rules = RulesConfig::bundled().unwrap();
    let run = || {
        let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(11)).unwrap();
        let mut street = Street::new(70.0);
        let result = automix.create(&mut street).ok();
        (result, street.describe())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_create_refuses_negative_and_nan_widths() {
    let catalog = catalog();
    let rules = RulesConfig::bundled().unwrap();
    for width in [-5.0, f64::NAN] {
        let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(1)).unwrap();
        let mut street = Street::new(width);
        let err = automix.create(&mut street).unwrap_err();
        assert!(matches!(err, AutomixError::CreationExhausted { .. }));
        assert!(err.is_retryable());
        assert!(street.segments.is_empty());
    }
}

// ── Mix ────────────────────────────────────────────────────────────────

#[test]
fn test_mix_recovers_from_overflow() {
    let catalog = catalog();
    let rules = RulesConfig::bundled().unwrap();
    let parts = [
        ("sidewalk", "normal", 8.0),
        ("parking-lane", "inbound|left", 8.0),
        ("drive-lane", "inbound|car", 10.0),
        ("drive-lane", "outbound|car", 10.0),
        ("sidewalk", "normal", 8.0),
    ];
    for seed in 0..10 {
        let mut street = street_of(&catalog, &rules, 42.0, &parts);
        assert!((street.remaining_width + 2.0).abs() < 1e-6);
        let original = street.fingerprint();

        let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(seed)).unwrap();
        match automix.mix(&mut street) {
            Ok(_) => {
                assert!(street.remaining_width >= -1e-6);
                assert_ne!(street.fingerprint(), original);
                assert!(!street.has_warnings());
            }
            Err(e) => {
                assert!(matches!(e, AutomixError::MixExhausted { .. }));
                assert_eq!(street.fingerprint(), original);
            }
        }
    }
}

#[test]
fn test_failed_mix_leaves_street_untouched() {
    let catalog = catalog();
    let rules: RulesConfig = serde_json::from_str(r#"{"maxLoops": 1}"#).unwrap();
    let mut street = street_of(&catalog, &rules, 20.0, &[("sidewalk", "normal", 20.0)]);
    let before = street.clone();

    let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(5)).unwrap();
    let err = automix.mix(&mut street).unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("try again"));
    assert_eq!(street, before);
}

// ── Variant mix ────────────────────────────────────────────────────────

#[test]
fn test_mix_variants_keeps_structure() {
    let catalog = catalog();
    let rules = RulesConfig::bundled().unwrap();
    let parts = [
        ("sidewalk", "normal", 8.0),
        ("sidewalk-lamp", "right|modern", 4.0),
        ("parking-lane", "inbound|left", 8.0),
        ("drive-lane", "inbound|car", 10.0),
        ("drive-lane", "outbound|car", 10.0),
        ("sidewalk", "normal", 10.0),
    ];
    let mut street = street_of(&catalog, &rules, 50.0, &parts);
    let widths: Vec<f64> = street.segments.iter().map(|s| s.width).collect();
    let ids: Vec<_> = street.segments.iter().map(|s| s.id).collect();

    let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(2)).unwrap();
    automix.mix_variants(&mut street).unwrap();

    assert_eq!(street.segments.iter().map(|s| s.width).collect::<Vec<_>>(), widths);
    assert_eq!(street.segments.iter().map(|s| s.id).collect::<Vec<_>>(), ids);
    assert_eq!(street.segments[1].variant_string, "right|traditional");
    assert_width_rules_hold(&catalog, &street);
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn test_legacy_bike_lane_variant_is_upgraded() {
    assert_eq!(upgrade_legacy_variant("bike-lane", "outbound|colored"), "outbound|green|road");
}

#[test]
fn test_select_with_zero_weights_is_none() {
    let mut sampler = Sampler::new(ScriptedSource::new(vec![0.5]));
    assert_eq!(sampler.select([("a", 0.0), ("b", 0.0)]), None);
}
