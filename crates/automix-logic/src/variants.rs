//! Variant-only mixing: keeps types and widths, re-rolls variants and the
//! environment.

use crate::adjacency::{upgrade_legacy_variant, SegmentKey};
use crate::constants::directions;
use crate::constants::segment_types::VARIANT_MIX_EXEMPT;
use crate::context::MixContext;
use crate::error::{AutomixError, AutomixResult};
use crate::sampler::Sampler;
use crate::street::{Environment, Segment, Street};

/// Re-roll variants until the variant layout differs from the original and
/// no warnings remain. Returns the number of attempts used.
pub fn mix_variants(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> AutomixResult<u32> {
    let original = street.variant_fingerprint();
    let mut attempt: u32 = 0;
    loop {
        street.environment = Environment::random(sampler);
        let start = street.variant_fingerprint();
        let swapped = run_attempt(ctx, street, sampler);
        ctx.recalculate(street);

        let end = street.variant_fingerprint();
        if end != start && end != original && !street.has_warnings() {
            log::info!("Mixed {swapped} segment variants in {} attempts", attempt + 1);
            return Ok(attempt + 1);
        }
        if attempt > ctx.rules.max_loops {
            log::warn!("AutoMix gave up mixing variants after {} attempts", attempt + 1);
            return Err(AutomixError::VariantMixExhausted {
                attempts: attempt + 1,
            });
        }
        log::debug!("Variant mix produced no usable change, trying again ({attempt})");
        attempt += 1;
    }
}

/// One pass over the street. Neighbour context is the street as it was
/// before the pass. Returns how many variants changed.
fn run_attempt(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> usize {
    let keys: Vec<SegmentKey> = street.segments.iter().map(Segment::key).collect();
    let mut swapped = 0;
    for index in 0..street.segments.len() {
        if VARIANT_MIX_EXEMPT.contains(&street.segments[index].segment_type.as_str()) {
            continue;
        }
        let prev = &keys[index.saturating_sub(1)];
        let Some(variant) = alternative_variant(ctx, &street.segments[index], prev, sampler) else {
            continue;
        };
        if ctx.set_variant(&mut street.segments[index], &variant) {
            swapped += 1;
        }
    }
    swapped
}

/// A different known variant of the same type, drawn from transitions
/// leaving `prev`, with the segment's travel direction kept.
pub fn alternative_variant(
    ctx: &MixContext<'_>,
    segment: &Segment,
    prev: &SegmentKey,
    sampler: &mut Sampler,
) -> Option<String> {
    let info = ctx.info(&segment.segment_type)?;
    let direction = directions::of(&segment.variant_string);
    let options: Vec<(String, f64)> = ctx
        .model
        .transitions()
        .iter()
        .filter(|t| t.from == *prev && t.to.segment_type == segment.segment_type)
        .map(|t| (upgrade_legacy_variant(&segment.segment_type, &t.to.variant), t.count))
        .filter(|(v, _)| *v != segment.variant_string && info.knows_variant(v))
        .filter(|(v, _)| direction.map_or(true, |d| v.contains(d)))
        .collect();
    sampler.select(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::*;
    use crate::rules::RulesConfig;

    #[test]
    fn test_alternative_variant_keeps_direction() {
        let f = Fixture::bundled();
        let ctx = f.ctx();
        let street = f.street(
            30.0,
            &[("drive-lane", "inbound|car", 10.0), ("drive-lane", "inbound|car", 10.0)],
        );
        let prev = street.segments[0].key();
        for seed in 0..20 {
            let mut sampler = Sampler::seeded(seed);
            if let Some(v) = alternative_variant(&ctx, &street.segments[1], &prev, &mut sampler) {
                assert_ne!(v, "inbound|car");
                assert!(v.starts_with("inbound"));
            }
        }
    }

    #[test]
    fn test_alternative_variant_follows_predecessor_edges() {
        let f = Fixture::bundled();
        let ctx = f.ctx();
        let street = f.street(
            10.0,
            &[("sidewalk", "normal", 6.0), ("sidewalk-lamp", "right|modern", 4.0)],
        );
        let prev = street.segments[0].key();
        let picked = alternative_variant(&ctx, &street.segments[1], &prev, &mut Sampler::seeded(3));
        assert_eq!(picked.as_deref(), Some("right|traditional"));
    }

    #[test]
    fn test_mix_variants_keeps_types_and_widths() {
        let f = Fixture::bundled();
        let ctx = f.ctx();
        let mut mixed = 0;
        for seed in 0..10 {
            let mut street = f.street(
                60.0,
                &[
                    ("sidewalk", "normal", 8.0),
                    ("sidewalk-lamp", "right|modern", 4.0),
                    ("parking-lane", "inbound|left", 8.0),
                    ("drive-lane", "inbound|car", 10.0),
                    ("turn-lane", "inbound|left", 10.0),
                    ("drive-lane", "outbound|car", 10.0),
                    ("sidewalk", "normal", 10.0),
                ],
            );
            let before: Vec<(String, f64)> = street
                .segments
                .iter()
                .map(|s| (s.segment_type.clone(), s.width))
                .collect();
            let variants = street.variant_fingerprint();
            if mix_variants(&ctx, &mut street, &mut Sampler::seeded(seed)).is_ok() {
                mixed += 1;
                let after: Vec<(String, f64)> = street
                    .segments
                    .iter()
                    .map(|s| (s.segment_type.clone(), s.width))
                    .collect();
                assert_eq!(before, after);
                assert_ne!(street.variant_fingerprint(), variants);
                assert_eq!(street.segments[4].variant_string, "inbound|left");
            }
        }
        assert!(mixed > 0);
    }

    #[test]
    fn test_mix_variants_exhausts_without_stats() {
        let rules: RulesConfig = serde_json::from_str(r#"{"maxLoops": 2}"#).unwrap();
        let f = Fixture::with_rules(rules);
        let mut street = f.street(20.0, &[("sidewalk", "normal", 20.0)]);
        let err = mix_variants(&f.ctx(), &mut street, &mut Sampler::seeded(1)).unwrap_err();
        assert!(matches!(err, AutomixError::VariantMixExhausted { attempts: 4 }));
    }
}
