//! Reduce pass: frees width by collapsing duplicate lanes, and normalizes
//! parking and turn lanes before the rest of the attempt runs.

use super::{keep_first, keep_outermost, LaneCounts};
use crate::adjacency::VariantFilter;
use crate::constants::directions;
use crate::constants::segment_types::*;
use crate::context::MixContext;
use crate::sampler::Sampler;
use crate::street::{Segment, Street};
use crate::validate;

fn typed_inbound(t: &'static str) -> impl Fn(&Segment) -> bool {
    move |s| s.is(t) && s.is_inbound()
}

fn typed_outbound(t: &'static str) -> impl Fn(&Segment) -> bool {
    move |s| s.is(t) && s.is_outbound()
}

/// With several drive lanes in both directions, keep the first of each, and
/// the first bus lane of each direction.
pub fn remove_drive_lanes(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    let counts = LaneCounts::of(street);
    let mut removed = 0;
    if counts.drive_inbound > 1 && counts.drive_outbound > 1 {
        for t in [DRIVE_LANE, BUS_LANE] {
            removed += keep_first(&mut street.segments, typed_inbound(t));
            removed += keep_first(&mut street.segments, typed_outbound(t));
        }
    }
    ctx.recalculate(street);
    removed
}

pub fn remove_bike_lanes(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    remove_duplicate_lanes(ctx, street, BIKE_LANE)
}

pub fn remove_parking_lanes(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    remove_duplicate_lanes(ctx, street, PARKING_LANE)
}

fn remove_duplicate_lanes(ctx: &MixContext<'_>, street: &mut Street, t: &'static str) -> usize {
    let removed = keep_first(&mut street.segments, typed_inbound(t))
        + keep_first(&mut street.segments, typed_outbound(t));
    ctx.recalculate(street);
    removed
}

/// More than two sidewalks: keep the outermost two.
pub fn remove_sidewalks(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    let removed = keep_outermost(&mut street.segments, |s| s.is(SIDEWALK));
    ctx.recalculate(street);
    removed
}

/// More than two lamps: keep the outermost two.
pub fn remove_lamps(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    let removed = keep_outermost(&mut street.segments, |s| s.is(SIDEWALK_LAMP));
    ctx.recalculate(street);
    removed
}

/// Swap every directional parking lane for one replacement type drawn from
/// `rules.replace.parkingLane`. Returns how many lanes were replaced.
pub fn replace_parking_lanes(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> usize {
    let lanes: Vec<usize> = street
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is(PARKING_LANE) && (s.is_inbound() || s.is_outbound()))
        .map(|(i, _)| i)
        .collect();
    if lanes.is_empty() {
        return 0;
    }
    let Some(candidate) = sampler.choose(&ctx.rules.replace.parking_lane).cloned() else {
        return 0;
    };

    let mut replaced = 0;
    for index in lanes {
        let (direction, width, elevation) = {
            let lane = &street.segments[index];
            (directions::of(&lane.variant_string), lane.width, lane.elevation)
        };
        let prev = index.checked_sub(1).map(|p| street.segments[p].key());
        let filter = VariantFilter {
            includes: direction,
            allowed: ctx.rules.allowed_variants(&candidate),
        };
        let Some(variant) = ctx
            .model
            .next_variant(&candidate, prev.as_ref(), &filter, sampler)
        else {
            log::debug!("No {candidate} variant to replace parking lane {index}");
            continue;
        };

        let width = match ctx.rules.max_widths.get(&candidate) {
            Some(cap) => width.min(*cap),
            None => width,
        };
        match ctx.segment(sampler, &candidate, &variant, width, elevation) {
            Some(segment) if validate::segment(ctx.catalog, &segment) => {
                street.segments[index] = segment;
                replaced += 1;
            }
            _ => log::debug!("Invalid {candidate}:{variant} generated for parking lane replacement"),
        }
    }
    ctx.recalculate(street);
    replaced
}

/// Switch turn lanes to an allowed variant of the same direction.
pub fn replace_turn_lanes(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> usize {
    let Some(allowed) = ctx.rules.allowed_variants(TURN_LANE) else {
        return 0;
    };

    let mut switched = 0;
    for lane in street.segments.iter_mut().filter(|s| s.is(TURN_LANE)) {
        if allowed.contains(&lane.variant_string) {
            continue;
        }
        let direction = if lane.is_inbound() {
            directions::INBOUND
        } else {
            directions::OUTBOUND
        };
        let matching: Vec<&String> = allowed.iter().filter(|v| v.contains(direction)).collect();
        if let Some(choice) = sampler.choose(&matching) {
            if ctx.set_variant(lane, choice) {
                switched += 1;
            }
        }
    }
    switched
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::rules::RulesConfig;

    #[test]
    fn test_remove_drive_lanes_keeps_first_each_way() {
        let f = Fixture::bundled();
        let mut street = f.street(
            80.0,
            &[
                ("sidewalk", "normal", 6.0),
                ("drive-lane", "inbound|car", 10.0),
                ("drive-lane", "inbound|truck", 10.0),
                ("bus-lane", "inbound|regular|typical", 12.0),
                ("drive-lane", "outbound|car", 10.0),
                ("drive-lane", "outbound|av", 10.0),
                ("sidewalk", "normal", 6.0),
            ],
        );
        assert_eq!(remove_drive_lanes(&f.ctx(), &mut street), 2);
        let variants: Vec<_> = street.segments.iter().map(|s| s.variant_string.as_str()).collect();
        assert_eq!(
            variants,
            vec!["normal", "inbound|car", "inbound|regular|typical", "outbound|car", "normal"]
        );
        assert_eq!(street.remaining_width, 80.0 - 44.0);
    }

    #[test]
    fn test_remove_drive_lanes_needs_both_directions() {
        let f = Fixture::bundled();
        let mut street = f.street(
            40.0,
            &[
                ("drive-lane", "inbound|car", 10.0),
                ("drive-lane", "inbound|car", 10.0),
                ("drive-lane", "outbound|car", 10.0),
            ],
        );
        assert_eq!(remove_drive_lanes(&f.ctx(), &mut street), 0);
        assert_eq!(street.segments.len(), 3);
    }

    #[test]
    fn test_remove_bike_lanes() {
        let f = Fixture::bundled();
        let mut street = f.street(
            40.0,
            &[
                ("bike-lane", "inbound|green|road", 6.0),
                ("bike-lane", "inbound|red|road", 6.0),
                ("bike-lane", "outbound|green|road", 6.0),
            ],
        );
        assert_eq!(remove_bike_lanes(&f.ctx(), &mut street), 1);
        assert_eq!(types(&street), vec!["bike-lane", "bike-lane"]);
    }

    #[test]
    fn test_remove_sidewalks_and_lamps_keep_outermost() {
        let f = Fixture::bundled();
        let mut street = f.street(
            60.0,
            &[
                ("sidewalk", "normal", 6.0),
                ("sidewalk-lamp", "right|modern", 4.0),
                ("sidewalk", "normal", 6.0),
                ("sidewalk-lamp", "left|modern", 4.0),
                ("sidewalk-lamp", "both|modern", 4.0),
                ("sidewalk", "dense", 6.0),
            ],
        );
        let ctx = f.ctx();
        assert_eq!(remove_sidewalks(&ctx, &mut street), 1);
        assert_eq!(remove_lamps(&ctx, &mut street), 1);
        assert_eq!(
            types(&street),
            vec!["sidewalk", "sidewalk-lamp", "sidewalk-lamp", "sidewalk"]
        );
        assert_eq!(street.segments[2].variant_string, "both|modern");
    }

    #[test]
    fn test_replace_parking_lanes_keeps_direction_and_caps_width() {
        let rules: RulesConfig = serde_json::from_str(
            r#"{"replace": {"parkingLane": ["bike-lane"]}, "maxWidths": {"bike-lane": 7}}"#,
        )
        .unwrap();
        let f = Fixture::with_rules(rules.with_stats(RulesConfig::bundled().unwrap().stats));
        let mut street = f.street(
            60.0,
            &[
                ("sidewalk", "normal", 6.0),
                ("parking-lane", "inbound|left", 8.0),
                ("drive-lane", "inbound|car", 10.0),
                ("drive-lane", "outbound|car", 10.0),
                ("parking-lane", "outbound|right", 8.0),
                ("parking-lane", "sideways|right", 8.0),
                ("sidewalk", "normal", 6.0),
            ],
        );
        let mut sampler = Sampler::seeded(4);
        assert_eq!(replace_parking_lanes(&f.ctx(), &mut street, &mut sampler), 2);

        let first = &street.segments[1];
        assert_eq!(first.segment_type, "bike-lane");
        assert!(first.variant_string.starts_with("inbound"));
        assert_eq!(first.width, 7.0);
        let second = &street.segments[4];
        assert_eq!(second.segment_type, "bike-lane");
        assert!(second.variant_string.starts_with("outbound"));
        assert_eq!(street.segments[5].segment_type, "parking-lane");
    }

    #[test]
    fn test_replace_turn_lanes_uses_allowed_variants() {
        let f = Fixture::bundled();
        let mut street = f.street(
            40.0,
            &[
                ("drive-lane", "inbound|car", 10.0),
                ("turn-lane", "outbound|right", 10.0),
                ("turn-lane", "inbound|left", 10.0),
            ],
        );
        let mut sampler = Sampler::seeded(8);
        assert_eq!(replace_turn_lanes(&f.ctx(), &mut street, &mut sampler), 1);
        let lane = &street.segments[1];
        assert!(lane.variant_string == "outbound|left" || lane.variant_string == "outbound|left-straight");
        assert_eq!(lane.variant.get("turn-lane-orientation").map(|o| o.starts_with("left")), Some(true));
        assert_eq!(street.segments[2].variant_string, "inbound|left");
    }
}
