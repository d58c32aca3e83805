//! Width-only operators: nothing is added or removed, segments only shrink
//! or grow within their rules.

use crate::constants::limits::{SIDEWALK_MAX_SHARE, WIDTH_EPSILON};
use crate::constants::segment_types::{BUS_LANE, DRIVE_LANE, SIDEWALK, SIDEWALK_LAMP};
use crate::context::MixContext;
use crate::sampler::Sampler;
use crate::street::Street;

fn floor_half(width: f64) -> f64 {
    (width * 2.0).floor() / 2.0
}

/// Reset every lamp to its default width.
pub fn shrink_lamps(ctx: &MixContext<'_>, street: &mut Street) {
    let Some(info) = ctx.info(SIDEWALK_LAMP) else {
        return;
    };
    for lamp in street.segments.iter_mut().filter(|s| s.is(SIDEWALK_LAMP)) {
        lamp.width = info.default_width;
    }
    ctx.recalculate(street);
}

/// Shrink drive lanes, then bus lanes, by one random delta per group. The
/// delta is bounded by how far the group's first lane sits above its minimum.
pub fn shrink_drive_lanes(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) {
    for group in [DRIVE_LANE, BUS_LANE] {
        let Some(min) = ctx.min_width(group) else {
            continue;
        };
        let Some(first) = street.segments.iter().find(|s| s.is(group)) else {
            continue;
        };
        let max_diff = (first.width - min).max(0.0);
        let delta = (sampler.next_f64() * (max_diff + 1.0)).floor().min(max_diff);
        if delta <= 0.0 {
            continue;
        }
        for lane in street.segments.iter_mut().filter(|s| s.is(group)) {
            if lane.width > min {
                lane.width = (lane.width - delta).max(min);
            }
        }
    }
    ctx.recalculate(street);
}

/// Share the remaining width between the sidewalks, up to 30% of the street
/// and `rules.maxWidths.sidewalk`, in half units.
pub fn expand_sidewalks(ctx: &MixContext<'_>, street: &mut Street) {
    let sidewalks = street.positions_of(SIDEWALK);
    if sidewalks.is_empty() {
        return;
    }
    let share = street.remaining_width / sidewalks.len() as f64;
    if share < 0.0 {
        return;
    }

    let street_cap = street.width * SIDEWALK_MAX_SHARE;
    let policy_cap = ctx.rules.max_widths.get(SIDEWALK).copied();
    let min = ctx.min_width(SIDEWALK);
    for index in sidewalks {
        let sidewalk = &mut street.segments[index];
        let mut width = (sidewalk.width + share).min(street_cap);
        if let Some(cap) = policy_cap {
            width = width.min(cap);
        }
        width = floor_half(width);
        if let Some(min) = min {
            width = width.max(min);
        }
        sidewalk.width = width;
    }
    ctx.recalculate(street);
}

/// Emergency reclaim on overflow: every non-sidewalk segment goes down to
/// its minimum width.
pub fn reclaim_overflow(ctx: &MixContext<'_>, street: &mut Street) {
    if street.remaining_width >= 0.0 {
        return;
    }
    for segment in street.segments.iter_mut().filter(|s| !s.is(SIDEWALK)) {
        if let Some(min) = ctx.min_width(&segment.segment_type) {
            if segment.width > min {
                segment.width = min;
            }
        }
    }
    ctx.recalculate(street);
}

/// Push leftover width onto the first and last segments, then donate what
/// is still left to any segment below its width cap. Every step respects
/// both the catalog rule and `rules.maxWidths`.
pub fn expand_ends(ctx: &MixContext<'_>, street: &mut Street) {
    ctx.recalculate(street);
    if street.segments.is_empty() || street.remaining_width <= WIDTH_EPSILON {
        return;
    }

    let last = street.segments.len() - 1;
    let ends: &[usize] = if last == 0 { &[0] } else { &[0, last] };
    let share = street.remaining_width / ends.len() as f64;
    for &index in ends {
        let segment = &mut street.segments[index];
        let cap = ctx.width_cap(&segment.segment_type).unwrap_or(f64::INFINITY);
        let grown = floor_half(segment.width + share).min(cap);
        segment.width = segment.width.max(grown);
    }
    ctx.recalculate(street);

    for index in 0..street.segments.len() {
        if street.remaining_width <= WIDTH_EPSILON {
            break;
        }
        let segment = &mut street.segments[index];
        let Some(max) = ctx.width_cap(&segment.segment_type) else {
            continue;
        };
        let headroom = max - segment.width;
        if headroom <= WIDTH_EPSILON {
            continue;
        }
        segment.width += headroom.min(street.remaining_width);
        ctx.recalculate(street);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_shrink_lamps_resets_to_default() {
        let f = Fixture::bundled();
        let mut street = f.street(30.0, &[("sidewalk-lamp", "right|modern", 6.0), ("sidewalk", "normal", 6.0)]);
        shrink_lamps(&f.ctx(), &mut street);
        assert_eq!(street.segments[0].width, 4.0);
        assert_eq!(street.remaining_width, 20.0);
    }

    #[test]
    fn test_shrink_drive_lanes_respects_minimum() {
        let f = Fixture::bundled();
        let ctx = f.ctx();
        for seed in 0..30 {
            let mut street = f.street(
                50.0,
                &[
                    ("drive-lane", "inbound|car", 12.0),
                    ("drive-lane", "outbound|car", 9.0),
                    ("bus-lane", "inbound|regular|typical", 13.0),
                ],
            );
            shrink_drive_lanes(&ctx, &mut street, &mut Sampler::seeded(seed));
            assert!(street.segments[0].width >= 8.0 && street.segments[0].width <= 12.0);
            assert!(street.segments[1].width >= 8.0 && street.segments[1].width <= 9.0);
            assert!(street.segments[2].width >= 10.0);
            let delta = 12.0 - street.segments[0].width;
            assert_eq!(delta.fract(), 0.0);
        }
    }

    #[test]
    fn test_expand_sidewalks_caps_and_halves() {
        let f = Fixture::bundled();
        let mut street = f.street(
            40.0,
            &[("sidewalk", "normal", 6.0), ("drive-lane", "inbound|car", 10.0), ("sidewalk", "normal", 6.0)],
        );
        expand_sidewalks(&f.ctx(), &mut street);
        // 18 left, 9 each, but 30% of 40 is 12
        assert_eq!(street.segments[0].width, 12.0);
        assert_eq!(street.segments[2].width, 12.0);
        assert_eq!(street.remaining_width, 6.0);

        let mut street = f.street(
            23.5,
            &[("sidewalk", "normal", 6.0), ("drive-lane", "inbound|car", 10.0), ("sidewalk", "normal", 6.0)],
        );
        expand_sidewalks(&f.ctx(), &mut street);
        assert_eq!(street.segments[0].width, 6.5);
        assert!(street.remaining_width >= 0.0);
    }

    #[test]
    fn test_reclaim_overflow_skips_sidewalks() {
        let f = Fixture::bundled();
        let mut street = f.street(
            30.0,
            &[("sidewalk", "normal", 8.0), ("drive-lane", "inbound|car", 12.0), ("bike-lane", "inbound|green|road", 8.0), ("sidewalk", "normal", 8.0)],
        );
        assert!(street.remaining_width < 0.0);
        reclaim_overflow(&f.ctx(), &mut street);
        assert_eq!(street.segments[0].width, 8.0);
        assert_eq!(street.segments[1].width, 8.0);
        assert_eq!(street.segments[2].width, 5.0);
        assert_eq!(street.remaining_width, 1.0);
    }

    #[test]
    fn test_expand_ends_fills_exactly() {
        let f = Fixture::bundled();
        let mut street = f.street(
            41.3,
            &[("sidewalk", "normal", 6.0), ("drive-lane", "inbound|car", 10.0), ("sidewalk", "normal", 6.0)],
        );
        expand_ends(&f.ctx(), &mut street);
        assert!(street.remaining_width.abs() < 1e-6);
        for s in &street.segments {
            let max = f.ctx().max_width(&s.segment_type).unwrap();
            assert!(s.width <= max + 1e-9);
        }
        // sidewalks are held to maxWidths.sidewalk on the first push
        assert_eq!(street.segments[0].width, 15.0);
    }

    #[test]
    fn test_expand_ends_leaves_leftover_when_everything_is_capped() {
        let f = Fixture::bundled();
        let mut street = f.street(100.0, &[("sidewalk", "normal", 20.0), ("drive-lane", "inbound|car", 12.0)]);
        expand_ends(&f.ctx(), &mut street);
        assert_eq!(street.segments[0].width, 20.0);
        assert_eq!(street.segments[1].width, 12.0);
        assert_eq!(street.remaining_width, 68.0);
    }
}
