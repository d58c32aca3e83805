//! End-of-attempt tidying: lamp clustering and orphaned turn lanes.

use super::remove_indices;
use crate::constants::limits::LAMP_SPACING;
use crate::constants::segment_types::{is_travel_lane, SIDEWALK_LAMP, TURN_LANE};
use crate::context::MixContext;
use crate::street::{Segment, Street};

/// A turn lane needs a travel lane on each side, one inbound and one outbound.
pub fn turn_lane_supported(segments: &[Segment], index: usize) -> bool {
    let Some(prev) = index.checked_sub(1).and_then(|p| segments.get(p)) else {
        return false;
    };
    let Some(next) = segments.get(index + 1) else {
        return false;
    };
    is_travel_lane(&prev.segment_type)
        && is_travel_lane(&next.segment_type)
        && ((prev.is_inbound() && next.is_outbound()) || (prev.is_outbound() && next.is_inbound()))
}

/// Drop every unsupported turn lane. Returns how many went.
pub fn remove_invalid_turn_lanes(street: &mut Street) -> usize {
    let doomed: Vec<usize> = street
        .segments
        .iter()
        .enumerate()
        .filter(|(i, s)| s.is(TURN_LANE) && !turn_lane_supported(&street.segments, *i))
        .map(|(i, _)| i)
        .collect();
    remove_indices(&mut street.segments, |i| doomed.contains(&i))
}

/// Thin out clustered lamps, then remove unsupported turn lanes.
///
/// The first two lamps always stay; any later lamp within
/// [`LAMP_SPACING`] positions of a kept lamp is removed. Positions are
/// measured on the street as it was before removal.
pub fn cleanup(ctx: &MixContext<'_>, street: &mut Street) -> usize {
    let mut kept: Vec<usize> = Vec::new();
    let mut doomed: Vec<usize> = Vec::new();
    for index in street.positions_of(SIDEWALK_LAMP) {
        if kept.len() < 2 || kept.iter().all(|k| index.abs_diff(*k) >= LAMP_SPACING) {
            kept.push(index);
        } else {
            doomed.push(index);
        }
    }

    let mut removed = remove_indices(&mut street.segments, |i| doomed.contains(&i));
    removed += remove_invalid_turn_lanes(street);
    if removed > 0 {
        log::debug!("Cleanup removed {removed} segments");
    }
    ctx.recalculate(street);
    removed
}
