//! Replace one segment with a likely successor of its predecessor.

use crate::adjacency::{upgrade_legacy_variant, SegmentKey};
use crate::constants::directions::{INBOUND, OUTBOUND};
use crate::constants::segment_types::{follows_sidewalk_elevation, DRIVE_LANE, SIDEWALK};
use crate::context::MixContext;
use crate::error::SoftFailure;
use crate::sampler::Sampler;
use crate::street::{SegmentId, Street};
use crate::validate;

/// Replace the segment at `target` (random when `None`).
///
/// Refuses the first and last segments, sidewalks and drive lanes. The new
/// `(type, variant)` comes from transitions leaving the predecessor's exact
/// key, or its type when that key has no outgoing edges, and never repeats
/// the target's type. Width starts at the new type's minimum.
pub fn replace(
    ctx: &MixContext<'_>,
    street: &mut Street,
    sampler: &mut Sampler,
    target: Option<usize>,
) -> Result<SegmentId, SoftFailure> {
    let len = street.segments.len();
    let index = target.unwrap_or_else(|| sampler.index(len));
    if index == 0 || index >= len {
        return Err(SoftFailure::NoPredecessor);
    }
    if index == len - 1 {
        return Err(SoftFailure::LastSegment);
    }

    let current = &street.segments[index];
    if current.is(SIDEWALK) || current.is(DRIVE_LANE) {
        return Err(SoftFailure::ProtectedType(current.segment_type.clone()));
    }

    let prior = street.segments[index - 1].key();
    let chosen = pick_successor(ctx, &prior, &current.segment_type, sampler)
        .ok_or(SoftFailure::NoCandidate)?;
    let segment_type = chosen.segment_type;
    let mut variant = upgrade_legacy_variant(&segment_type, &chosen.variant);

    let mut elevation = street
        .segments
        .iter()
        .find(|s| s.segment_type == segment_type)
        .map_or(current.elevation, |s| s.elevation);
    if follows_sidewalk_elevation(&segment_type) {
        if let Some(sidewalk) = street.segments.iter().find(|s| s.is(SIDEWALK)) {
            elevation = sidewalk.elevation;
        }
    }

    if current.is_inbound() {
        variant = variant.replace(OUTBOUND, INBOUND);
    } else if current.is_outbound() {
        variant = variant.replace(INBOUND, OUTBOUND);
    }

    let width = ctx.min_width(&segment_type).unwrap_or(current.width);
    let candidate = ctx
        .segment(sampler, &segment_type, &variant, width, elevation)
        .filter(|s| validate::segment(ctx.catalog, s))
        .ok_or_else(|| SoftFailure::InvalidCandidate(format!("{segment_type}:{variant}")))?;

    let id = candidate.id;
    log::debug!(
        "Replaced {} at {index} with {}:{}",
        street.segments[index].segment_type,
        candidate.segment_type,
        candidate.variant_string
    );
    street.segments[index] = candidate;
    ctx.recalculate(street);
    Ok(id)
}

fn pick_successor(
    ctx: &MixContext<'_>,
    prior: &SegmentKey,
    current_type: &str,
    sampler: &mut Sampler,
) -> Option<SegmentKey> {
    let edges = |exact: bool| -> Vec<(SegmentKey, f64)> {
        ctx.model
            .transitions()
            .iter()
            .filter(|t| {
                let origin = if exact {
                    t.from == *prior
                } else {
                    t.from.segment_type == prior.segment_type
                };
                origin && t.to.segment_type != current_type
            })
            .map(|t| (t.to.clone(), t.count))
            .collect()
    };
    sampler
        .select(edges(true))
        .or_else(|| sampler.select(edges(false)))
}
