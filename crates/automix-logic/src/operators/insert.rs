//! Insert a new segment drawn from the transition table.

use super::cleanup::remove_invalid_turn_lanes;
use crate::adjacency::{upgrade_legacy_variant, SegmentKey};
use crate::constants::segment_types::SIDEWALK;
use crate::context::MixContext;
use crate::error::SoftFailure;
use crate::placement;
use crate::sampler::Sampler;
use crate::street::{SegmentId, Street};
use crate::validate;

/// Insert one segment whose type follows any of `candidate_types`.
///
/// Sidewalks are never inserted, nor any type already at
/// `rules.maxInstances`. The new segment goes immediately before the first
/// existing segment of a typical predecessor type, at its default width.
/// Unsupported turn lanes are purged on success; a declined insert leaves
/// the street as it was.
pub fn insert(
    ctx: &MixContext<'_>,
    street: &mut Street,
    sampler: &mut Sampler,
    candidate_types: &[String],
) -> Result<SegmentId, SoftFailure> {
    let options: Vec<(SegmentKey, f64)> = {
        let saturated = |t: &str| {
            ctx.rules
                .max_instances
                .get(t)
                .is_some_and(|cap| street.count_of(t) >= *cap)
        };
        ctx.model
            .transitions()
            .iter()
            .filter(|t| candidate_types.contains(&t.from.segment_type))
            .filter(|t| t.to.segment_type != SIDEWALK && !saturated(&t.to.segment_type))
            .map(|t| (t.to.clone(), t.count))
            .collect()
    };
    let chosen = sampler.select(options).ok_or(SoftFailure::NoCandidate)?;
    let segment_type = chosen.segment_type;
    let variant = match ctx.rules.allowed_variants(&segment_type) {
        Some(allowed) => sampler
            .choose(allowed)
            .cloned()
            .unwrap_or_else(|| chosen.variant.clone()),
        None => upgrade_legacy_variant(&segment_type, &chosen.variant),
    };

    let mut working = street.clone();
    remove_invalid_turn_lanes(&mut working);

    let info = ctx
        .info(&segment_type)
        .ok_or_else(|| SoftFailure::InvalidCandidate(segment_type.clone()))?;
    let predecessor = ctx
        .model
        .typical_predecessor(&segment_type, sampler)
        .ok_or(SoftFailure::NoInsertionPoint)?;
    let index = working
        .segments
        .iter()
        .position(|s| s.segment_type == predecessor)
        .ok_or(SoftFailure::NoInsertionPoint)?;

    let candidate = ctx
        .segment(sampler, &segment_type, &variant, info.default_width, info.default_elevation)
        .ok_or_else(|| SoftFailure::InvalidCandidate(format!("{segment_type}:{variant}")))?;
    let left = index.checked_sub(1).and_then(|i| working.segments.get(i));
    let right = working.segments.get(index);
    let candidate = placement::apply(ctx.catalog, candidate, left, right);
    if !validate::segment(ctx.catalog, &candidate) {
        return Err(SoftFailure::InvalidCandidate(format!(
            "{}:{}",
            candidate.segment_type, candidate.variant_string
        )));
    }

    let id = candidate.id;
    log::debug!(
        "Inserted {}:{} before {predecessor} at {index}",
        candidate.segment_type,
        candidate.variant_string
    );
    working.segments.insert(index, candidate);
    ctx.recalculate(&mut working);
    *street = working;
    Ok(id)
}
