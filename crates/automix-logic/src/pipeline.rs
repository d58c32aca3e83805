//! The mix pipeline: one full pass of the operators, retried until the
//! layout changes and carries no warnings.
//!
//! ```text
//! Start → ReducePass → ShrinkPass → InsertOrReplace → ExpandPass
//!       → RepairPass → Cleanup → { Converged | RetryFromStart | Failed }
//! ```
//!
//! Retries are a bounded loop; `Failed` is reached only once the attempt
//! counter passes `rules.maxLoops`.

use std::fmt;

use crate::constants::limits::{FORCED_SHRINK_THRESHOLD, INSERT_MAX_ITERATIONS, WIDTH_EPSILON};
use crate::context::MixContext;
use crate::error::{AutomixError, AutomixResult};
use crate::operators;
use crate::sampler::Sampler;
use crate::street::{SegmentId, Street};

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Converged,
    /// Layout matches the attempt's start or the caller's original.
    Unchanged,
    WarningsRemain,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Converged => write!(f, "converged"),
            AttemptOutcome::Unchanged => write!(f, "an identical layout"),
            AttemptOutcome::WarningsRemain => write!(f, "a layout with warnings"),
        }
    }
}

/// Mix `street` in place. Returns the number of attempts used.
///
/// The street must already be recalculated. On error it is left in
/// whatever state the last attempt produced; callers work on a copy.
pub fn mix(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> AutomixResult<u32> {
    let original = street.fingerprint();
    let mut attempt: u32 = 0;
    loop {
        let outcome = run_attempt(ctx, street, sampler, original);
        if outcome == AttemptOutcome::Converged {
            return Ok(attempt + 1);
        }
        if attempt > ctx.rules.max_loops {
            log::warn!("AutoMix gave up after {} attempts ({outcome})", attempt + 1);
            return Err(AutomixError::MixExhausted {
                attempts: attempt + 1,
            });
        }
        log::debug!("AutoMix generated {outcome}, trying again ({attempt})");
        attempt += 1;
    }
}

/// One pass over the operators.
pub fn run_attempt(
    ctx: &MixContext<'_>,
    street: &mut Street,
    sampler: &mut Sampler,
    original: u64,
) -> AttemptOutcome {
    let start = street.fingerprint();

    reduce_pass(ctx, street, sampler);
    shrink_pass(ctx, street, sampler);
    insert_or_replace(ctx, street, sampler);
    expand_pass(ctx, street);
    repair_pass(ctx, street);
    operators::cleanup(ctx, street);
    if street.remaining_width > WIDTH_EPSILON {
        operators::expand_ends(ctx, street);
    }

    let end = street.fingerprint();
    log::debug!("Attempt hashes {start:016x} -> {end:016x}: {}", street.describe());
    if end == start || end == original {
        AttemptOutcome::Unchanged
    } else if street.has_warnings() {
        AttemptOutcome::WarningsRemain
    } else {
        AttemptOutcome::Converged
    }
}

fn reduce_pass(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) {
    operators::remove_drive_lanes(ctx, street);
    operators::remove_bike_lanes(ctx, street);
    operators::remove_parking_lanes(ctx, street);
    operators::replace_parking_lanes(ctx, street, sampler);
    operators::replace_turn_lanes(ctx, street, sampler);
    operators::remove_sidewalks(ctx, street);
    operators::remove_lamps(ctx, street);
}

fn shrink_pass(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) {
    let chances = ctx.rules.chances;
    if street.remaining_width < FORCED_SHRINK_THRESHOLD || sampler.chance(chances.shrink_lamps) {
        operators::shrink_lamps(ctx, street);
    }
    if street.remaining_width < FORCED_SHRINK_THRESHOLD || sampler.chance(chances.shrink_drive_lanes) {
        operators::shrink_drive_lanes(ctx, street, sampler);
    }
}

/// Catalog types whose minimum width fits in the remaining width, shuffled.
fn fitting_types(ctx: &MixContext<'_>, street: &Street, sampler: &mut Sampler) -> Vec<String> {
    let mut candidates: Vec<String> = ctx
        .catalog
        .types()
        .into_iter()
        .filter(|t| ctx.min_width(t).is_some_and(|min| min <= street.remaining_width))
        .map(str::to_string)
        .collect();
    sampler.shuffle(&mut candidates);
    candidates
}

fn insert_or_replace(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) {
    let rules = ctx.rules;
    let candidates = fitting_types(ctx, street, sampler);

    if candidates.is_empty() {
        if sampler.chance(rules.chances.replace_segment) {
            let n = sampler.range_inclusive(rules.min_segments_replaced, rules.max_segments_replaced);
            for _ in 0..n {
                if let Err(reason) = operators::replace(ctx, street, sampler, None) {
                    log::debug!("Replace skipped: {reason}");
                }
            }
        }
        return;
    }

    if !sampler.chance(rules.chances.insert_segment) {
        return;
    }
    try_insert(ctx, street, sampler, &candidates);
    let mut i = 0;
    while street.remaining_width > street.width / 3.0 && i < INSERT_MAX_ITERATIONS {
        try_insert(ctx, street, sampler, &candidates);
        i += 1;
    }
}

fn try_insert(
    ctx: &MixContext<'_>,
    street: &mut Street,
    sampler: &mut Sampler,
    candidates: &[String],
) -> Option<SegmentId> {
    let result = operators::insert(ctx, street, sampler, candidates);
    ctx.recalculate(street);
    result
        .map_err(|reason| log::debug!("Insert skipped: {reason}"))
        .ok()
}

fn expand_pass(ctx: &MixContext<'_>, street: &mut Street) {
    operators::shrink_lamps(ctx, street);
    operators::expand_sidewalks(ctx, street);
    operators::reclaim_overflow(ctx, street);
}

/// Reset warned segments to their minimum, one at a time; if that is not
/// enough, drop the first warned segment and refill the ends.
fn repair_pass(ctx: &MixContext<'_>, street: &mut Street) {
    ctx.recalculate(street);
    if !street.has_warnings() {
        return;
    }

    let warned: Vec<SegmentId> = street
        .segments
        .iter()
        .filter(|s| s.warnings.any())
        .map(|s| s.id)
        .collect();
    for id in &warned {
        if let Some(index) = street.position_of_id(*id) {
            let segment = &mut street.segments[index];
            if let Some(width) = ctx.min_or_default_width(&segment.segment_type) {
                segment.width = width;
            }
        }
        ctx.recalculate(street);
        if !street.has_warnings() {
            return;
        }
    }

    if let Some(index) = street.segments.iter().position(|s| s.warnings.any()) {
        let dropped = street.segments.remove(index);
        log::debug!("Dropped warned segment {}:{}", dropped.segment_type, dropped.variant_string);
        ctx.recalculate(street);
        operators::expand_ends(ctx, street);
    }
}
