//! Builds a brand-new street that exactly fills its target width.
//!
//! Segments are appended left to right, each drawn from the adjacency
//! statistics given its predecessor. The segment that would reach the target
//! width is the closing segment; it is redrawn from the end distribution
//! when it overflows or is not an allowed end type. A street that fails the
//! whole-street rules is discarded and rebuilt. Every append attempt, across
//! rebuilds, counts against one iteration budget. Negative and non-finite
//! widths are refused outright.

use crate::adjacency::VariantFilter;
use crate::constants::limits::{BUILDER_MAX_ITERATIONS, WIDTH_EPSILON};
use crate::context::MixContext;
use crate::error::{AutomixError, AutomixResult};
use crate::operators;
use crate::sampler::Sampler;
use crate::street::{Environment, Segment, Street};
use crate::validate;

/// Result of one append iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Skipped,
    Appended,
    Closed,
}

/// Replace `street.segments` with a generated layout. Returns the number of
/// iterations used.
pub fn create(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler) -> AutomixResult<u32> {
    if !street.width.is_finite() || street.width < 0.0 {
        log::warn!("AutoMix creation refused a street of width {}", street.width);
        return Err(AutomixError::CreationExhausted { iterations: 0 });
    }
    street.environment = Environment::random(sampler);
    let mut iterations: u32 = 0;

    loop {
        street.segments.clear();
        let mut current = 0.0;
        let mut closed = false;
        let rebuild_start = iterations;
        while !closed && current < street.width - WIDTH_EPSILON {
            iterations += 1;
            if iterations > BUILDER_MAX_ITERATIONS {
                log::warn!("AutoMix creation ran out of iterations for a {} wide street", street.width);
                return Err(AutomixError::CreationExhausted {
                    iterations: BUILDER_MAX_ITERATIONS,
                });
            }
            closed = step(ctx, street, sampler, &mut current) == Step::Closed;
        }

        ctx.recalculate(street);
        if street.remaining_width > WIDTH_EPSILON {
            operators::expand_ends(ctx, street);
        }

        let violations = validate::street_violations(ctx.catalog, street, ctx.rules);
        if violations.is_empty() && street.remaining_width.abs() <= WIDTH_EPSILON {
            log::info!(
                "Created {} segment street ({}) in {iterations} iterations",
                street.segments.len(),
                street.environment.name()
            );
            return Ok(iterations);
        }
        log::debug!(
            "Discarding street with {:.2} left over and {} rule violations: {}",
            street.remaining_width,
            violations.len(),
            street.describe()
        );
        // a rebuild that appended nothing would repeat forever
        if iterations >= BUILDER_MAX_ITERATIONS || iterations == rebuild_start {
            log::warn!("AutoMix creation ran out of iterations for a {} wide street", street.width);
            return Err(AutomixError::CreationExhausted { iterations });
        }
    }
}

fn step(ctx: &MixContext<'_>, street: &mut Street, sampler: &mut Sampler, current: &mut f64) -> Step {
    let rules = ctx.rules;
    let target = street.width;
    let prev = street.segments.last().map(Segment::key);

    let picked_type = match &prev {
        None if rules.start.is_declared() => sampler.choose(rules.start.types()).cloned(),
        None => ctx.model.start_type(sampler),
        Some(key) => ctx.model.next_type(key, sampler),
    };
    let Some(mut segment_type) = picked_type else {
        return Step::Skipped;
    };
    let filter = VariantFilter::allowed(rules.allowed_variants(&segment_type));
    let picked_variant = match &prev {
        None => ctx.model.start_variant(&segment_type, &filter, sampler),
        Some(key) => ctx.model.next_variant(&segment_type, Some(key), &filter, sampler),
    };
    let Some(mut variant) = picked_variant else {
        log::debug!("No variant resolved for {segment_type}");
        return Step::Skipped;
    };
    if !validate::admits(&street.segments, &segment_type, rules) {
        return Step::Skipped;
    }
    let Some(mut info) = ctx.info(&segment_type) else {
        return Step::Skipped;
    };

    let mut width = info.default_width;
    let mut closing = *current + width >= target - WIDTH_EPSILON;
    let wrong_end = closing && rules.end.is_declared() && !rules.end.contains(&segment_type);

    if *current + width > target + WIDTH_EPSILON || wrong_end {
        let Some(end_type) = ctx.model.end_type(&rules.end, sampler) else {
            return Step::Skipped;
        };
        let Some(end_info) = ctx.info(&end_type) else {
            return Step::Skipped;
        };
        let Some(end_variant) = ctx.model.end_variant(&end_type, sampler) else {
            return Step::Skipped;
        };
        if !validate::admits(&street.segments, &end_type, rules) {
            return Step::Skipped;
        }
        segment_type = end_type;
        variant = end_variant;
        info = end_info;
        width = info.min_or_default_width();

        if *current + width > target + WIDTH_EPSILON {
            global_min_pass(ctx, street, sampler, (segment_type.as_str(), variant.as_str(), width));
            return Step::Closed;
        }
        let slack = target - *current;
        let ceiling = ctx.width_cap(&segment_type).unwrap_or(f64::INFINITY);
        width = slack.min(ceiling).max(width);
        closing = *current + width >= target - WIDTH_EPSILON;
    }

    let Some(mut segment) = ctx.segment(sampler, &segment_type, &variant, width, info.default_elevation) else {
        log::debug!("Undecodable variant {segment_type}:{variant}");
        return Step::Skipped;
    };

    if validate::segment(ctx.catalog, &segment) {
        *current += width;
        street.segments.push(segment);
    } else if closing {
        segment.width = target - *current;
        *current = target;
        street.segments.push(segment);
    } else {
        return Step::Skipped;
    }

    if closing {
        Step::Closed
    } else {
        Step::Appended
    }
}

/// Shrink everything placed so far to its minimum, append the end segment
/// if it now fits, and spread the slack over the two ends.
fn global_min_pass(
    ctx: &MixContext<'_>,
    street: &mut Street,
    sampler: &mut Sampler,
    end: (&str, &str, f64),
) {
    for segment in &mut street.segments {
        if let Some(width) = ctx.min_or_default_width(&segment.segment_type) {
            segment.width = width;
        }
    }

    let (end_type, end_variant, end_width) = end;
    let placed = street.segments_width();
    if placed + end_width <= street.width + WIDTH_EPSILON {
        let elevation = ctx.info(end_type).map_or(0, |i| i.default_elevation);
        if let Some(segment) = ctx.segment(sampler, end_type, end_variant, end_width, elevation) {
            street.segments.push(segment);
        }
    }

    let slack = street.width - street.segments_width();
    if slack > WIDTH_EPSILON {
        distribute_over_ends(ctx, street, slack);
    }
}

/// Half the slack to each end, clamped by its cap; what one end cannot take
/// goes to the other.
fn distribute_over_ends(ctx: &MixContext<'_>, street: &mut Street, slack: f64) {
    let Some(last) = street.segments.len().checked_sub(1) else {
        return;
    };
    let cap = |segment: &Segment| ctx.width_cap(&segment.segment_type).unwrap_or(f64::INFINITY);

    if last == 0 {
        let only = &mut street.segments[0];
        only.width = (only.width + slack).min(cap(only).max(only.width));
        return;
    }

    let (first_cap, last_cap) = (cap(&street.segments[0]), cap(&street.segments[last]));
    let mut first = street.segments[0].width + slack / 2.0;
    let mut end = street.segments[last].width + slack / 2.0;
    if first > first_cap {
        end += first - first_cap;
        first = first_cap;
    }
    if end > last_cap {
        first = (first + end - last_cap).min(first_cap.max(first));
        end = last_cap;
    }
    street.segments[0].width = first.max(street.segments[0].width);
    street.segments[last].width = end.max(street.segments[last].width);
}
