//! Neighbour-driven variant fix-ups for a segment about to be inserted.
//!
//! `left` is the segment that will sit immediately before the new one,
//! `right` the one immediately after. Only dimensions the segment's type
//! actually has are touched.

use crate::catalog::SegmentCatalog;
use crate::constants::directions::{INBOUND, LEFT, RIGHT};
use crate::constants::segment_types::PARKLET;
use crate::constants::variant_dimensions::*;
use crate::street::Segment;

pub fn apply(
    catalog: &dyn SegmentCatalog,
    mut segment: Segment,
    left: Option<&Segment>,
    right: Option<&Segment>,
) -> Segment {
    let asphalt = |neighbour: Option<&Segment>| {
        neighbour
            .and_then(|n| catalog.info(&n.segment_type))
            .is_some_and(|info| info.owner.is_asphalt())
    };
    let direction_of = |neighbour: Option<&Segment>| {
        neighbour.and_then(|n| n.variant.get(DIRECTION).map(str::to_string))
    };

    let left_asphalt = asphalt(left);
    let right_asphalt = asphalt(right);
    let neighbour_direction = direction_of(right).or_else(|| direction_of(left));
    let variant = &mut segment.variant;

    if let Some(direction) = &neighbour_direction {
        variant.set(DIRECTION, direction);
    }

    if variant.has(BIKE_DIRECTION) {
        variant.set(
            BIKE_DIRECTION,
            neighbour_direction.as_deref().unwrap_or(INBOUND),
        );
    }

    for dimension in [PARKING_LANE_ORIENTATION, TURN_LANE_ORIENTATION] {
        if !left_asphalt {
            variant.set(dimension, RIGHT);
        } else if !right_asphalt {
            variant.set(dimension, LEFT);
        }
    }

    if segment.segment_type == PARKLET {
        if right_asphalt {
            variant.set(ORIENTATION, RIGHT);
        } else if left_asphalt {
            variant.set(ORIENTATION, LEFT);
        }
    }

    segment.variant_string = catalog.variant_string(&segment.variant);
    segment
}
