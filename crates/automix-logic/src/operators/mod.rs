//! Street mutation operators.
//!
//! Each operator takes the shared [`MixContext`](crate::context::MixContext)
//! and mutates a working street in place, recalculating widths when it is
//! done. Operators that can decline (`replace`, `insert`) return a
//! [`SoftFailure`](crate::error::SoftFailure) and leave the street untouched.
//!
//! | Module | Operators |
//! |--------|-----------|
//! | [`remove`] | Reduce pass: duplicate lanes, extra sidewalks and lamps, parking/turn lane swaps |
//! | [`resize`] | Shrink lamps and travel lanes, expand sidewalks and ends, overflow reclaim |
//! | [`replace`] | Swap one segment for a statistically likely neighbour of its predecessor |
//! | [`insert`] | Add a new segment before its typical predecessor type |
//! | [`cleanup`] | Lamp spacing and unsupported turn lanes |

pub mod cleanup;
pub mod insert;
pub mod remove;
pub mod replace;
pub mod resize;

pub use cleanup::{cleanup, remove_invalid_turn_lanes, turn_lane_supported};
pub use insert::insert;
pub use remove::{
    remove_bike_lanes, remove_drive_lanes, remove_lamps, remove_parking_lanes, remove_sidewalks,
    replace_parking_lanes, replace_turn_lanes,
};
pub use replace::replace;
pub use resize::{expand_ends, expand_sidewalks, reclaim_overflow, shrink_drive_lanes, shrink_lamps};

use serde::Serialize;

use crate::constants::segment_types::{BIKE_LANE, BUS_LANE, DRIVE_LANE, PARKING_LANE, SIDEWALK};
use crate::street::{Segment, Street};

/// Per-direction lane counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LaneCounts {
    pub drive_inbound: usize,
    pub drive_outbound: usize,
    pub bike_inbound: usize,
    pub bike_outbound: usize,
    pub bus_inbound: usize,
    pub bus_outbound: usize,
    pub parking_inbound: usize,
    pub parking_outbound: usize,
    pub sidewalks: usize,
}

impl LaneCounts {
    pub fn of(street: &Street) -> Self {
        let mut counts = LaneCounts::default();
        for s in &street.segments {
            let (inbound, outbound) = match s.segment_type.as_str() {
                DRIVE_LANE => (&mut counts.drive_inbound, &mut counts.drive_outbound),
                BIKE_LANE => (&mut counts.bike_inbound, &mut counts.bike_outbound),
                BUS_LANE => (&mut counts.bus_inbound, &mut counts.bus_outbound),
                PARKING_LANE => (&mut counts.parking_inbound, &mut counts.parking_outbound),
                SIDEWALK => {
                    counts.sidewalks += 1;
                    continue;
                }
                _ => continue,
            };
            if s.is_inbound() {
                *inbound += 1;
            } else if s.is_outbound() {
                *outbound += 1;
            }
        }
        counts
    }
}

/// Remove every match of `pred` except the first. Returns how many went.
pub(crate) fn keep_first(segments: &mut Vec<Segment>, pred: impl Fn(&Segment) -> bool) -> usize {
    let before = segments.len();
    let mut seen = false;
    segments.retain(|s| {
        if !pred(s) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    before - segments.len()
}

/// Remove every match of `pred` except the first and the last.
pub(crate) fn keep_outermost(segments: &mut Vec<Segment>, pred: impl Fn(&Segment) -> bool) -> usize {
    let matches: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| pred(s))
        .map(|(i, _)| i)
        .collect();
    if matches.len() <= 2 {
        return 0;
    }
    let (first, last) = (matches[0], matches[matches.len() - 1]);
    remove_indices(segments, |i| i != first && i != last && matches.binary_search(&i).is_ok())
}

/// Remove segments whose current index satisfies `doomed`.
pub(crate) fn remove_indices(segments: &mut Vec<Segment>, doomed: impl Fn(usize) -> bool) -> usize {
    let before = segments.len();
    let mut index = 0;
    segments.retain(|_| {
        let keep = !doomed(index);
        index += 1;
        keep
    });
    before - segments.len()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::catalog::BuiltinCatalog;
    use crate::context::MixContext;
    use crate::rules::RulesConfig;
    use crate::sampler::Sampler;
    use crate::street::Street;
    use crate::width::STANDARD;

    pub struct Fixture {
        pub catalog: BuiltinCatalog,
        pub rules: RulesConfig,
    }

    impl Fixture {
        pub fn bundled() -> Self {
            Self {
                catalog: BuiltinCatalog::bundled().unwrap(),
                rules: RulesConfig::bundled().unwrap(),
            }
        }

        pub fn with_rules(rules: RulesConfig) -> Self {
            Self {
                catalog: BuiltinCatalog::bundled().unwrap(),
                rules,
            }
        }

        pub fn ctx(&self) -> MixContext<'_> {
            MixContext::new(&self.catalog, &STANDARD, &self.rules)
        }

        /// Street of the given width from `(type, variant, width)` parts.
        pub fn street(&self, width: f64, parts: &[(&str, &str, f64)]) -> Street {
            let ctx = self.ctx();
            let mut sampler = Sampler::seeded(99);
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
    }

    pub fn types(street: &Street) -> Vec<&str> {
        street
            .segments
            .iter()
            .map(|s| s.segment_type.as_str())
            .collect()
    }
}
