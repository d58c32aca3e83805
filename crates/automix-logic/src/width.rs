//! Width bookkeeping and per-segment warnings.
//!
//! The engine never computes warnings itself; it asks a
//! [`WidthRecalculator`] after every structural change and reacts to what
//! comes back.

use crate::catalog::SegmentCatalog;
use crate::constants::limits::WIDTH_EPSILON;
use crate::street::{SegmentWarnings, Street};

#[derive(Debug, Clone, PartialEq)]
pub struct WidthReport {
    pub occupied_width: f64,
    pub remaining_width: f64,
    /// One entry per segment, in street order.
    pub warnings: Vec<SegmentWarnings>,
}

impl WidthReport {
    /// Write the report back onto the street it was computed from.
    pub fn apply(self, street: &mut Street) {
        street.occupied_width = self.occupied_width;
        street.remaining_width = self.remaining_width;
        for (segment, warnings) in street.segments.iter_mut().zip(self.warnings) {
            segment.warnings = warnings;
        }
    }

    pub fn warned_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.any()).count()
    }
}

pub trait WidthRecalculator {
    fn recalculate(&self, street: &Street, catalog: &dyn SegmentCatalog) -> WidthReport;
}

/// Centres the segments in the street: anything hanging past either edge is
/// `outside`; widths are checked against the catalog rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRecalculator;

pub static STANDARD: StandardRecalculator = StandardRecalculator;

impl WidthRecalculator for StandardRecalculator {
    fn recalculate(&self, street: &Street, catalog: &dyn SegmentCatalog) -> WidthReport {
        let occupied: f64 = street.segments.iter().map(|s| s.width).sum();
        let remaining = street.width - occupied;

        let mut left = remaining / 2.0;
        let warnings = street
            .segments
            .iter()
            .map(|segment| {
                let right = left + segment.width;
                let outside = left < -WIDTH_EPSILON || right > street.width + WIDTH_EPSILON;
                left = right;

                let rule = catalog.info(&segment.segment_type).and_then(|i| i.rules);
                let too_narrow = rule
                    .and_then(|r| r.min_width)
                    .is_some_and(|min| segment.width < min - WIDTH_EPSILON);
                let too_wide = rule
                    .and_then(|r| r.max_width)
                    .is_some_and(|max| segment.width > max + WIDTH_EPSILON);

                SegmentWarnings {
                    outside,
                    too_narrow,
                    too_wide,
                }
            })
            .collect();

        WidthReport {
            occupied_width: occupied,
            remaining_width: remaining,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinCatalog;
    use crate::sampler::Sampler;
    use crate::street::{Segment, Variant};

    fn street_of(width: f64, parts: &[(&str, f64)]) -> Street {
        let mut sampler = Sampler::seeded(5);
        let mut street = Street::new(width);
        for (t, w) in parts {
            street.segments.push(Segment {
                id: sampler.segment_id(),
                segment_type: t.to_string(),
                variant_string: String::new(),
                variant: Variant::default(),
                width: *w,
                elevation: 0,
                label: String::new(),
                warnings: SegmentWarnings::default(),
            });
        }
        street
    }

    #[test]
    fn test_remaining_width_is_conserved() {
        let catalog = BuiltinCatalog::bundled().unwrap();
        let mut street = street_of(40.0, &[("sidewalk", 6.0), ("drive-lane", 10.0)]);
        STANDARD.recalculate(&street, &catalog).apply(&mut street);
        assert_eq!(street.occupied_width, 16.0);
        assert_eq!(street.remaining_width, 24.0);
        assert!(!street.has_warnings());
    }

    #[test]
    fn test_overflow_marks_edges_outside() {
        let catalog = BuiltinCatalog::bundled().unwrap();
        let mut street = street_of(
            20.0,
            &[("sidewalk", 6.0), ("drive-lane", 10.0), ("sidewalk", 6.0)],
        );
        let report = STANDARD.recalculate(&street, &catalog);
        assert_eq!(report.remaining_width, -2.0);
        assert_eq!(report.warned_count(), 2);
        report.apply(&mut street);
        assert!(street.segments[0].warnings.outside);
        assert!(!street.segments[1].warnings.outside);
        assert!(street.segments[2].warnings.outside);
    }

    #[test]
    fn test_width_rule_warnings() {
        let catalog = BuiltinCatalog::bundled().unwrap();
        let street = street_of(
            60.0,
            &[("drive-lane", 7.0), ("bus-lane", 14.0), ("divider", 30.0)],
        );
        let report = STANDARD.recalculate(&street, &catalog);
        assert!(report.warnings[0].too_narrow);
        assert!(report.warnings[1].too_wide);
        assert!(!report.warnings[2].any());
    }
}
