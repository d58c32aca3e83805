//! Rule checks for single segments and whole streets.

use crate::catalog::SegmentCatalog;
use crate::constants::segment_types::{BUS_STOP, DRIVE_LANE};
use crate::rules::RulesConfig;
use crate::street::{Segment, Street};

/// A whole-street rule the street breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub message: String,
}

/// Fails only when the type has a width rule and the width is outside it.
pub fn segment(catalog: &dyn SegmentCatalog, segment: &Segment) -> bool {
    catalog
        .info(&segment.segment_type)
        .and_then(|info| info.rules)
        .map_or(true, |rule| rule.admits(segment.width))
}

pub fn street(catalog: &dyn SegmentCatalog, street: &Street, rules: &RulesConfig) -> bool {
    street_violations(catalog, street, rules).is_empty()
}

/// Every whole-street rule the street breaks, in check order.
pub fn street_violations(
    catalog: &dyn SegmentCatalog,
    street: &Street,
    rules: &RulesConfig,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    let first = street.segments.first();
    let last = street.segments.last();

    if let Some(first) = first {
        if rules.start.is_declared() && !rules.start.contains(&first.segment_type) {
            violations.push(RuleViolation {
                rule: "start",
                message: format!("street starts with {}", first.segment_type),
            });
        }
    }

    if let Some(last) = last {
        if rules.end.is_declared() && !rules.end.contains(&last.segment_type) {
            violations.push(RuleViolation {
                rule: "end",
                message: format!("street ends with {}", last.segment_type),
            });
        }
    }

    if let Some(max) = rules.max_drive_lanes {
        let count = street.count_of(DRIVE_LANE);
        if count > max {
            violations.push(RuleViolation {
                rule: "maxDriveLanes",
                message: format!("{count} drive lanes, at most {max} allowed"),
            });
        }
    }

    if !rules.can_have_bus_stop && street.count_of(BUS_STOP) > 0 {
        violations.push(RuleViolation {
            rule: "canHaveBusStop",
            message: "bus stops are not allowed".to_string(),
        });
    }

    if let (Some(first), Some(last)) = (first, last) {
        if let Some(followers) = rules.adjacent_rules.get(&last.segment_type) {
            if !followers.contains(&first.segment_type) {
                violations.push(RuleViolation {
                    rule: "adjacentRules",
                    message: format!(
                        "{} may not wrap around to {}",
                        last.segment_type, first.segment_type
                    ),
                });
            }
        }
    }

    for (i, s) in street.segments.iter().enumerate() {
        if !segment(catalog, s) {
            violations.push(RuleViolation {
                rule: "width",
                message: format!("segment {i} ({}) is {} wide", s.segment_type, s.width),
            });
        }
    }

    violations
}

/// Whether appending `candidate_type` keeps the count rules satisfied.
pub fn admits(segments: &[Segment], candidate_type: &str, rules: &RulesConfig) -> bool {
    if candidate_type == DRIVE_LANE {
        if let Some(max) = rules.max_drive_lanes {
            let count = segments.iter().filter(|s| s.is(DRIVE_LANE)).count();
            if count >= max {
                return false;
            }
        }
    }
    !(candidate_type == BUS_STOP && !rules.can_have_bus_stop)
}
