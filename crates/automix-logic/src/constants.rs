//! Engine constants: segment type keys, variant dimensions, directions and limits.
//!
//! These are plain `&str` / numeric constants with no catalog dependency.
//! The operators special-case a handful of segment types by key; everything
//! else about a type comes from the catalog.

pub mod segment_types {
    // Sidewalk & furniture
    pub const SIDEWALK: &str = "sidewalk";
    pub const SIDEWALK_LAMP: &str = "sidewalk-lamp";
    // Flex
    pub const PARKLET: &str = "parklet";
    pub const FOOD_TRUCK: &str = "food-truck";
    // Travel & storage lanes
    pub const BIKE_LANE: &str = "bike-lane";
    pub const DRIVE_LANE: &str = "drive-lane";
    pub const TURN_LANE: &str = "turn-lane";
    pub const BUS_LANE: &str = "bus-lane";
    pub const PARKING_LANE: &str = "parking-lane";
    // Transit
    pub const TRANSIT_SHELTER: &str = "transit-shelter";
    pub const BUS_STOP: &str = "bus-stop";
    // Other
    pub const DIVIDER: &str = "divider";

    /// Lanes a turn lane may sit between.
    pub fn is_travel_lane(segment_type: &str) -> bool {
        segment_type == DRIVE_LANE || segment_type == BUS_LANE
    }

    /// Types that take their elevation from an existing sidewalk.
    pub fn follows_sidewalk_elevation(segment_type: &str) -> bool {
        segment_type.starts_with(SIDEWALK) || segment_type == TRANSIT_SHELTER
    }

    /// Types whose variants are never re-mixed.
    pub const VARIANT_MIX_EXEMPT: &[&str] = &[TURN_LANE];
}

pub mod variant_dimensions {
    pub const DIRECTION: &str = "direction";
    pub const BIKE_DIRECTION: &str = "bike-direction";
    pub const PARKING_LANE_ORIENTATION: &str = "parking-lane-orientation";
    pub const TURN_LANE_ORIENTATION: &str = "turn-lane-orientation";
    pub const ORIENTATION: &str = "orientation";
}

pub mod directions {
    pub const INBOUND: &str = "inbound";
    pub const OUTBOUND: &str = "outbound";

    pub const LEFT: &str = "left";
    pub const RIGHT: &str = "right";

    /// The travel direction encoded in a variant string, if any.
    pub fn of(variant_string: &str) -> Option<&'static str> {
        if variant_string.contains(INBOUND) {
            Some(INBOUND)
        } else if variant_string.contains(OUTBOUND) {
            Some(OUTBOUND)
        } else {
            None
        }
    }
}

pub mod limits {
    /// Append iterations a single `create` may spend, rebuilds included.
    pub const BUILDER_MAX_ITERATIONS: u32 = 100;
    /// Extra inserts per mix attempt while the street is still mostly empty.
    pub const INSERT_MAX_ITERATIONS: u32 = 20;
    /// Below this much remaining width, lamp and lane shrinking is forced.
    pub const FORCED_SHRINK_THRESHOLD: f64 = 4.0;
    /// A sidewalk never grows past this share of the street width.
    pub const SIDEWALK_MAX_SHARE: f64 = 0.3;
    /// Minimum spacing, in positions, between lamps after the first pair.
    pub const LAMP_SPACING: usize = 3;
    /// Floating tolerance for width comparisons.
    pub const WIDTH_EPSILON: f64 = 1e-6;
}
