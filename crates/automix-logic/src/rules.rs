//! AutoMix policy: loop bounds, operator chances, per-type caps and the
//! adjacency statistics.
//!
//! Rules are plain serde data in camelCase JSON. Every field has a default,
//! so a partial document (`{"maxDriveLanes": 2}`) is a valid rule set.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyStats;
use crate::error::{AutomixError, AutomixResult};

const RULES_JSON: &str = include_str!("../../../data/automix_rules.json");
const STATS_JSON: &str = include_str!("../../../data/automix_stats.json");

/// Operator probabilities, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chances {
    pub replace_segment: f64,
    pub insert_segment: f64,
    pub shrink_drive_lanes: f64,
    pub shrink_lamps: f64,
}

impl Default for Chances {
    fn default() -> Self {
        Self {
            replace_segment: 0.9,
            insert_segment: 0.5,
            shrink_drive_lanes: 1.0,
            shrink_lamps: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaceRules {
    /// Types a parking lane may be swapped for.
    pub parking_lane: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTypeSet {
    One(String),
    Many(Vec<String>),
}

/// A set of segment types, written in JSON as one string or a list.
/// An empty set means "not declared".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTypeSet", into = "RawTypeSet")]
pub struct TypeSet(Vec<String>);

impl From<RawTypeSet> for TypeSet {
    fn from(raw: RawTypeSet) -> Self {
        match raw {
            RawTypeSet::One(t) => TypeSet(vec![t]),
            RawTypeSet::Many(ts) => TypeSet(ts),
        }
    }
}

impl From<TypeSet> for RawTypeSet {
    fn from(set: TypeSet) -> Self {
        RawTypeSet::Many(set.0)
    }
}

impl From<Vec<String>> for TypeSet {
    fn from(types: Vec<String>) -> Self {
        TypeSet(types)
    }
}

impl TypeSet {
    pub fn is_declared(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn contains(&self, segment_type: &str) -> bool {
        self.0.iter().any(|t| t == segment_type)
    }

    pub fn types(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesConfig {
    pub max_loops: u32,
    pub min_segments_replaced: u32,
    pub max_segments_replaced: u32,
    pub chances: Chances,
    /// Policy width caps, tighter than the catalog's.
    pub max_widths: BTreeMap<String, f64>,
    pub max_instances: BTreeMap<String, usize>,
    pub replace: ReplaceRules,
    /// Per-type variant allow-lists.
    pub variants: BTreeMap<String, Vec<String>>,
    pub start: TypeSet,
    pub end: TypeSet,
    pub max_drive_lanes: Option<usize>,
    pub can_have_bus_stop: bool,
    /// Types allowed to follow each type when the street wraps around.
    pub adjacent_rules: BTreeMap<String, Vec<String>>,
    pub stats: AdjacencyStats,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_loops: 150,
            min_segments_replaced: 2,
            max_segments_replaced: 5,
            chances: Chances::default(),
            max_widths: BTreeMap::new(),
            max_instances: BTreeMap::new(),
            replace: ReplaceRules::default(),
            variants: BTreeMap::new(),
            start: TypeSet::default(),
            end: TypeSet::default(),
            max_drive_lanes: None,
            can_have_bus_stop: true,
            adjacent_rules: BTreeMap::new(),
            stats: AdjacencyStats::default(),
        }
    }
}

impl RulesConfig {
    /// Rules and statistics shipped in `data/`.
    pub fn bundled() -> AutomixResult<Self> {
        let rules = Self::from_json_str(RULES_JSON)?;
        Ok(rules.with_stats(AdjacencyStats::from_json_str(STATS_JSON)?))
    }

    pub fn from_json_str(json: &str) -> AutomixResult<Self> {
        let rules: RulesConfig = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: impl AsRef<Path>) -> AutomixResult<Self> {
        let path = path.as_ref();
        log::debug!("Loading AutoMix rules from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_stats(mut self, stats: AdjacencyStats) -> Self {
        self.stats = stats;
        self
    }

    /// Combined width cap: catalog rule and `maxWidths`, whichever is tighter.
    pub fn width_cap(&self, segment_type: &str, catalog_max: Option<f64>) -> Option<f64> {
        match (catalog_max, self.max_widths.get(segment_type).copied()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn allowed_variants(&self, segment_type: &str) -> Option<&[String]> {
        self.variants
            .get(segment_type)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    pub fn validate(&self) -> AutomixResult<()> {
        let chances = [
            ("replaceSegment", self.chances.replace_segment),
            ("insertSegment", self.chances.insert_segment),
            ("shrinkDriveLanes", self.chances.shrink_drive_lanes),
            ("shrinkLamps", self.chances.shrink_lamps),
        ];
        for (name, p) in chances {
            if !(0.0..=1.0).contains(&p) {
                return Err(AutomixError::InvalidRules(format!(
                    "chances.{name} must be within [0, 1], got {p}"
                )));
            }
        }

        if self.min_segments_replaced > self.max_segments_replaced {
            return Err(AutomixError::InvalidRules(format!(
                "minSegmentsReplaced ({}) exceeds maxSegmentsReplaced ({})",
                self.min_segments_replaced, self.max_segments_replaced
            )));
        }

        if let Some((t, w)) = self
            .max_widths
            .iter()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(AutomixError::InvalidRules(format!(
                "maxWidths.{t} must be a positive width, got {w}"
            )));
        }

        Ok(())
    }
}
