//! Learned adjacency statistics and the sampling model built on them.
//!
//! The statistics come from a corpus of real streets and are stored on disk
//! with string keys (`"type:variant->type:variant": count`). They are parsed
//! once, at load, into [`SegmentKey`]s and [`Transition`]s; nothing
//! downstream splits strings.
//!
//! The corpus mixes several historical variant schemas, so every variant
//! pulled out of a table goes through [`upgrade_legacy_variant`] before use.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::SegmentCatalog;
use crate::constants::segment_types::{BIKE_LANE, BUS_LANE, FOOD_TRUCK};
use crate::error::{AutomixError, AutomixResult};
use crate::rules::TypeSet;
use crate::sampler::Sampler;

/// `(type, variant)` pair identifying a kind of segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub segment_type: String,
    pub variant: String,
}

impl SegmentKey {
    pub fn new(segment_type: &str, variant: &str) -> Self {
        Self {
            segment_type: segment_type.to_string(),
            variant: variant.to_string(),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment_type, self.variant)
    }
}

impl FromStr for SegmentKey {
    type Err = AutomixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((t, v)) if !t.is_empty() => Ok(SegmentKey::new(t, v)),
            _ => Err(AutomixError::MalformedStatsKey(s.to_string())),
        }
    }
}

/// One observed left-to-right neighbour pair with its frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: SegmentKey,
    pub to: SegmentKey,
    pub count: f64,
}

/// Typed statistics tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStats", into = "RawStats")]
pub struct AdjacencyStats {
    transitions: Vec<Transition>,
    variants: BTreeMap<String, Vec<(String, f64)>>,
    starts: Vec<(SegmentKey, f64)>,
    ends: Vec<(SegmentKey, f64)>,
}

impl AdjacencyStats {
    pub fn from_json_str(json: &str) -> AutomixResult<Self> {
        let stats: AdjacencyStats = serde_json::from_str(json)?;
        log::debug!(
            "Loaded adjacency stats: {} transitions, {} start keys, {} end keys",
            stats.transitions.len(),
            stats.starts.len(),
            stats.ends.len()
        );
        Ok(stats)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn starts(&self) -> &[(SegmentKey, f64)] {
        &self.starts
    }

    pub fn ends(&self) -> &[(SegmentKey, f64)] {
        &self.ends
    }

    pub fn variant_counts(&self, segment_type: &str) -> &[(String, f64)] {
        self.variants
            .get(segment_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.starts.is_empty() && self.ends.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCount {
    Plain(f64),
    Counted { count: f64 },
}

impl RawCount {
    fn value(self) -> f64 {
        match self {
            RawCount::Plain(n) | RawCount::Counted { count: n } => n,
        }
    }
}

/// On-disk shape of the statistics file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawStats {
    adjacency_stats: BTreeMap<String, f64>,
    variant_stats: BTreeMap<String, BTreeMap<String, f64>>,
    start_stats: BTreeMap<String, RawCount>,
    end_stats: BTreeMap<String, RawCount>,
}

impl TryFrom<RawStats> for AdjacencyStats {
    type Error = AutomixError;

    fn try_from(raw: RawStats) -> Result<Self, Self::Error> {
        let transitions = raw
            .adjacency_stats
            .into_iter()
            .map(|(key, count)| {
                let (from, to) = key
                    .split_once("->")
                    .ok_or_else(|| AutomixError::MalformedStatsKey(key.clone()))?;
                Ok(Transition {
                    from: from.parse()?,
                    to: to.parse()?,
                    count,
                })
            })
            .collect::<AutomixResult<Vec<_>>>()?;

        let keyed = |table: BTreeMap<String, RawCount>| {
            table
                .into_iter()
                .map(|(key, count)| Ok((key.parse::<SegmentKey>()?, count.value())))
                .collect::<AutomixResult<Vec<_>>>()
        };

        Ok(AdjacencyStats {
            transitions,
            variants: raw
                .variant_stats
                .into_iter()
                .map(|(t, counts)| (t, counts.into_iter().collect()))
                .collect(),
            starts: keyed(raw.start_stats)?,
            ends: keyed(raw.end_stats)?,
        })
    }
}

impl From<AdjacencyStats> for RawStats {
    fn from(stats: AdjacencyStats) -> Self {
        RawStats {
            adjacency_stats: stats
                .transitions
                .into_iter()
                .map(|t| (format!("{}->{}", t.from, t.to), t.count))
                .collect(),
            variant_stats: stats
                .variants
                .into_iter()
                .map(|(t, counts)| (t, counts.into_iter().collect()))
                .collect(),
            start_stats: stats
                .starts
                .into_iter()
                .map(|(k, n)| (k.to_string(), RawCount::Counted { count: n }))
                .collect(),
            end_stats: stats
                .ends
                .into_iter()
                .map(|(k, n)| (k.to_string(), RawCount::Plain(n)))
                .collect(),
        }
    }
}

/// Normalize a variant from an older schema to the current one.
///
/// * bike-lane: `colored` becomes `green`; a two-field variant gains `road`.
/// * bus-lane: a two-field variant gains `typical`.
/// * food-truck: anything other than `left`/`right` becomes `right`.
pub fn upgrade_legacy_variant(segment_type: &str, variant: &str) -> String {
    let fields = variant.split('|').count();
    match segment_type {
        BIKE_LANE => {
            let upgraded = variant.replace("colored", "green");
            if fields == 2 {
                format!("{upgraded}|road")
            } else {
                upgraded
            }
        }
        BUS_LANE if fields == 2 => format!("{variant}|typical"),
        FOOD_TRUCK if variant != "left" && variant != "right" => "right".to_string(),
        _ => variant.to_string(),
    }
}

/// Extra constraints on a variant draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantFilter<'f> {
    /// Prefer variants containing this word, when the type has any.
    pub includes: Option<&'f str>,
    /// Allow-list from `rules.variants[type]`.
    pub allowed: Option<&'f [String]>,
}

impl<'f> VariantFilter<'f> {
    pub fn allowed(allowed: Option<&'f [String]>) -> Self {
        Self {
            includes: None,
            allowed,
        }
    }

    /// Narrow `candidates` in place. The `includes` word only narrows when
    /// at least one candidate carries it.
    fn narrow(&self, candidates: &mut Vec<(String, f64)>) {
        if let Some(allowed) = self.allowed.filter(|a| !a.is_empty()) {
            candidates.retain(|(v, _)| allowed.contains(v));
        }
        if let Some(word) = self.includes {
            if candidates.iter().any(|(v, _)| v.contains(word)) {
                candidates.retain(|(v, _)| v.contains(word));
            }
        }
    }
}

/// Sampling queries over [`AdjacencyStats`].
#[derive(Clone, Copy)]
pub struct AdjacencyModel<'a> {
    stats: &'a AdjacencyStats,
    catalog: &'a dyn SegmentCatalog,
}

impl<'a> AdjacencyModel<'a> {
    pub fn new(stats: &'a AdjacencyStats, catalog: &'a dyn SegmentCatalog) -> Self {
        Self { stats, catalog }
    }

    pub fn transitions(&self) -> &'a [Transition] {
        self.stats.transitions()
    }

    fn any_type(&self, sampler: &mut Sampler) -> Option<String> {
        let types = self.catalog.types();
        sampler.choose(&types).map(|t| t.to_string())
    }

    pub fn start_key(&self, sampler: &mut Sampler) -> Option<SegmentKey> {
        sampler.select(self.stats.starts().iter().cloned())
    }

    /// Weighted by the start table; uniform over the catalog when it is empty.
    pub fn start_type(&self, sampler: &mut Sampler) -> Option<String> {
        match self.start_key(sampler) {
            Some(key) => Some(key.segment_type),
            None => self.any_type(sampler),
        }
    }

    pub fn start_variant(
        &self,
        segment_type: &str,
        filter: &VariantFilter<'_>,
        sampler: &mut Sampler,
    ) -> Option<String> {
        let mut candidates = upgraded(segment_type, self.stats.starts());
        filter.narrow(&mut candidates);
        sampler
            .select(candidates)
            .or_else(|| self.marginal_variant(segment_type, filter, sampler))
    }

    /// Type following `prev`. Falls back to edges leaving any segment of the
    /// same type, then to a uniform catalog draw.
    pub fn next_type(&self, prev: &SegmentKey, sampler: &mut Sampler) -> Option<String> {
        let exact: Vec<(&str, f64)> = self
            .transitions()
            .iter()
            .filter(|t| t.from == *prev)
            .map(|t| (t.to.segment_type.as_str(), t.count))
            .collect();
        if let Some(t) = sampler.select(exact) {
            return Some(t.to_string());
        }

        let loose: Vec<(&str, f64)> = self
            .transitions()
            .iter()
            .filter(|t| t.from.segment_type == prev.segment_type)
            .map(|t| (t.to.segment_type.as_str(), t.count))
            .collect();
        match sampler.select(loose) {
            Some(t) => Some(t.to_string()),
            None => self.any_type(sampler),
        }
    }

    /// Variant for a `segment_type` placed after `prev`. With no predecessor
    /// a start key is drawn as context.
    pub fn next_variant(
        &self,
        segment_type: &str,
        prev: Option<&SegmentKey>,
        filter: &VariantFilter<'_>,
        sampler: &mut Sampler,
    ) -> Option<String> {
        let context = match prev {
            Some(key) => Some(key.clone()),
            None => self.start_key(sampler),
        };

        if let Some(context) = context {
            let mut candidates: Vec<(String, f64)> = self
                .transitions()
                .iter()
                .filter(|t| t.from == context && t.to.segment_type == segment_type)
                .map(|t| {
                    (
                        upgrade_legacy_variant(segment_type, &t.to.variant),
                        t.count,
                    )
                })
                .collect();
            filter.narrow(&mut candidates);
            if let Some(v) = sampler.select(candidates) {
                return Some(v);
            }
        }
        self.marginal_variant(segment_type, filter, sampler)
    }

    /// Draw from the per-type variant distribution, falling back to the
    /// catalog's known variants.
    pub fn marginal_variant(
        &self,
        segment_type: &str,
        filter: &VariantFilter<'_>,
        sampler: &mut Sampler,
    ) -> Option<String> {
        let mut candidates: Vec<(String, f64)> = self
            .stats
            .variant_counts(segment_type)
            .iter()
            .map(|(v, n)| (upgrade_legacy_variant(segment_type, v), *n))
            .collect();
        filter.narrow(&mut candidates);
        if let Some(v) = sampler.select(candidates) {
            return Some(v);
        }

        let mut known: Vec<(String, f64)> = self
            .catalog
            .info(segment_type)?
            .details
            .iter()
            .map(|d| (d.clone(), 1.0))
            .collect();
        filter.narrow(&mut known);
        sampler.select(known)
    }

    /// End-table draw restricted to `allowed` when it is declared.
    pub fn end_type(&self, allowed: &TypeSet, sampler: &mut Sampler) -> Option<String> {
        let candidates = self
            .stats
            .ends()
            .iter()
            .filter(|(k, _)| !allowed.is_declared() || allowed.contains(&k.segment_type))
            .map(|(k, n)| (k.segment_type.clone(), *n));
        if let Some(t) = sampler.select(candidates) {
            return Some(t);
        }
        if allowed.is_declared() {
            sampler.choose(allowed.types()).cloned()
        } else {
            self.any_type(sampler)
        }
    }

    pub fn end_variant(&self, segment_type: &str, sampler: &mut Sampler) -> Option<String> {
        sampler
            .select(upgraded(segment_type, self.stats.ends()))
            .or_else(|| self.marginal_variant(segment_type, &VariantFilter::default(), sampler))
    }

    /// A type other than `segment_type` commonly seen immediately left of it.
    pub fn typical_predecessor(&self, segment_type: &str, sampler: &mut Sampler) -> Option<String> {
        let candidates: Vec<(&str, f64)> = self
            .transitions()
            .iter()
            .filter(|t| t.to.segment_type == segment_type && t.from.segment_type != segment_type)
            .map(|t| (t.from.segment_type.as_str(), t.count))
            .collect();
        sampler.select(candidates).map(str::to_string)
    }
}

fn upgraded(segment_type: &str, table: &[(SegmentKey, f64)]) -> Vec<(String, f64)> {
    table
        .iter()
        .filter(|(k, _)| k.segment_type == segment_type)
        .map(|(k, n)| (upgrade_legacy_variant(segment_type, &k.variant), *n))
        .collect()
}
