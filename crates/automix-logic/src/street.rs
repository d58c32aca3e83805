//! Street and segment data types.
//!
//! A [`Street`] is an ordered left-to-right list of [`Segment`]s plus the
//! width bookkeeping kept current by a
//! [`WidthRecalculator`](crate::width::WidthRecalculator).

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adjacency::SegmentKey;
use crate::sampler::Sampler;

/// Stable identity of a segment, unique within a street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Decoded variant: `(dimension, value)` pairs in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant(Vec<(String, String)>);

impl Variant {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(d, _)| d == dimension)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite a dimension the variant already has. Returns false otherwise.
    pub fn set(&mut self, dimension: &str, value: &str) -> bool {
        match self.0.iter_mut().find(|(d, _)| d == dimension) {
            Some((_, v)) => {
                *v = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn has(&self, dimension: &str) -> bool {
        self.0.iter().any(|(d, _)| d == dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(d, _)| d.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pipe-joined values, e.g. `inbound|car`.
    pub fn to_variant_string(&self) -> String {
        self.0
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Per-segment width warnings. All false means the segment is healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentWarnings {
    pub outside: bool,
    pub too_narrow: bool,
    pub too_wide: bool,
}

impl SegmentWarnings {
    pub fn any(&self) -> bool {
        self.outside || self.too_narrow || self.too_wide
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    #[serde(rename = "type")]
    pub segment_type: String,
    pub variant_string: String,
    #[serde(default)]
    pub variant: Variant,
    pub width: f64,
    #[serde(default)]
    pub elevation: i32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub warnings: SegmentWarnings,
}

impl Segment {
    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(&self.segment_type, &self.variant_string)
    }

    pub fn is(&self, segment_type: &str) -> bool {
        self.segment_type == segment_type
    }

    pub fn is_inbound(&self) -> bool {
        self.variant_string.contains(crate::constants::directions::INBOUND)
    }

    pub fn is_outbound(&self) -> bool {
        self.variant_string.contains(crate::constants::directions::OUTBOUND)
    }
}

/// Lighting/time-of-day scene for the street.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Day,
    Night,
    Dawn,
    Dusk,
    Twilight,
    Fog,
}

impl Environment {
    pub const ALL: [Environment; 6] = [
        Environment::Day,
        Environment::Night,
        Environment::Dawn,
        Environment::Dusk,
        Environment::Twilight,
        Environment::Fog,
    ];

    pub fn random(sampler: &mut Sampler) -> Self {
        Self::ALL[sampler.index(Self::ALL.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Environment::Day => "day",
            Environment::Night => "night",
            Environment::Dawn => "dawn",
            Environment::Dusk => "dusk",
            Environment::Twilight => "twilight",
            Environment::Fog => "fog",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    pub width: f64,
    #[serde(default)]
    pub occupied_width: f64,
    #[serde(default)]
    pub remaining_width: f64,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Street {
    /// An empty street of the given target width.
    pub fn new(width: f64) -> Self {
        Self {
            width,
            occupied_width: 0.0,
            remaining_width: width,
            environment: Environment::default(),
            segments: Vec::new(),
        }
    }

    /// Hash over `(type, variant, width)` of every segment, in order.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for s in &self.segments {
            s.segment_type.hash(&mut hasher);
            s.variant_string.hash(&mut hasher);
            s.width.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Like [`fingerprint`](Self::fingerprint) but ignoring widths.
    pub fn variant_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for s in &self.segments {
            s.segment_type.hash(&mut hasher);
            s.variant_string.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Human-readable `type!variant!width` listing, joined by `,`.
    pub fn describe(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("{}!{}!{}", s.segment_type, s.variant_string, s.width))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn has_warnings(&self) -> bool {
        self.segments.iter().any(|s| s.warnings.any())
    }

    pub fn count_of(&self, segment_type: &str) -> usize {
        self.segments.iter().filter(|s| s.is(segment_type)).count()
    }

    pub fn positions_of(&self, segment_type: &str) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is(segment_type))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn position_of_id(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }

    pub fn segments_width(&self) -> f64 {
        self.segments.iter().map(|s| s.width).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sampler: &mut Sampler, t: &str, v: &str, width: f64) -> Segment {
        Segment {
            id: sampler.segment_id(),
            segment_type: t.into(),
            variant_string: v.into(),
            variant: Variant::default(),
            width,
            elevation: 0,
            label: String::new(),
            warnings: SegmentWarnings::default(),
        }
    }

    #[test]
    fn test_fingerprint_tracks_widths() {
        let mut s = Sampler::seeded(1);
        let mut street = Street::new(20.0);
        street.segments.push(segment(&mut s, "sidewalk", "normal", 6.0));
        street.segments.push(segment(&mut s, "drive-lane", "inbound|car", 10.0));

        let before = street.fingerprint();
        let variants_before = street.variant_fingerprint();
        street.segments[1].width = 11.0;
        assert_ne!(street.fingerprint(), before);
        assert_eq!(street.variant_fingerprint(), variants_before);
        assert_eq!(street.describe(), "sidewalk!normal!6,drive-lane!inbound|car!11");
    }

    #[test]
    fn test_fingerprint_ignores_ids() {
        let mut s = Sampler::seeded(2);
        let mut a = Street::new(10.0);
        let mut b = Street::new(10.0);
        a.segments.push(segment(&mut s, "sidewalk", "normal", 6.0));
        b.segments.push(segment(&mut s, "sidewalk", "normal", 6.0));
        assert_ne!(a.segments[0].id, b.segments[0].id);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_variant_get_set() {
        let mut v = Variant::new(vec![
            ("direction".into(), "inbound".into()),
            ("car-type".into(), "car".into()),
        ]);
        assert_eq!(v.get("direction"), Some("inbound"));
        assert!(v.set("direction", "outbound"));
        assert!(!v.set("orientation", "left"));
        assert_eq!(v.to_variant_string(), "outbound|car");
    }

    #[test]
    fn test_street_json_shape() {
        let json = r#"{
            "width": 40,
            "environment": "fog",
            "segments": [{
                "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "type": "sidewalk",
                "variantString": "normal",
                "width": 6,
                "warnings": {"outside": false, "tooNarrow": true, "tooWide": false}
            }]
        }"#;
        let street: Street = serde_json::from_str(json).unwrap();
        assert_eq!(street.environment, Environment::Fog);
        assert_eq!(street.segments[0].segment_type, "sidewalk");
        assert!(street.has_warnings());
        assert_eq!(street.count_of("sidewalk"), 1);
    }
}
