//! Segment catalog: per-type metadata (default width, width rules, owner,
//! variant dimensions).
//!
//! The engine only sees the [`SegmentCatalog`] trait. [`BuiltinCatalog`] is
//! the JSON-backed implementation shipped in `data/segment_catalog.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AutomixResult;
use crate::street::Variant;

const CATALOG_JSON: &str = include_str!("../../../data/segment_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentOwner {
    Car,
    Bike,
    Transit,
    Pedestrian,
    Flex,
    Nature,
}

impl SegmentOwner {
    /// Whether segments of this owner sit on the roadway surface.
    pub fn is_asphalt(self) -> bool {
        matches!(
            self,
            SegmentOwner::Car | SegmentOwner::Bike | SegmentOwner::Transit
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidthRule {
    #[serde(default)]
    pub min_width: Option<f64>,
    #[serde(default)]
    pub max_width: Option<f64>,
}

impl WidthRule {
    pub fn admits(&self, width: f64) -> bool {
        self.min_width.map_or(true, |min| width >= min)
            && self.max_width.map_or(true, |max| width <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInfo {
    pub name: String,
    pub owner: SegmentOwner,
    pub default_width: f64,
    #[serde(default)]
    pub default_elevation: i32,
    #[serde(default)]
    pub rules: Option<WidthRule>,
    /// Ordered variant dimension names.
    #[serde(default)]
    pub variants: Vec<String>,
    /// Known variant strings.
    #[serde(default)]
    pub details: Vec<String>,
}

impl SegmentInfo {
    pub fn min_width(&self) -> Option<f64> {
        self.rules.and_then(|r| r.min_width)
    }

    pub fn max_width(&self) -> Option<f64> {
        self.rules.and_then(|r| r.max_width)
    }

    pub fn min_or_default_width(&self) -> f64 {
        self.min_width().unwrap_or(self.default_width)
    }

    pub fn knows_variant(&self, variant_string: &str) -> bool {
        self.details.iter().any(|d| d == variant_string)
    }
}

/// Read-only segment metadata lookup.
pub trait SegmentCatalog {
    fn info(&self, segment_type: &str) -> Option<&SegmentInfo>;

    /// All type keys, in a stable order.
    fn types(&self) -> Vec<&str>;

    /// Decode `a|b|c` against the type's dimensions. `None` when the type is
    /// unknown or the field count does not match.
    fn variant_array(&self, segment_type: &str, variant_string: &str) -> Option<Variant> {
        let info = self.info(segment_type)?;
        if info.variants.is_empty() {
            return variant_string.is_empty().then(Variant::default);
        }
        let values: Vec<&str> = variant_string.split('|').collect();
        if values.len() != info.variants.len() {
            return None;
        }
        Some(Variant::new(
            info.variants
                .iter()
                .zip(values)
                .map(|(d, v)| (d.clone(), v.to_string()))
                .collect(),
        ))
    }

    fn variant_string(&self, variant: &Variant) -> String {
        variant.to_variant_string()
    }
}

/// Catalog loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct BuiltinCatalog {
    segments: BTreeMap<String, SegmentInfo>,
}

impl BuiltinCatalog {
    /// The catalog bundled with the crate.
    pub fn bundled() -> AutomixResult<Self> {
        Self::from_json_str(CATALOG_JSON)
    }

    pub fn from_json_str(json: &str) -> AutomixResult<Self> {
        let segments: BTreeMap<String, SegmentInfo> = serde_json::from_str(json)?;
        log::debug!("Loaded segment catalog with {} types", segments.len());
        Ok(Self { segments })
    }

    pub fn load(path: impl AsRef<Path>) -> AutomixResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl SegmentCatalog for BuiltinCatalog {
    fn info(&self, segment_type: &str) -> Option<&SegmentInfo> {
        self.segments.get(segment_type)
    }

    fn types(&self) -> Vec<&str> {
        self.segments.keys().map(String::as_str).collect()
    }
}
