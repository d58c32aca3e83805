//! Collaborators shared by every operator during one engine call.

use crate::adjacency::AdjacencyModel;
use crate::catalog::{SegmentCatalog, SegmentInfo};
use crate::rules::RulesConfig;
use crate::sampler::Sampler;
use crate::street::{Segment, SegmentWarnings, Street};
use crate::width::WidthRecalculator;

#[derive(Clone, Copy)]
pub struct MixContext<'a> {
    pub catalog: &'a dyn SegmentCatalog,
    pub recalculator: &'a dyn WidthRecalculator,
    pub rules: &'a RulesConfig,
    pub model: AdjacencyModel<'a>,
}

impl<'a> MixContext<'a> {
    pub fn new(
        catalog: &'a dyn SegmentCatalog,
        recalculator: &'a dyn WidthRecalculator,
        rules: &'a RulesConfig,
    ) -> Self {
        Self {
            catalog,
            recalculator,
            rules,
            model: AdjacencyModel::new(&rules.stats, catalog),
        }
    }

    /// Refresh occupied/remaining width and warnings.
    pub fn recalculate(&self, street: &mut Street) {
        self.recalculator
            .recalculate(street, self.catalog)
            .apply(street);
    }

    pub fn info(&self, segment_type: &str) -> Option<&'a SegmentInfo> {
        self.catalog.info(segment_type)
    }

    pub fn min_width(&self, segment_type: &str) -> Option<f64> {
        self.info(segment_type).and_then(SegmentInfo::min_width)
    }

    pub fn max_width(&self, segment_type: &str) -> Option<f64> {
        self.info(segment_type).and_then(SegmentInfo::max_width)
    }

    pub fn min_or_default_width(&self, segment_type: &str) -> Option<f64> {
        self.info(segment_type).map(SegmentInfo::min_or_default_width)
    }

    /// Catalog max-width rule tightened by `rules.maxWidths`.
    pub fn width_cap(&self, segment_type: &str) -> Option<f64> {
        self.rules
            .width_cap(segment_type, self.max_width(segment_type))
    }

    /// A new segment with a fresh id. `None` if the type is unknown or the
    /// variant does not decode.
    pub fn segment(
        &self,
        sampler: &mut Sampler,
        segment_type: &str,
        variant_string: &str,
        width: f64,
        elevation: i32,
    ) -> Option<Segment> {
        let info = self.info(segment_type)?;
        let variant = self.catalog.variant_array(segment_type, variant_string)?;
        Some(Segment {
            id: sampler.segment_id(),
            segment_type: segment_type.to_string(),
            variant_string: variant_string.to_string(),
            variant,
            width,
            elevation,
            label: info.name.clone(),
            warnings: SegmentWarnings::default(),
        })
    }

    /// Swap a segment's variant in place, keeping both encodings in step.
    pub fn set_variant(&self, segment: &mut Segment, variant_string: &str) -> bool {
        match self
            .catalog
            .variant_array(&segment.segment_type, variant_string)
        {
            Some(variant) => {
                segment.variant = variant;
                segment.variant_string = variant_string.to_string();
                true
            }
            None => false,
        }
    }
}
