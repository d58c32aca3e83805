//! `AutoMix`: the public entry points.
//!
//! Each call works on a copy of the caller's street and writes it back only
//! when the operation succeeds, so a failed call leaves the street untouched.

use crate::builder;
use crate::catalog::SegmentCatalog;
use crate::context::MixContext;
use crate::error::AutomixResult;
use crate::pipeline;
use crate::rules::RulesConfig;
use crate::sampler::Sampler;
use crate::street::Street;
use crate::variants;
use crate::width::{WidthRecalculator, STANDARD};

pub struct AutoMix<'a> {
    catalog: &'a dyn SegmentCatalog,
    recalculator: &'a dyn WidthRecalculator,
    rules: &'a RulesConfig,
    sampler: Sampler,
}

impl<'a> AutoMix<'a> {
    /// Validates `rules` up front; a bad policy is an error here rather than
    /// a silent misbehaviour later.
    pub fn new(catalog: &'a dyn SegmentCatalog, rules: &'a RulesConfig, sampler: Sampler) -> AutomixResult<Self> {
        rules.validate()?;
        Ok(Self {
            catalog,
            recalculator: &STANDARD,
            rules,
            sampler,
        })
    }

    pub fn with_recalculator(mut self, recalculator: &'a dyn WidthRecalculator) -> Self {
        self.recalculator = recalculator;
        self
    }

    fn context(&self) -> MixContext<'a> {
        MixContext::new(self.catalog, self.recalculator, self.rules)
    }

    /// Generate a new layout filling `street.width`.
    pub fn create(&mut self, street: &mut Street) -> AutomixResult<u32> {
        let ctx = self.context();
        let mut working = street.clone();
        let iterations = builder::create(&ctx, &mut working, &mut self.sampler)?;
        *street = working;
        Ok(iterations)
    }

    /// Mutate the existing layout into a different, warning-free one.
    pub fn mix(&mut self, street: &mut Street) -> AutomixResult<u32> {
        let ctx = self.context();
        let mut working = street.clone();
        ctx.recalculate(&mut working);
        let attempts = pipeline::mix(&ctx, &mut working, &mut self.sampler)?;
        *street = working;
        Ok(attempts)
    }

    /// Re-roll variants and environment, keeping types and widths.
    pub fn mix_variants(&mut self, street: &mut Street) -> AutomixResult<u32> {
        let ctx = self.context();
        let mut working = street.clone();
        ctx.recalculate(&mut working);
        let attempts = variants::mix_variants(&ctx, &mut working, &mut self.sampler)?;
        *street = working;
        Ok(attempts)
    }
}
