//! Pure street-layout logic for AutoMix.
//!
//! This crate generates and mutates street cross-sections: ordered sequences
//! of typed segments (lanes, sidewalks, lamps, ...) that must fill a target
//! width, respect per-type width rules, and read like the streets in the
//! corpus the adjacency statistics were learned from. Functions take plain
//! data and return results; there is no rendering, persistence or network
//! code here.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`adjacency`] | Learned start/end/variant/transition tables and legacy-variant upgrades |
//! | [`builder`] | Builds a brand-new street that fills the target width |
//! | [`catalog`] | Segment catalog trait and the bundled JSON catalog |
//! | [`constants`] | Segment type keys, directions, iteration limits |
//! | [`context`] | Collaborators shared by every operator during one call |
//! | [`engine`] | `AutoMix` entry points: `create`, `mix`, `mix_variants` |
//! | [`error`] | Fatal errors and soft operator failures |
//! | [`operators`] | Replace, Insert, Remove*, Shrink*, Expand*, Cleanup |
//! | [`pipeline`] | One mix attempt plus bounded retry-on-stagnation |
//! | [`placement`] | Neighbour-driven variant fix-ups for inserted segments |
//! | [`rules`] | `RulesConfig` policy object and its JSON loaders |
//! | [`sampler`] | Injectable random source and weighted selection |
//! | [`street`] | `Street`, `Segment`, `Variant`, `Environment` |
//! | [`validate`] | Per-segment and whole-street rule checks |
//! | [`variants`] | Variant-only mixing |
//! | [`width`] | Width recalculation and per-segment warnings |
//!
//! ```
//! use automix_logic::catalog::BuiltinCatalog;
//! use automix_logic::engine::AutoMix;
//! use automix_logic::rules::RulesConfig;
//! use automix_logic::sampler::Sampler;
//! use automix_logic::street::Street;
//!
//! let catalog = BuiltinCatalog::bundled().unwrap();
//! let rules = RulesConfig::bundled().unwrap();
//! let mut automix = AutoMix::new(&catalog, &rules, Sampler::seeded(7)).unwrap();
//!
//! let mut street = Street::new(60.0);
//! if automix.create(&mut street).is_ok() {
//!     assert!(street.remaining_width.abs() < 1e-6);
//! }
//! ```

pub mod adjacency;
pub mod builder;
pub mod catalog;
pub mod constants;
pub mod context;
pub mod engine;
pub mod error;
pub mod operators;
pub mod pipeline;
pub mod placement;
pub mod rules;
pub mod sampler;
pub mod street;
pub mod validate;
pub mod variants;
pub mod width;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::catalog::{BuiltinCatalog, SegmentCatalog};
    pub use crate::engine::AutoMix;
    pub use crate::error::{AutomixError, AutomixResult};
    pub use crate::rules::RulesConfig;
    pub use crate::sampler::Sampler;
    pub use crate::street::{Environment, Segment, Street};
}
