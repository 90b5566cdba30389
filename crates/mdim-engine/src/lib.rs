//! Expansion, merge and conflict resolution for chart collections.
//!
//! ```text
//!   Table ──► expand ──► ExpandedConfig ─┐
//!                                        ├─► combine_dimensions ─► assemble ─► Collection
//!   CollectionConfig (YAML) ─────────────┘         ▲
//!                                                  │
//!                        common_views ─► CommonViewConfig::merge (per view)
//!
//!   Collection, Collection, ... ──► combine_collections ──► Collection + CombineReport
//! ```
//!
//! Everything here is a pure function of its inputs: no I/O, no global state.
//! Errors are raised at the point of detection and name the offending slugs.

pub mod assemble;
pub mod combine;
pub mod common;
pub mod dimensions;
pub mod error;
pub mod expand;

pub use assemble::assemble;
pub use combine::{
    combine_collections, ChoiceConflict, ChoiceVariant, CombineOptions, CombineReport,
    CombinedCollection,
};
pub use common::{merge_common_metadata, CommonViewConfig};
pub use dimensions::combine_dimensions;
pub use error::{EngineError, Result};
pub use expand::{
    expand, ChoiceSelection, DimensionSelection, ExpandOptions, ExpandedConfig,
    RESERVED_DIMENSION_NAMES,
};
