//! Data model for multi-dimensional chart collections.
//!
//! A collection is a list of [`Dimension`]s (axes of variation such as sex or
//! age group, each with an ordered set of [`Choice`]s) and a list of
//! [`View`]s, each of which fixes one choice per dimension and names the
//! indicators to chart for that combination.
//!
//! ```text
//!   Table (column metadata) ──► expand ──┐
//!                                        ├──► Collection ──► validate ──► export
//!   CollectionConfig (YAML) ─────────────┘
//! ```
//!
//! This crate owns the types, their invariants ([`Collection::validate`]) and
//! the small in-place operations on them (pruning, choice sorting, indicator
//! path expansion). Merging and expansion live in `mdim-engine`.

pub mod authored;
pub mod collection;
pub mod config;
pub mod dimension;
pub mod error;
pub mod indicator;
pub mod table;
pub mod view;

pub use authored::{ChoiceConfig, CollectionConfig, CommonOverrideRule, DimensionConfig};
pub use collection::{Collection, CollectionKind};
pub use config::{merge_override, ConfigMap, ConfigValue};
pub use dimension::{Choice, Dimension, Presentation, UiType};
pub use error::{ModelError, Result};
pub use indicator::{CatalogPath, IndicatorRef, TableLookup};
pub use table::{ColumnDimensions, Filter, Table, TableColumn};
pub use view::{Axis, DimensionAssignment, View, ViewIndicators};
