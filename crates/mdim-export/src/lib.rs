//! Flat table export for chart collections.
//!
//! A [`Collection`](mdim_model::Collection) is written out as two tables
//! consumed by the legacy explorer tooling:
//!
//! ```text
//!   Collection ──► materialize ──► graphers (one row per view)
//!                                  columns  (one row per indicator display)
//!                                      │
//!                                      └──► ExportTable::to_tsv
//! ```

pub mod error;
pub mod materialize;
pub mod table;

pub use error::{ExportError, Result};
pub use materialize::{materialize, ExportOptions, Materialized, AXIS, CATALOG_PATH};
pub use table::{Cell, ExportTable, Row};
