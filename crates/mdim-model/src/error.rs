//! Model-level errors.
//!
//! Every variant carries the offending slugs/paths so that an author can find
//! the broken entry in the YAML without re-running anything.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate dimension slugs: {slugs:?}")]
    DuplicateDimension { slugs: Vec<String> },

    #[error("dimension `{dimension}` has duplicate choice slugs: {slugs:?}")]
    DuplicateChoice { dimension: String, slugs: Vec<String> },

    #[error("checkbox dimension `{dimension}` is malformed: {reason}")]
    InvalidCheckbox { dimension: String, reason: String },

    #[error(
        "view #{view} has dimension keys {found:?}, expected exactly {expected:?}"
    )]
    ViewDimensionMismatch {
        view: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("view #{view} selects unknown choice `{choice}` for dimension `{dimension}`")]
    UnknownViewChoice {
        view: usize,
        dimension: String,
        choice: String,
    },

    #[error("duplicate views (same dimension assignment) at positions {positions:?}: {dimensions}")]
    DuplicateView {
        positions: Vec<usize>,
        dimensions: String,
    },

    #[error("unknown dimension `{0}`")]
    UnknownDimension(String),

    #[error("dimension `{dimension}`: unknown choices {unknown:?} (available: {available:?})")]
    UnknownChoices {
        dimension: String,
        unknown: Vec<String>,
        available: Vec<String>,
    },

    #[error("invalid catalog path `{0}`: expected `[dataset/]table#indicator`")]
    InvalidCatalogPath(String),

    #[error("catalog path `{path}`: no table named `{table}` among dependencies")]
    UnknownTable { path: String, table: String },

    #[error("catalog path `{path}`: table `{table}` is ambiguous, candidates: {candidates:?}")]
    AmbiguousTable {
        path: String,
        table: String,
        candidates: Vec<String>,
    },

    #[error("indicators not found in the catalog: {0:?}")]
    MissingIndicators(Vec<String>),

    #[error("dimension `{0}` has no name and no derived counterpart to take it from")]
    MissingDimensionName(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
