use mdim_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------
    #[error("table `{0}` has no columns with dimension metadata")]
    NoIndicators(String),

    #[error("dimension name `{0}` is reserved and cannot be used by a table column")]
    ReservedDimensionName(String),

    #[error("multiple indicators in the table, but none specified (available: {available:?})")]
    MultipleIndicators { available: Vec<String> },

    #[error("unknown indicators {unknown:?} (available: {available:?})")]
    UnknownIndicators {
        unknown: Vec<String>,
        available: Vec<String>,
    },

    #[error("column `{column}` has no value for dimension `{dimension}`")]
    MissingFilter { column: String, dimension: String },

    #[error("dimensions {unknown:?} are not in the table (available: {available:?})")]
    UnknownDimensions {
        unknown: Vec<String>,
        available: Vec<String>,
    },

    #[error("dimensions {missing:?} are in the table but missing from the selection")]
    MissingDimensions { missing: Vec<String> },

    #[error("dimension `{dimension}`: choices {unknown:?} do not occur in the table (available: {available:?})")]
    UnknownChoices {
        dimension: String,
        unknown: Vec<String>,
        available: Vec<String>,
    },

    // ------------------------------------------------------------------
    // Common view rules
    // ------------------------------------------------------------------
    #[error("common view rules #{first} and #{second} share the dimension pattern {{{pattern}}}")]
    DuplicateRulePattern {
        first: usize,
        second: usize,
        pattern: String,
    },

    #[error(
        "common view rules #{first} {{{first_pattern}}} and #{second} {{{second_pattern}}} \
         are equally specific and disagree on `{path}`: {first_value} vs {second_value}"
    )]
    AmbiguousMerge {
        path: String,
        first: usize,
        first_pattern: String,
        first_value: String,
        second: usize,
        second_pattern: String,
        second_value: String,
    },

    // ------------------------------------------------------------------
    // Collection combination
    // ------------------------------------------------------------------
    #[error("need at least two collections to combine, got {0}")]
    TooFewCollections(usize),

    #[error("collection name `{0}` appears more than once")]
    DuplicateCollectionId(String),

    #[error("collection `{collection}` does not match `{reference}`: {detail}")]
    DimensionShapeMismatch {
        collection: String,
        reference: String,
        detail: String,
    },

    #[error("collection `{collection}`: combining checkbox dimension `{dimension}` is not implemented")]
    CheckboxUnsupported {
        collection: String,
        dimension: String,
    },

    #[error("dimension `{dimension}`: combined choice slug `{slug}` is used by two different choices")]
    ChoiceSlugCollision { dimension: String, slug: String },

    #[error("collections `{first}` and `{second}` both have a view for {dimensions}")]
    DuplicateCombinedView {
        dimensions: String,
        first: String,
        second: String,
    },
}
