use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("view {view} does not set dimension '{dimension}'")]
    MissingDimension { view: usize, dimension: String },

    #[error("view {view}: unknown choice '{choice}' for dimension '{dimension}' (known: {known:?})")]
    UnknownChoice {
        view: usize,
        dimension: String,
        choice: String,
        known: Vec<String>,
    },

    #[error("dimensions {dimensions:?} would share the widget column `{widget}`")]
    DuplicateWidget {
        widget: String,
        dimensions: Vec<String>,
    },

    #[error("indicators with conflicting display settings across views: {paths:?}")]
    AmbiguousDisplay { paths: Vec<String> },

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
