//! The structural side of a catalog table: its columns and their dimension
//! metadata. Cell data never reaches this crate.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One `{name, value}` pair fixing a dimension for a data column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub value: String,
}

impl Filter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Which indicator a column belongs to, and at which dimension values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDimensions {
    /// Name of the indicator before it was split by dimension values.
    #[serde(alias = "originalShortName", alias = "indicator_name")]
    pub original_short_name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Columns without dimension metadata (index columns, plain indicators)
    /// take no part in expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ColumnDimensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub short_name: String,
    pub columns: Vec<TableColumn>,
}

impl Table {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            columns: Vec::new(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Add a column of indicator `indicator` at the given dimension values.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        indicator: impl Into<String>,
        filters: &[(&str, &str)],
    ) -> Self {
        self.columns.push(TableColumn {
            name: name.into(),
            title: None,
            dimensions: Some(ColumnDimensions {
                original_short_name: indicator.into(),
                filters: filters.iter().map(|(n, v)| Filter::new(*n, *v)).collect(),
            }),
        });
        self
    }

    /// Columns that carry dimension metadata.
    pub fn dimensional_columns(&self) -> impl Iterator<Item = (&TableColumn, &ColumnDimensions)> {
        self.columns
            .iter()
            .filter_map(|c| c.dimensions.as_ref().map(|d| (c, d)))
    }
}
