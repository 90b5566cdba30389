//! Indicator references and catalog path expansion.
//!
//! A catalog path has the shape `[dataset/]table#indicator`. Authors usually
//! write the short form `table#indicator`; before export every path is
//! expanded to the fully qualified table URI found among the step's
//! dependencies.

use crate::config::ConfigMap;
use crate::error::{ModelError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn catalog_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<dataset>[^#]+)/)?(?P<table>[^/#]+)#(?P<indicator>[^/#]+)$")
            .expect("catalog path pattern is a valid regex")
    })
}

/// The pieces of a catalog path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPath<'a> {
    pub dataset: Option<&'a str>,
    pub table: &'a str,
    pub indicator: &'a str,
}

impl<'a> CatalogPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self> {
        let caps = catalog_path_re()
            .captures(path)
            .ok_or_else(|| ModelError::InvalidCatalogPath(path.to_string()))?;
        let group = |name: &str| caps.name(name).map(|m| &path[m.start()..m.end()]);
        match (group("table"), group("indicator")) {
            (Some(table), Some(indicator)) => Ok(Self {
                dataset: group("dataset"),
                table,
                indicator,
            }),
            _ => Err(ModelError::InvalidCatalogPath(path.to_string())),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.dataset.is_some()
    }
}

/// Table short name → fully qualified table URIs (e.g.
/// `grapher/who/2024-01-01/gho/deaths`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLookup {
    tables: BTreeMap<String, Vec<String>>,
}

impl TableLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index table URIs by their last path segment.
    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lookup = Self::new();
        for uri in uris {
            lookup.insert(uri);
        }
        lookup
    }

    pub fn insert(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        let short_name = uri.rsplit('/').next().unwrap_or(uri.as_str()).to_string();
        let candidates = self.tables.entry(short_name).or_default();
        if !candidates.contains(&uri) {
            candidates.push(uri);
        }
    }

    pub fn candidates(&self, table: &str) -> &[String] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A reference to one indicator, plus optional per-indicator display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRef {
    pub catalog_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<ConfigMap>,
}

impl IndicatorRef {
    pub fn new(catalog_path: impl Into<String>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: ConfigMap) -> Self {
        self.display = Some(display);
        self
    }

    pub fn parsed_path(&self) -> Result<CatalogPath<'_>> {
        CatalogPath::parse(&self.catalog_path)
    }

    /// Expand a short `table#indicator` path in place. Complete paths are
    /// left untouched, so calling this twice is harmless.
    pub fn expand_path(&mut self, lookup: &TableLookup) -> Result<()> {
        let parsed = CatalogPath::parse(&self.catalog_path)?;
        if parsed.is_complete() {
            return Ok(());
        }
        let expanded = match lookup.candidates(parsed.table) {
            [] => {
                return Err(ModelError::UnknownTable {
                    path: self.catalog_path.clone(),
                    table: parsed.table.to_string(),
                })
            }
            [uri] => format!("{uri}#{}", parsed.indicator),
            many => {
                return Err(ModelError::AmbiguousTable {
                    path: self.catalog_path.clone(),
                    table: parsed.table.to_string(),
                    candidates: many.to_vec(),
                })
            }
        };
        self.catalog_path = expanded;
        Ok(())
    }
}
