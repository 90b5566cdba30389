//! Flat, column-ordered tables and their TSV rendering.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    List(Vec<String>),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::List(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Text(s) => s.is_empty(),
            Cell::List(l) => l.is_empty(),
        }
    }

    fn render(&self) -> String {
        let clean = |s: &str| s.replace(['\t', '\n', '\r'], " ");
        match self {
            Cell::Text(s) => clean(s),
            Cell::List(items) => items.iter().map(|s| clean(s)).collect::<Vec<_>>().join(" "),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

pub type Row = BTreeMap<String, Cell>;

/// Rows plus the column order they are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ExportTable {
    /// Register a column (no-op if already known) so that the output keeps
    /// first-seen column order.
    pub fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            self.add_column(key);
        }
        self.rows.push(row);
    }

    /// Drop columns, both from the header and from every row.
    pub fn drop_columns(&mut self, mut predicate: impl FnMut(&str) -> bool) {
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect();
        self.columns.retain(|c| !dropped.contains(c));
        for row in &mut self.rows {
            row.retain(|k, _| !dropped.contains(k));
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn to_tsv(&self) -> String {
        let mut out = self.columns.join("\t");
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|c| row.get(c).map(Cell::render).unwrap_or_default())
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }
}
