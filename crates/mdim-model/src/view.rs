//! Views: one concrete chart per assignment of choices.

use crate::config::ConfigMap;
use crate::error::Result;
use crate::indicator::{IndicatorRef, TableLookup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimension slug → choice slug.
pub type DimensionAssignment = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Y,
    X,
    Size,
    Color,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Y => "y",
            Axis::X => "x",
            Axis::Size => "size",
            Axis::Color => "color",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewIndicators {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<IndicatorRef>,
    #[serde(default, deserialize_with = "optional_ref", skip_serializing_if = "Option::is_none")]
    pub x: Option<IndicatorRef>,
    #[serde(default, deserialize_with = "optional_ref", skip_serializing_if = "Option::is_none")]
    pub size: Option<IndicatorRef>,
    #[serde(default, deserialize_with = "optional_ref", skip_serializing_if = "Option::is_none")]
    pub color: Option<IndicatorRef>,
}

impl ViewIndicators {
    pub fn y(refs: Vec<IndicatorRef>) -> Self {
        Self {
            y: refs,
            ..Self::default()
        }
    }

    /// All references paired with their axis, y first.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &IndicatorRef)> {
        self.y
            .iter()
            .map(|r| (Axis::Y, r))
            .chain(self.x.iter().map(|r| (Axis::X, r)))
            .chain(self.size.iter().map(|r| (Axis::Size, r)))
            .chain(self.color.iter().map(|r| (Axis::Color, r)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IndicatorRef> {
        self.y
            .iter_mut()
            .chain(self.x.iter_mut())
            .chain(self.size.iter_mut())
            .chain(self.color.iter_mut())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RefEntry {
    Path(String),
    Full(IndicatorRef),
}

impl From<RefEntry> for IndicatorRef {
    fn from(entry: RefEntry) -> Self {
        match entry {
            RefEntry::Path(path) => IndicatorRef::new(path),
            RefEntry::Full(r) => r,
        }
    }
}

/// Authors write `y: table#ind` as often as `y: [table#ind]`, and a bare
/// string instead of `{catalog_path: ...}`.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<IndicatorRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(RefEntry),
        Many(Vec<RefEntry>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(entry) => vec![entry.into()],
        OneOrMany::Many(entries) => entries.into_iter().map(Into::into).collect(),
    })
}

fn optional_ref<'de, D>(deserializer: D) -> std::result::Result<Option<IndicatorRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<RefEntry>::deserialize(deserializer)?.map(Into::into))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub dimensions: DimensionAssignment,
    #[serde(default)]
    pub indicators: ViewIndicators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConfigMap>,
}

impl View {
    pub fn new(dimensions: DimensionAssignment, indicators: ViewIndicators) -> Self {
        Self {
            dimensions,
            indicators,
            config: None,
            metadata: None,
        }
    }

    pub fn expand_paths(&mut self, lookup: &TableLookup) -> Result<()> {
        for indicator in self.indicators.iter_mut() {
            indicator.expand_path(lookup)?;
        }
        Ok(())
    }

    /// Compact `dim=choice, ...` rendering for messages.
    pub fn dimensions_label(&self) -> String {
        self.dimensions
            .iter()
            .map(|(d, c)| format!("{d}={c}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
