//! Derive dimensions and views from a table's column metadata.
//!
//! Every data column of a dimensional table is one indicator at one
//! combination of dimension values:
//!
//! ```text
//!   column                    indicator   sex      age
//!   deaths__sex_female__0_4   deaths      female   0-4
//!   deaths__sex_male__0_4     deaths      male     0-4
//!   ...
//! ```
//!
//! Expansion turns the distinct values per dimension into [`Dimension`]s and
//! every surviving column into one [`View`]. The caller can restrict and
//! reorder dimensions and choices with a [`DimensionSelection`].

use crate::error::{EngineError, Result};
use mdim_model::{
    Choice, Collection, ConfigMap, Dimension, DimensionAssignment, IndicatorRef, ModelError, Table,
    View, ViewIndicators,
};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Internal column names that a table dimension must not shadow.
pub const RESERVED_DIMENSION_NAMES: [&str; 2] = ["indicator_name", "data_column_name"];

const WILDCARD: &str = "*";

/// Choices to keep for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceSelection {
    /// `"*"`: every observed choice, in table order.
    All,
    /// An explicit ordered subset.
    Only(Vec<String>),
}

impl<'de> Deserialize<'de> for ChoiceSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::One(s) if s == WILDCARD => Ok(ChoiceSelection::All),
            Raw::One(s) => Err(de::Error::custom(format!(
                "expected `{WILDCARD}` or a list of choices, got `{s}`"
            ))),
            Raw::Many(list) => Ok(ChoiceSelection::Only(list)),
        }
    }
}

/// Which dimensions to expand, and in which order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DimensionSelection {
    /// Every dimension found in the table, in table order.
    #[default]
    All,
    /// Exactly these dimensions, in this order, with all their choices.
    Ordered(Vec<String>),
    /// Exactly these dimensions, in this order, each with its own choice
    /// selection.
    Choices(Vec<(String, ChoiceSelection)>),
}

impl<'de> Deserialize<'de> for DimensionSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SelectionVisitor;

        impl<'de> Visitor<'de> for SelectionVisitor {
            type Value = DimensionSelection;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("null, a list of dimension names, or a mapping of dimension to choices")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(DimensionSelection::All)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(DimensionSelection::All)
            }

            fn visit_some<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Self::Value, D::Error> {
                deserializer.deserialize_any(self)
            }

            fn visit_seq<A: de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut names = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    names.push(name);
                }
                Ok(DimensionSelection::Ordered(names))
            }

            // A mapping keeps its document order; a BTreeMap would lose it.
            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, choices)) = map.next_entry::<String, ChoiceSelection>()? {
                    entries.push((name, choices));
                }
                Ok(DimensionSelection::Choices(entries))
            }
        }

        deserializer.deserialize_any(SelectionVisitor)
    }
}

/// Knobs for [`expand`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    /// Indicators to expand. `None` requires the table to hold exactly one.
    pub indicator_names: Option<Vec<String>>,
    pub dimensions: DimensionSelection,
    /// Attached verbatim as `config` to every generated view.
    pub common_view_config: Option<ConfigMap>,
    /// Slug of the synthesized indicator dimension.
    pub indicators_slug: String,
    /// Synthesize the indicator dimension even for a single indicator.
    pub indicator_as_dimension: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            indicator_names: None,
            dimensions: DimensionSelection::All,
            common_view_config: None,
            indicators_slug: "indicator".to_string(),
            indicator_as_dimension: false,
        }
    }
}

/// Dimensions and views derived from one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedConfig {
    pub dimensions: Vec<Dimension>,
    pub views: Vec<View>,
}

impl ExpandedConfig {
    pub fn into_collection(self, short_name: impl Into<String>) -> Collection {
        Collection::new(short_name, self.dimensions, self.views)
    }
}

/// One data column, flattened: its indicator, its dimension values (aligned
/// with the table's dimension list) and its name.
struct Row<'a> {
    indicator: &'a str,
    values: Vec<&'a str>,
    column: &'a str,
}

pub fn expand(table: &Table, options: &ExpandOptions) -> Result<ExpandedConfig> {
    let columns: Vec<_> = table.dimensional_columns().collect();
    if columns.is_empty() {
        return Err(EngineError::NoIndicators(table.short_name.clone()));
    }

    let reserved: Vec<&str> = RESERVED_DIMENSION_NAMES
        .iter()
        .copied()
        .chain(std::iter::once(options.indicators_slug.as_str()))
        .collect();
    for (_, meta) in &columns {
        if let Some(filter) = meta.filters.iter().find(|f| reserved.contains(&f.name.as_str())) {
            return Err(EngineError::ReservedDimensionName(filter.name.clone()));
        }
    }

    // Indicator selection
    let available = first_seen(columns.iter().map(|(_, m)| m.original_short_name.as_str()));
    let selected: Vec<&str> = match &options.indicator_names {
        None if available.len() == 1 => available.clone(),
        None => {
            return Err(EngineError::MultipleIndicators {
                available: to_owned(&available),
            })
        }
        Some(names) => {
            let unknown: Vec<String> = names
                .iter()
                .filter(|n| !available.contains(&n.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(EngineError::UnknownIndicators {
                    unknown,
                    available: to_owned(&available),
                });
            }
            first_seen(names.iter().map(String::as_str))
        }
    };
    let columns: Vec<_> = columns
        .into_iter()
        .filter(|(_, m)| selected.contains(&m.original_short_name.as_str()))
        .collect();

    // Table dimensions among the selected indicators, and one row per column
    let table_dims = first_seen(
        columns
            .iter()
            .flat_map(|(_, m)| m.filters.iter().map(|f| f.name.as_str())),
    );
    let mut rows = Vec::with_capacity(columns.len());
    for (column, meta) in &columns {
        let mut values = Vec::with_capacity(table_dims.len());
        for dim in &table_dims {
            let value = meta
                .filters
                .iter()
                .find(|f| f.name == *dim)
                .ok_or_else(|| EngineError::MissingFilter {
                    column: column.name.clone(),
                    dimension: dim.to_string(),
                })?;
            values.push(value.value.as_str());
        }
        rows.push(Row {
            indicator: meta.original_short_name.as_str(),
            values,
            column: column.name.as_str(),
        });
    }

    let use_indicator_dim = selected.len() > 1 || options.indicator_as_dimension;
    let indicator_slug = options.indicators_slug.as_str();

    let mut known_dims: Vec<&str> = Vec::with_capacity(table_dims.len() + 1);
    if use_indicator_dim {
        known_dims.push(indicator_slug);
    }
    known_dims.extend(table_dims.iter().copied());

    // Observed choices per dimension, in table order
    let mut observed_choices: Vec<(&str, Vec<&str>)> = Vec::with_capacity(known_dims.len());
    if use_indicator_dim {
        observed_choices.push((indicator_slug, selected.clone()));
    }
    for (pos, dim) in table_dims.iter().enumerate() {
        observed_choices.push((*dim, first_seen(rows.iter().map(|r| r.values[pos]))));
    }
    let observed = |dim: &str| {
        observed_choices
            .iter()
            .find(|(d, _)| *d == dim)
            .map(|(_, choices)| choices.clone())
            .unwrap_or_default()
    };

    let plan: Vec<(&str, Vec<&str>)> = match &options.dimensions {
        DimensionSelection::All => known_dims.iter().map(|d| (*d, observed(*d))).collect(),
        DimensionSelection::Ordered(names) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            check_coverage(&names, &known_dims, &table_dims)?;
            with_leading_indicator(use_indicator_dim, indicator_slug, &names)
                .into_iter()
                .map(|d| (d, observed(d)))
                .collect()
        }
        DimensionSelection::Choices(entries) => {
            let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
            check_coverage(&names, &known_dims, &table_dims)?;
            let mut plan = Vec::with_capacity(known_dims.len());
            for dim in with_leading_indicator(use_indicator_dim, indicator_slug, &names) {
                let all = observed(dim);
                let choices = match entries.iter().find(|(n, _)| n == dim).map(|(_, c)| c) {
                    None | Some(ChoiceSelection::All) => all,
                    Some(ChoiceSelection::Only(listed)) => {
                        let unknown: Vec<String> = listed
                            .iter()
                            .filter(|c| !all.contains(&c.as_str()))
                            .cloned()
                            .collect();
                        if !unknown.is_empty() {
                            return Err(EngineError::UnknownChoices {
                                dimension: dim.to_string(),
                                unknown,
                                available: to_owned(&all),
                            });
                        }
                        first_seen(listed.iter().map(String::as_str))
                    }
                };
                plan.push((dim, choices));
            }
            plan
        }
    };

    let value_of = |row: &Row<'_>, dim: &str| -> Option<String> {
        if use_indicator_dim && dim == indicator_slug {
            return Some(row.indicator.to_string());
        }
        let pos = table_dims.iter().position(|d| *d == dim)?;
        Some(row.values[pos].to_string())
    };

    let dimensions: Vec<Dimension> = plan
        .iter()
        .map(|(dim, choices)| {
            let name = if use_indicator_dim && *dim == indicator_slug {
                "Indicator".to_string()
            } else {
                dim.to_string()
            };
            Dimension::new(
                *dim,
                name,
                choices.iter().map(|c| Choice::new(*c, *c)).collect(),
            )
        })
        .collect();

    let mut views = Vec::new();
    let mut seen: HashMap<DimensionAssignment, usize> = HashMap::new();
    'rows: for row in &rows {
        let mut assignment = DimensionAssignment::new();
        for (dim, choices) in &plan {
            let Some(value) = value_of(row, dim) else {
                continue 'rows;
            };
            if !choices.contains(&value.as_str()) {
                continue 'rows;
            }
            assignment.insert(dim.to_string(), value);
        }
        if let Some(&first) = seen.get(&assignment) {
            let label = assignment
                .iter()
                .map(|(d, c)| format!("{d}={c}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ModelError::DuplicateView {
                positions: vec![first, views.len()],
                dimensions: label,
            }
            .into());
        }
        seen.insert(assignment.clone(), views.len());
        let mut view = View::new(
            assignment,
            ViewIndicators::y(vec![IndicatorRef::new(format!(
                "{}#{}",
                table.short_name, row.column
            ))]),
        );
        view.config = options.common_view_config.clone();
        views.push(view);
    }

    tracing::debug!(
        table = %table.short_name,
        indicators = selected.len(),
        dimensions = dimensions.len(),
        views = views.len(),
        "expanded table config"
    );

    Ok(ExpandedConfig { dimensions, views })
}

/// Selected names must be known, and every table dimension must be named.
/// The synthesized indicator dimension may be left out; it is then put first.
fn check_coverage(names: &[&str], known: &[&str], table_dims: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    let dups: Vec<String> = names
        .iter()
        .filter(|n| !seen.insert(**n))
        .map(|n| n.to_string())
        .collect();
    if !dups.is_empty() {
        return Err(ModelError::DuplicateDimension { slugs: dups }.into());
    }

    let unknown: Vec<String> = names
        .iter()
        .filter(|n| !known.contains(n))
        .map(|n| n.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(EngineError::UnknownDimensions {
            unknown,
            available: to_owned(known),
        });
    }

    let missing: Vec<String> = table_dims
        .iter()
        .filter(|d| !names.contains(d))
        .map(|d| d.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::MissingDimensions { missing });
    }
    Ok(())
}

fn with_leading_indicator<'a>(use_indicator_dim: bool, slug: &'a str, names: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(names.len() + 1);
    if use_indicator_dim && !names.contains(&slug) {
        out.push(slug);
    }
    out.extend(names.iter().copied());
    out
}

fn first_seen<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|s| seen.insert(*s)).collect()
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deaths_table() -> Table {
        Table::new("deaths")
            .with_column("deaths__female__0_4", "deaths", &[("sex", "female"), ("age", "0-4")])
            .with_column("deaths__female__5_9", "deaths", &[("sex", "female"), ("age", "5-9")])
            .with_column("deaths__male__0_4", "deaths", &[("sex", "male"), ("age", "0-4")])
            .with_column("deaths__male__5_9", "deaths", &[("sex", "male"), ("age", "5-9")])
    }

    fn two_indicator_table() -> Table {
        deaths_table()
            .with_column("dalys__female__0_4", "dalys", &[("sex", "female"), ("age", "0-4")])
            .with_column("dalys__male__0_4", "dalys", &[("sex", "male"), ("age", "0-4")])
    }

    fn dims(expanded: &ExpandedConfig) -> Vec<(&str, Vec<&str>)> {
        expanded
            .dimensions
            .iter()
            .map(|d| (d.slug.as_str(), d.choice_slugs()))
            .collect()
    }

    #[test]
    fn test_expand_all_dimensions() {
        let expanded = expand(&deaths_table(), &ExpandOptions::default()).unwrap();
        assert_eq!(
            dims(&expanded),
            vec![("sex", vec!["female", "male"]), ("age", vec!["0-4", "5-9"])]
        );
        assert_eq!(expanded.views.len(), 4);
        assert_eq!(
            expanded.views[0].indicators.y[0].catalog_path,
            "deaths#deaths__female__0_4"
        );
    }

    #[test]
    fn test_mapping_selection_orders_and_filters() {
        let options = ExpandOptions {
            dimensions: DimensionSelection::Choices(vec![
                ("age".into(), ChoiceSelection::Only(vec!["5-9".into()])),
                ("sex".into(), ChoiceSelection::All),
            ]),
            ..Default::default()
        };
        let expanded = expand(&deaths_table(), &options).unwrap();
        assert_eq!(
            dims(&expanded),
            vec![("age", vec!["5-9"]), ("sex", vec!["female", "male"])]
        );
        assert_eq!(expanded.views.len(), 2);
        assert!(expanded.views.iter().all(|v| v.dimensions["age"] == "5-9"));
    }

    #[test]
    fn test_list_selection_requires_full_coverage() {
        let options = ExpandOptions {
            dimensions: DimensionSelection::Ordered(vec!["sex".into()]),
            ..Default::default()
        };
        match expand(&deaths_table(), &options) {
            Err(EngineError::MissingDimensions { missing }) => assert_eq!(missing, vec!["age"]),
            other => panic!("expected missing dimensions, got {other:?}"),
        }

        let options = ExpandOptions {
            dimensions: DimensionSelection::Ordered(vec!["sex".into(), "age".into(), "region".into()]),
            ..Default::default()
        };
        assert!(matches!(
            expand(&deaths_table(), &options),
            Err(EngineError::UnknownDimensions { ref unknown, .. }) if unknown == &["region"]
        ));
    }

    #[test]
    fn test_unknown_choice_rejected() {
        let options = ExpandOptions {
            dimensions: DimensionSelection::Choices(vec![
                ("sex".into(), ChoiceSelection::Only(vec!["other".into()])),
                ("age".into(), ChoiceSelection::All),
            ]),
            ..Default::default()
        };
        assert!(matches!(
            expand(&deaths_table(), &options),
            Err(EngineError::UnknownChoices { ref dimension, .. }) if dimension == "sex"
        ));
    }

    #[test]
    fn test_multiple_indicators_need_names() {
        assert!(matches!(
            expand(&two_indicator_table(), &ExpandOptions::default()),
            Err(EngineError::MultipleIndicators { .. })
        ));

        let options = ExpandOptions {
            indicator_names: Some(vec!["dalys".into(), "ghost".into()]),
            ..Default::default()
        };
        assert!(matches!(
            expand(&two_indicator_table(), &options),
            Err(EngineError::UnknownIndicators { ref unknown, .. }) if unknown == &["ghost"]
        ));
    }

    #[test]
    fn test_indicator_dimension_is_synthesized() {
        let options = ExpandOptions {
            indicator_names: Some(vec!["dalys".into(), "deaths".into()]),
            ..Default::default()
        };
        let expanded = expand(&two_indicator_table(), &options).unwrap();
        assert_eq!(expanded.dimensions[0].slug, "indicator");
        assert_eq!(expanded.dimensions[0].choice_slugs(), vec!["dalys", "deaths"]);
        assert_eq!(expanded.views.len(), 6);

        let single = ExpandOptions {
            indicator_as_dimension: true,
            ..Default::default()
        };
        let expanded = expand(&deaths_table(), &single).unwrap();
        assert_eq!(expanded.dimensions[0].choice_slugs(), vec!["deaths"]);
        assert!(expanded.views.iter().all(|v| v.dimensions["indicator"] == "deaths"));
    }

    #[test]
    fn test_indicator_dimension_can_be_placed() {
        let options = ExpandOptions {
            indicator_names: Some(vec!["deaths".into(), "dalys".into()]),
            dimensions: DimensionSelection::Ordered(vec!["sex".into(), "indicator".into(), "age".into()]),
            ..Default::default()
        };
        let expanded = expand(&two_indicator_table(), &options).unwrap();
        let order: Vec<&str> = expanded.dimensions.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(order, vec!["sex", "indicator", "age"]);
    }

    #[test]
    fn test_reserved_dimension_name() {
        let table = Table::new("t").with_column("c", "ind", &[("indicator", "x")]);
        assert!(matches!(
            expand(&table, &ExpandOptions::default()),
            Err(EngineError::ReservedDimensionName(ref name)) if name == "indicator"
        ));
        let table = Table::new("t").with_column("c", "ind", &[("data_column_name", "x")]);
        assert!(expand(&table, &ExpandOptions::default()).is_err());
    }

    #[test]
    fn test_duplicate_columns_are_duplicate_views() {
        let table = deaths_table().with_column(
            "deaths__female__0_4_bis",
            "deaths",
            &[("sex", "female"), ("age", "0-4")],
        );
        assert!(matches!(
            expand(&table, &ExpandOptions::default()),
            Err(EngineError::Model(ModelError::DuplicateView { .. }))
        ));
    }

    #[test]
    fn test_common_view_config_is_attached() {
        let options = ExpandOptions {
            common_view_config: Some(mdim_model::config_map! { "hasMapTab" => true }),
            ..Default::default()
        };
        let expanded = expand(&deaths_table(), &options).unwrap();
        assert!(expanded
            .views
            .iter()
            .all(|v| v.config.as_ref().is_some_and(|c| c.contains_key("hasMapTab"))));
    }

    #[test]
    fn test_selection_from_yaml_keeps_order() {
        let options: ExpandOptions = serde_yaml::from_str(
            r#"
dimensions:
  sex: "*"
  age: ["5-9", "0-4"]
"#,
        )
        .unwrap();
        assert_eq!(
            options.dimensions,
            DimensionSelection::Choices(vec![
                ("sex".into(), ChoiceSelection::All),
                ("age".into(), ChoiceSelection::Only(vec!["5-9".into(), "0-4".into()])),
            ])
        );
        assert_eq!(options.indicators_slug, "indicator");

        let options: ExpandOptions = serde_yaml::from_str("dimensions: [age, sex]\n").unwrap();
        assert_eq!(
            options.dimensions,
            DimensionSelection::Ordered(vec!["age".into(), "sex".into()])
        );
    }
}
