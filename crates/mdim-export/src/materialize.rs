//! Collection → legacy "graphers" and "columns" tables.
//!
//! ```text
//!   yVariableIds          xVariableId  Sex Dropdown  Age Radio  hasMapTab  title
//!   grapher/.../t#f_0_4                Female        0-4        true       Deaths
//!   ...
//! ```
//!
//! The graphers table has one row per view; dimension columns carry choice
//! *names* under a widget header ("{dimension name} {widget}"), and rows are
//! sorted by the choice order of each dimension. The columns table carries
//! per-indicator display settings, one row per catalog path.

use crate::error::{ExportError, Result};
use crate::table::{Cell, ExportTable, Row};
use mdim_model::{Axis, Collection, ConfigMap, ConfigValue, Dimension, UiType, View};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const CATALOG_PATH: &str = "catalogPath";
pub const AXIS: &str = "axis";

/// Knobs for [`materialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub dropdown_suffix: String,
    pub radio_suffix: String,
    pub checkbox_suffix: String,
    /// Write booleans as `true`/`false` rather than `True`/`False`.
    pub lowercase_booleans: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dropdown_suffix: "Dropdown".to_string(),
            radio_suffix: "Radio".to_string(),
            checkbox_suffix: "Checkbox".to_string(),
            lowercase_booleans: true,
        }
    }
}

impl ExportOptions {
    fn suffix(&self, ui_type: UiType) -> &str {
        match ui_type {
            UiType::Dropdown => &self.dropdown_suffix,
            UiType::Radio => &self.radio_suffix,
            UiType::Checkbox => &self.checkbox_suffix,
        }
    }

    pub fn widget_name(&self, dimension: &Dimension) -> String {
        format!("{} {}", dimension.name, self.suffix(dimension.presentation.ui_type))
    }

    fn is_widget_column(&self, column: &str) -> bool {
        [&self.dropdown_suffix, &self.radio_suffix, &self.checkbox_suffix]
            .iter()
            .any(|suffix| column.ends_with(&format!(" {suffix}")))
    }

    fn bool_text(&self, value: bool) -> String {
        match (value, self.lowercase_booleans) {
            (true, true) => "true".to_string(),
            (false, true) => "false".to_string(),
            (true, false) => "True".to_string(),
            (false, false) => "False".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub graphers: ExportTable,
    pub columns: ExportTable,
}

const SINGLE_AXES: [(Axis, &str); 3] = [
    (Axis::X, "xVariableId"),
    (Axis::Size, "sizeVariableId"),
    (Axis::Color, "colorVariableId"),
];

pub fn materialize(collection: &Collection, options: &ExportOptions) -> Result<Materialized> {
    let widgets = widget_columns(collection, options)?;

    // indicator columns first, then one widget per dimension, then config
    let mut graphers = ExportTable::default();
    graphers.add_column("yVariableIds");
    for (axis, column) in SINGLE_AXES {
        let used = collection
            .views
            .iter()
            .any(|v| v.indicators.iter().any(|(a, _)| a == axis));
        if used {
            graphers.add_column(column);
        }
    }
    for widget in &widgets {
        graphers.add_column(widget);
    }

    let mut columns = ExportTable::default();
    columns.add_column(CATALOG_PATH);
    columns.add_column(AXIS);
    for widget in &widgets {
        columns.add_column(widget);
    }

    let mut keyed_rows: Vec<(Vec<usize>, Row)> = Vec::with_capacity(collection.views.len());
    for (i, view) in collection.views.iter().enumerate() {
        let mut row = Row::new();
        let mut sort_key = Vec::with_capacity(collection.dimensions.len());
        let mut widget_cells: Vec<(String, Cell)> = Vec::with_capacity(widgets.len());
        for (dim, widget) in collection.dimensions.iter().zip(&widgets) {
            let (rank, label) = choice_label(dim, view, i, options)?;
            sort_key.push(rank);
            widget_cells.push((widget.clone(), Cell::Text(label)));
        }

        // indicators
        let y: Vec<String> = view
            .indicators
            .y
            .iter()
            .map(|r| r.catalog_path.clone())
            .collect();
        if !y.is_empty() {
            row.insert("yVariableIds".to_string(), Cell::List(y));
        }
        for (axis, indicator) in view.indicators.iter() {
            if let Some((_, column)) = SINGLE_AXES.iter().find(|(a, _)| *a == axis) {
                row.insert(column.to_string(), Cell::Text(indicator.catalog_path.clone()));
            }
        }
        row.extend(widget_cells.iter().cloned());

        // view config
        if let Some(config) = &view.config {
            for (key, value) in config {
                if let Some(cell) = to_cell(value, options)? {
                    graphers.add_column(key);
                    row.insert(key.clone(), cell);
                }
            }
        }
        keyed_rows.push((sort_key, row));

        // one columns row per indicator reference
        for (axis, indicator) in view.indicators.iter() {
            let mut col_row = Row::new();
            col_row.insert(CATALOG_PATH.to_string(), Cell::Text(indicator.catalog_path.clone()));
            col_row.insert(AXIS.to_string(), Cell::Text(axis.as_str().to_string()));
            col_row.extend(widget_cells.iter().cloned());
            if let Some(display) = &indicator.display {
                for (key, cell) in flatten_display(display, options)? {
                    columns.add_column(&key);
                    col_row.insert(key, cell);
                }
            }
            columns.rows.push(col_row);
        }
    }

    // categorical sort by dimension choice order
    keyed_rows.sort_by(|a, b| a.0.cmp(&b.0));
    graphers.rows = keyed_rows.into_iter().map(|(_, row)| row).collect();

    finalize_columns(&mut columns, options)?;

    tracing::debug!(
        collection = %collection.short_name,
        graphers = graphers.rows.len(),
        columns = columns.rows.len(),
        "materialized collection"
    );
    Ok(Materialized { graphers, columns })
}

/// Widget column per dimension. Two dimensions rendering to the same column
/// would overwrite each other's cells.
fn widget_columns(collection: &Collection, options: &ExportOptions) -> Result<Vec<String>> {
    let mut widgets: Vec<String> = Vec::with_capacity(collection.dimensions.len());
    for (pos, dim) in collection.dimensions.iter().enumerate() {
        let widget = options.widget_name(dim);
        if let Some(first) = widgets.iter().position(|w| *w == widget) {
            return Err(ExportError::DuplicateWidget {
                widget,
                dimensions: vec![
                    collection.dimensions[first].slug.clone(),
                    collection.dimensions[pos].slug.clone(),
                ],
            });
        }
        widgets.push(widget);
    }
    Ok(widgets)
}

/// Position of the view's choice in the dimension (the sort rank) and the
/// label written to the widget column.
fn choice_label(
    dim: &Dimension,
    view: &View,
    view_index: usize,
    options: &ExportOptions,
) -> Result<(usize, String)> {
    let choice = view
        .dimensions
        .get(&dim.slug)
        .ok_or_else(|| ExportError::MissingDimension {
            view: view_index,
            dimension: dim.slug.clone(),
        })?;

    if dim.is_checkbox() {
        let checked = dim.presentation.checkbox_true_choice_slug.as_deref() == Some(choice.as_str());
        return Ok((usize::from(!checked), options.bool_text(checked)));
    }

    dim.choices
        .iter()
        .position(|c| &c.slug == choice)
        .map(|pos| (pos, dim.choices[pos].name.clone()))
        .ok_or_else(|| ExportError::UnknownChoice {
            view: view_index,
            dimension: dim.slug.clone(),
            choice: choice.clone(),
            known: dim.choice_slugs().iter().map(|s| s.to_string()).collect(),
        })
}

fn to_cell(value: &ConfigValue, options: &ExportOptions) -> Result<Option<Cell>> {
    Ok(match value {
        ConfigValue::Null => None,
        ConfigValue::Bool(b) => Some(Cell::Text(options.bool_text(*b))),
        ConfigValue::Number(n) => Some(Cell::Text(n.to_string())),
        ConfigValue::String(s) => Some(Cell::Text(s.clone())),
        ConfigValue::List(items) => Some(Cell::List(
            items
                .iter()
                .map(|item| scalar_text(item, options))
                .collect::<Result<Vec<_>>>()?,
        )),
        ConfigValue::Map(map) => Some(Cell::Text(serde_json::to_string(map)?)),
    })
}

fn scalar_text(value: &ConfigValue, options: &ExportOptions) -> Result<String> {
    Ok(match value {
        ConfigValue::Null => String::new(),
        ConfigValue::Bool(b) => options.bool_text(*b),
        ConfigValue::Number(n) => n.to_string(),
        ConfigValue::String(s) => s.clone(),
        ConfigValue::List(_) | ConfigValue::Map(_) => serde_json::to_string(value)?,
    })
}

/// Display settings as flat columns; nested keys are joined with `.`.
fn flatten_display(display: &ConfigMap, options: &ExportOptions) -> Result<Vec<(String, Cell)>> {
    fn walk(
        prefix: &str,
        map: &ConfigMap,
        options: &ExportOptions,
        out: &mut Vec<(String, Cell)>,
    ) -> Result<()> {
        for (key, value) in map {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                ConfigValue::Map(nested) => walk(&name, nested, options, out)?,
                other => {
                    if let Some(cell) = to_cell(other, options)? {
                        out.push((name, cell));
                    }
                }
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk("", display, options, &mut out)?;
    Ok(out)
}

/// Drop widget and axis columns, empty and duplicate rows, and reject paths
/// that ended up with two different display settings.
fn finalize_columns(columns: &mut ExportTable, options: &ExportOptions) -> Result<()> {
    columns.drop_columns(|c| c == AXIS || options.is_widget_column(c));

    let mut seen_rows: HashSet<Row> = HashSet::new();
    columns.rows.retain(|row| {
        let informative = row
            .iter()
            .any(|(k, v)| k != CATALOG_PATH && !v.is_empty());
        informative && seen_rows.insert(row.clone())
    });

    let mut per_path: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &columns.rows {
        if let Some(path) = row.get(CATALOG_PATH).and_then(Cell::as_text) {
            *per_path.entry(path).or_default() += 1;
        }
    }
    let ambiguous: Vec<String> = per_path
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(p, _)| p.to_string())
        .collect();
    if !ambiguous.is_empty() {
        return Err(ExportError::AmbiguousDisplay { paths: ambiguous });
    }

    // columns that no surviving row uses
    let used: HashSet<&String> = columns.rows.iter().flat_map(|r| r.keys()).collect();
    let unused: Vec<String> = columns
        .columns
        .iter()
        .filter(|c| c.as_str() != CATALOG_PATH && !used.contains(c))
        .cloned()
        .collect();
    columns.columns.retain(|c| !unused.contains(c));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdim_model::{config_map, Choice, DimensionAssignment, IndicatorRef, Presentation, ViewIndicators};

    fn view(pairs: &[(&str, &str)], path: &str) -> View {
        let dims: DimensionAssignment = pairs
            .iter()
            .map(|(d, c)| (d.to_string(), c.to_string()))
            .collect();
        View::new(dims, ViewIndicators::y(vec![IndicatorRef::new(path)]))
    }

    fn collection() -> Collection {
        let mut age = Dimension::new(
            "age",
            "Age",
            vec![Choice::new("0_4", "0-4 years"), Choice::new("5_9", "5-9 years")],
        );
        age.presentation.ui_type = UiType::Radio;
        Collection::new(
            "deaths",
            vec![
                Dimension::new(
                    "sex",
                    "Sex",
                    vec![Choice::new("male", "Male"), Choice::new("female", "Female")],
                ),
                age,
            ],
            vec![
                view(&[("sex", "female"), ("age", "5_9")], "g/t#f5"),
                view(&[("sex", "female"), ("age", "0_4")], "g/t#f0"),
                view(&[("sex", "male"), ("age", "5_9")], "g/t#m5"),
                view(&[("sex", "male"), ("age", "0_4")], "g/t#m0"),
            ],
        )
    }

    #[test]
    fn test_grapher_rows_sorted_by_choice_order() {
        let out = materialize(&collection(), &ExportOptions::default()).unwrap();
        let order: Vec<(&str, &str)> = out
            .graphers
            .rows
            .iter()
            .map(|r| {
                (
                    r["Sex Dropdown"].as_text().unwrap(),
                    r["Age Radio"].as_text().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("Male", "0-4 years"),
                ("Male", "5-9 years"),
                ("Female", "0-4 years"),
                ("Female", "5-9 years"),
            ]
        );
        assert_eq!(
            out.graphers.rows[0]["yVariableIds"],
            Cell::List(vec!["g/t#m0".into()])
        );
    }

    #[test]
    fn test_config_booleans_lowercased() {
        let mut c = collection();
        c.views[0].config = Some(config_map! { "hasMapTab" => true, "yAxisMin" => 0i64, "note" => ConfigValue::Null });
        let out = materialize(&c, &ExportOptions::default()).unwrap();
        let row = out
            .graphers
            .rows
            .iter()
            .find(|r| r.contains_key("hasMapTab"))
            .unwrap();
        assert_eq!(row["hasMapTab"], Cell::from("true"));
        assert_eq!(row["yAxisMin"], Cell::from("0"));
        assert!(!row.contains_key("note"));
        assert!(out.graphers.columns.contains(&"hasMapTab".to_string()));
    }

    #[test]
    fn test_unknown_choice_is_an_error() {
        let mut c = collection();
        c.views[0].dimensions.insert("sex".into(), "other".into());
        assert!(matches!(
            materialize(&c, &ExportOptions::default()),
            Err(ExportError::UnknownChoice { ref choice, .. }) if choice == "other"
        ));
    }

    #[test]
    fn test_checkbox_widget_values() {
        let mut c = collection();
        c.dimensions.push(Dimension {
            presentation: Presentation::checkbox("per_capita"),
            ..Dimension::new("metric", "Per capita", vec![Choice::new("per_capita", "Per capita")])
        });
        for (i, v) in c.views.iter_mut().enumerate() {
            let value = if i % 2 == 0 { "per_capita" } else { "absolute" };
            v.dimensions.insert("metric".into(), value.into());
        }
        let out = materialize(&c, &ExportOptions::default()).unwrap();
        let values: HashSet<&str> = out
            .graphers
            .rows
            .iter()
            .map(|r| r["Per capita Checkbox"].as_text().unwrap())
            .collect();
        assert_eq!(values, ["true", "false"].into_iter().collect());
    }

    #[test]
    fn test_columns_table_keeps_display_rows_only() {
        let mut c = collection();
        let display = config_map! { "name" => "Female deaths", "numDecimalPlaces" => 1i64 };
        c.views[0].indicators.y[0] = IndicatorRef::new("g/t#f5").with_display(display.clone());
        // same path, same display in another view: deduplicated
        c.views[1].indicators.y.push(IndicatorRef::new("g/t#f5").with_display(display));
        let out = materialize(&c, &ExportOptions::default()).unwrap();
        assert_eq!(out.columns.rows.len(), 1);
        assert_eq!(out.columns.columns, vec!["catalogPath", "name", "numDecimalPlaces"]);
        assert_eq!(out.columns.rows[0]["numDecimalPlaces"], Cell::from("1"));
    }

    #[test]
    fn test_conflicting_display_is_an_error() {
        let mut c = collection();
        c.views[0].indicators.y[0] =
            IndicatorRef::new("g/t#f5").with_display(config_map! { "name" => "A" });
        c.views[1].indicators.y[0] =
            IndicatorRef::new("g/t#f5").with_display(config_map! { "name" => "B" });
        match materialize(&c, &ExportOptions::default()) {
            Err(ExportError::AmbiguousDisplay { paths }) => assert_eq!(paths, vec!["g/t#f5"]),
            other => panic!("expected ambiguous display, got {other:?}"),
        }
    }
}
