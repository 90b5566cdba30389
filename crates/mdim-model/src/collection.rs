//! Collections: dimensions plus the views over them.

use crate::config::ConfigMap;
use crate::dimension::Dimension;
use crate::error::{ModelError, Result};
use crate::indicator::TableLookup;
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Fields that only one of the two publishing targets cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionKind {
    /// Flat-table explorer; `config` holds the explorer-wide settings.
    Explorer {
        #[serde(default)]
        config: ConfigMap,
    },
    /// Multi-dimensional indicator page.
    Mdim {
        #[serde(default)]
        title: ConfigMap,
        #[serde(default)]
        default_selection: Vec<String>,
        #[serde(default)]
        topic_tags: Vec<String>,
    },
}

impl Default for CollectionKind {
    fn default() -> Self {
        CollectionKind::Explorer {
            config: ConfigMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub short_name: String,
    #[serde(flatten)]
    pub kind: CollectionKind,
    pub dimensions: Vec<Dimension>,
    pub views: Vec<View>,
}

impl Collection {
    pub fn new(short_name: impl Into<String>, dimensions: Vec<Dimension>, views: Vec<View>) -> Self {
        Self {
            short_name: short_name.into(),
            kind: CollectionKind::default(),
            dimensions,
            views,
        }
    }

    pub fn with_kind(mut self, kind: CollectionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn dimension(&self, slug: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.slug == slug)
    }

    pub fn dimension_mut(&mut self, slug: &str) -> Option<&mut Dimension> {
        self.dimensions.iter_mut().find(|d| d.slug == slug)
    }

    pub fn dimension_slugs(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.slug.as_str()).collect()
    }

    /// Check every structural invariant of a finished collection.
    pub fn validate(&self) -> Result<()> {
        self.validate_dimensions()?;
        self.validate_views()?;
        for view in &self.views {
            for (_, indicator) in view.indicators.iter() {
                indicator.parsed_path()?;
            }
        }
        Ok(())
    }

    fn validate_dimensions(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut dups: Vec<String> = Vec::new();
        for dim in &self.dimensions {
            if !seen.insert(dim.slug.as_str()) && !dups.contains(&dim.slug) {
                dups.push(dim.slug.clone());
            }
        }
        if !dups.is_empty() {
            return Err(ModelError::DuplicateDimension { slugs: dups });
        }
        self.dimensions.iter().try_for_each(Dimension::validate)
    }

    fn validate_views(&self) -> Result<()> {
        let expected: BTreeSet<&str> = self.dimension_slugs().into_iter().collect();
        let by_slug: HashMap<&str, &Dimension> =
            self.dimensions.iter().map(|d| (d.slug.as_str(), d)).collect();

        let mut first_seen: HashMap<&crate::view::DimensionAssignment, usize> = HashMap::new();
        for (i, view) in self.views.iter().enumerate() {
            let found: BTreeSet<&str> = view.dimensions.keys().map(String::as_str).collect();
            if found != expected {
                return Err(ModelError::ViewDimensionMismatch {
                    view: i,
                    expected: expected.iter().map(|s| s.to_string()).collect(),
                    found: found.iter().map(|s| s.to_string()).collect(),
                });
            }
            for (dim_slug, choice) in &view.dimensions {
                let dim = by_slug[dim_slug.as_str()];
                if !dim.is_checkbox() && !dim.has_choice(choice) {
                    return Err(ModelError::UnknownViewChoice {
                        view: i,
                        dimension: dim_slug.clone(),
                        choice: choice.clone(),
                    });
                }
            }
            if let Some(&first) = first_seen.get(&view.dimensions) {
                return Err(ModelError::DuplicateView {
                    positions: vec![first, i],
                    dimensions: view.dimensions_label(),
                });
            }
            first_seen.insert(&view.dimensions, i);
        }
        Ok(())
    }

    /// Drop choices no view uses. Returns the removed `(dimension, choice)`
    /// pairs. Checkbox dimensions are left alone.
    pub fn prune_dimensions(&mut self) -> Vec<(String, String)> {
        let mut used: HashMap<&str, HashSet<&str>> = HashMap::new();
        for view in &self.views {
            for (dim, choice) in &view.dimensions {
                used.entry(dim.as_str()).or_default().insert(choice.as_str());
            }
        }

        let mut removed = Vec::new();
        let mut keep: Vec<Vec<bool>> = Vec::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            let used_here = used.get(dim.slug.as_str());
            keep.push(
                dim.choices
                    .iter()
                    .map(|c| {
                        let kept = dim.is_checkbox()
                            || used_here.is_some_and(|u| u.contains(c.slug.as_str()));
                        if !kept {
                            removed.push((dim.slug.clone(), c.slug.clone()));
                        }
                        kept
                    })
                    .collect(),
            );
        }
        for (dim, mask) in self.dimensions.iter_mut().zip(keep) {
            let mut flags = mask.into_iter();
            dim.choices.retain(|_| flags.next().unwrap_or(true));
        }
        removed
    }

    /// Reorder one dimension's choices. Listed slugs come first in the given
    /// order; unlisted ones keep their relative order after them.
    pub fn sort_choices(&mut self, dimension: &str, order: &[&str]) -> Result<()> {
        let dim = self
            .dimension_mut(dimension)
            .ok_or_else(|| ModelError::UnknownDimension(dimension.to_string()))?;

        let unknown: Vec<String> = order
            .iter()
            .filter(|s| !dim.has_choice(s))
            .map(|s| s.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(ModelError::UnknownChoices {
                dimension: dimension.to_string(),
                unknown,
                available: dim.choice_slugs().iter().map(|s| s.to_string()).collect(),
            });
        }

        let rank = |slug: &str| order.iter().position(|s| *s == slug).unwrap_or(order.len());
        // stable sort keeps unlisted choices in place relative to each other
        dim.choices.sort_by_key(|c| rank(&c.slug));
        Ok(())
    }

    /// Expand every indicator path in every view against the dependency
    /// tables.
    pub fn expand_paths(&mut self, lookup: &TableLookup) -> Result<()> {
        for view in &mut self.views {
            view.expand_paths(lookup)?;
        }
        Ok(())
    }

    /// Distinct catalog paths referenced by the views, in first-use order.
    pub fn indicator_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for view in &self.views {
            for (_, indicator) in view.indicators.iter() {
                if seen.insert(indicator.catalog_path.as_str()) {
                    paths.push(indicator.catalog_path.clone());
                }
            }
        }
        paths
    }

    /// Fail with every referenced path that is not among `known`.
    pub fn check_indicators_exist(&self, known: &HashSet<String>) -> Result<()> {
        let missing: Vec<String> = self
            .indicator_paths()
            .into_iter()
            .filter(|p| !known.contains(p))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::MissingIndicators(missing))
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Choice;
    use crate::indicator::IndicatorRef;
    use crate::view::{DimensionAssignment, ViewIndicators};

    fn view(pairs: &[(&str, &str)], path: &str) -> View {
        let dims: DimensionAssignment = pairs
            .iter()
            .map(|(d, c)| (d.to_string(), c.to_string()))
            .collect();
        View::new(dims, ViewIndicators::y(vec![IndicatorRef::new(path)]))
    }

    fn sample() -> Collection {
        Collection::new(
            "deaths",
            vec![
                Dimension::new(
                    "sex",
                    "Sex",
                    vec![
                        Choice::new("female", "Female"),
                        Choice::new("male", "Male"),
                        Choice::new("all", "Both sexes"),
                    ],
                ),
                Dimension::new("age", "Age", vec![Choice::new("0_4", "0-4")]),
            ],
            vec![
                view(&[("sex", "female"), ("age", "0_4")], "deaths#f"),
                view(&[("sex", "male"), ("age", "0_4")], "deaths#m"),
            ],
        )
    }

    #[test]
    fn test_valid_collection() {
        sample().validate().unwrap();
    }

    #[test]
    fn test_view_key_mismatch() {
        let mut c = sample();
        c.views[0].dimensions.remove("age");
        assert!(matches!(c.validate(), Err(ModelError::ViewDimensionMismatch { view: 0, .. })));
    }

    #[test]
    fn test_duplicate_views() {
        let mut c = sample();
        c.views.push(view(&[("sex", "female"), ("age", "0_4")], "deaths#other"));
        match c.validate() {
            Err(ModelError::DuplicateView { positions, .. }) => assert_eq!(positions, vec![0, 2]),
            other => panic!("expected duplicate view, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_view_choice() {
        let mut c = sample();
        c.views[1].dimensions.insert("sex".into(), "other".into());
        assert!(matches!(c.validate(), Err(ModelError::UnknownViewChoice { .. })));
    }

    #[test]
    fn test_prune_removes_unused() {
        let mut c = sample();
        let removed = c.prune_dimensions();
        assert_eq!(removed, vec![("sex".to_string(), "all".to_string())]);
        assert_eq!(c.dimensions[0].choice_slugs(), vec!["female", "male"]);
    }

    #[test]
    fn test_sort_choices() {
        let mut c = sample();
        c.sort_choices("sex", &["all"]).unwrap();
        assert_eq!(c.dimensions[0].choice_slugs(), vec!["all", "female", "male"]);
        assert!(c.sort_choices("sex", &["nope"]).is_err());
        assert!(c.sort_choices("nope", &[]).is_err());
    }

    #[test]
    fn test_indicator_paths_and_existence() {
        let c = sample();
        assert_eq!(c.indicator_paths(), vec!["deaths#f", "deaths#m"]);
        let known: HashSet<String> = ["deaths#f".to_string()].into_iter().collect();
        match c.check_indicators_exist(&known) {
            Err(ModelError::MissingIndicators(missing)) => assert_eq!(missing, vec!["deaths#m"]),
            other => panic!("expected missing indicators, got {other:?}"),
        }
    }

    #[test]
    fn test_json_roundtrip_keeps_kind() {
        let c = sample().with_kind(CollectionKind::Mdim {
            title: crate::config_map! { "title" => "Deaths" },
            default_selection: vec!["World".into()],
            topic_tags: vec![],
        });
        let text = c.to_json_string().unwrap();
        assert!(text.contains("\"kind\": \"mdim\""));
        assert_eq!(Collection::from_json_str(&text).unwrap(), c);
    }
}
