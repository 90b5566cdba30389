//! Common view configuration ("common_views").
//!
//! A rule pairs a partial dimension assignment with a config fragment. For a
//! given view every rule whose assignment is contained in the view's
//! dimensions applies. Rules are layered from least to most specific (number
//! of fixed dimensions), and the view's own config goes on top:
//!
//! ```text
//!   {}                         tab: map, hasMapTab: true
//!   {sex: female}              note: "Female only"
//!   {sex: female, age: 10}     title: "Girls aged 10"
//!   view.config                title: "Override"        ← wins
//! ```
//!
//! Two equally specific rules that disagree on a leaf are an authoring error;
//! picking either would silently change a published chart.

use crate::error::{EngineError, Result};
use mdim_model::{merge_override, CommonOverrideRule, ConfigMap, ConfigValue, DimensionAssignment};
use std::collections::{BTreeMap, HashMap};

/// A validated list of common view rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonViewConfig {
    rules: Vec<CommonOverrideRule>,
}

impl CommonViewConfig {
    /// Rejects two rules with the same dimension pattern.
    pub fn new(rules: Vec<CommonOverrideRule>) -> Result<Self> {
        let mut seen: HashMap<&DimensionAssignment, usize> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            if let Some(&first) = seen.get(&rule.dimensions) {
                return Err(EngineError::DuplicateRulePattern {
                    first,
                    second: i,
                    pattern: pattern_label(&rule.dimensions),
                });
            }
            seen.insert(&rule.dimensions, i);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[CommonOverrideRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Merged config for a view with dimensions `active` and inline config
    /// `explicit`.
    pub fn merge(&self, active: &DimensionAssignment, explicit: Option<&ConfigMap>) -> Result<ConfigMap> {
        let mut by_specificity: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.matches(active) {
                by_specificity.entry(rule.specificity()).or_default().push(i);
            }
        }

        let mut merged = ConfigMap::new();
        for indices in by_specificity.values() {
            let mut level = ConfigMap::new();
            let mut owners: HashMap<Vec<String>, usize> = HashMap::new();
            for &i in indices {
                let mut path = Vec::new();
                self.merge_strict(&mut level, &mut owners, &self.rules[i].config, i, &mut path)?;
            }
            merge_override(&mut merged, &level);
        }

        if let Some(explicit) = explicit {
            merge_override(&mut merged, explicit);
        }
        Ok(merged)
    }

    /// Merge `incoming` (from rule `rule`) into a same-specificity level,
    /// failing on leaf disagreements.
    fn merge_strict(
        &self,
        level: &mut ConfigMap,
        owners: &mut HashMap<Vec<String>, usize>,
        incoming: &ConfigMap,
        rule: usize,
        path: &mut Vec<String>,
    ) -> Result<()> {
        for (key, value) in incoming {
            path.push(key.clone());
            match (level.get_mut(key), value) {
                (None, _) => {
                    level.insert(key.clone(), value.clone());
                    owners.insert(path.clone(), rule);
                }
                (Some(ConfigValue::Map(existing)), ConfigValue::Map(nested)) => {
                    self.merge_strict(existing, owners, nested, rule, path)?;
                }
                (Some(existing), _) if existing == value => {}
                (Some(existing), _) => {
                    let first = owner_of(owners, path).unwrap_or(rule);
                    return Err(EngineError::AmbiguousMerge {
                        path: path.join("."),
                        first,
                        first_pattern: pattern_label(&self.rules[first].dimensions),
                        first_value: existing.to_string(),
                        second: rule,
                        second_pattern: pattern_label(&self.rules[rule].dimensions),
                        second_value: value.to_string(),
                    });
                }
            }
            path.pop();
        }
        Ok(())
    }
}

/// Merge the applicable `rules` for one view, see [`CommonViewConfig::merge`].
pub fn merge_common_metadata(
    rules: &[CommonOverrideRule],
    active: &DimensionAssignment,
    explicit: Option<&ConfigMap>,
) -> Result<ConfigMap> {
    CommonViewConfig::new(rules.to_vec())?.merge(active, explicit)
}

/// The rule that introduced `path` or its closest ancestor.
fn owner_of(owners: &HashMap<Vec<String>, usize>, path: &[String]) -> Option<usize> {
    (1..=path.len())
        .rev()
        .find_map(|len| owners.get(&path[..len]).copied())
}

fn pattern_label(pattern: &DimensionAssignment) -> String {
    pattern
        .iter()
        .map(|(d, c)| format!("{d}: {c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdim_model::config_map;

    fn assignment(pairs: &[(&str, &str)]) -> DimensionAssignment {
        pairs
            .iter()
            .map(|(d, c)| (d.to_string(), c.to_string()))
            .collect()
    }

    fn rule(pairs: &[(&str, &str)], config: ConfigMap) -> CommonOverrideRule {
        CommonOverrideRule::new(assignment(pairs), config)
    }

    #[test]
    fn test_specificity_layering() {
        let common = CommonViewConfig::new(vec![
            rule(&[("sex", "female"), ("age", "10")], config_map! { "title" => "Girls aged 10" }),
            rule(&[], config_map! { "title" => "Default", "tab" => "map" }),
            rule(&[("sex", "female")], config_map! { "title" => "Female", "note" => "F" }),
        ])
        .unwrap();

        let merged = common
            .merge(&assignment(&[("sex", "female"), ("age", "10")]), None)
            .unwrap();
        assert_eq!(merged["title"], ConfigValue::from("Girls aged 10"));
        assert_eq!(merged["tab"], ConfigValue::from("map"));
        assert_eq!(merged["note"], ConfigValue::from("F"));

        let merged = common
            .merge(&assignment(&[("sex", "male"), ("age", "10")]), None)
            .unwrap();
        assert_eq!(merged["title"], ConfigValue::from("Default"));
        assert!(!merged.contains_key("note"));
    }

    #[test]
    fn test_explicit_config_wins() {
        let common = CommonViewConfig::new(vec![rule(
            &[("sex", "female")],
            config_map! { "title" => "Female", "yAxis" => config_map! { "min" => 0i64 } },
        )])
        .unwrap();
        let explicit = config_map! { "title" => "Mine", "yAxis" => config_map! { "max" => 5i64 } };
        let merged = common
            .merge(&assignment(&[("sex", "female")]), Some(&explicit))
            .unwrap();
        assert_eq!(merged["title"], ConfigValue::from("Mine"));
        let y_axis = merged["yAxis"].as_map().unwrap();
        assert_eq!(y_axis.len(), 2);
    }

    #[test]
    fn test_same_specificity_disagreement_is_an_error() {
        let common = CommonViewConfig::new(vec![
            rule(&[("sex", "female")], config_map! { "title" => "A" }),
            rule(&[("age", "10")], config_map! { "title" => "B" }),
        ])
        .unwrap();
        let err = common
            .merge(&assignment(&[("sex", "female"), ("age", "10")]), None)
            .unwrap_err();
        match err {
            EngineError::AmbiguousMerge { path, first, second, .. } => {
                assert_eq!(path, "title");
                assert_eq!((first, second), (0, 1));
            }
            other => panic!("expected ambiguous merge, got {other:?}"),
        }
    }

    #[test]
    fn test_same_specificity_agreement_and_disjoint_keys_merge() {
        let common = CommonViewConfig::new(vec![
            rule(&[("sex", "female")], config_map! { "title" => "A", "map" => config_map! { "time" => 2000i64 } }),
            rule(&[("age", "10")], config_map! { "title" => "A", "map" => config_map! { "colorScale" => "blue" } }),
        ])
        .unwrap();
        let merged = common
            .merge(&assignment(&[("sex", "female"), ("age", "10")]), None)
            .unwrap();
        assert_eq!(merged["map"].as_map().unwrap().len(), 2);
    }

    #[test]
    fn test_nested_disagreement_names_owner() {
        let common = CommonViewConfig::new(vec![
            rule(&[("sex", "female")], config_map! { "map" => config_map! { "time" => 2000i64 } }),
            rule(&[("age", "10")], config_map! { "map" => config_map! { "time" => 2010i64 } }),
        ])
        .unwrap();
        let err = common
            .merge(&assignment(&[("sex", "female"), ("age", "10")]), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousMerge { ref path, .. } if path == "map.time"));
    }

    #[test]
    fn test_duplicate_patterns_rejected() {
        let result = CommonViewConfig::new(vec![
            rule(&[("sex", "female")], config_map! { "title" => "A" }),
            rule(&[("sex", "female")], config_map! { "note" => "B" }),
        ]);
        assert!(matches!(
            result,
            Err(EngineError::DuplicateRulePattern { first: 0, second: 1, .. })
        ));
    }
}
