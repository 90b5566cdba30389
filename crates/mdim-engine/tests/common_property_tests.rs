use mdim_engine::{merge_common_metadata, EngineError};
use mdim_model::{config_map, CommonOverrideRule, ConfigValue, DimensionAssignment};
use proptest::prelude::*;

fn assignment(pairs: &[(&str, &str)]) -> DimensionAssignment {
    pairs
        .iter()
        .map(|(d, c)| (d.to_string(), c.to_string()))
        .collect()
}

fn label() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z ]{0,12}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn more_specific_rule_wins(general in label(), specific in label(), shuffled in any::<bool>()) {
        let mut rules = vec![
            CommonOverrideRule::new(assignment(&[("sex", "female")]), config_map! { "title" => general.as_str() }),
            CommonOverrideRule::new(
                assignment(&[("sex", "female"), ("age", "10")]),
                config_map! { "title" => specific.as_str() },
            ),
        ];
        if shuffled {
            rules.reverse();
        }
        let active = assignment(&[("sex", "female"), ("age", "10")]);
        let merged = merge_common_metadata(&rules, &active, None).expect("merge");
        prop_assert_eq!(merged.get("title"), Some(&ConfigValue::from(specific.as_str())));
    }

    #[test]
    fn view_config_wins_over_every_rule(rule_title in label(), own_title in label()) {
        let rules = vec![
            CommonOverrideRule::new(assignment(&[]), config_map! { "title" => rule_title.as_str(), "hasMapTab" => true }),
        ];
        let explicit = config_map! { "title" => own_title.as_str() };
        let merged = merge_common_metadata(&rules, &assignment(&[("sex", "male")]), Some(&explicit))
            .expect("merge");
        prop_assert_eq!(merged.get("title"), Some(&ConfigValue::from(own_title.as_str())));
        prop_assert_eq!(merged.get("hasMapTab"), Some(&ConfigValue::Bool(true)));
    }

    #[test]
    fn non_matching_rules_never_apply(title in label()) {
        let rules = vec![
            CommonOverrideRule::new(assignment(&[("sex", "female")]), config_map! { "title" => title.as_str() }),
        ];
        let merged = merge_common_metadata(&rules, &assignment(&[("sex", "male")]), None).expect("merge");
        prop_assert!(merged.is_empty());
    }
}

#[test]
fn test_equal_specificity_disagreement_is_an_error() {
    let rules = vec![
        CommonOverrideRule::new(assignment(&[("sex", "female")]), config_map! { "title" => "Girls" }),
        CommonOverrideRule::new(assignment(&[("age", "10")]), config_map! { "title" => "Ten year olds" }),
    ];
    let active = assignment(&[("sex", "female"), ("age", "10")]);
    match merge_common_metadata(&rules, &active, None) {
        Err(EngineError::AmbiguousMerge { path, first, second, .. }) => {
            assert_eq!(path, "title");
            assert_eq!((first, second), (0, 1));
        }
        other => panic!("expected ambiguous merge, got {other:?}"),
    }
}

#[test]
fn test_equal_specificity_agreement_merges() {
    let rules = vec![
        CommonOverrideRule::new(
            assignment(&[("sex", "female")]),
            config_map! { "title" => "Same", "note" => "from sex" },
        ),
        CommonOverrideRule::new(
            assignment(&[("age", "10")]),
            config_map! { "title" => "Same", "subtitle" => "from age" },
        ),
    ];
    let active = assignment(&[("sex", "female"), ("age", "10")]);
    let merged = merge_common_metadata(&rules, &active, None).unwrap();
    assert_eq!(merged.len(), 3);
}
