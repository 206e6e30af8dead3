//! Node affinity from scheduler labels
//!
//! The scheduler labels carry a small `key=value,key=value` language. Hard
//! labels become one required node selector term, soft labels one preferred
//! term. Affinity maps to `In`, anti-affinity to `NotIn`.

use crate::labels::{
    HOST_AFFINITY_LABEL, HOST_ANTI_AFFINITY_LABEL, HOST_SOFT_AFFINITY_LABEL,
    HOST_SOFT_ANTI_AFFINITY_LABEL,
};
use crate::models::Container;
use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PreferredSchedulingTerm,
};

/// Weight of the preferred term; the source has no per-rule priority
pub const PREFERRED_WEIGHT: i32 = 100;

const OP_IN: &str = "In";
const OP_NOT_IN: &str = "NotIn";

/// Parse `key1=val1,key2=val2` into pairs
///
/// Entries are trimmed. Entries without `=` or with an empty key are
/// skipped. Duplicate keys are kept as separate pairs. Only the first `=`
/// splits, so values may contain `=`.
pub fn parse_selector(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| entry.trim().split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn requirements(raw: &str, operator: &str) -> Vec<NodeSelectorRequirement> {
    parse_selector(raw)
        .into_iter()
        .map(|(key, value)| NodeSelectorRequirement {
            key,
            operator: operator.to_string(),
            values: Some(vec![value]),
        })
        .collect()
}

/// Union of the `In` and `NotIn` requirements for a label pair, or `None`
/// when neither label is present
fn term(container: &Container, affinity: &str, anti_affinity: &str) -> Option<NodeSelectorTerm> {
    let affinity = container.label(affinity);
    let anti_affinity = container.label(anti_affinity);

    if affinity.is_none() && anti_affinity.is_none() {
        return None;
    }

    let mut expressions = Vec::new();
    if let Some(raw) = affinity {
        expressions.extend(requirements(raw, OP_IN));
    }
    if let Some(raw) = anti_affinity {
        expressions.extend(requirements(raw, OP_NOT_IN));
    }

    Some(NodeSelectorTerm {
        match_expressions: Some(expressions),
        match_fields: None,
    })
}

/// Node affinity for a container, `None` when no scheduler label is set
pub fn affinity(container: &Container) -> Option<Affinity> {
    let required = term(container, HOST_AFFINITY_LABEL, HOST_ANTI_AFFINITY_LABEL);
    let preferred = term(
        container,
        HOST_SOFT_AFFINITY_LABEL,
        HOST_SOFT_ANTI_AFFINITY_LABEL,
    );

    if required.is_none() && preferred.is_none() {
        return None;
    }

    Some(Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: required.map(|term| {
                NodeSelector {
                    node_selector_terms: vec![term],
                }
            }),
            preferred_during_scheduling_ignored_during_execution: preferred.map(|preference| {
                vec![PreferredSchedulingTerm {
                    preference,
                    weight: PREFERRED_WEIGHT,
                }]
            }),
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelValue;

    fn with_labels(labels: &[(&str, &str)]) -> Container {
        Container {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), LabelValue::from(*v)))
                .collect(),
            ..Default::default()
        }
    }

    fn requirement(key: &str, operator: &str, value: &str) -> NodeSelectorRequirement {
        NodeSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: Some(vec![value.to_string()]),
        }
    }

    fn expected_requirements() -> Vec<NodeSelectorRequirement> {
        vec![
            requirement("key1", "In", "val1"),
            requirement("key2", "In", "val2"),
            requirement("key3", "NotIn", "val3"),
            requirement("key4", "NotIn", "val4"),
        ]
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            parse_selector("key1=val1,key2=val2"),
            vec![
                ("key1".to_string(), "val1".to_string()),
                ("key2".to_string(), "val2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_selector_skips_malformed_entries() {
        assert_eq!(
            parse_selector("broken,key=val,,=nokey, spaced = out "),
            vec![
                ("key".to_string(), "val".to_string()),
                ("spaced".to_string(), "out".to_string()),
            ]
        );
        assert!(parse_selector("").is_empty());
    }

    #[test]
    fn test_parse_selector_keeps_duplicates_and_inner_equals() {
        assert_eq!(
            parse_selector("zone=a,zone=b,expr=x=y"),
            vec![
                ("zone".to_string(), "a".to_string()),
                ("zone".to_string(), "b".to_string()),
                ("expr".to_string(), "x=y".to_string()),
            ]
        );
    }

    #[test]
    fn test_required_affinity() {
        let affinity = affinity(&with_labels(&[
            (HOST_AFFINITY_LABEL, "key1=val1,key2=val2"),
            (HOST_ANTI_AFFINITY_LABEL, "key3=val3,key4=val4"),
        ]))
        .unwrap();

        let node_affinity = affinity.node_affinity.unwrap();
        assert!(node_affinity
            .preferred_during_scheduling_ignored_during_execution
            .is_none());

        let terms = node_affinity
            .required_during_scheduling_ignored_during_execution
            .unwrap()
            .node_selector_terms;
        assert_eq!(terms.len(), 1);

        let expressions = terms[0].match_expressions.clone().unwrap();
        assert_eq!(expressions.len(), 4);
        for expected in expected_requirements() {
            assert!(expressions.contains(&expected), "missing {:?}", expected);
        }
    }

    #[test]
    fn test_preferred_affinity() {
        let affinity = affinity(&with_labels(&[
            (HOST_SOFT_AFFINITY_LABEL, "key1=val1,key2=val2"),
            (HOST_SOFT_ANTI_AFFINITY_LABEL, "key3=val3,key4=val4"),
        ]))
        .unwrap();

        let node_affinity = affinity.node_affinity.unwrap();
        assert!(node_affinity
            .required_during_scheduling_ignored_during_execution
            .is_none());

        let preferred = node_affinity
            .preferred_during_scheduling_ignored_during_execution
            .unwrap();
        assert_eq!(preferred.len(), 1);
        assert_eq!(preferred[0].weight, PREFERRED_WEIGHT);

        let expressions = preferred[0].preference.match_expressions.clone().unwrap();
        assert_eq!(expressions.len(), 4);
        for expected in expected_requirements() {
            assert!(expressions.contains(&expected), "missing {:?}", expected);
        }
    }

    #[test]
    fn test_key_order_does_not_change_requirements() {
        let forward = affinity(&with_labels(&[(HOST_AFFINITY_LABEL, "key1=val1,key2=val2")]));
        let reverse = affinity(&with_labels(&[(HOST_AFFINITY_LABEL, "key2=val2,key1=val1")]));

        let expressions = |a: Option<Affinity>| {
            let mut expressions = a
                .and_then(|a| a.node_affinity)
                .and_then(|n| n.required_during_scheduling_ignored_during_execution)
                .map(|s| s.node_selector_terms[0].match_expressions.clone().unwrap())
                .unwrap();
            expressions.sort_by(|a, b| a.key.cmp(&b.key));
            expressions
        };

        assert_eq!(expressions(forward), expressions(reverse));
    }

    #[test]
    fn test_no_scheduler_labels() {
        assert!(affinity(&with_labels(&[("unrelated", "a=b")])).is_none());
    }

    #[test]
    fn test_present_but_malformed_label_still_allocates_term() {
        let affinity = affinity(&with_labels(&[(HOST_ANTI_AFFINITY_LABEL, "garbage")])).unwrap();

        let terms = affinity
            .node_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap()
            .node_selector_terms;
        assert_eq!(terms[0].match_expressions, Some(vec![]));
    }
}
