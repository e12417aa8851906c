//! Confidence scoring (spec.md §4.4): a small additive score mapped onto a
//! discrete [`Confidence`] level by [`Confidence::from_score`].

use std::collections::HashSet;

use driftwatch_model::{Confidence, SimpleChange};

use crate::matchers::PatternKind;

pub fn score_group(changes: &[SimpleChange], pattern: PatternKind) -> i32 {
    let mut score = 0;
    score += time_span_bonus(changes);
    score += namespace_bonus(changes);
    score += pattern.score_bonus();
    score += member_count_bonus(changes);
    score
}

fn time_span_bonus(changes: &[SimpleChange]) -> i32 {
    let Some(min) = changes.iter().map(|c| c.timestamp).min() else {
        return 0;
    };
    let max = changes.iter().map(|c| c.timestamp).max().unwrap();
    let span_secs = (max - min).num_seconds();

    if span_secs <= 30 {
        3
    } else if span_secs <= 120 {
        2
    } else if span_secs <= 300 {
        1
    } else {
        0
    }
}

fn namespace_bonus(changes: &[SimpleChange]) -> i32 {
    let namespaces: HashSet<&Option<String>> = changes.iter().map(|c| &c.namespace).collect();
    if namespaces.len() == 1 && namespaces.iter().next().unwrap().is_some() {
        2
    } else {
        0
    }
}

fn member_count_bonus(changes: &[SimpleChange]) -> i32 {
    if changes.len() >= 5 {
        2
    } else if changes.len() >= 3 {
        1
    } else {
        0
    }
}

pub fn confidence_for(changes: &[SimpleChange], pattern: PatternKind) -> Confidence {
    Confidence::from_score(score_group(changes, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn change(id: &str, secs: i64, namespace: Option<&str>) -> SimpleChange {
        SimpleChange {
            change_type: driftwatch_model::ChangeType::Modified,
            resource_id: id.to_string(),
            resource_type: "deployment".to_string(),
            resource_name: id.to_string(),
            namespace: namespace.map(|s| s.to_string()),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            details: vec![],
        }
    }

    #[test]
    fn tight_same_namespace_scaling_pair_is_high_confidence() {
        let changes = vec![change("a", 0, Some("default")), change("b", 5, Some("default"))];
        assert_eq!(confidence_for(&changes, PatternKind::Scaling), Confidence::High);
    }

    #[test]
    fn wide_time_span_drops_confidence() {
        let changes = vec![change("a", 0, Some("default")), change("b", 10_000, Some("default"))];
        assert_eq!(confidence_for(&changes, PatternKind::Scaling), Confidence::Low);
    }

    #[test]
    fn three_secrets_in_one_namespace_within_window_is_high() {
        let changes = vec![
            change("a", 0, Some("default")),
            change("b", 5, Some("default")),
            change("c", 10, Some("default")),
        ];
        assert_eq!(confidence_for(&changes, PatternKind::SecurityChanges), Confidence::High);
    }
}
