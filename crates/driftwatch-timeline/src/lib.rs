//! Bucketizes a sequence of [`Event`]s into fixed-width [`TimeWindow`]s with
//! a derived severity and human-readable summary.
//!
//! Grounded in the correlation engine's chunked-parallel confidence scorer:
//! small, pure, bounded fan-out via `tokio::task::JoinSet` rather than a
//! data-parallelism crate, since the degree of parallelism here is at most
//! "one task per window".

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use driftwatch_model::{ChangeType, Event, Severity, SimpleChange, TimeWindow};
use tokio::task::JoinSet;

/// Lifts a [`SimpleChange`] into timeline [`Event`] form using the default
/// severity mapping: `added -> low`, `modified -> medium`, `removed -> high`.
pub fn change_to_event(change: &SimpleChange) -> Event {
    let severity = match change.change_type {
        ChangeType::Added => Severity::Low,
        ChangeType::Modified => Severity::Medium,
        ChangeType::Removed => Severity::High,
    };
    Event {
        id: format!("{}-{}", change.resource_id, change.timestamp.timestamp_millis()),
        timestamp: change.timestamp,
        event_type: change_type_str(change.change_type).to_string(),
        resource_id: change.resource_id.clone(),
        resource_type: change.resource_type.clone(),
        namespace: change.namespace.clone(),
        severity,
        metadata: Default::default(),
    }
}

fn change_type_str(t: ChangeType) -> &'static str {
    match t {
        ChangeType::Added => "added",
        ChangeType::Modified => "modified",
        ChangeType::Removed => "removed",
    }
}

/// Processes `events` into windows of width `window`. Events must not be
/// empty; an empty slice yields an empty window list.
///
/// Windows are processed independently and (for more than two windows) in
/// parallel: bucketing is a pure partition of `events` so no cross-window
/// coordination is needed beyond the initial split.
pub async fn process(events: &[Event], window: std::time::Duration) -> Vec<TimeWindow> {
    if events.is_empty() {
        return Vec::new();
    }

    let window_secs = window.as_secs().max(1) as i64;
    let buckets = bucket_indices(events, window_secs);
    let first_start = truncate(events[0].timestamp, window_secs);

    let mut grouped: HashMap<i64, Vec<Event>> = HashMap::new();
    for (event, index) in events.iter().zip(buckets) {
        grouped.entry(index).or_default().push(event.clone());
    }

    let mut indices: Vec<i64> = grouped.keys().copied().collect();
    indices.sort_unstable();

    if indices.len() <= 2 {
        indices
            .into_iter()
            .map(|index| {
                let events = grouped.remove(&index).unwrap();
                build_window(first_start, index, window_secs, events)
            })
            .collect()
    } else {
        let mut set = JoinSet::new();
        for index in indices {
            let events = grouped.remove(&index).unwrap();
            set.spawn(async move { (index, build_window(first_start, index, window_secs, events)) });
        }
        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            if let Ok(pair) = joined {
                results.push(pair);
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, window)| window).collect()
    }
}

fn truncate(ts: DateTime<Utc>, window_secs: i64) -> DateTime<Utc> {
    let epoch_secs = ts.timestamp();
    let truncated = epoch_secs.div_euclid(window_secs) * window_secs;
    DateTime::<Utc>::from_timestamp(truncated, 0).unwrap_or(ts)
}

fn bucket_indices(events: &[Event], window_secs: i64) -> Vec<i64> {
    let first_start_secs = truncate(events[0].timestamp, window_secs).timestamp();
    events
        .iter()
        .map(|e| (e.timestamp.timestamp() - first_start_secs).div_euclid(window_secs))
        .collect()
}

fn build_window(
    first_start: DateTime<Utc>,
    index: i64,
    window_secs: i64,
    mut events: Vec<Event>,
) -> TimeWindow {
    events.sort_by_key(|e| e.timestamp);
    let start = first_start + ChronoDuration::seconds(index * window_secs);
    let end = start + ChronoDuration::seconds(window_secs);
    let severity = window_severity(&events);
    let summary = window_summary(&events);

    TimeWindow {
        start,
        end,
        duration_secs: window_secs,
        events,
        severity,
        summary,
    }
}

/// First-match-wins severity roll-up (spec.md §4.5):
/// any high member -> high; more than half medium -> medium; else count > 5
/// -> medium; else low; `None` if empty.
fn window_severity(events: &[Event]) -> Option<Severity> {
    if events.is_empty() {
        return None;
    }
    if events.iter().any(|e| e.severity == Severity::High) {
        return Some(Severity::High);
    }
    let medium = events.iter().filter(|e| e.severity == Severity::Medium).count();
    if medium * 2 > events.len() {
        return Some(Severity::Medium);
    }
    if events.len() > 5 {
        return Some(Severity::Medium);
    }
    Some(Severity::Low)
}

fn window_summary(events: &[Event]) -> String {
    let n = events.len();
    if n == 0 {
        return "0 events".to_string();
    }

    let mut types = HashMap::new();
    let mut resource_types = HashMap::new();
    for e in events {
        *types.entry(e.event_type.as_str()).or_insert(0usize) += 1;
        *resource_types.entry(e.resource_type.as_str()).or_insert(0usize) += 1;
    }

    if types.len() == 1 && resource_types.len() == 1 {
        let event_type = types.keys().next().unwrap();
        let resource_type = resource_types.keys().next().unwrap();
        return format!("{n} {event_type} events on {resource_type} resources");
    }

    if let Some((dominant_type, count)) = types.iter().max_by_key(|(_, c)| **c) {
        if *count * 2 > n {
            return format!("{n} events (mostly {dominant_type})");
        }
    }

    format!("{n} events")
}
