//! Prometheus text exposition format (`text/plain; version=0.0.4`), shared
//! by the metrics collector's own reporting surface and the `prometheus`
//! export plugin in `driftwatch-export`.
//!
//! Spec.md §6: `# HELP`/`# TYPE` preamble once per metric name, label
//! values escaped for backslash/quote/newline, labels sorted for stable
//! output, each sample timestamped in milliseconds.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::snapshot::PluginMetricsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: MetricType,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub timestamp_millis: i64,
}

/// Renders samples into the exposition format. Samples for the same metric
/// name must be adjacent for the single HELP/TYPE preamble to land
/// correctly; [`samples_for_snapshot`] already emits them grouped.
pub fn render(samples: &[MetricSample]) -> String {
    let mut out = String::new();
    let mut last_name: Option<&str> = None;
    for sample in samples {
        if last_name != Some(sample.name) {
            let _ = writeln!(out, "# HELP {} {}", sample.name, sample.help);
            let _ = writeln!(out, "# TYPE {} {}", sample.name, sample.metric_type.as_str());
            last_name = Some(sample.name);
        }
        let label_str = render_labels(&sample.labels);
        let _ = writeln!(
            out,
            "{}{} {} {}",
            sample.name, label_str, format_value(sample.value), sample.timestamp_millis
        );
    }
    out
}

fn render_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let mut out = String::from("{");
    for (i, (key, value)) in labels.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{key}=\"{}\"", escape_label_value(value));
    }
    out.push('}');
    out
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Builds the standard sample set for one plugin's snapshot, grouped by
/// metric name so [`render`] emits each preamble exactly once.
pub fn samples_for_snapshot(snapshot: &PluginMetricsSnapshot, timestamp_millis: i64) -> Vec<MetricSample> {
    let mut labels = BTreeMap::new();
    labels.insert("plugin".to_string(), snapshot.plugin_name.clone());

    vec![
        MetricSample {
            name: "driftwatch_export_requests_total",
            help: "Total export requests handled by this plugin",
            metric_type: MetricType::Counter,
            labels: labels.clone(),
            value: snapshot.total_requests as f64,
            timestamp_millis,
        },
        MetricSample {
            name: "driftwatch_export_requests_successful_total",
            help: "Successful export requests handled by this plugin",
            metric_type: MetricType::Counter,
            labels: labels.clone(),
            value: snapshot.successful_requests as f64,
            timestamp_millis,
        },
        MetricSample {
            name: "driftwatch_export_requests_failed_total",
            help: "Failed export requests handled by this plugin",
            metric_type: MetricType::Counter,
            labels: labels.clone(),
            value: snapshot.failed_requests as f64,
            timestamp_millis,
        },
        MetricSample {
            name: "driftwatch_export_latency_ms_avg",
            help: "Exponentially smoothed average export latency in milliseconds",
            metric_type: MetricType::Gauge,
            labels: labels.clone(),
            value: snapshot.avg_latency_ms,
            timestamp_millis,
        },
        MetricSample {
            name: "driftwatch_export_error_rate",
            help: "Failed requests divided by total requests",
            metric_type: MetricType::Gauge,
            labels,
            value: snapshot.error_rate(),
            timestamp_millis,
        },
    ]
}

/// Renders every plugin's snapshot, grouping by metric name across plugins
/// (all plugins' `requests_total` together) rather than by plugin, matching
/// the "HELP/TYPE once per metric name" requirement when there is more than
/// one plugin.
pub fn render_all(snapshots: &[PluginMetricsSnapshot], timestamp_millis: i64) -> String {
    let per_plugin: Vec<Vec<MetricSample>> = snapshots
        .iter()
        .map(|s| samples_for_snapshot(s, timestamp_millis))
        .collect();

    let metric_count = per_plugin.first().map(|v| v.len()).unwrap_or(0);
    let mut grouped = Vec::new();
    for metric_index in 0..metric_count {
        for plugin_samples in &per_plugin {
            grouped.push(plugin_samples[metric_index].clone());
        }
    }
    render(&grouped)
}
