//! Compiled field accessors: the redesign called for in spec.md §9
//! ("interface-with-switch pattern in the router ... model field access as a
//! precomputed accessor closure per route, built once at route compile
//! time; runtime evaluation is a tight sequence of calls to those
//! accessors").
//!
//! A [`FieldAccessor`] is built once when a route is registered and never
//! re-parses the field path string again; matching a request is just
//! calling the closure.

use std::sync::Arc;

use driftwatch_model::{ConfigValue, ExportRequest};

pub type FieldAccessor = Arc<dyn Fn(&ExportRequest) -> Option<ConfigValue> + Send + Sync>;

/// Compiles a dotted field path (`"data_type"`, `"options.destination"`,
/// `"metadata.owner"`, ...) into a closure that reads that field off an
/// [`ExportRequest`] without re-parsing the path on every evaluation.
pub fn compile(field_path: &str) -> FieldAccessor {
    match field_path {
        "data_type" => Arc::new(|req| Some(ConfigValue::String(data_type_str(req).to_string()))),
        "format" => Arc::new(|req| Some(ConfigValue::String(req.format.clone()))),
        "priority" => Arc::new(|req| Some(ConfigValue::Number(req.priority as u8 as f64))),
        "plugin_name" => Arc::new(|req| req.plugin_name.clone().map(ConfigValue::String)),
        "async" => Arc::new(|req| Some(ConfigValue::Bool(req.is_async))),
        "id" => Arc::new(|req| Some(ConfigValue::String(req.id.clone()))),
        path if path.starts_with("options.") => {
            let key = path["options.".len()..].to_string();
            Arc::new(move |req| req.options.get(&key).cloned())
        }
        path if path.starts_with("metadata.") => {
            let key = path["metadata.".len()..].to_string();
            Arc::new(move |req| lookup_nested(&req.data, &["metadata", &key]))
        }
        path if path.starts_with("data.") => {
            let segments: Vec<String> = path["data.".len()..].split('.').map(String::from).collect();
            Arc::new(move |req| {
                let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
                lookup_nested(&req.data, &refs)
            })
        }
        other => {
            let key = other.to_string();
            Arc::new(move |req| req.options.get(&key).cloned())
        }
    }
}

fn data_type_str(req: &ExportRequest) -> &'static str {
    use driftwatch_model::DataType::*;
    match req.data_type {
        DriftReport => "drift_report",
        Snapshot => "snapshot",
        Correlation => "correlation",
        Baseline => "baseline",
        Timeline => "timeline",
        Metrics => "metrics",
        Events => "events",
        Alert => "alert",
    }
}

fn lookup_nested(value: &ConfigValue, path: &[&str]) -> Option<ConfigValue> {
    let mut current = value;
    for segment in path {
        match current {
            ConfigValue::Map(map) => current = map.get(*segment)?,
            _ => return None,
        }
    }
    Some(current.clone())
}
