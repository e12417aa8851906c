//! Compiled [`RoutePattern`] matching: data type, format, destination glob,
//! priority, tag subset, then the ordered custom conditions.

use driftwatch_model::{ConfigValue, ExportRequest, RoutePattern};

use crate::condition::{CompiledCondition, ConditionCompileError};

pub struct CompiledPattern {
    pattern: RoutePattern,
    conditions: Vec<CompiledCondition>,
}

impl CompiledPattern {
    pub fn compile(pattern: RoutePattern) -> Result<Self, ConditionCompileError> {
        let conditions = pattern
            .conditions
            .iter()
            .map(CompiledCondition::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pattern, conditions })
    }

    pub fn matches(&self, request: &ExportRequest) -> bool {
        if let Some(wanted) = &self.pattern.data_type {
            if !data_type_matches(wanted, request) {
                return false;
            }
        }

        if let Some(format) = &self.pattern.format {
            if !glob_matches(format, &request.format) {
                return false;
            }
        }

        if let Some(destination) = &self.pattern.destination {
            let actual = request
                .options
                .get("destination")
                .and_then(ConfigValue::as_str)
                .unwrap_or("");
            if !glob_matches(destination, actual) {
                return false;
            }
        }

        if let Some(priority) = self.pattern.priority {
            if request.priority as i32 != priority {
                return false;
            }
        }

        for (key, wanted_value) in &self.pattern.tags {
            let actual = request
                .options
                .get(key)
                .or_else(|| lookup_tag(&request.data, key));
            match actual {
                Some(value) => {
                    if wanted_value != "*" {
                        let actual_str = value.as_str().unwrap_or_default();
                        if actual_str != wanted_value {
                            return false;
                        }
                    }
                }
                None => return false,
            }
        }

        self.conditions.iter().all(|c| c.evaluate(request))
    }
}

fn lookup_tag<'a>(data: &'a ConfigValue, key: &str) -> Option<&'a ConfigValue> {
    match data {
        ConfigValue::Map(map) => map.get("tags").and_then(|tags| match tags {
            ConfigValue::Map(tag_map) => tag_map.get(key),
            _ => None,
        }),
        _ => None,
    }
}

fn data_type_matches(wanted: &str, request: &ExportRequest) -> bool {
    use driftwatch_model::DataType::*;
    let actual = match request.data_type {
        DriftReport => "drift_report",
        Snapshot => "snapshot",
        Correlation => "correlation",
        Baseline => "baseline",
        Timeline => "timeline",
        Metrics => "metrics",
        Events => "events",
        Alert => "alert",
    };
    wanted == actual
}

/// `*` matches anything; a pattern ending in `*` matches any value sharing
/// its prefix; otherwise exact match. Enough glob surface for spec.md
/// §4.7's "`*` and glob" destination/format matching without pulling in a
/// dedicated glob crate for two wildcard shapes.
fn glob_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return value.starts_with(prefix);
    }
    pattern == value
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_model::DataType;

    fn request(format: &str, data_type: DataType) -> ExportRequest {
        ExportRequest::new(format, data_type, ConfigValue::Null)
    }

    #[test]
    fn matches_on_format_glob() {
        let pattern = RoutePattern {
            format: Some("json*".to_string()),
            ..Default::default()
        };
        let compiled = CompiledPattern::compile(pattern).unwrap();
        assert!(compiled.matches(&request("json-lines", DataType::Snapshot)));
        assert!(!compiled.matches(&request("yaml", DataType::Snapshot)));
    }

    #[test]
    fn wildcard_destination_matches_anything() {
        let pattern = RoutePattern {
            destination: Some("*".to_string()),
            ..Default::default()
        };
        let compiled = CompiledPattern::compile(pattern).unwrap();
        assert!(compiled.matches(&request("json", DataType::Snapshot)));
    }

    #[test]
    fn data_type_mismatch_fails() {
        let pattern = RoutePattern {
            data_type: Some("metrics".to_string()),
            ..Default::default()
        };
        let compiled = CompiledPattern::compile(pattern).unwrap();
        assert!(!compiled.matches(&request("json", DataType::Snapshot)));
        assert!(compiled.matches(&request("json", DataType::Metrics)));
    }
}
