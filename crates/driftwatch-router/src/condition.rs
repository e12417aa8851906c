//! Compiled [`RouteCondition`]s: one [`FieldAccessor`] plus the operator and
//! target value, evaluated in order against a request.

use driftwatch_model::{ConditionOperator, ConfigValue, ExportRequest, RouteCondition};
use regex::Regex;

use crate::accessor::{self, FieldAccessor};

pub struct CompiledCondition {
    accessor: FieldAccessor,
    operator: ConditionOperator,
    value: ConfigValue,
    /// Precompiled once at registration time for `Regex` conditions, since
    /// spec.md §4.7 calls out the `regex` operator as "precompiled".
    regex: Option<Regex>,
    field_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConditionCompileError {
    #[error("condition on '{field_path}' has an invalid regex pattern: {message}")]
    InvalidRegex { field_path: String, message: String },
}

impl CompiledCondition {
    pub fn compile(condition: &RouteCondition) -> Result<Self, ConditionCompileError> {
        let regex = if condition.operator == ConditionOperator::Regex {
            let pattern = condition.value.as_str().unwrap_or_default();
            Some(Regex::new(pattern).map_err(|e| ConditionCompileError::InvalidRegex {
                field_path: condition.field_path.clone(),
                message: e.to_string(),
            })?)
        } else {
            None
        };

        Ok(Self {
            accessor: accessor::compile(&condition.field_path),
            operator: condition.operator,
            value: condition.value.clone(),
            regex,
            field_path: condition.field_path.clone(),
        })
    }

    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    pub fn evaluate(&self, request: &ExportRequest) -> bool {
        let Some(actual) = (self.accessor)(request) else {
            // `ne` and `in`-against-absence are the only operators where a
            // missing field can still be meaningfully true/false; everything
            // else treats an absent field as a non-match.
            return matches!(self.operator, ConditionOperator::Ne);
        };
        evaluate_operator(self.operator, &actual, &self.value, self.regex.as_ref())
    }
}

fn evaluate_operator(
    operator: ConditionOperator,
    actual: &ConfigValue,
    expected: &ConfigValue,
    regex: Option<&Regex>,
) -> bool {
    use ConditionOperator::*;
    match operator {
        Eq => values_equal(actual, expected),
        Ne => !values_equal(actual, expected),
        Lt => numeric_cmp(actual, expected).map(|o| o.is_lt()).unwrap_or(false),
        Gt => numeric_cmp(actual, expected).map(|o| o.is_gt()).unwrap_or(false),
        Lte => numeric_cmp(actual, expected).map(|o| o.is_le()).unwrap_or(false),
        Gte => numeric_cmp(actual, expected).map(|o| o.is_ge()).unwrap_or(false),
        Contains => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.contains(e),
            _ => match actual {
                ConfigValue::List(items) => items.iter().any(|v| values_equal(v, expected)),
                _ => false,
            },
        },
        Regex => match (actual.as_str(), regex) {
            (Some(a), Some(re)) => re.is_match(a),
            _ => false,
        },
        In => match expected {
            ConfigValue::List(items) => items.iter().any(|v| values_equal(v, actual)),
            _ => false,
        },
    }
}

/// Numeric comparison is attempted first; string comparison is the
/// fallback (spec.md §4.7).
fn numeric_cmp(actual: &ConfigValue, expected: &ConfigValue) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(e)) = (as_number(actual), as_number(expected)) {
        return a.partial_cmp(&e);
    }
    if let (Some(a), Some(e)) = (actual.as_str(), expected.as_str()) {
        return Some(a.cmp(e));
    }
    None
}

fn as_number(value: &ConfigValue) -> Option<f64> {
    match value {
        ConfigValue::Number(n) => Some(*n),
        ConfigValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn values_equal(a: &ConfigValue, b: &ConfigValue) -> bool {
    if let (Some(an), Some(bn)) = (as_number(a), as_number(b)) {
        return an == bn;
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use driftwatch_model::DataType;

    fn request_with_priority(priority: driftwatch_model::Priority) -> ExportRequest {
        let mut req = ExportRequest::new("json", DataType::Snapshot, ConfigValue::Null);
        req.priority = priority;
        let _ = Utc::now();
        req
    }

    #[test]
    fn numeric_comparison_wins_over_string_when_both_parse() {
        let condition = RouteCondition {
            field_path: "priority".to_string(),
            operator: ConditionOperator::Gte,
            value: ConfigValue::Number(5.0),
        };
        let compiled = CompiledCondition::compile(&condition).unwrap();
        assert!(compiled.evaluate(&request_with_priority(driftwatch_model::Priority::High)));
        assert!(!compiled.evaluate(&request_with_priority(driftwatch_model::Priority::Low)));
    }

    #[test]
    fn regex_is_precompiled_and_reusable() {
        let condition = RouteCondition {
            field_path: "format".to_string(),
            operator: ConditionOperator::Regex,
            value: ConfigValue::String("^json".to_string()),
        };
        let compiled = CompiledCondition::compile(&condition).unwrap();
        let req = ExportRequest::new("json-lines", DataType::Snapshot, ConfigValue::Null);
        assert!(compiled.evaluate(&req));
    }

    #[test]
    fn missing_field_matches_only_ne() {
        let eq = RouteCondition {
            field_path: "options.missing".to_string(),
            operator: ConditionOperator::Eq,
            value: ConfigValue::String("x".to_string()),
        };
        let ne = RouteCondition {
            field_path: "options.missing".to_string(),
            operator: ConditionOperator::Ne,
            value: ConfigValue::String("x".to_string()),
        };
        let req = ExportRequest::new("json", DataType::Snapshot, ConfigValue::Null);
        assert!(!CompiledCondition::compile(&eq).unwrap().evaluate(&req));
        assert!(CompiledCondition::compile(&ne).unwrap().evaluate(&req));
    }
}
