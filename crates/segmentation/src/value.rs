//! Condition values, one variant per operator family, and their coercions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::predicates::{Operator, ValueShape};

/// A single typed value as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Scalar::Number(_) => None,
        }
    }

    /// Convert a record attribute. Nulls, arrays and objects have no scalar form.
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Scalar::Number),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

/// Both ends inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub from: Scalar,
    pub to: Scalar,
}

/// The value slot of a condition.
///
/// Serialized without a tag so persisted trees keep the plain document form:
/// `""`, `25`, `true`, `["a","b"]`, `{"from": 1, "to": 5}` or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Null,
    Scalar(Scalar),
    List(Vec<String>),
    Range(ValueRange),
}

impl ConditionValue {
    /// The value a fresh condition starts with: an empty string.
    pub fn empty() -> Self {
        ConditionValue::Scalar(Scalar::Text(String::new()))
    }

    pub fn empty_range() -> Self {
        ConditionValue::range("", "")
    }

    /// Starting value for a condition that just switched to `operator`.
    pub fn default_for(operator: Option<Operator>) -> Self {
        match operator.map(|op| op.value_shape()) {
            Some(ValueShape::Range) => Self::empty_range(),
            _ => Self::empty(),
        }
    }

    pub fn range(from: impl Into<Scalar>, to: impl Into<Scalar>) -> Self {
        ConditionValue::Range(ValueRange {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConditionValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConditionValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ConditionValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&ValueRange> {
        match self {
            ConditionValue::Range(r) => Some(r),
            _ => None,
        }
    }

    /// Membership set for `in`/`not_in`: a stored list or a comma separated
    /// string, trimmed, with empty entries dropped.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            ConditionValue::List(items) => Some(
                items
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            ConditionValue::Scalar(Scalar::Text(s)) => Some(parse_comma_list(s)),
            ConditionValue::Scalar(other) => Some(vec![other.as_text()]),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<ValueShape> {
        match self {
            ConditionValue::Null => None,
            ConditionValue::Scalar(_) => Some(ValueShape::Scalar),
            ConditionValue::List(_) => Some(ValueShape::List),
            ConditionValue::Range(_) => Some(ValueShape::Range),
        }
    }
}

impl Default for ConditionValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Scalar> for ConditionValue {
    fn from(value: Scalar) -> Self {
        ConditionValue::Scalar(value)
    }
}

macro_rules! scalar_condition_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ConditionValue {
            fn from(value: $ty) -> Self {
                ConditionValue::Scalar(value.into())
            }
        })*
    };
}

scalar_condition_value!(f64, i64, bool, &str, String);

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Null => f.write_str("?"),
            ConditionValue::Scalar(s) => write!(f, "{s}"),
            ConditionValue::List(items) => write!(f, "[{}]", items.join(", ")),
            ConditionValue::Range(r) => write!(f, "{} and {}", r.from, r.to),
        }
    }
}

pub fn parse_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
