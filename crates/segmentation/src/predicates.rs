//! Operator vocabulary and the primitive comparisons behind condition evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a group combines its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Fold child results. `And` over nothing is true, `Or` over nothing is false.
    pub fn combine(&self, mut results: impl Iterator<Item = bool>) -> bool {
        match self {
            LogicalOperator::And => results.all(|r| r),
            LogicalOperator::Or => results.any(|r| r),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("AND"),
            LogicalOperator::Or => f.write_str("OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    Contains,
    NotContains,
    In,
    NotIn,
}

/// Shape of the value a condition stores for a given operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Range,
    List,
}

impl Operator {
    pub fn all() -> [Operator; 11] {
        use Operator::*;
        [Eq, Neq, Gt, Gte, Lt, Lte, Between, Contains, NotContains, In, NotIn]
    }

    pub fn value_shape(&self) -> ValueShape {
        match self {
            Operator::Between => ValueShape::Range,
            Operator::In | Operator::NotIn => ValueShape::List,
            _ => ValueShape::Scalar,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Between => "between",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

pub fn compare_numbers(actual: f64, operator: Operator, expected: f64) -> bool {
    match operator {
        Operator::Eq => actual == expected,
        Operator::Neq => actual != expected,
        Operator::Gt => actual > expected,
        Operator::Gte => actual >= expected,
        Operator::Lt => actual < expected,
        Operator::Lte => actual <= expected,
        _ => false,
    }
}

/// Inclusive on both ends.
pub fn number_between(actual: f64, from: f64, to: f64) -> bool {
    from <= actual && actual <= to
}

/// Equality is exact; substring tests ignore case.
pub fn compare_text(actual: &str, operator: Operator, expected: &str) -> bool {
    match operator {
        Operator::Eq => actual == expected,
        Operator::Neq => actual != expected,
        Operator::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
        Operator::NotContains => !actual.to_lowercase().contains(&expected.to_lowercase()),
        _ => false,
    }
}

pub fn text_in_list(actual: &str, operator: Operator, list: &[String]) -> bool {
    let member = list.iter().any(|item| item == actual.trim());
    match operator {
        Operator::In => member,
        Operator::NotIn => !member,
        _ => false,
    }
}

pub fn compare_bools(actual: bool, operator: Operator, expected: bool) -> bool {
    match operator {
        Operator::Eq => actual == expected,
        Operator::Neq => actual != expected,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_combine() {
        assert!(!LogicalOperator::And.combine([true, false].into_iter()));
        assert!(LogicalOperator::Or.combine([true, false].into_iter()));
        assert!(LogicalOperator::And.combine(std::iter::empty()));
        assert!(!LogicalOperator::Or.combine(std::iter::empty()));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(compare_numbers(30.0, Operator::Gte, 25.0));
        assert!(compare_numbers(25.0, Operator::Gte, 25.0));
        assert!(!compare_numbers(20.0, Operator::Gt, 25.0));
        assert!(compare_numbers(20.0, Operator::Neq, 25.0));
        assert!(!compare_numbers(20.0, Operator::Contains, 20.0));
        assert!(number_between(10.0, 10.0, 20.0));
        assert!(number_between(20.0, 10.0, 20.0));
        assert!(!number_between(20.5, 10.0, 20.0));
    }

    #[test]
    fn test_text_comparisons() {
        assert!(compare_text("Karnataka", Operator::Contains, "karna"));
        assert!(!compare_text("Karnataka", Operator::NotContains, "KARNA"));
        assert!(!compare_text("Karnataka", Operator::Eq, "karnataka"));
        assert!(compare_text("Karnataka", Operator::Neq, "karnataka"));
        assert!(!compare_text("Karnataka", Operator::Gt, "a"));
    }

    #[test]
    fn test_list_membership() {
        let list = vec!["urban".to_string(), "suburban".to_string()];
        assert!(text_in_list("urban", Operator::In, &list));
        assert!(!text_in_list("rural", Operator::In, &list));
        assert!(text_in_list("rural", Operator::NotIn, &list));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Operator::NotContains).unwrap(), "\"not_contains\"");
        assert_eq!(serde_json::to_string(&LogicalOperator::Or).unwrap(), "\"OR\"");
        let op: Operator = serde_json::from_str("\"gte\"").unwrap();
        assert_eq!(op, Operator::Gte);
    }
}
