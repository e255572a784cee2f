//! Membership evaluation of records against a condition tree.

use std::collections::HashMap;

use audience_core::config::EvaluatorConfig;
use tracing::trace;

use crate::fields::{FieldRegistry, ValueType};
use crate::predicates::{self, Operator, ValueShape};
use crate::tree::{Condition, ConditionGroup, ConditionTree, FilterNode};
use crate::value::{ConditionValue, Scalar};

/// A candidate audience member: field id to attribute value.
pub type Record = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluatorOptions {
    /// Result for a complete condition whose field is absent (or null) in the record.
    pub missing_field_matches: bool,
}

impl From<&EvaluatorConfig> for EvaluatorOptions {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            missing_field_matches: config.missing_field_matches,
        }
    }
}

/// Evaluates trees against records using field types from a registry.
///
/// Evaluation never fails. Incomplete conditions (no field, no operator, or a
/// field the registry does not know) do not constrain and yield `true`;
/// attribute values that cannot be coerced to the field type yield `false`.
pub struct Evaluator<'r> {
    registry: &'r FieldRegistry,
    options: EvaluatorOptions,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FieldRegistry) -> Self {
        Self {
            registry,
            options: EvaluatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn evaluate(&self, tree: &ConditionTree, record: &Record) -> bool {
        self.evaluate_group(tree.root(), record)
    }

    pub fn evaluate_node(&self, node: &FilterNode, record: &Record) -> bool {
        match node {
            FilterNode::Condition(c) => self.evaluate_condition(c, record),
            FilterNode::Group(g) => self.evaluate_group(g, record),
        }
    }

    pub fn evaluate_group(&self, group: &ConditionGroup, record: &Record) -> bool {
        group
            .operator
            .combine(group.children.iter().map(|child| self.evaluate_node(child, record)))
    }

    pub fn evaluate_condition(&self, condition: &Condition, record: &Record) -> bool {
        let (Some(field_id), Some(operator)) = (condition.field_id.as_deref(), condition.operator)
        else {
            trace!(condition_id = %condition.id, "Incomplete condition, not constraining");
            return true;
        };
        let Some(field) = self.registry.lookup(field_id) else {
            trace!(condition_id = %condition.id, field_id, "Unknown field, not constraining");
            return true;
        };
        let actual = match record.get(field_id) {
            Some(value) if !value.is_null() => value,
            _ => {
                trace!(condition_id = %condition.id, field_id, "Field missing from record");
                return self.options.missing_field_matches;
            }
        };

        let matched = Scalar::from_json(actual)
            .and_then(|actual| match field.value_type {
                ValueType::Number => number_condition(&actual, operator, &condition.value),
                ValueType::String | ValueType::Enum => {
                    text_condition(&actual, operator, &condition.value)
                }
                ValueType::Boolean => bool_condition(&actual, operator, &condition.value),
            })
            .unwrap_or(false);
        trace!(condition_id = %condition.id, field_id, %operator, matched, "Condition evaluated");
        matched
    }

    /// Records satisfying `tree`, in input order.
    pub fn filter<'a>(&self, tree: &ConditionTree, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.evaluate(tree, r)).collect()
    }

    pub fn count_matches(&self, tree: &ConditionTree, records: &[Record]) -> usize {
        records.iter().filter(|r| self.evaluate(tree, r)).count()
    }
}

// `None` from these helpers means a value could not be coerced to the field type.

fn number_condition(
    actual: &Scalar,
    operator: Operator,
    expected: &ConditionValue,
) -> Option<bool> {
    let actual = actual.as_number()?;
    match operator.value_shape() {
        ValueShape::Range => {
            let range = expected.as_range()?;
            let from = range.from.as_number()?;
            let to = range.to.as_number()?;
            Some(predicates::number_between(actual, from, to))
        }
        ValueShape::Scalar => {
            let expected = expected.as_scalar()?.as_number()?;
            Some(predicates::compare_numbers(actual, operator, expected))
        }
        ValueShape::List => None,
    }
}

fn text_condition(actual: &Scalar, operator: Operator, expected: &ConditionValue) -> Option<bool> {
    let actual = actual.as_text();
    match operator.value_shape() {
        ValueShape::List => Some(predicates::text_in_list(&actual, operator, &expected.as_list()?)),
        ValueShape::Scalar => {
            let expected = expected.as_scalar()?.as_text();
            Some(predicates::compare_text(&actual, operator, &expected))
        }
        ValueShape::Range => None,
    }
}

fn bool_condition(actual: &Scalar, operator: Operator, expected: &ConditionValue) -> Option<bool> {
    let actual = actual.as_bool()?;
    let expected = expected.as_scalar()?.as_bool()?;
    Some(predicates::compare_bools(actual, operator, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn condition(field: &str, operator: Operator, value: impl Into<ConditionValue>) -> Condition {
        Condition {
            id: "cond-1".into(),
            field_id: Some(field.into()),
            operator: Some(operator),
            value: value.into(),
        }
    }

    #[test]
    fn test_incomplete_condition_matches_everything() {
        let registry = FieldRegistry::builtin();
        let evaluator = Evaluator::new(&registry);
        let blank = Condition::new("cond-1");
        assert!(evaluator.evaluate_condition(&blank, &record(json!({}))));
        assert!(evaluator.evaluate_condition(&blank, &record(json!({"age": 3}))));

        let mut no_operator = blank.clone();
        no_operator.field_id = Some("age".into());
        assert!(evaluator.evaluate_condition(&no_operator, &record(json!({"age": 3}))));

        let unknown = condition("shoe_size", Operator::Eq, 42.0);
        assert!(evaluator.evaluate_condition(&unknown, &record(json!({}))));
    }

    #[test]
    fn test_missing_field_policy() {
        let registry = FieldRegistry::builtin();
        let cond = condition("age", Operator::Gte, 25.0);
        let strict = Evaluator::new(&registry);
        assert!(!strict.evaluate_condition(&cond, &record(json!({"state": "goa"}))));
        assert!(!strict.evaluate_condition(&cond, &record(json!({"age": null}))));

        let lenient = Evaluator::new(&registry).with_options(EvaluatorOptions {
            missing_field_matches: true,
        });
        assert!(lenient.evaluate_condition(&cond, &record(json!({"state": "goa"}))));
    }

    #[test]
    fn test_numbers() {
        let registry = FieldRegistry::builtin();
        let evaluator = Evaluator::new(&registry);
        let r = record(json!({"age": 30, "annual_income": "55000"}));

        assert!(evaluator.evaluate_condition(&condition("age", Operator::Gt, 25.0), &r));
        assert!(evaluator.evaluate_condition(&condition("age", Operator::Eq, "30"), &r));
        assert!(evaluator.evaluate_condition(
            &condition("annual_income", Operator::Lt, 60000.0),
            &r
        ));
        assert!(evaluator.evaluate_condition(
            &condition("age", Operator::Between, ConditionValue::range("30", 40.0)),
            &r
        ));
        assert!(!evaluator.evaluate_condition(
            &condition("age", Operator::Between, ConditionValue::range(31.0, 40.0)),
            &r
        ));
        // Empty bounds and non-numeric values never satisfy a numeric test.
        assert!(!evaluator.evaluate_condition(
            &condition("age", Operator::Between, ConditionValue::empty_range()),
            &r
        ));
        assert!(!evaluator.evaluate_condition(&condition("age", Operator::Gt, ""), &r));
        assert!(!evaluator.evaluate_condition(
            &condition("age", Operator::Gt, 1.0),
            &record(json!({"age": "thirty"}))
        ));
        assert!(!evaluator.evaluate_condition(&condition("age", Operator::Contains, "3"), &r));
    }

    #[test]
    fn test_strings_and_enums() {
        let registry = FieldRegistry::builtin();
        let evaluator = Evaluator::new(&registry);
        let r = record(json!({
            "city": "Bengaluru",
            "area_type": "urban",
            "interests": "Hiking, Travel"
        }));

        assert!(evaluator.evaluate_condition(&condition("city", Operator::Eq, "Bengaluru"), &r));
        assert!(!evaluator.evaluate_condition(&condition("city", Operator::Eq, "bengaluru"), &r));
        assert!(evaluator.evaluate_condition(&condition("city", Operator::Contains, "GALU"), &r));
        assert!(evaluator.evaluate_condition(
            &condition("interests", Operator::NotContains, "golf"),
            &r
        ));
        assert!(evaluator.evaluate_condition(
            &condition("area_type", Operator::In, "rural, urban"),
            &r
        ));
        assert!(evaluator.evaluate_condition(
            &condition("area_type", Operator::NotIn, ConditionValue::list(["rural", "suburban"])),
            &r
        ));
        assert!(evaluator.evaluate_condition(
            &condition("area_type", Operator::Contains, "urb"),
            &r
        ));
        assert!(!evaluator.evaluate_condition(&condition("city", Operator::Gt, "A"), &r));
    }

    #[test]
    fn test_booleans() {
        let registry = FieldRegistry::builtin();
        let evaluator = Evaluator::new(&registry);
        let r = record(json!({"has_children": true, "owns_home": "false"}));

        assert!(evaluator.evaluate_condition(&condition("has_children", Operator::Eq, true), &r));
        assert!(evaluator.evaluate_condition(
            &condition("has_children", Operator::Neq, "false"),
            &r
        ));
        assert!(evaluator.evaluate_condition(&condition("owns_home", Operator::Eq, false), &r));
        assert!(!evaluator.evaluate_condition(&condition("has_children", Operator::Eq, ""), &r));
        assert!(!evaluator.evaluate_condition(
            &condition("has_children", Operator::Eq, true),
            &record(json!({"has_children": 1}))
        ));
    }
}
