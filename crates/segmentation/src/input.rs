//! Value editor selection for a condition's field and operator.

use serde::Serialize;

use crate::fields::{FieldOption, FilterField, ValueType};
use crate::predicates::{Operator, ValueShape};

/// Which input a value editor should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum ValueInput {
    Text,
    Number,
    /// Two number inputs, `from` and `to`.
    NumberRange,
    Select { options: Vec<FieldOption> },
    Boolean,
    /// Free text split on commas.
    CommaList,
}

impl ValueInput {
    /// `None` while no operator is chosen, or when the operator does not
    /// apply to the field's value type.
    pub fn resolve(field: &FilterField, operator: Option<Operator>) -> Option<Self> {
        let operator = operator?;
        if !field.value_type.supports(operator) {
            return None;
        }
        let input = match (operator.value_shape(), field.value_type) {
            (ValueShape::List, _) => ValueInput::CommaList,
            (ValueShape::Range, _) => ValueInput::NumberRange,
            (ValueShape::Scalar, ValueType::Number) => ValueInput::Number,
            (ValueShape::Scalar, ValueType::String) => ValueInput::Text,
            (ValueShape::Scalar, ValueType::Boolean) => ValueInput::Boolean,
            (ValueShape::Scalar, ValueType::Enum) => ValueInput::Select {
                options: field.options.clone().unwrap_or_default(),
            },
        };
        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;

    #[test]
    fn test_resolve_inputs() {
        let registry = FieldRegistry::builtin();
        let age = registry.lookup("age").unwrap();
        let city = registry.lookup("city").unwrap();
        let gender = registry.lookup("gender").unwrap();
        let owns_home = registry.lookup("owns_home").unwrap();

        assert_eq!(ValueInput::resolve(age, None), None);
        assert_eq!(ValueInput::resolve(age, Some(Operator::Gt)), Some(ValueInput::Number));
        assert_eq!(
            ValueInput::resolve(age, Some(Operator::Between)),
            Some(ValueInput::NumberRange)
        );
        assert_eq!(ValueInput::resolve(age, Some(Operator::Contains)), None);
        assert_eq!(ValueInput::resolve(city, Some(Operator::Contains)), Some(ValueInput::Text));
        assert_eq!(
            ValueInput::resolve(city, Some(Operator::NotIn)),
            Some(ValueInput::CommaList)
        );
        assert_eq!(
            ValueInput::resolve(owns_home, Some(Operator::Eq)),
            Some(ValueInput::Boolean)
        );

        match ValueInput::resolve(gender, Some(Operator::Eq)) {
            Some(ValueInput::Select { options }) => assert_eq!(options.len(), 4),
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn test_range_input_only_for_numbers() {
        let registry = FieldRegistry::builtin();
        for field in registry.fields() {
            let input = ValueInput::resolve(field, Some(Operator::Between));
            match field.value_type {
                ValueType::Number => assert_eq!(input, Some(ValueInput::NumberRange)),
                _ => assert_eq!(input, None, "field {}", field.id),
            }
        }
    }
}
