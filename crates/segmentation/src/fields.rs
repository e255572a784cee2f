//! Field registry: the static catalog of segmentable audience attributes.

use std::collections::HashMap;
use std::path::Path;

use audience_core::{AudienceError, AudienceResult};
use serde::{Deserialize, Serialize};

use crate::predicates::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Demographics,
    Geography,
    Socioeconomic,
    Behavioral,
    Psychographic,
    Digital,
}

impl FieldCategory {
    pub fn all() -> [FieldCategory; 6] {
        [
            FieldCategory::Demographics,
            FieldCategory::Geography,
            FieldCategory::Socioeconomic,
            FieldCategory::Behavioral,
            FieldCategory::Psychographic,
            FieldCategory::Digital,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Enum,
}

impl ValueType {
    /// Every operator the evaluator accepts for this value type.
    pub fn operators(&self) -> &'static [Operator] {
        use Operator::*;
        match self {
            ValueType::Number => &[Eq, Neq, Gt, Gte, Lt, Lte, Between],
            ValueType::String | ValueType::Enum => &[Eq, Neq, Contains, NotContains, In, NotIn],
            ValueType::Boolean => &[Eq, Neq],
        }
    }

    /// Operators offered by the editor. Enum fields are narrowed to equality.
    pub fn editor_operators(&self) -> &'static [Operator] {
        match self {
            ValueType::Enum => &[Operator::Eq, Operator::Neq],
            other => other.operators(),
        }
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub id: String,
    pub label: String,
    pub category: FieldCategory,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

impl FilterField {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        category: FieldCategory,
        value_type: ValueType,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
            value_type,
            options: None,
        }
    }

    pub fn with_options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = Some(
            options
                .iter()
                .map(|(value, label)| FieldOption::new(*value, *label))
                .collect(),
        );
        self
    }
}

/// Immutable catalog of [`FilterField`]s, indexed by id.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FilterField>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Build a registry from an arbitrary catalog, rejecting duplicate ids and
    /// enum fields without options (or non-enum fields carrying them).
    pub fn from_fields(fields: Vec<FilterField>) -> AudienceResult<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (pos, field) in fields.iter().enumerate() {
            if index.insert(field.id.clone(), pos).is_some() {
                return Err(AudienceError::Validation(format!(
                    "duplicate field id: {}",
                    field.id
                )));
            }
            match (field.value_type, &field.options) {
                (ValueType::Enum, Some(options)) if !options.is_empty() => {}
                (ValueType::Enum, _) => {
                    return Err(AudienceError::Validation(format!(
                        "enum field {} has no options",
                        field.id
                    )));
                }
                (_, Some(_)) => {
                    return Err(AudienceError::Validation(format!(
                        "field {} declares options but is not an enum",
                        field.id
                    )));
                }
                (_, None) => {}
            }
        }
        Ok(Self { fields, index })
    }

    /// Parse a JSON array of fields.
    pub fn from_json(json: &str) -> AudienceResult<Self> {
        let fields: Vec<FilterField> = serde_json::from_str(json)?;
        Self::from_fields(fields)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AudienceResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The catalog shipped with the audience builder.
    pub fn builtin() -> Self {
        use FieldCategory::*;
        use ValueType as T;

        let fields = vec![
            // Demographics
            FilterField::new("age", "Age", Demographics, T::Number),
            FilterField::new("gender", "Gender", Demographics, T::Enum).with_options(&[
                ("male", "Male"),
                ("female", "Female"),
                ("non_binary", "Non-binary"),
                ("other", "Other"),
            ]),
            FilterField::new("marital_status", "Marital Status", Demographics, T::Enum)
                .with_options(&[
                    ("single", "Single"),
                    ("married", "Married"),
                    ("divorced", "Divorced"),
                    ("widowed", "Widowed"),
                ]),
            FilterField::new("household_size", "Household Size", Demographics, T::Number),
            FilterField::new("has_children", "Has Children", Demographics, T::Boolean),
            FilterField::new("education", "Education Level", Demographics, T::Enum).with_options(
                &[
                    ("high_school", "High School"),
                    ("bachelors", "Bachelor's Degree"),
                    ("masters", "Master's Degree"),
                    ("doctorate", "Doctorate"),
                ],
            ),
            // Geography
            FilterField::new("country", "Country", Geography, T::String),
            FilterField::new("state", "State", Geography, T::String),
            FilterField::new("city", "City", Geography, T::String),
            FilterField::new("area_type", "Area Type", Geography, T::Enum).with_options(&[
                ("urban", "Urban"),
                ("suburban", "Suburban"),
                ("rural", "Rural"),
            ]),
            FilterField::new("city_tier", "City Tier", Geography, T::Enum).with_options(&[
                ("tier_1", "Tier 1"),
                ("tier_2", "Tier 2"),
                ("tier_3", "Tier 3"),
            ]),
            // Socioeconomic
            FilterField::new("annual_income", "Annual Income", Socioeconomic, T::Number),
            FilterField::new("income_bracket", "Income Bracket", Socioeconomic, T::Enum)
                .with_options(&[
                    ("low", "Low"),
                    ("lower_middle", "Lower Middle"),
                    ("middle", "Middle"),
                    ("upper_middle", "Upper Middle"),
                    ("high", "High"),
                ]),
            FilterField::new("occupation", "Occupation", Socioeconomic, T::String),
            FilterField::new("employment_status", "Employment Status", Socioeconomic, T::Enum)
                .with_options(&[
                    ("employed", "Employed"),
                    ("self_employed", "Self-employed"),
                    ("student", "Student"),
                    ("unemployed", "Unemployed"),
                    ("retired", "Retired"),
                ]),
            FilterField::new("owns_home", "Owns Home", Socioeconomic, T::Boolean),
            // Behavioral
            FilterField::new("purchase_frequency", "Purchases per Month", Behavioral, T::Number),
            FilterField::new("avg_order_value", "Average Order Value", Behavioral, T::Number),
            FilterField::new("preferred_channel", "Preferred Shopping Channel", Behavioral, T::Enum)
                .with_options(&[
                    ("online", "Online"),
                    ("in_store", "In Store"),
                    ("both", "Both"),
                ]),
            FilterField::new("brand_loyal", "Brand Loyal", Behavioral, T::Boolean),
            FilterField::new("price_sensitivity", "Price Sensitivity", Behavioral, T::Enum)
                .with_options(&[("low", "Low"), ("medium", "Medium"), ("high", "High")]),
            // Psychographic
            FilterField::new("interests", "Interests", Psychographic, T::String),
            FilterField::new("lifestyle", "Lifestyle", Psychographic, T::String),
            FilterField::new("values", "Core Values", Psychographic, T::String),
            FilterField::new("early_adopter", "Early Adopter", Psychographic, T::Boolean),
            // Digital
            FilterField::new("daily_screen_time", "Daily Screen Time (hours)", Digital, T::Number),
            FilterField::new("primary_device", "Primary Device", Digital, T::Enum).with_options(&[
                ("mobile", "Mobile"),
                ("desktop", "Desktop"),
                ("tablet", "Tablet"),
            ]),
            FilterField::new("social_platforms", "Social Platforms", Digital, T::String),
            FilterField::new("online_shopper", "Shops Online", Digital, T::Boolean),
        ];

        // The built-in catalog satisfies every registry rule.
        let index = fields
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.id.clone(), pos))
            .collect();
        Self { fields, index }
    }

    pub fn lookup(&self, field_id: &str) -> Option<&FilterField> {
        self.index.get(field_id).map(|&pos| &self.fields[pos])
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    pub fn by_category(&self, category: FieldCategory) -> impl Iterator<Item = &FilterField> {
        self.fields.iter().filter(move |f| f.category == category)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
