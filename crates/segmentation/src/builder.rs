//! Fluent builder for condition trees in code.

use crate::predicates::{LogicalOperator, Operator};
use crate::tree::{Condition, ConditionGroup, ConditionTree, FilterNode, IdGenerator};
use crate::value::ConditionValue;

enum Pending {
    Condition {
        field_id: String,
        operator: Operator,
        value: ConditionValue,
    },
    Group(TreeBuilder),
}

/// Builds a group and its descendants; ids are assigned at [`TreeBuilder::build`]
/// time in pre-order, so they match what an editing session would produce.
pub struct TreeBuilder {
    operator: LogicalOperator,
    children: Vec<Pending>,
}

impl TreeBuilder {
    pub fn and() -> Self {
        Self {
            operator: LogicalOperator::And,
            children: Vec::new(),
        }
    }

    pub fn or() -> Self {
        Self {
            operator: LogicalOperator::Or,
            children: Vec::new(),
        }
    }

    pub fn condition(
        mut self,
        field_id: impl Into<String>,
        operator: Operator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.children.push(Pending::Condition {
            field_id: field_id.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn group(mut self, group: TreeBuilder) -> Self {
        self.children.push(Pending::Group(group));
        self
    }

    pub fn build(self) -> ConditionTree {
        self.build_with(&mut IdGenerator::new())
    }

    pub fn build_with(self, ids: &mut IdGenerator) -> ConditionTree {
        ConditionTree {
            root: self.into_group(ids),
        }
    }

    fn into_group(self, ids: &mut IdGenerator) -> ConditionGroup {
        let id = ids.group_id();
        let mut children = Vec::with_capacity(self.children.len().max(1));
        for pending in self.children {
            let node = match pending {
                Pending::Condition {
                    field_id,
                    operator,
                    value,
                } => FilterNode::Condition(Condition {
                    id: ids.condition_id(),
                    field_id: Some(field_id),
                    operator: Some(operator),
                    value,
                }),
                Pending::Group(builder) => FilterNode::Group(builder.into_group(ids)),
            };
            children.push(node);
        }
        // An empty builder still yields a non-empty group.
        if children.is_empty() {
            children.push(FilterNode::Condition(ids.fresh_condition()));
        }
        ConditionGroup {
            id,
            operator: self.operator,
            children,
        }
    }
}
