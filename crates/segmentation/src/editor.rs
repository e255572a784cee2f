//! Tree editor: pure edits that map a tree and a command to a new tree.
//!
//! Every operation is total. An id that does not resolve, or resolves to the
//! wrong kind of node, yields a tree equal to the input. Ids are drawn from
//! the generator only when an edit actually inserts nodes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::predicates::{LogicalOperator, Operator};
use crate::tree::{Condition, ConditionTree, FilterNode, IdGenerator, NodeMut};
use crate::value::ConditionValue;

/// Partial update of a condition. Unset members leave the condition as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

impl ConditionPatch {
    pub fn field(field_id: impl Into<String>) -> Self {
        Self {
            field_id: Some(field_id.into()),
            ..Self::default()
        }
    }

    pub fn operator(operator: Operator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn value(value: impl Into<ConditionValue>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_value(mut self, value: impl Into<ConditionValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Apply to `condition`, resetting values whose shape no longer fits.
    ///
    /// A null value is ignored. A field change clears operator and value and
    /// ignores the rest of the patch. Otherwise entering `between` seeds an
    /// empty range and leaving it seeds an empty string, overriding any value
    /// in the patch.
    pub fn apply_to(self, condition: &mut Condition) {
        let field_changing = self
            .field_id
            .as_deref()
            .is_some_and(|f| condition.field_id.as_deref() != Some(f));
        if field_changing {
            condition.field_id = self.field_id;
            condition.operator = None;
            condition.value = ConditionValue::empty();
            return;
        }

        let previous = condition.operator;
        if let Some(value) = self.value.filter(|v| !v.is_null()) {
            condition.value = value;
        }
        if let Some(operator) = self.operator {
            condition.operator = Some(operator);
            if previous != Some(operator) {
                if operator == Operator::Between {
                    condition.value = ConditionValue::empty_range();
                } else if previous == Some(Operator::Between) {
                    condition.value = ConditionValue::empty();
                }
            }
        }
    }
}

/// Find `id`, hand the node to `edit`, and return the edited copy. `edit`
/// reports whether the node was of the kind it expected; when it was not,
/// it must leave the node untouched.
fn rewrite<F>(tree: &ConditionTree, id: &str, operation: &'static str, edit: F) -> ConditionTree
where
    F: FnOnce(NodeMut<'_>) -> bool,
{
    let mut next = tree.clone();
    let applied = next.root.find_mut(id).map(edit).unwrap_or(false);
    if !applied {
        debug!(node_id = %id, operation, "Edit target not found, tree unchanged");
    }
    next
}

/// Append an empty condition to the group `group_id`.
///
/// New ids skip any id already in `tree`, so a stale or foreign generator
/// cannot introduce duplicates.
pub fn add_condition(
    tree: &ConditionTree,
    group_id: &str,
    ids: &mut IdGenerator,
) -> ConditionTree {
    let mut taken = tree.node_ids();
    rewrite(tree, group_id, "add_condition", |node| match node.into_group() {
        Some(group) => {
            let condition = ids.fresh_condition_in(&mut taken);
            group.children.push(FilterNode::Condition(condition));
            true
        }
        None => false,
    })
}

/// Append a nested `AND` group, seeded with one empty condition, to `parent_group_id`.
pub fn add_group(
    tree: &ConditionTree,
    parent_group_id: &str,
    ids: &mut IdGenerator,
) -> ConditionTree {
    let mut taken = tree.node_ids();
    rewrite(tree, parent_group_id, "add_group", |node| match node.into_group() {
        Some(group) => {
            group.children.push(FilterNode::Group(ids.fresh_group_in(&mut taken)));
            true
        }
        None => false,
    })
}

/// Remove `node_id` from its parent. The root is never removed, and a group
/// emptied by the removal is refilled with a fresh empty condition.
pub fn remove_node(tree: &ConditionTree, node_id: &str, ids: &mut IdGenerator) -> ConditionTree {
    if tree.root.id == node_id {
        debug!(node_id = %node_id, "Refusing to remove the root group");
        return tree.clone();
    }
    let mut taken = tree.node_ids();
    let mut next = tree.clone();
    let removed = next
        .root
        .remove_descendant(node_id, &mut || ids.fresh_condition_in(&mut taken));
    if !removed {
        debug!(
            node_id = %node_id,
            operation = "remove_node",
            "Edit target not found, tree unchanged"
        );
    }
    next
}

pub fn set_group_operator(
    tree: &ConditionTree,
    group_id: &str,
    operator: LogicalOperator,
) -> ConditionTree {
    rewrite(tree, group_id, "set_group_operator", |node| match node.into_group() {
        Some(group) => {
            group.operator = operator;
            true
        }
        None => false,
    })
}

pub fn update_condition(
    tree: &ConditionTree,
    condition_id: &str,
    patch: ConditionPatch,
) -> ConditionTree {
    rewrite(tree, condition_id, "update_condition", |node| match node.into_condition() {
        Some(condition) => {
            patch.apply_to(condition);
            true
        }
        None => false,
    })
}

/// An editor operation as data, the form in which a UI submits edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TreeEdit {
    AddCondition {
        group_id: String,
    },
    AddGroup {
        parent_group_id: String,
    },
    RemoveNode {
        node_id: String,
    },
    SetGroupOperator {
        group_id: String,
        operator: LogicalOperator,
    },
    UpdateCondition {
        condition_id: String,
        patch: ConditionPatch,
    },
}

impl TreeEdit {
    pub fn target_id(&self) -> &str {
        match self {
            TreeEdit::AddCondition { group_id } => group_id,
            TreeEdit::AddGroup { parent_group_id } => parent_group_id,
            TreeEdit::RemoveNode { node_id } => node_id,
            TreeEdit::SetGroupOperator { group_id, .. } => group_id,
            TreeEdit::UpdateCondition { condition_id, .. } => condition_id,
        }
    }

    pub fn apply(self, tree: &ConditionTree, ids: &mut IdGenerator) -> ConditionTree {
        match self {
            TreeEdit::AddCondition { group_id } => add_condition(tree, &group_id, ids),
            TreeEdit::AddGroup { parent_group_id } => add_group(tree, &parent_group_id, ids),
            TreeEdit::RemoveNode { node_id } => remove_node(tree, &node_id, ids),
            TreeEdit::SetGroupOperator { group_id, operator } => {
                set_group_operator(tree, &group_id, operator)
            }
            TreeEdit::UpdateCondition {
                condition_id,
                patch,
            } => update_condition(tree, &condition_id, patch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seed() -> (ConditionTree, IdGenerator) {
        let mut ids = IdGenerator::new();
        let tree = ConditionTree::new(&mut ids);
        (tree, ids)
    }

    fn patch_cond(tree: &ConditionTree, patch: ConditionPatch) -> ConditionTree {
        update_condition(tree, "cond-2", patch)
    }

    #[test]
    fn test_add_condition_appends() {
        let (tree, mut ids) = seed();
        let tree = add_condition(&tree, "group-1", &mut ids);
        let ids_in_root: Vec<&str> = tree.root().children.iter().map(|c| c.id()).collect();
        assert_eq!(ids_in_root, vec!["cond-2", "cond-3"]);
    }

    #[test]
    fn test_add_condition_to_condition_is_noop() {
        let (tree, mut ids) = seed();
        let after = add_condition(&tree, "cond-2", &mut ids);
        assert_eq!(after, tree);
        let after = add_condition(&tree, "group-42", &mut ids);
        assert_eq!(after, tree);
        // No ids were consumed by the failed edits.
        assert_eq!(ids.condition_id(), "cond-3");
    }

    #[test]
    fn test_add_nested_group() {
        let (tree, mut ids) = seed();
        let tree = add_group(&tree, "group-1", &mut ids);
        let tree = add_group(&tree, "group-3", &mut ids);
        let inner = tree.group("group-5").unwrap();
        assert_eq!(inner.operator, LogicalOperator::And);
        assert_eq!(inner.children.len(), 1);
        assert!(tree.condition("cond-6").is_some());
        tree.validate().unwrap();
    }

    #[test]
    fn test_remove_root_is_noop() {
        let (tree, mut ids) = seed();
        assert_eq!(remove_node(&tree, "group-1", &mut ids), tree);
    }

    #[test]
    fn test_remove_last_condition_refills() {
        let (tree, mut ids) = seed();
        let tree = remove_node(&tree, "cond-2", &mut ids);
        assert_eq!(tree.root().children.len(), 1);
        let refill = tree.condition("cond-3").unwrap();
        assert!(!refill.is_complete());
    }

    #[test]
    fn test_remove_in_nested_group_keeps_group() {
        let (tree, mut ids) = seed();
        let tree = add_group(&tree, "group-1", &mut ids);
        let tree = remove_node(&tree, "cond-4", &mut ids);
        let nested = tree.group("group-3").unwrap();
        assert_eq!(nested.children.len(), 1);
        assert_eq!(nested.children[0].id(), "cond-5");
        assert_eq!(tree.root().children.len(), 2);
    }

    #[test]
    fn test_remove_group_with_descendants() {
        let (tree, mut ids) = seed();
        let tree = add_group(&tree, "group-1", &mut ids);
        let tree = remove_node(&tree, "group-3", &mut ids);
        assert!(tree.find("group-3").is_none());
        assert!(tree.find("cond-4").is_none());
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (tree, mut ids) = seed();
        assert_eq!(remove_node(&tree, "cond-77", &mut ids), tree);
    }

    #[test]
    fn test_foreign_generator_never_duplicates_ids() {
        let (tree, _) = seed();
        let tree = add_condition(&tree, "group-1", &mut IdGenerator::new());
        let tree = add_condition(&tree, "group-1", &mut IdGenerator::new());
        let tree = add_group(&tree, "group-1", &mut IdGenerator::new());
        let tree = remove_node(&tree, "cond-2", &mut IdGenerator::new());
        tree.validate().unwrap();
        let mut node_ids: Vec<String> = tree.node_ids().into_iter().collect();
        node_ids.sort();
        assert_eq!(node_ids, vec!["cond-1", "cond-3", "cond-4", "group-1", "group-2"]);
    }

    #[test]
    fn test_set_group_operator() {
        let (tree, mut ids) = seed();
        let tree = add_condition(&tree, "group-1", &mut ids);
        let after = set_group_operator(&tree, "group-1", LogicalOperator::Or);
        assert_eq!(after.root().operator, LogicalOperator::Or);
        assert_eq!(after.root().children, tree.root().children);
        assert_eq!(set_group_operator(&tree, "cond-2", LogicalOperator::Or), tree);
    }

    #[test]
    fn test_field_change_resets_operator_and_value() {
        let (tree, _) = seed();
        let tree = update_condition(
            &tree,
            "cond-2",
            ConditionPatch::field("age")
                .with_operator(Operator::Gt)
                .with_value(5.0),
        );
        // The field changed, so operator and value in the same patch are discarded.
        let cond = tree.condition("cond-2").unwrap();
        assert_eq!(cond.operator, None);

        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Gt).with_value(5.0));
        let cond = tree.condition("cond-2").unwrap();
        assert_eq!(cond.operator, Some(Operator::Gt));
        assert_eq!(cond.value, ConditionValue::from(5.0));

        let tree = patch_cond(&tree, ConditionPatch::field("household_size"));
        let cond = tree.condition("cond-2").unwrap();
        assert_eq!(cond.field_id.as_deref(), Some("household_size"));
        assert_eq!(cond.operator, None);
        assert_eq!(cond.value, ConditionValue::empty());
    }

    #[test]
    fn test_same_field_keeps_operator() {
        let (tree, _) = seed();
        let tree = patch_cond(&tree, ConditionPatch::field("age"));
        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Lt).with_value(40.0));
        let tree = patch_cond(&tree, ConditionPatch::field("age"));
        let cond = tree.condition("cond-2").unwrap();
        assert_eq!(cond.operator, Some(Operator::Lt));
        assert_eq!(cond.value, ConditionValue::from(40.0));
    }

    #[test]
    fn test_between_resets() {
        let (tree, _) = seed();
        let tree = patch_cond(&tree, ConditionPatch::field("age"));
        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Gte).with_value(18.0));
        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Between).with_value(3.0));
        assert_eq!(tree.condition("cond-2").unwrap().value, ConditionValue::empty_range());

        let tree = patch_cond(&tree, ConditionPatch::value(ConditionValue::range(18.0, 30.0)));
        assert_eq!(tree.condition("cond-2").unwrap().value, ConditionValue::range(18.0, 30.0));

        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Lte));
        assert_eq!(tree.condition("cond-2").unwrap().value, ConditionValue::empty());
    }

    #[test]
    fn test_operator_change_outside_between_keeps_value() {
        let (tree, _) = seed();
        let tree = patch_cond(&tree, ConditionPatch::field("age"));
        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Gt).with_value(21.0));
        let tree = patch_cond(&tree, ConditionPatch::operator(Operator::Gte));
        assert_eq!(tree.condition("cond-2").unwrap().value, ConditionValue::from(21.0));
    }

    #[test]
    fn test_null_value_is_ignored() {
        let (tree, _) = seed();
        let tree = patch_cond(&tree, ConditionPatch::field("age"));
        let tree = update_condition(
            &tree,
            "cond-2",
            ConditionPatch::operator(Operator::Gt).with_value(21.0),
        );
        let from_api = patch_cond(&tree, ConditionPatch::value(ConditionValue::Null));
        assert_eq!(from_api, tree);

        let patch: ConditionPatch =
            serde_json::from_value(serde_json::json!({"value": null})).unwrap();
        assert_eq!(patch_cond(&tree, patch), tree);
    }

    #[test]
    fn test_update_group_id_is_noop() {
        let (tree, _) = seed();
        assert_eq!(update_condition(&tree, "group-1", ConditionPatch::field("age")), tree);
    }

    #[test]
    fn test_edit_commands_from_json() {
        let edits: Vec<TreeEdit> = serde_json::from_value(serde_json::json!([
            {"op": "add_group", "parentGroupId": "group-1"},
            {"op": "set_group_operator", "groupId": "group-3", "operator": "OR"},
            {"op": "update_condition", "conditionId": "cond-2", "patch": {"fieldId": "state"}},
            {
                "op": "update_condition",
                "conditionId": "cond-2",
                "patch": {"operator": "eq", "value": "karnataka"}
            },
            {"op": "remove_node", "nodeId": "cond-4"}
        ]))
        .unwrap();
        assert_eq!(edits[0].target_id(), "group-1");

        let (mut tree, mut ids) = seed();
        for edit in edits {
            tree = edit.apply(&tree, &mut ids);
        }
        assert_eq!(tree.group("group-3").unwrap().operator, LogicalOperator::Or);
        assert_eq!(tree.to_string(), "(state = \"karnataka\" AND (?))");
        tree.validate().unwrap();
    }
}
