//! Authoring session state. One tree and its id counter per edit session.

use serde::Serialize;
use tracing::{debug, info};

use crate::editor::{ConditionPatch, TreeEdit};
use crate::predicates::LogicalOperator;
use crate::tree::{ConditionTree, IdGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    Applied,
    NoOp,
}

/// The single source of truth while an audience filter is being authored.
///
/// Edits replace the tree wholesale. Nothing here is persisted; hand
/// [`AuthoringSession::tree`] to an [`crate::store::AudienceStore`] to save.
#[derive(Debug, Clone)]
pub struct AuthoringSession {
    tree: ConditionTree,
    ids: IdGenerator,
    revision: u64,
}

impl AuthoringSession {
    pub fn new() -> Self {
        let mut ids = IdGenerator::new();
        let tree = ConditionTree::new(&mut ids);
        info!(root_id = %tree.root().id, "Authoring session started");
        Self {
            tree,
            ids,
            revision: 0,
        }
    }

    /// Continue editing a saved tree. New ids continue after the highest
    /// generated id already present.
    pub fn resume(tree: ConditionTree) -> Self {
        let ids = IdGenerator::resume_after(&tree);
        info!(
            root_id = %tree.root().id,
            nodes = tree.node_count(),
            "Authoring session resumed"
        );
        Self {
            tree,
            ids,
            revision: 0,
        }
    }

    pub fn tree(&self) -> &ConditionTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConditionTree {
        self.tree
    }

    /// Number of edits that changed the tree.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn apply(&mut self, edit: TreeEdit) -> EditOutcome {
        let target = edit.target_id().to_string();
        let next = edit.apply(&self.tree, &mut self.ids);
        if next == self.tree {
            debug!(target_id = %target, revision = self.revision, "Edit left tree unchanged");
            return EditOutcome::NoOp;
        }
        self.tree = next;
        self.revision += 1;
        debug!(target_id = %target, revision = self.revision, "Edit applied");
        EditOutcome::Applied
    }

    pub fn add_condition(&mut self, group_id: &str) -> EditOutcome {
        self.apply(TreeEdit::AddCondition {
            group_id: group_id.to_string(),
        })
    }

    pub fn add_group(&mut self, parent_group_id: &str) -> EditOutcome {
        self.apply(TreeEdit::AddGroup {
            parent_group_id: parent_group_id.to_string(),
        })
    }

    pub fn remove_node(&mut self, node_id: &str) -> EditOutcome {
        self.apply(TreeEdit::RemoveNode {
            node_id: node_id.to_string(),
        })
    }

    pub fn set_group_operator(&mut self, group_id: &str, operator: LogicalOperator) -> EditOutcome {
        self.apply(TreeEdit::SetGroupOperator {
            group_id: group_id.to_string(),
            operator,
        })
    }

    pub fn update_condition(&mut self, condition_id: &str, patch: ConditionPatch) -> EditOutcome {
        self.apply(TreeEdit::UpdateCondition {
            condition_id: condition_id.to_string(),
            patch,
        })
    }
}

impl Default for AuthoringSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::Operator;

    #[test]
    fn test_outcomes_and_revision() {
        let mut session = AuthoringSession::new();
        assert_eq!(session.add_condition("group-1"), EditOutcome::Applied);
        assert_eq!(session.add_condition("cond-2"), EditOutcome::NoOp);
        assert_eq!(session.remove_node("group-1"), EditOutcome::NoOp);
        assert_eq!(
            session.set_group_operator("group-1", LogicalOperator::And),
            EditOutcome::NoOp
        );
        assert_eq!(
            session.set_group_operator("group-1", LogicalOperator::Or),
            EditOutcome::Applied
        );
        assert_eq!(session.revision(), 2);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut session = AuthoringSession::new();
        session.add_condition("group-1"); // cond-3
        session.remove_node("cond-3");
        session.add_condition("group-1");
        assert!(session.tree().condition("cond-3").is_none());
        assert!(session.tree().condition("cond-4").is_some());
    }

    #[test]
    fn test_resume_continues_numbering() {
        let mut session = AuthoringSession::new();
        session.add_group("group-1");
        session.update_condition("cond-4", ConditionPatch::field("age"));
        session.update_condition("cond-4", ConditionPatch::operator(Operator::Gt).with_value(40.0));

        let json = serde_json::to_string(session.tree()).unwrap();
        let restored: ConditionTree = serde_json::from_str(&json).unwrap();
        let mut resumed = AuthoringSession::resume(restored);
        assert_eq!(resumed.tree(), session.tree());

        resumed.add_condition("group-3");
        assert!(resumed.tree().condition("cond-5").is_some());
        resumed.tree().validate().unwrap();
    }

    #[test]
    fn test_resume_after_largest_possible_id() {
        let tree: ConditionTree = serde_json::from_value(serde_json::json!({
            "kind": "group", "id": "group-1", "operator": "AND", "children": [
                {"kind": "condition", "id": "cond-18446744073709551615",
                 "fieldId": null, "operator": null, "value": ""}
            ]
        }))
        .unwrap();
        let mut session = AuthoringSession::resume(tree);
        assert_eq!(session.add_condition("group-1"), EditOutcome::Applied);
        assert_eq!(session.add_group("group-1"), EditOutcome::Applied);
        assert_eq!(session.remove_node("cond-18446744073709551615"), EditOutcome::Applied);
        session.tree().validate().unwrap();
        assert_eq!(session.tree().node_count(), 4);
        assert!(session.tree().condition("cond-1").is_some());
    }
}
