//! Flattened, read-only view of a tree for rendering nested rows.

use serde::Serialize;

use crate::predicates::{LogicalOperator, Operator};
use crate::tree::{ConditionTree, NodeRef};
use crate::value::ConditionValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RowKind {
    Group {
        operator: LogicalOperator,
        child_count: usize,
    },
    Condition {
        field_id: Option<String>,
        operator: Option<Operator>,
        value: ConditionValue,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    /// Every row except the root may be removed.
    pub removable: bool,
    #[serde(flatten)]
    pub kind: RowKind,
}

/// Pre-order rows, root first.
pub fn render_rows(tree: &ConditionTree) -> Vec<TreeRow> {
    let mut rows = Vec::with_capacity(tree.node_count());
    tree.root().walk(&mut |node, parent, depth| {
        let kind = match node {
            NodeRef::Group(g) => RowKind::Group {
                operator: g.operator,
                child_count: g.children.len(),
            },
            NodeRef::Condition(c) => RowKind::Condition {
                field_id: c.field_id.clone(),
                operator: c.operator,
                value: c.value.clone(),
            },
        };
        rows.push(TreeRow {
            id: node.id().to_string(),
            parent_id: parent.map(str::to_string),
            depth,
            removable: parent.is_some(),
            kind,
        });
    });
    rows
}
