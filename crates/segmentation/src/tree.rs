//! Condition tree model: condition leaves, AND/OR groups, and session-scoped ids.
//!
//! Every group holds at least one child and every node id is unique within
//! its tree. Trees coming from outside (deserialization, [`ConditionTree::from_root`])
//! are validated against both rules; trees produced by the editor keep them
//! by construction.

use std::collections::HashSet;
use std::fmt;

use audience_core::{AudienceError, AudienceResult};
use serde::{Deserialize, Serialize};

use crate::predicates::{LogicalOperator, Operator};
use crate::value::ConditionValue;

const CONDITION_PREFIX: &str = "cond-";
const GROUP_PREFIX: &str = "group-";

/// Leaf constraint. Field and operator stay unset until the user picks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub field_id: Option<String>,
    pub operator: Option<Operator>,
    #[serde(default)]
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_id: None,
            operator: None,
            value: ConditionValue::empty(),
        }
    }

    /// A condition with both a field and an operator chosen.
    pub fn is_complete(&self) -> bool {
        self.field_id.is_some() && self.operator.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub id: String,
    pub operator: LogicalOperator,
    pub children: Vec<FilterNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterNode {
    Condition(Condition),
    Group(ConditionGroup),
}

/// Shared view of a node found by id.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Condition(&'a Condition),
    Group(&'a ConditionGroup),
}

#[derive(Debug)]
pub enum NodeMut<'a> {
    Condition(&'a mut Condition),
    Group(&'a mut ConditionGroup),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            NodeRef::Condition(c) => &c.id,
            NodeRef::Group(g) => &g.id,
        }
    }

    pub fn as_condition(&self) -> Option<&'a Condition> {
        match *self {
            NodeRef::Condition(c) => Some(c),
            NodeRef::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&'a ConditionGroup> {
        match *self {
            NodeRef::Group(g) => Some(g),
            NodeRef::Condition(_) => None,
        }
    }
}

impl<'a> NodeMut<'a> {
    pub fn into_group(self) -> Option<&'a mut ConditionGroup> {
        match self {
            NodeMut::Group(g) => Some(g),
            NodeMut::Condition(_) => None,
        }
    }

    pub fn into_condition(self) -> Option<&'a mut Condition> {
        match self {
            NodeMut::Condition(c) => Some(c),
            NodeMut::Group(_) => None,
        }
    }
}

impl FilterNode {
    pub fn id(&self) -> &str {
        self.node_ref().id()
    }

    pub fn node_ref(&self) -> NodeRef<'_> {
        match self {
            FilterNode::Condition(c) => NodeRef::Condition(c),
            FilterNode::Group(g) => NodeRef::Group(g),
        }
    }
}

impl ConditionGroup {
    /// An `AND` group seeded with one empty condition.
    pub fn new(id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operator: LogicalOperator::And,
            children: vec![FilterNode::Condition(Condition::new(child_id))],
        }
    }

    /// Depth-first search for `id`, including this group itself.
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        if self.id == id {
            return Some(NodeRef::Group(self));
        }
        self.children.iter().find_map(|child| match child {
            FilterNode::Condition(c) if c.id == id => Some(NodeRef::Condition(c)),
            FilterNode::Condition(_) => None,
            FilterNode::Group(g) => g.find(id),
        })
    }

    pub fn find_mut(&mut self, id: &str) -> Option<NodeMut<'_>> {
        if self.id == id {
            return Some(NodeMut::Group(self));
        }
        for child in &mut self.children {
            match child {
                FilterNode::Condition(c) if c.id == id => return Some(NodeMut::Condition(c)),
                FilterNode::Condition(_) => {}
                FilterNode::Group(g) => {
                    if let Some(found) = g.find_mut(id) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Detach the descendant `id` from its parent. A parent left without
    /// children receives the condition produced by `refill`.
    pub(crate) fn remove_descendant<F>(&mut self, id: &str, refill: &mut F) -> bool
    where
        F: FnMut() -> Condition,
    {
        if let Some(pos) = self.children.iter().position(|c| c.id() == id) {
            self.children.remove(pos);
            if self.children.is_empty() {
                self.children.push(FilterNode::Condition(refill()));
            }
            return true;
        }
        self.children.iter_mut().any(|child| match child {
            FilterNode::Group(g) => g.remove_descendant(id, refill),
            FilterNode::Condition(_) => false,
        })
    }

    /// Pre-order walk. The visitor receives each node, its parent id and depth.
    pub fn walk<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(NodeRef<'a>, Option<&'a str>, usize),
    {
        visitor(NodeRef::Group(self), None, 0);
        self.walk_children(visitor, 1);
    }

    fn walk_children<'a, F>(&'a self, visitor: &mut F, depth: usize)
    where
        F: FnMut(NodeRef<'a>, Option<&'a str>, usize),
    {
        for child in &self.children {
            visitor(child.node_ref(), Some(self.id.as_str()), depth);
            if let FilterNode::Group(g) = child {
                g.walk_children(visitor, depth + 1);
            }
        }
    }
}

/// Monotonic id source for one authoring session. Ids are not reused after
/// the node carrying them is removed. Editor inserts also skip any id the
/// target tree already holds.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Continue numbering past every `cond-<n>`/`group-<n>` id already in `tree`.
    pub fn resume_after(tree: &ConditionTree) -> Self {
        let mut highest = 0;
        tree.root.walk(&mut |node, _, _| {
            let id = node.id();
            let suffix = id
                .strip_prefix(CONDITION_PREFIX)
                .or_else(|| id.strip_prefix(GROUP_PREFIX));
            if let Some(n) = suffix.and_then(|s| s.parse::<u64>().ok()) {
                highest = highest.max(n);
            }
        });
        Self {
            next: highest.checked_add(1).unwrap_or(1),
        }
    }

    pub fn condition_id(&mut self) -> String {
        format!("{CONDITION_PREFIX}{}", self.bump())
    }

    pub fn group_id(&mut self) -> String {
        format!("{GROUP_PREFIX}{}", self.bump())
    }

    pub fn fresh_condition(&mut self) -> Condition {
        Condition::new(self.condition_id())
    }

    pub fn fresh_group(&mut self) -> ConditionGroup {
        let id = self.group_id();
        ConditionGroup::new(id, self.condition_id())
    }

    /// Condition with an id not present in `taken`. The id is added to `taken`.
    pub fn fresh_condition_in(&mut self, taken: &mut HashSet<String>) -> Condition {
        Condition::new(self.claim(CONDITION_PREFIX, taken))
    }

    /// Group and seed condition with ids not present in `taken`.
    pub fn fresh_group_in(&mut self, taken: &mut HashSet<String>) -> ConditionGroup {
        let id = self.claim(GROUP_PREFIX, taken);
        ConditionGroup::new(id, self.claim(CONDITION_PREFIX, taken))
    }

    fn claim(&mut self, prefix: &str, taken: &mut HashSet<String>) -> String {
        loop {
            let id = format!("{prefix}{}", self.bump());
            if taken.insert(id.clone()) {
                return id;
            }
        }
    }

    // Past u64::MAX numbering restarts at 1; `claim` skips ids still in use.
    fn bump(&mut self) -> u64 {
        let n = self.next;
        self.next = n.checked_add(1).unwrap_or(1);
        n
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A root group plus the structural invariants the editor maintains.
///
/// Serialized as the root group node itself, `kind` tag included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FilterNode", into = "FilterNode")]
pub struct ConditionTree {
    pub(crate) root: ConditionGroup,
}

impl ConditionTree {
    /// The seed tree of a new session: one `AND` group with one empty condition.
    pub fn new(ids: &mut IdGenerator) -> Self {
        Self {
            root: ids.fresh_group(),
        }
    }

    pub fn from_root(root: ConditionGroup) -> AudienceResult<Self> {
        let tree = Self { root };
        tree.validate()?;
        Ok(tree)
    }

    pub fn root(&self) -> &ConditionGroup {
        &self.root
    }

    pub fn into_root(self) -> ConditionGroup {
        self.root
    }

    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        self.root.find(id)
    }

    pub fn condition(&self, id: &str) -> Option<&Condition> {
        self.find(id).and_then(|node| node.as_condition())
    }

    pub fn group(&self, id: &str) -> Option<&ConditionGroup> {
        self.find(id).and_then(|node| node.as_group())
    }

    /// Every node id in the tree, root included.
    pub fn node_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        self.root.walk(&mut |node, _, _| {
            ids.insert(node.id().to_string());
        });
        ids
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |_, _, _| count += 1);
        count
    }

    /// Check that no group is empty and no id repeats.
    pub fn validate(&self) -> AudienceResult<()> {
        let mut seen = HashSet::new();
        let mut problem = None;
        self.root.walk(&mut |node, _, _| {
            if problem.is_some() {
                return;
            }
            if !seen.insert(node.id()) {
                problem = Some(format!("duplicate node id: {}", node.id()));
            } else if let NodeRef::Group(g) = node {
                if g.children.is_empty() {
                    problem = Some(format!("group {} has no children", g.id));
                }
            }
        });
        match problem {
            Some(msg) => Err(AudienceError::Validation(msg)),
            None => Ok(()),
        }
    }
}

impl TryFrom<FilterNode> for ConditionTree {
    type Error = AudienceError;

    fn try_from(node: FilterNode) -> Result<Self, Self::Error> {
        match node {
            FilterNode::Group(root) => Self::from_root(root),
            FilterNode::Condition(c) => Err(AudienceError::Validation(format!(
                "tree root {} must be a group",
                c.id
            ))),
        }
    }
}

impl From<ConditionTree> for FilterNode {
    fn from(tree: ConditionTree) -> Self {
        FilterNode::Group(tree.root)
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_group(f, &self.root)
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, group: &ConditionGroup) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in group.children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", group.operator)?;
        }
        match child {
            FilterNode::Group(g) => write_group(f, g)?,
            FilterNode::Condition(c) => match (&c.field_id, c.operator) {
                (Some(field), Some(op)) => write!(f, "{field} {op} {}", c.value)?,
                _ => f.write_str("?")?,
            },
        }
    }
    f.write_str(")")
}
