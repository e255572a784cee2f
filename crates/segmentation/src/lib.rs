//! Audience segmentation filters: a field registry, AND/OR condition trees,
//! invariant-preserving tree edits, and membership evaluation of records.

pub mod builder;
pub mod editor;
pub mod evaluator;
pub mod fields;
pub mod input;
pub mod predicates;
pub mod rows;
pub mod session;
pub mod store;
pub mod tree;
pub mod value;

pub use builder::TreeBuilder;
pub use editor::{ConditionPatch, TreeEdit};
pub use evaluator::{Evaluator, EvaluatorOptions, Record};
pub use fields::{FieldCategory, FieldRegistry, FilterField, ValueType};
pub use input::ValueInput;
pub use predicates::{LogicalOperator, Operator};
pub use rows::{render_rows, TreeRow};
pub use session::{AuthoringSession, EditOutcome};
pub use store::{Audience, AudienceStore, InMemoryAudienceStore};
pub use tree::{Condition, ConditionGroup, ConditionTree, FilterNode, IdGenerator};
pub use value::{ConditionValue, Scalar};
