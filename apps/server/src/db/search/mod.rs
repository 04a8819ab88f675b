//! Search engine internals: property classification, predicate IR, condition
//! compiler, cursor codec and SQL rendering.

pub mod compiler;
pub mod cursor;
pub(crate) mod escape;
pub mod plan;
pub mod predicate;
pub mod property;
pub mod query_builder;
pub mod resolver;

pub use compiler::{CompileOutcome, CompiledFilters, ConditionCompiler};
pub use cursor::{Cursor, CURSOR_VERSION};
pub use plan::{Projection, SearchPlan, Seek, SortKey};
pub use predicate::{AttributeTest, Comparison, LikePattern, Predicate, Scalar, ValueCast};
pub use property::{Column, ColumnKind, PropertyRef, RelationshipTarget};
pub use query_builder::{BindValue, QueryBuilder};
pub use resolver::CustomFieldResolver;
