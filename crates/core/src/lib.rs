pub mod config;
pub mod domain;
pub mod errors;

pub use domain::diff::{compare_rows, ComparisonMode, RowChange, TableComparison};
pub use domain::filter::{FilterError, FilterOperator, Predicate, TableFilter};
pub use domain::query::{Row, TableQuery, TableResult};
pub use domain::snapshot::{SnapshotCatalog, SnapshotId, SnapshotRef, SnapshotState, SnapshotSummary};
pub use domain::table::TableName;
pub use errors::{QueryError, ToolError};
