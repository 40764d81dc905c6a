//! Field selection and flattening of nested JSON into tabular rows
//!
//! The pipeline runs in two passes per document. A shape tree restricted to
//! the selected paths is built first, with a record count on every node; the
//! tree is then materialized bottom-up into flat rows.
//!
//! ## Reusing selections
//!
//! Building a `PathIndex` is the only per-selection cost. Keep one in a
//! `SchemaCache` (or an `Arc` of your own) when flattening many documents
//! against the same path list.

pub mod types;
pub mod path_index;
pub mod evaluator;
pub mod tree;
pub mod materialize;
pub mod flattener;
pub mod schema_file;
pub mod writer;

pub use types::{FlatRow, FlattenConfig};
pub use path_index::{PathIndex, PathSegment, Selector};
pub use evaluator::{DottedPathEvaluator, EvalError, PathEvaluator};
pub use tree::{NodeKind, ShapeNode, ShapeTreeBuilder};
pub use materialize::materialize;
pub use flattener::{flatten, JsonFlattener, SchemaCache};
pub use schema_file::SchemaFile;
pub use writer::{OutputFormat, RowWriter};
