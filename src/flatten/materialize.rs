//! Record materialization: turn a built shape tree into flat rows
//!
//! Rows are produced bottom-up. Object children are cross-joined left to right,
//! array elements are concatenated in array order. For every node the number of
//! rows equals the record count computed while building the tree.

use crate::flatten::tree::ShapeNode;
use crate::flatten::types::FlatRow;

/// Materialize every row contributed by `node`
pub fn materialize(node: &ShapeNode) -> Vec<FlatRow> {
    let rows = match node {
        ShapeNode::Primitive { path, value, .. } => vec![FlatRow::with_cell(path.clone(), value.clone())],
        ShapeNode::Object { children, .. } => {
            let child_rows: Vec<Vec<FlatRow>> = children.iter().map(materialize).collect();
            cross_join(&child_rows)
        }
        ShapeNode::Array { elements, .. } => elements.iter().flat_map(materialize).collect(),
    };

    debug_assert_eq!(rows.len(), node.record_count(), "row count mismatch at {}", node.path());
    rows
}

/// Pair every running row with every row of the next branch, left to right.
/// Zero branches yield a single empty row.
fn cross_join(branches: &[Vec<FlatRow>]) -> Vec<FlatRow> {
    let mut running = vec![FlatRow::new()];

    for branch in branches {
        let mut joined = Vec::with_capacity(running.len() * branch.len());
        for left in &running {
            for right in branch {
                let mut row = left.clone();
                row.merge(right);
                joined.push(row);
            }
        }
        running = joined;
    }

    running
}
