//! Shape tree construction
//!
//! The shape tree mirrors only the selected branches of one document. Each
//! node knows how many flat rows it will produce before any row exists:
//! sibling branches multiply (cross-join) and array elements add (row union).

use crate::flatten::evaluator::PathEvaluator;
use crate::flatten::path_index::{child_path, is_array_segment, PathIndex, ROOT};
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

/// Classification of a shape tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    Primitive,
}

/// One selected position in the source document
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeNode {
    /// A position with selected descendants; its rows are the cross-join of its children
    Object {
        name: String,
        path: String,
        children: Vec<ShapeNode>,
        record_count: usize,
    },
    /// A `[*]` position; its rows are the union of its element rows
    Array {
        name: String,
        path: String,
        elements: Vec<ShapeNode>,
        record_count: usize,
    },
    /// A selected leaf holding the value found at `path` (null when absent)
    Primitive {
        name: String,
        path: String,
        value: Value,
    },
}

impl ShapeNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ShapeNode::Object { .. } => NodeKind::Object,
            ShapeNode::Array { .. } => NodeKind::Array,
            ShapeNode::Primitive { .. } => NodeKind::Primitive,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShapeNode::Object { name, .. }
            | ShapeNode::Array { name, .. }
            | ShapeNode::Primitive { name, .. } => name,
        }
    }

    /// Fully qualified path, used as the column name of leaves
    pub fn path(&self) -> &str {
        match self {
            ShapeNode::Object { path, .. }
            | ShapeNode::Array { path, .. }
            | ShapeNode::Primitive { path, .. } => path,
        }
    }

    /// Number of flat rows this node contributes
    pub fn record_count(&self) -> usize {
        match self {
            ShapeNode::Object { record_count, .. } | ShapeNode::Array { record_count, .. } => {
                *record_count
            }
            ShapeNode::Primitive { .. } => 1,
        }
    }

    /// Child nodes (object children or array elements)
    pub fn children(&self) -> &[ShapeNode] {
        match self {
            ShapeNode::Object { children, .. } => children,
            ShapeNode::Array { elements, .. } => elements,
            ShapeNode::Primitive { .. } => &[],
        }
    }
}

/// Builds shape trees for documents against one path index
pub struct ShapeTreeBuilder<'a, E: PathEvaluator> {
    index: &'a PathIndex,
    evaluator: &'a E,
}

impl<'a, E: PathEvaluator> ShapeTreeBuilder<'a, E> {
    pub fn new(index: &'a PathIndex, evaluator: &'a E) -> Self {
        ShapeTreeBuilder { index, evaluator }
    }

    /// Build the tree for one document; the root is always an object node
    pub fn build(&self, document: &Value) -> ShapeNode {
        let (children, record_count) = self.build_level(Some(document), ROOT);
        ShapeNode::Object {
            name: ROOT.to_string(),
            path: ROOT.to_string(),
            children,
            record_count,
        }
    }

    /// Build the selected children under `path`, returning them with the
    /// product of their record counts
    fn build_level(&self, value: Option<&Value>, path: &str) -> (Vec<ShapeNode>, usize) {
        let Some(segments) = self.index.children(path) else {
            return (Vec::new(), 1);
        };

        let mut children = Vec::with_capacity(segments.len());
        let mut level_count: usize = 1;

        for segment in segments {
            let node_path = child_path(path, segment);
            let child_value = self.evaluate(value, segment);

            let node = if is_array_segment(segment) {
                self.build_array(child_value, segment, node_path)
            } else if self.index.has_children(&node_path) {
                let (grandchildren, record_count) = self.build_level(child_value.as_deref(), &node_path);
                ShapeNode::Object {
                    name: segment.clone(),
                    path: node_path,
                    children: grandchildren,
                    record_count,
                }
            } else {
                ShapeNode::Primitive {
                    name: segment.clone(),
                    path: node_path,
                    value: child_value.map(Cow::into_owned).unwrap_or(Value::Null),
                }
            };

            level_count = level_count.saturating_mul(node.record_count());
            children.push(node);
        }

        (children, level_count)
    }

    /// Build an array slot: one element node per entry, or a single null
    /// placeholder when the array is absent or empty
    fn build_array<'v>(&self, value: Option<Cow<'v, Value>>, segment: &str, path: String) -> ShapeNode {
        let entries: Vec<Option<Cow<'v, Value>>> = match value {
            Some(Cow::Borrowed(Value::Array(items))) if !items.is_empty() => {
                items.iter().map(|item| Some(Cow::Borrowed(item))).collect()
            }
            Some(Cow::Owned(Value::Array(items))) if !items.is_empty() => {
                items.into_iter().map(|item| Some(Cow::Owned(item))).collect()
            }
            _ => vec![None],
        };

        let mut elements = Vec::with_capacity(entries.len());
        let mut record_count: usize = 0;
        for entry in entries {
            let element = self.build_element(entry, segment, &path);
            record_count = record_count.saturating_add(element.record_count());
            elements.push(element);
        }

        ShapeNode::Array {
            name: segment.to_string(),
            path,
            elements,
            record_count,
        }
    }

    fn build_element(&self, value: Option<Cow<'_, Value>>, segment: &str, path: &str) -> ShapeNode {
        if self.index.has_children(path) {
            let (children, record_count) = self.build_level(value.as_deref(), path);
            ShapeNode::Object {
                name: segment.to_string(),
                path: path.to_string(),
                children,
                record_count,
            }
        } else {
            ShapeNode::Primitive {
                name: segment.to_string(),
                path: path.to_string(),
                value: value.map(Cow::into_owned).unwrap_or(Value::Null),
            }
        }
    }

    /// Evaluate `$.<segment>` against the parent value; a null or absent
    /// parent, or any evaluation failure, yields no value. Only leaves clone.
    fn evaluate<'v>(&self, parent: Option<&'v Value>, segment: &str) -> Option<Cow<'v, Value>> {
        let parent = parent.filter(|v| !v.is_null())?;
        let expression = child_path(ROOT, segment);
        match self.evaluator.evaluate(parent, &expression) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(%expression, error = %err, "path evaluation failed, using null");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::evaluator::{DottedPathEvaluator, EvalError};
    use serde_json::json;
    use std::cell::Cell;

    fn build(document: Value, paths: &[&str]) -> ShapeNode {
        let index = PathIndex::build(paths).unwrap();
        let evaluator = DottedPathEvaluator::new();
        ShapeTreeBuilder::new(&index, &evaluator).build(&document)
    }

    #[test]
    fn test_sibling_primitives() {
        let root = build(json!({"a": 1, "b": 2}), &["$.a", "$.b"]);

        assert_eq!(root.kind(), NodeKind::Object);
        assert_eq!(root.record_count(), 1);
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind(), NodeKind::Primitive);
        assert_eq!(children[0].path(), "$.a");
        assert_eq!(children[1].name(), "b");
    }

    #[test]
    fn test_array_counts_add() {
        let root = build(
            json!({"a": [{"x": 1}, {"x": 2}, {"x": 3}]}),
            &["$.a[*].x"],
        );

        let array = &root.children()[0];
        assert_eq!(array.kind(), NodeKind::Array);
        assert_eq!(array.path(), "$.a[*]");
        assert_eq!(array.children().len(), 3);
        assert_eq!(array.record_count(), 3);
        assert_eq!(root.record_count(), 3);
    }

    #[test]
    fn test_sibling_arrays_multiply() {
        let root = build(
            json!({"a": [{"x": 1}, {"x": 2}], "b": [{"y": 1}, {"y": 2}, {"y": 3}], "c": 7}),
            &["$.a[*].x", "$.b[*].y", "$.c"],
        );
        assert_eq!(root.record_count(), 6);
    }

    #[test]
    fn test_nested_arrays_sum_per_element() {
        let root = build(
            json!({"orders": [
                {"items": [{"sku": "a"}, {"sku": "b"}]},
                {"items": [{"sku": "c"}]},
                {"items": []}
            ]}),
            &["$.orders[*].items[*].sku"],
        );
        let orders = &root.children()[0];
        let counts: Vec<usize> = orders.children().iter().map(ShapeNode::record_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);
        assert_eq!(root.record_count(), 4);
    }

    #[test]
    fn test_empty_and_missing_arrays_get_placeholder() {
        for document in [json!({"a": []}), json!({}), json!({"a": null}), json!({"a": 5}), json!({"a": {}})] {
            let root = build(document, &["$.a[*].x"]);
            let array = &root.children()[0];
            assert_eq!(array.children().len(), 1);
            assert_eq!(array.record_count(), 1);

            let element = &array.children()[0];
            assert_eq!(element.kind(), NodeKind::Object);
            let leaf = &element.children()[0];
            assert_eq!(
                leaf,
                &ShapeNode::Primitive {
                    name: "x".to_string(),
                    path: "$.a[*].x".to_string(),
                    value: Value::Null,
                }
            );
        }
    }

    #[test]
    fn test_null_parent_keeps_shape() {
        let root = build(json!({"a": null}), &["$.a.b.c", "$.a.d"]);
        let a = &root.children()[0];
        assert_eq!(a.kind(), NodeKind::Object);
        assert_eq!(a.children().len(), 2);
        assert_eq!(a.children()[0].children()[0].path(), "$.a.b.c");
    }

    struct CountingEvaluator {
        calls: Cell<usize>,
    }

    impl PathEvaluator for CountingEvaluator {
        fn evaluate<'v>(&self, value: &'v Value, expression: &str) -> Result<Cow<'v, Value>, EvalError> {
            self.calls.set(self.calls.get() + 1);
            DottedPathEvaluator::new().evaluate(value, expression)
        }
    }

    #[test]
    fn test_null_parent_skips_evaluation() {
        let index = PathIndex::build(&["$.a.b.c", "$.a.d", "$.e[*].f"]).unwrap();
        let evaluator = CountingEvaluator { calls: Cell::new(0) };

        let root = ShapeTreeBuilder::new(&index, &evaluator).build(&json!({"a": null, "e": null}));

        // only $.a and $.e[*] are evaluated; nothing below the nulls
        assert_eq!(evaluator.calls.get(), 2);
        assert_eq!(root.record_count(), 1);
        assert_eq!(root.children()[1].children()[0].children()[0].path(), "$.e[*].f");
    }

    #[test]
    fn test_wildcard_over_object_expands_member_values() {
        let root = build(json!({"a": {"p": {"x": 1}, "q": {"x": 2}}}), &["$.a[*].x"]);
        let array = &root.children()[0];
        assert_eq!(array.record_count(), 2);
        assert_eq!(
            array.children()[1].children()[0],
            ShapeNode::Primitive {
                name: "x".to_string(),
                path: "$.a[*].x".to_string(),
                value: json!(2),
            }
        );
    }

    #[test]
    fn test_scalar_array_elements_are_primitives() {
        let root = build(json!({"tags": ["x", "y"]}), &["$.tags[*]"]);
        let tags = &root.children()[0];
        assert_eq!(tags.record_count(), 2);
        assert_eq!(
            tags.children()[1],
            ShapeNode::Primitive {
                name: "tags[*]".to_string(),
                path: "$.tags[*]".to_string(),
                value: json!("y"),
            }
        );
    }

    #[test]
    fn test_root_without_selection() {
        let root = build(json!({"a": 1}), &["$"]);
        assert!(root.children().is_empty());
        assert_eq!(root.record_count(), 1);
    }
}
