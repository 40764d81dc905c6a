//! Flattener facade: raw JSON text in, flat rows out
//!
//! A [`JsonFlattener`] holds a shared [`PathIndex`] and runs the build and
//! materialize passes once per top-level document. Indexes for named path
//! lists can be kept in a caller-owned [`SchemaCache`].

use crate::error::Result;
use crate::flatten::evaluator::{DottedPathEvaluator, PathEvaluator};
use crate::flatten::materialize::materialize;
use crate::flatten::path_index::PathIndex;
use crate::flatten::tree::ShapeTreeBuilder;
use crate::flatten::types::FlatRow;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Selects requested fields out of JSON documents as flat rows
#[derive(Debug, Clone)]
pub struct JsonFlattener<E: PathEvaluator = DottedPathEvaluator> {
    index: Arc<PathIndex>,
    evaluator: E,
}

impl JsonFlattener {
    /// Create a flattener for a list of paths such as `$.a` or `$.b[*].c`
    pub fn new<S: AsRef<str>>(paths: &[S]) -> Result<Self> {
        Ok(Self::with_index(Arc::new(PathIndex::build(paths)?)))
    }

    /// Create a flattener over an already built, possibly shared, index
    pub fn with_index(index: Arc<PathIndex>) -> Self {
        JsonFlattener {
            index,
            evaluator: DottedPathEvaluator::new(),
        }
    }
}

impl<E: PathEvaluator> JsonFlattener<E> {
    /// Use a custom path evaluator
    pub fn with_evaluator(index: Arc<PathIndex>, evaluator: E) -> Self {
        JsonFlattener { index, evaluator }
    }

    pub fn index(&self) -> &Arc<PathIndex> {
        &self.index
    }

    /// Flatten JSON text. Blank input yields no rows.
    pub fn flatten(&self, json: &str) -> Result<Vec<FlatRow>> {
        trace!(payload = json, "flattening JSON payload");
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Value = serde_json::from_str(json)?;
        Ok(self.flatten_value(&document))
    }

    /// Flatten JSON bytes using the SIMD parser. The buffer is used as scratch space.
    pub fn flatten_bytes(&self, json: &mut [u8]) -> Result<Vec<FlatRow>> {
        if json.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: Value = simd_json::serde::from_slice(json)?;
        Ok(self.flatten_value(&document))
    }

    /// Flatten an already parsed document. A top-level array is flattened
    /// element by element, rows kept in element order.
    pub fn flatten_value(&self, document: &Value) -> Vec<FlatRow> {
        match document {
            Value::Array(elements) => elements
                .iter()
                .flat_map(|element| self.flatten_document(element))
                .collect(),
            _ => self.flatten_document(document),
        }
    }

    fn flatten_document(&self, document: &Value) -> Vec<FlatRow> {
        let builder = ShapeTreeBuilder::new(&self.index, &self.evaluator);
        let root = builder.build(document);
        debug!(records = root.record_count(), "built shape tree");
        materialize(&root)
    }
}

/// Flatten `json`, keeping only the fields named by `paths`
pub fn flatten<S: AsRef<str>>(json: &str, paths: &[S]) -> Result<Vec<FlatRow>> {
    JsonFlattener::new(paths)?.flatten(json)
}

/// Caller-owned cache of path indexes keyed by schema name
#[derive(Debug, Default)]
pub struct SchemaCache {
    indexes: HashMap<String, Arc<PathIndex>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        SchemaCache::default()
    }

    /// Return the index cached under `name`, building it from `paths` on first use.
    /// Later calls with the same name reuse the cached index whatever paths they pass.
    pub fn get_or_build<S: AsRef<str>>(&mut self, name: &str, paths: &[S]) -> Result<Arc<PathIndex>> {
        if let Some(index) = self.indexes.get(name) {
            debug!(schema = name, "path index cache hit");
            return Ok(Arc::clone(index));
        }

        debug!(schema = name, "path index cache miss");
        let index = Arc::new(PathIndex::build(paths)?);
        self.indexes.insert(name.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// Flattener for the named schema, sharing the cached index
    pub fn flattener<S: AsRef<str>>(&mut self, name: &str, paths: &[S]) -> Result<JsonFlattener> {
        Ok(JsonFlattener::with_index(self.get_or_build(name, paths)?))
    }

    /// Drop one cached schema; returns whether it was present
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.indexes.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.indexes.clear();
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
