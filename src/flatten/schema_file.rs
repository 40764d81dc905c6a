use crate::error::{FlattenError, Result};
use crate::flatten::flattener::{JsonFlattener, SchemaCache};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Named path lists loaded from a JSON file:
///
/// ```json
/// {"schemas": {"events": ["$.version", "$.tags.instanceID"]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub schemas: BTreeMap<String, Vec<String>>,
}

impl SchemaFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(FlattenError::SchemaFile)
    }

    /// Paths declared for `name`
    pub fn paths(&self, name: &str) -> Result<&[String]> {
        self.schemas
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FlattenError::SchemaNotFound {
                name: name.to_string(),
            })
    }

    /// Flattener for `name`, built through (and cached in) `cache`
    pub fn flattener(&self, name: &str, cache: &mut SchemaCache) -> Result<JsonFlattener> {
        let paths = self.paths(name)?;
        cache.flattener(name, paths)
    }
}
