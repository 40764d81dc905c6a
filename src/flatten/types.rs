use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One flattened row: full field path -> value, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRow {
    cells: Map<String, Value>,
}

impl FlatRow {
    pub fn new() -> Self {
        FlatRow { cells: Map::new() }
    }

    /// A row holding a single cell
    pub fn with_cell(column: impl Into<String>, value: Value) -> Self {
        let mut row = FlatRow::new();
        row.insert(column, value);
        row
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.cells.insert(column.into(), value);
    }

    /// Merge the cells of a row from a disjoint branch into this one
    pub fn merge(&mut self, other: &FlatRow) {
        for (column, value) in other.cells.iter() {
            self.cells.insert(column.clone(), value.clone());
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn cells(&self) -> &Map<String, Value> {
        &self.cells
    }

    pub fn into_cells(self) -> Map<String, Value> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl From<Map<String, Value>> for FlatRow {
    fn from(cells: Map<String, Value>) -> Self {
        FlatRow { cells }
    }
}

/// Output settings for flattened rows
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Cell separator for delimited output
    pub separator: char,

    /// Whether delimited output starts with a header line of column names
    pub emit_header: bool,

    /// Text written for null cells in delimited output
    pub null_text: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            separator: ',',
            emit_header: true,
            null_text: String::new(),
        }
    }
}
