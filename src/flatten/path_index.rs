//! Selection index built from a list of requested field paths
//!
//! The index maps every ancestor path to the ordered set of child segments
//! selected beneath it, so the tree builder never has to re-parse paths while
//! walking a document. An index is immutable once built and can be shared
//! between any number of flatten calls.

use crate::error::{FlattenError, Result};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Key of the document root in every index
pub const ROOT: &str = "$";

/// Marker carried by segments that select every element of an array
pub const ARRAY_MARKER: &str = "[*]";

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\[\]]*)((?:\[(?:\*|\d+)\])*)$").unwrap()
});

static SELECTOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\*|\d+)\]").unwrap()
});

/// Bracketed selector following a segment name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `[*]`: all elements
    Wildcard,
    /// `[n]`: a single element
    Index(usize),
}

/// One dot-separated step of a path, e.g. `items[*]` or `tags[0]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub selectors: Vec<Selector>,
}

impl PathSegment {
    /// Parse a raw segment. Returns `None` when the bracket syntax is invalid.
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = SEGMENT_REGEX.captures(raw)?;
        let name = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let brackets = captures.get(2).map_or("", |m| m.as_str());

        let mut selectors = Vec::new();
        for selector in SELECTOR_REGEX.captures_iter(brackets) {
            let token = &selector[1];
            if token == "*" {
                selectors.push(Selector::Wildcard);
            } else {
                selectors.push(Selector::Index(token.parse().ok()?));
            }
        }

        Some(PathSegment { name, selectors })
    }

    pub fn is_array(&self) -> bool {
        self.selectors.contains(&Selector::Wildcard)
    }
}

/// Whether a raw segment name carries the array marker
pub fn is_array_segment(segment: &str) -> bool {
    segment.contains(ARRAY_MARKER)
}

/// Ancestor path -> selected child segments, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathIndex {
    children: IndexMap<String, IndexSet<String>>,
}

impl PathIndex {
    /// Build an index from dotted paths such as `$.tags.correlationContext.runID`
    ///
    /// Fails when the list is empty, or when a path is blank, not rooted at `$`,
    /// or carries malformed brackets. Empty segments (`$.a..b`) are skipped.
    pub fn build<S: AsRef<str>>(paths: &[S]) -> Result<Self> {
        if paths.is_empty() {
            return Err(FlattenError::invalid_selection("path list is empty"));
        }

        let mut children: IndexMap<String, IndexSet<String>> = IndexMap::new();
        children.insert(ROOT.to_string(), IndexSet::new());

        for path in paths {
            let path = path.as_ref();
            if path.trim().is_empty() {
                return Err(FlattenError::invalid_selection("path is blank"));
            }

            let mut segments = path.split('.');
            if segments.next() != Some(ROOT) {
                return Err(FlattenError::invalid_selection(format!(
                    "path '{}' does not start with '{}'",
                    path, ROOT
                )));
            }

            let mut parent = ROOT.to_string();
            for segment in segments {
                if segment.is_empty() {
                    debug!(path, "skipping empty path segment");
                    continue;
                }
                if PathSegment::parse(segment).is_none() {
                    return Err(FlattenError::invalid_selection(format!(
                        "malformed segment '{}' in path '{}'",
                        segment, path
                    )));
                }

                children
                    .entry(parent.clone())
                    .or_default()
                    .insert(segment.to_string());
                parent = child_path(&parent, segment);
            }
        }

        debug!(paths = paths.len(), parents = children.len(), "built path index");
        Ok(PathIndex { children })
    }

    /// Selected child segments under `path`, if any were requested
    pub fn children(&self, path: &str) -> Option<&IndexSet<String>> {
        self.children.get(path)
    }

    /// Whether `path` has selected descendants (and is therefore not a leaf)
    pub fn has_children(&self, path: &str) -> bool {
        self.children.contains_key(path)
    }

    /// Number of ancestor paths, root included
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Join a parent path and a child segment
pub fn child_path(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + segment.len() + 1);
    path.push_str(parent);
    path.push('.');
    path.push_str(segment);
    path
}
