//! Path expression evaluation against an in-memory JSON value
//!
//! The tree builder asks an evaluator for the value of a single child segment
//! relative to its parent (`$.name`, `$.items[*]`). Evaluation failures are
//! returned as [`EvalError`] rather than folded into `null`, so callers decide
//! how to treat a missing branch.

use crate::flatten::path_index::{PathSegment, Selector, ROOT};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

/// Why a path expression produced no value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("no field '{segment}'")]
    Missing { segment: String },

    #[error("'{segment}' expected {expected}")]
    TypeMismatch {
        segment: String,
        expected: &'static str,
    },

    #[error("index {index} out of bounds at '{segment}'")]
    IndexOutOfBounds { segment: String, index: usize },

    #[error("malformed path expression '{expression}'")]
    Malformed { expression: String },
}

/// Evaluates a dotted/bracketed path expression rooted at `$`
///
/// Definite paths should borrow from `value`; only results assembled from
/// several matches need to be owned.
pub trait PathEvaluator {
    fn evaluate<'v>(&self, value: &'v Value, expression: &str) -> Result<Cow<'v, Value>, EvalError>;
}

/// Evaluator for the `$.name[*].other[0]` dialect used by field selections
///
/// A path containing `[*]` is indefinite: its result is an array of every
/// match, and elements lacking a later field are dropped rather than failing.
/// `[*]` over an object selects its member values in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedPathEvaluator;

impl DottedPathEvaluator {
    pub fn new() -> Self {
        DottedPathEvaluator
    }

    fn select_field<'v>(
        current: Vec<&'v Value>,
        name: &str,
        definite: bool,
    ) -> Result<Vec<&'v Value>, EvalError> {
        let mut next = Vec::with_capacity(current.len());
        for value in current {
            match value {
                Value::Object(obj) => match obj.get(name) {
                    Some(field) => next.push(field),
                    None if definite => {
                        return Err(EvalError::Missing {
                            segment: name.to_string(),
                        })
                    }
                    None => {}
                },
                _ if definite => {
                    return Err(EvalError::TypeMismatch {
                        segment: name.to_string(),
                        expected: "an object",
                    })
                }
                _ => {}
            }
        }
        Ok(next)
    }

    fn apply_selector<'v>(
        current: Vec<&'v Value>,
        selector: Selector,
        segment: &str,
        definite: bool,
    ) -> Result<Vec<&'v Value>, EvalError> {
        let mut next = Vec::new();
        for value in current {
            match (value, selector) {
                (Value::Array(arr), Selector::Wildcard) => next.extend(arr.iter()),
                (Value::Object(obj), Selector::Wildcard) => next.extend(obj.values()),
                (Value::Array(arr), Selector::Index(index)) => match arr.get(index) {
                    Some(element) => next.push(element),
                    None if definite => {
                        return Err(EvalError::IndexOutOfBounds {
                            segment: segment.to_string(),
                            index,
                        })
                    }
                    None => {}
                },
                (_, Selector::Wildcard) if definite => {
                    return Err(EvalError::TypeMismatch {
                        segment: segment.to_string(),
                        expected: "an array or object",
                    })
                }
                (_, Selector::Index(_)) if definite => {
                    return Err(EvalError::TypeMismatch {
                        segment: segment.to_string(),
                        expected: "an array",
                    })
                }
                _ => {}
            }
        }
        Ok(next)
    }
}

impl PathEvaluator for DottedPathEvaluator {
    fn evaluate<'v>(&self, value: &'v Value, expression: &str) -> Result<Cow<'v, Value>, EvalError> {
        let malformed = || EvalError::Malformed {
            expression: expression.to_string(),
        };

        let mut segments = expression.split('.');
        if segments.next() != Some(ROOT) {
            return Err(malformed());
        }

        let mut current = vec![value];
        let mut definite = true;

        for raw in segments.filter(|s| !s.is_empty()) {
            let segment = PathSegment::parse(raw).ok_or_else(malformed)?;

            if !segment.name.is_empty() {
                current = Self::select_field(current, &segment.name, definite)?;
            }
            for selector in segment.selectors {
                current = Self::apply_selector(current, selector, raw, definite)?;
                if selector == Selector::Wildcard {
                    definite = false;
                }
            }
        }

        if definite {
            current.first().map(|v| Cow::Borrowed(*v)).ok_or_else(malformed)
        } else {
            Ok(Cow::Owned(Value::Array(current.into_iter().cloned().collect())))
        }
    }
}
