//! Field locations: a small JSONPath-like query engine used to pull
//! values out of nested response bodies.
//!
//! Both extraction modes of the handler resolve their fields through this
//! one engine, so there is a single definition of what a location string
//! means: a leading `$` for the root, dot-separated keys, `[<n>]` array
//! indexing, and `[*]` to fan out over every element.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty field location")]
    Empty,

    #[error("invalid segment {0:?} in field location")]
    BadSegment(String),

    #[error("unclosed '[' in field location {0:?}")]
    UnclosedBracket(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A parsed field location, e.g. `$.eventMessages[*].resource.from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    steps: Vec<Step>,
}

impl FieldPath {
    /// Parse a location string. The leading `$` is optional; `$` on its
    /// own addresses the root value.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let rest = trimmed.strip_prefix('$').unwrap_or(trimmed);

        let mut steps = Vec::new();
        for part in rest.split('.') {
            if part.is_empty() {
                continue;
            }
            let (head, mut brackets) = match part.find('[') {
                Some(at) => (&part[..at], &part[at..]),
                None => (part, ""),
            };
            if !head.is_empty() {
                steps.push(Step::Key(head.to_string()));
            }
            while !brackets.is_empty() {
                let Some(after_open) = brackets.strip_prefix('[') else {
                    return Err(PathError::BadSegment(part.to_string()));
                };
                let Some(close) = after_open.find(']') else {
                    return Err(PathError::UnclosedBracket(input.to_string()));
                };
                let inner = &after_open[..close];
                if inner == "*" {
                    steps.push(Step::Wildcard);
                } else {
                    let index = inner
                        .parse()
                        .map_err(|_| PathError::BadSegment(part.to_string()))?;
                    steps.push(Step::Index(index));
                }
                brackets = &after_open[close + 1..];
            }
        }
        Ok(Self { steps })
    }

    /// Resolve the location against `root`, returning zero, one, or many
    /// results. Missing keys and out-of-range indexes yield nothing.
    pub fn query<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for value in current {
                match step {
                    Step::Key(key) => {
                        if let Some(found) = value.get(key) {
                            next.push(found);
                        }
                    }
                    Step::Index(index) => {
                        if let Some(found) = value.get(index) {
                            next.push(found);
                        }
                    }
                    Step::Wildcard => match value {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    },
                }
            }
            current = next;
        }
        current
    }

    /// First query result, if any.
    pub fn value<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.query(root).into_iter().next()
    }
}
