//! # Field Paths
//!
//! Dotted/indexed positions used by every error in the stack to report where
//! inside an entity a failure occurred, e.g. `members[1].address.city`.

use std::fmt;

/// One step into an entity: a named field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named field, rendered as `.name`.
    Field(String),
    /// An array element, rendered as `[index]`.
    Index(usize),
}

/// An ordered list of [`PathSegment`]s from an entity root down to one field.
///
/// The empty path denotes the entity itself and displays as `(root)`, the
/// same convention the violation reports use for top-level failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path (the entity root).
    pub fn root() -> Self {
        Self::default()
    }

    /// A single-field path.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Returns true if this path points at the entity root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments, outermost first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Extend the path downward with a field name.
    pub fn join_field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.into()));
        Self { segments }
    }

    /// Extend the path downward with an array index.
    pub fn join_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Prefix the path with an outer field, used when re-raising a nested
    /// failure from the context of the enclosing entity.
    pub fn prefixed_with_field(mut self, name: impl Into<String>) -> Self {
        self.segments.insert(0, PathSegment::Field(name.into()));
        self
    }

    /// Prefix the path with an outer array index.
    pub fn prefixed_with_index(mut self, index: usize) -> Self {
        self.segments.insert(0, PathSegment::Index(index));
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "(root)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(name: &str) -> Self {
        FieldPath::field(name)
    }
}
