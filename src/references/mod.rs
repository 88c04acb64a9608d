//! Reference targets, reference origins and the index that relates them.
//!
//! A code-lens computation only ever talks to a [`ReferenceIndex`]. The index
//! shipped with the server is [`LocalsIndex`], built from a tree-sitter
//! `locals` query over one document snapshot.

pub mod locals;

pub use locals::LocalsIndex;

use thiserror::Error;
use url::Url;

use crate::domain::SourceRange;

/// Failures reported by a [`ReferenceIndex`]
#[derive(Debug, Error)]
pub enum IndexError {
    /// The file could not be analyzed at all
    #[error("Cannot decode {file}: {reason}")]
    Decode { file: String, reason: String },

    /// Origins for a single target could not be looked up
    #[error("Reference lookup failed for '{name}': {reason}")]
    Lookup { name: String, reason: String },
}

impl IndexError {
    pub fn decode(file: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::Decode {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn lookup(name: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::Lookup {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A location in a document that other code can point to.
///
/// `range` is the addressable span (a whole declaration); `def_range` is the
/// narrower span of the declared name when the index knows it. Several
/// targets may share one `range` when the same location is addressable under
/// more than one kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceTarget {
    pub range: SourceRange,
    pub def_range: Option<SourceRange>,
    pub name: String,
    pub kind: Option<String>,
}

/// An occurrence that points at a [`ReferenceTarget`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceOrigin {
    pub range: SourceRange,
}

/// Source of reference targets and the origins pointing at them
pub trait ReferenceIndex {
    /// All targets declared in `file`.
    fn targets_in_file(&self, file: &Url) -> Result<Vec<ReferenceTarget>, IndexError>;

    /// All origins resolving to `target`.
    fn origins_targeting(&self, target: &ReferenceTarget)
    -> Result<Vec<ReferenceOrigin>, IndexError>;
}
