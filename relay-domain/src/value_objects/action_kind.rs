// Action kind value object

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verb telling the client how to apply a fragment.
///
/// The vocabulary is a contract with the templates, so any string is carried
/// through unchanged; only `append` and `prepend` change how the dom target
/// is named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKind(String);

impl ActionKind {
    pub const APPEND: &'static str = "append";
    pub const PREPEND: &'static str = "prepend";
    pub const REPLACE: &'static str = "replace";
    pub const UPDATE: &'static str = "update";
    pub const REMOVE: &'static str = "remove";
    pub const BEFORE: &'static str = "before";
    pub const AFTER: &'static str = "after";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn append() -> Self {
        Self::new(Self::APPEND)
    }

    pub fn replace() -> Self {
        Self::new(Self::REPLACE)
    }

    pub fn remove() -> Self {
        Self::new(Self::REMOVE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Inserts into a collection rather than targeting a single instance.
    pub fn targets_collection(&self) -> bool {
        self.0 == Self::APPEND || self.0 == Self::PREPEND
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
