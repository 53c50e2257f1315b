use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Name of a project known to the containerized build system (e.g. `"curl"`).
///
/// The name doubles as a directory under `projects/` and as the last path
/// segment of the project's image, so it must be non-empty and free of
/// path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ProjectName(String);

impl ProjectName {
    /// Validates and wraps a project name.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidProjectName`] if the name is empty, contains
    /// whitespace, or contains a `/`.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.contains('/') {
            Some("must not contain '/'")
        } else if name.chars().any(char::is_whitespace) {
            Some("must not contain whitespace")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidProjectName {
                value: name,
                reason: reason.to_owned(),
            }),
            None => Ok(Self(name)),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProjectName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An opaque commit identifier (full or abbreviated SHA, tag, ...).
///
/// Only non-emptiness is checked here; whether the commit exists is decided
/// by the working copy at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CommitRef(String);

impl CommitRef {
    /// Wraps a commit identifier.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyCommit`] if the trimmed value is empty.
    pub fn new(commit: impl Into<String>) -> Result<Self, CoreError> {
        let commit = commit.into();
        let trimmed = commit.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyCommit);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the commit as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CommitRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Unique identifier for a single orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random `RunId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
