use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Where a project's main source repository lives.
///
/// `origin` is anything `git clone` accepts (URL or local path); `local_name`
/// is the directory the source occupies under the build container's source
/// root, so the build mounts the checkout at `/src/<local_name>`.
///
/// Both fields are single whitespace-free tokens, matching the shape the
/// detection probe prints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RepoLocation {
    /// Fetchable source location.
    pub origin: String,
    /// Directory name inside the container's source root.
    pub local_name: String,
}

impl RepoLocation {
    /// Validates and builds a location.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidRepoLocation`] if either field is empty or
    /// contains whitespace, or if `local_name` contains a `/` or is `.`/`..`.
    pub fn new(origin: impl Into<String>, local_name: impl Into<String>) -> Result<Self, CoreError> {
        let origin = origin.into();
        let local_name = local_name.into();
        check_token("origin", &origin)?;
        check_token("local_name", &local_name)?;
        if local_name.contains('/') || local_name == "." || local_name == ".." {
            return Err(CoreError::InvalidRepoLocation {
                field: "local_name".to_owned(),
                reason: format!("'{local_name}' is not a single directory name"),
            });
        }
        Ok(Self { origin, local_name })
    }

    /// Path the container build scripts expect this source at.
    #[must_use]
    pub fn mount_location(&self, container_src_root: &str) -> String {
        format!("{}/{}", container_src_root.trim_end_matches('/'), self.local_name)
    }
}

fn check_token(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::InvalidRepoLocation {
            field: field.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidRepoLocation {
            field: field.to_owned(),
            reason: "must not contain whitespace".to_owned(),
        });
    }
    Ok(())
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.origin, self.local_name)
    }
}
