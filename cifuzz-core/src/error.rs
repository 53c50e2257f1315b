/// Errors produced by the `cifuzz-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A project name was empty or contained a path separator.
    #[error("invalid project name '{value}': {reason}")]
    InvalidProjectName { value: String, reason: String },

    /// A commit reference was empty.
    #[error("commit reference must not be empty")]
    EmptyCommit,

    /// A repository location field failed validation.
    #[error("invalid repository location field '{field}': {reason}")]
    InvalidRepoLocation { field: String, reason: String },

    /// A build parameter string did not name a known option.
    #[error("unknown {kind} '{value}'; expected one of: {expected}")]
    UnknownBuildOption {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}
