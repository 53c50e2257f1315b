//! Error types for the executor crate.

use std::path::PathBuf;

use cifuzz_core::{CommitRef, CoreError, ProjectName};

/// Errors raised while running external commands or container steps.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The process could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A strict-mode command exited non-zero or wrote to stderr.
    #[error("command `{command}` failed with exit code {exit_code}: {output}")]
    CommandFailed {
        command: String,
        output: String,
        exit_code: i32,
    },

    /// An image build step did not succeed.
    #[error("building image {image} failed: {reason}")]
    ImageBuildFailed { image: String, reason: String },

    /// The containerized build step reported failure.
    #[error("fuzzer build for project {project} failed with exit code {exit_code}: {output}")]
    BuildFailed {
        project: ProjectName,
        exit_code: i32,
        /// Trailing stdout and stderr of the build container.
        output: String,
    },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from cloning a repository or checking out a commit.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CheckoutError {
    /// `git clone` into the scratch directory failed.
    #[error("cloning {origin} into {}: {source}", .dest.display())]
    Clone {
        origin: String,
        dest: PathBuf,
        #[source]
        source: ExecutorError,
    },

    /// The commit is not present in the working copy, even after fetching.
    #[error("commit {0} does not exist in the working copy")]
    CommitNotFound(CommitRef),

    /// A version-control command failed while moving to the commit.
    #[error("checking out {commit}: {source}")]
    Command {
        commit: CommitRef,
        #[source]
        source: ExecutorError,
    },

    /// After checkout, HEAD does not point at the requested commit.
    #[error("HEAD is at {actual} after checking out {expected}")]
    HeadMismatch { expected: CommitRef, actual: String },
}

/// Reasons main-repo detection produced no result.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DetectError {
    /// Neither a repo-name hint nor an example commit was supplied.
    #[error("can not detect main repo without a repo name or an example commit")]
    InsufficientInput,

    /// The project is not known to the build system.
    #[error("project {0} does not exist")]
    ProjectNotFound(ProjectName),

    /// An image the probe depends on could not be built.
    #[error("image build before detection failed: {0}")]
    ImageBuild(#[source] ExecutorError),

    /// The probe process could not be run.
    #[error("detection probe could not run: {0}")]
    Probe(#[source] ExecutorError),

    /// The probe exited non-zero.
    #[error("detection probe exited with code {exit_code}")]
    ProbeFailed { exit_code: i32, output: String },

    /// The probe output had no well-formed detection line.
    #[error("no `Detected repo:` line in probe output")]
    NoDetectionLine { output: String },

    /// The probe output had more than one detection line.
    #[error("probe output has {count} `Detected repo:` lines, expected exactly one")]
    AmbiguousDetection { count: usize, output: String },

    /// The detected tokens do not form a valid repository location.
    #[error("detected repository is invalid: {0}")]
    InvalidLocation(#[from] CoreError),
}

/// Errors that abort a commit build run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// No main repository could be determined for the project.
    #[error("no main repo found for project {project}")]
    RepoNotFound { project: ProjectName },

    /// Cloning or checkout failed; no build was attempted.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The containerized build did not succeed.
    #[error(transparent)]
    Build(#[from] ExecutorError),

    /// The scratch directory could not be created.
    #[error("creating scratch directory under {}: {source}", .parent.display())]
    Scratch {
        parent: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
