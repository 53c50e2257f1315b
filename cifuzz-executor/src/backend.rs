//! Build-system collaborator abstraction.
//!
//! Separates the commit-to-build pipeline from how images are built and how
//! containers are run, so the pipeline can be driven against Docker or a
//! test double without changing orchestration logic.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use cifuzz_core::{BuildParameters, CommandResult, ProjectName};

use crate::ExecutorError;

/// An image the pipeline may need to (re)build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ImageName {
    /// The shared base image project images derive from.
    BaseBuilder,
    /// A project's own build image.
    Project(ProjectName),
}

/// Names the image's role; the registry tag is backend configuration.
impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseBuilder => f.write_str("base builder image"),
            Self::Project(p) => write!(f, "{p}"),
        }
    }
}

/// Everything the containerized build step needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct BuildRequest {
    /// Project whose fuzzers are built.
    pub project: ProjectName,
    /// Wipe previous outputs before building.
    pub clean: bool,
    /// Engine, sanitizer and architecture.
    pub params: BuildParameters,
    /// Extra `KEY=VALUE` environment entries for the container.
    pub env: Vec<(String, String)>,
    /// Host directory holding the checked-out source.
    pub source_path: PathBuf,
    /// Path inside the container where `source_path` is mounted.
    pub mount_location: String,
}

impl BuildRequest {
    /// A clean build with no extra environment.
    #[must_use]
    pub fn clean(
        project: ProjectName,
        params: BuildParameters,
        source_path: PathBuf,
        mount_location: String,
    ) -> Self {
        Self {
            project,
            clean: true,
            params,
            env: Vec::new(),
            source_path,
            mount_location,
        }
    }
}

/// The containerized build system as seen by the pipeline.
///
/// Implementations must be `Send + Sync`. Calls are awaited one at a time;
/// none of them carries a timeout.
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Whether the build system knows `project`.
    async fn project_exists(&self, project: &ProjectName) -> bool;

    /// Ensure `image` is built and current. Idempotent.
    ///
    /// # Errors
    /// Returns [`ExecutorError::ImageBuildFailed`] if the image cannot be built.
    async fn build_image(&self, image: &ImageName) -> Result<(), ExecutorError>;

    /// Run the detection probe inside `project`'s image with `args` and
    /// return its captured output. A non-zero exit is not an error here.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Spawn`] if the container cannot be started.
    async fn run_probe(
        &self,
        project: &ProjectName,
        args: &[String],
    ) -> Result<CommandResult, ExecutorError>;

    /// Build the project's fuzzers from `request.source_path`.
    ///
    /// # Errors
    /// Returns [`ExecutorError::BuildFailed`] if the build container exits
    /// non-zero, or [`ExecutorError::Io`] if output directories cannot be
    /// prepared.
    async fn run_build(&self, request: &BuildRequest) -> Result<(), ExecutorError>;
}
