//! Commit-to-build orchestration.
//!
//! Resolves the project's main repository, clones it into a fresh scratch
//! directory, checks out the requested commit and hands exactly that tree to
//! the containerized build.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use cifuzz_core::{
    BuildParameters, BuildReport, BuildStatus, CommitRef, ProjectName, RepoLocation, RunId,
};
use tracing::Instrument;

use crate::backend::{BuildBackend, BuildRequest};
use crate::detect::RepoDetector;
use crate::working_copy::{VersionControl, WorkingCopy};
use crate::{OrchestratorError, ShimConfig};

/// Prefix of per-run scratch directories.
const SCRATCH_PREFIX: &str = "cifuzz-";

/// Top-level coordinator for building a project's fuzzers at a commit.
///
/// One call to [`build_fuzzers`](Self::build_fuzzers) processes one request
/// end to end. Each call creates its own scratch directory, so concurrent
/// callers never share a working copy.
pub struct CommitBuildOrchestrator<B: BuildBackend, V: VersionControl> {
    backend: B,
    vcs: V,
    config: ShimConfig,
}

impl<B: BuildBackend, V: VersionControl> CommitBuildOrchestrator<B, V> {
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(backend: B, vcs: V, config: ShimConfig) -> Self {
        Self { backend, vcs, config }
    }

    /// The build-system collaborator.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The version-control collaborator.
    #[must_use]
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// The configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// A repo detector probing through this orchestrator's backend.
    #[must_use]
    pub fn detector(&self) -> RepoDetector<'_, B> {
        RepoDetector::new(&self.backend, self.config.container_src_root.clone())
    }

    /// Check out `commit` in `working_copy` and build the project from it.
    ///
    /// The checkout happens before any container work; if it fails, the build
    /// is never started. Builds are always clean.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Checkout`] if the commit cannot be checked
    /// out and [`OrchestratorError::Build`] if the containerized build fails.
    pub async fn build_fuzzers_from_commit(
        &self,
        project: &ProjectName,
        commit: &CommitRef,
        working_copy: &mut WorkingCopy<'_, V>,
        params: BuildParameters,
    ) -> Result<(), OrchestratorError> {
        if let Err(e) = working_copy.checkout_commit(commit).await {
            tracing::error!(%commit, error = %e, "checkout failed, not building");
            return Err(e.into());
        }

        let request = BuildRequest::clean(
            project.clone(),
            params,
            working_copy.root().to_path_buf(),
            working_copy
                .location()
                .mount_location(&self.config.container_src_root),
        );

        if let Err(e) = self.backend.run_build(&request).await {
            tracing::error!(project = %project, %commit, error = %e, "building fuzzers failed");
            return Err(e.into());
        }

        tracing::info!(project = %project, %commit, "fuzzers built");
        Ok(())
    }

    /// Build `project`'s fuzzers from `commit` of the repository named
    /// `repo_name`.
    ///
    /// The scratch directory holding the clone is removed before this returns,
    /// whatever the outcome.
    pub async fn build_fuzzers(
        &self,
        project: &ProjectName,
        repo_name: &str,
        commit: &CommitRef,
        params: BuildParameters,
    ) -> BuildReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let wall_start = Instant::now();

        let span = tracing::info_span!("build_fuzzers", %run_id, project = %project, %commit);
        let mut repo = None;
        let result = self
            .build_in_scratch(project, repo_name, commit, params, &mut repo)
            .instrument(span)
            .await;

        let status = match result {
            Ok(()) => BuildStatus::Succeeded,
            Err(e) => {
                tracing::error!(%run_id, project = %project, error = %e, "error building project's fuzzers");
                BuildStatus::Failed { reason: e.to_string() }
            }
        };

        BuildReport::new(
            run_id,
            project.clone(),
            commit.clone(),
            repo,
            params,
            started_at,
            wall_start.elapsed(),
            status,
        )
    }

    async fn build_in_scratch(
        &self,
        project: &ProjectName,
        repo_name: &str,
        commit: &CommitRef,
        params: BuildParameters,
        repo: &mut Option<RepoLocation>,
    ) -> Result<(), OrchestratorError> {
        let parent = self.config.scratch_parent();
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&parent)
            .map_err(|source| OrchestratorError::Scratch { parent: parent.clone(), source })?;

        tracing::debug!(scratch = %scratch.path().display(), "created scratch directory");

        let result = self
            .build_from_scratch(scratch.path(), project, repo_name, commit, params, repo)
            .await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(scratch = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }
        result
    }

    async fn build_from_scratch(
        &self,
        scratch: &Path,
        project: &ProjectName,
        repo_name: &str,
        commit: &CommitRef,
        params: BuildParameters,
        repo: &mut Option<RepoLocation>,
    ) -> Result<(), OrchestratorError> {
        let location = self
            .detector()
            .detect_main_repo(project, Some(repo_name), None)
            .await
            .ok_or_else(|| OrchestratorError::RepoNotFound { project: project.clone() })?;
        *repo = Some(location.clone());

        let mut working_copy = WorkingCopy::clone_into(&self.vcs, location, scratch).await?;
        self.build_fuzzers_from_commit(project, commit, &mut working_copy, params)
            .await
    }
}
