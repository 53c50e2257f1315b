use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{CommitRef, ProjectName, RunId};
use crate::params::BuildParameters;
use crate::repo::RepoLocation;

/// Record of one `build_fuzzers` run, from repo detection to build exit.
///
/// Reports are immutable once created; the CLI turns them into an exit
/// status and, on request, prints them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BuildReport {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Project whose fuzzers were built.
    pub project: ProjectName,
    /// Commit the source was checked out at.
    pub commit: CommitRef,
    /// Main repository, if detection succeeded.
    pub repo: Option<RepoLocation>,
    /// Parameters handed to the build container.
    pub params: BuildParameters,
    /// When the run began.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the whole run.
    pub duration: Duration,
    /// Final outcome.
    pub status: BuildStatus,
}

impl BuildReport {
    /// Create a new report.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        project: ProjectName,
        commit: CommitRef,
        repo: Option<RepoLocation>,
        params: BuildParameters,
        started_at: DateTime<Utc>,
        duration: Duration,
        status: BuildStatus,
    ) -> Self {
        Self {
            run_id,
            project,
            commit,
            repo,
            params,
            started_at,
            duration,
            status,
        }
    }

    /// Returns `true` if the build succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.status, BuildStatus::Succeeded)
    }

    /// Process exit code for this outcome: `0` on success, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.succeeded())
    }
}

/// The outcome of a build run. There is no partial success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[non_exhaustive]
pub enum BuildStatus {
    /// Every step completed and the container build reported success.
    Succeeded,
    /// Some step failed; the run was aborted at that step.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}
