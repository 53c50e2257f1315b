//! CI job entry point: build then run a project's fuzzers for the commit that
//! triggered the job, configured entirely through environment variables.

use anyhow::{bail, Context};
use cifuzz_core::{CommitRef, ProjectName};

/// Inputs read from the CI job's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEnv {
    /// `PROJECT_NAME`: the OSS-Fuzz project.
    pub project_name: ProjectName,
    /// Last path segment of `GITHUB_REPOSITORY`.
    pub repo_name: String,
    /// `GITHUB_SHA`: the commit that triggered the job.
    pub commit_sha: CommitRef,
    /// `FUZZ_TIME`: seconds the fuzzers should run for.
    pub fuzz_seconds: u64,
}

impl ActionEnv {
    /// Read the inputs from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the inputs through `lookup`.
    ///
    /// # Errors
    /// Returns an error if a variable is missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let require = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let project_name = ProjectName::new(require("PROJECT_NAME")?)?;
        let repository = require("GITHUB_REPOSITORY")?;
        let repo_name = repository.rsplit('/').next().unwrap_or_default().to_owned();
        if repo_name.is_empty() {
            bail!("GITHUB_REPOSITORY '{repository}' has no repository name");
        }
        let commit_sha = CommitRef::new(require("GITHUB_SHA")?)?;
        let fuzz_time = require("FUZZ_TIME")?;
        let fuzz_seconds = fuzz_time
            .trim()
            .parse()
            .with_context(|| format!("FUZZ_TIME '{fuzz_time}' is not a number of seconds"))?;

        Ok(Self { project_name, repo_name, commit_sha, fuzz_seconds })
    }
}
