//! Command-line surface for the CIFuzz commit-to-build pipeline.
//!
//! Two verbs: `build_fuzzers` builds a project's fuzzers from a commit of its
//! main repository, `run_fuzzers` is reserved for running them and does not
//! run anything yet. The `cifuzz-action` binary drives the same code from a
//! CI job's environment.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod action;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cifuzz_core::{Architecture, BuildParameters, CommitRef, Engine, ProjectName, Sanitizer};
use cifuzz_executor::{CommitBuildOrchestrator, DockerBackend, GitCli, ShimConfig};
use tracing_subscriber::EnvFilter;

/// Help CI tools build and run a project's fuzzers.
#[derive(Debug, Parser)]
#[command(name = "cifuzz", version)]
pub struct Cli {
    /// Root of the OSS-Fuzz checkout (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true, env = "OSS_FUZZ_HOME")]
    pub oss_fuzz_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a project's fuzzers at a commit
    #[command(name = "build_fuzzers")]
    BuildFuzzers(BuildFuzzersArgs),

    /// Run a project's fuzzers
    #[command(name = "run_fuzzers")]
    RunFuzzers(RunFuzzersArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BuildFuzzersArgs {
    /// Project to build
    pub project_name: ProjectName,

    /// Name of the repository the commit belongs to
    pub repo_name: String,

    /// Commit to build
    pub commit_sha: CommitRef,

    /// Fuzzing engine
    #[arg(long, default_value_t = Engine::default())]
    pub engine: Engine,

    /// Sanitizer
    #[arg(long, default_value_t = Sanitizer::default())]
    pub sanitizer: Sanitizer,

    /// Target architecture
    #[arg(long, default_value_t = Architecture::default())]
    pub architecture: Architecture,

    /// Print the build report as JSON on stdout
    #[arg(long)]
    pub report_json: bool,
}

impl BuildFuzzersArgs {
    /// Arguments for a default `{libfuzzer, address, x86_64}` build.
    #[must_use]
    pub fn new(project_name: ProjectName, repo_name: String, commit_sha: CommitRef) -> Self {
        Self {
            project_name,
            repo_name,
            commit_sha,
            engine: Engine::default(),
            sanitizer: Sanitizer::default(),
            architecture: Architecture::default(),
            report_json: false,
        }
    }

    #[must_use]
    pub fn params(&self) -> BuildParameters {
        BuildParameters::new(self.engine, self.sanitizer, self.architecture)
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunFuzzersArgs {
    /// Project whose fuzzers to run
    pub project_name: ProjectName,
}

/// Install the global `tracing` subscriber, logging to stderr.
///
/// `level` wins over `RUST_LOG`; with neither set, logs at `info`.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a parsed command line and return the process exit code.
///
/// # Errors
/// Returns an error if the base directory cannot be resolved or the report
/// cannot be serialized.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = ShimConfig::resolve(cli.oss_fuzz_dir).context("resolving OSS-Fuzz directory")?;
    tracing::debug!(oss_fuzz_dir = %config.base_dir().display(), "resolved configuration");

    match cli.command {
        Command::BuildFuzzers(args) => build_fuzzers(config, &args).await,
        Command::RunFuzzers(args) => Ok(run_fuzzers(&args.project_name)),
    }
}

/// Build the project's fuzzers with the Docker and git collaborators.
///
/// # Errors
/// Returns an error only if `--report-json` output cannot be produced; build
/// failures are reported through the exit code.
pub async fn build_fuzzers(config: ShimConfig, args: &BuildFuzzersArgs) -> anyhow::Result<i32> {
    let backend = DockerBackend::new(config.clone());
    let vcs = GitCli::new(config.git_binary.clone());
    let orchestrator = CommitBuildOrchestrator::new(backend, vcs, config);

    tracing::info!(
        project = %args.project_name,
        repo_name = %args.repo_name,
        commit = %args.commit_sha,
        "building fuzzers"
    );

    let report = orchestrator
        .build_fuzzers(&args.project_name, &args.repo_name, &args.commit_sha, args.params())
        .await;

    if args.report_json {
        let json = serde_json::to_string_pretty(&report).context("serializing build report")?;
        println!("{json}");
    }

    if report.succeeded() {
        tracing::info!(
            project = %report.project,
            elapsed_ms = report.duration.as_millis(),
            "fuzzers built"
        );
    } else {
        tracing::error!(project = %report.project, "error building project's fuzzers");
    }
    Ok(report.exit_code())
}

/// Running fuzzers is not implemented; logs that and succeeds.
#[must_use]
pub fn run_fuzzers(project: &ProjectName) -> i32 {
    tracing::warn!(project = %project, "running fuzzers is not implemented yet");
    0
}
