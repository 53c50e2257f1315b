//! Entry point for CI jobs: builds and runs a project's fuzzers for the commit
//! named by the job's environment.
//!
//! Required environment variables: `PROJECT_NAME`, `GITHUB_REPOSITORY`,
//! `GITHUB_SHA`, `FUZZ_TIME`. `OSS_FUZZ_HOME` selects the build-system checkout.

use cifuzz_cli::action::ActionEnv;
use cifuzz_cli::{build_fuzzers, init_tracing, run_fuzzers, BuildFuzzersArgs};
use cifuzz_executor::ShimConfig;

async fn run_action() -> anyhow::Result<i32> {
    let env = ActionEnv::from_env()?;
    let config = ShimConfig::resolve(None)?;

    tracing::debug!(fuzz_seconds = env.fuzz_seconds, "read job environment");
    let args = BuildFuzzersArgs::new(env.project_name.clone(), env.repo_name, env.commit_sha);
    let code = build_fuzzers(config, &args).await?;
    if code != 0 {
        return Ok(code);
    }

    tracing::info!(project = %env.project_name, fuzz_seconds = env.fuzz_seconds, "running fuzzers");
    Ok(run_fuzzers(&env.project_name))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing(None);

    let code = match run_action().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cifuzz action failed");
            1
        }
    };
    std::process::exit(code);
}
