//! Docker-backed implementation of [`BuildBackend`].
//!
//! Images are built from the build-system checkout (`projects/<name>` or
//! `infra/base-images/<name>`), and fuzzers are compiled by running the
//! project image's default command with the source tree bind-mounted.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use cifuzz_core::{CommandResult, ProjectName};

use crate::backend::{BuildBackend, BuildRequest, ImageName};
use crate::{CommandExecutor, ExecutorError, ShimConfig};

/// Number of trailing output lines kept in failure logs.
const FAILURE_TAIL_LINES: usize = 40;

/// Docker backend.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    config: ShimConfig,
    executor: CommandExecutor,
}

impl DockerBackend {
    /// Create a backend driven by `config`.
    #[must_use]
    pub fn new(config: ShimConfig) -> Self {
        Self { config, executor: CommandExecutor::new() }
    }

    /// Fully qualified tag for `image`.
    #[must_use]
    pub fn image_tag(&self, image: &ImageName) -> String {
        match image {
            ImageName::BaseBuilder => {
                format!("{}/{}", self.config.base_image_prefix, self.config.base_builder_image)
            }
            ImageName::Project(p) => format!("{}/{p}", self.config.project_image_prefix),
        }
    }

    fn build_context(&self, image: &ImageName) -> PathBuf {
        match image {
            ImageName::BaseBuilder => self
                .config
                .oss_fuzz_dir
                .join("infra")
                .join("base-images")
                .join(&self.config.base_builder_image),
            ImageName::Project(p) => self.config.projects_dir().join(p.as_str()),
        }
    }

    /// Arguments for the `docker run` that compiles fuzzers.
    ///
    /// The build runs with stdin closed, so no `-i` or `-t`.
    fn build_command(&self, request: &BuildRequest) -> Vec<OsString> {
        let project = request.project.as_str();
        let params = request.params;
        let mut args: Vec<OsString> = vec![
            self.config.docker_binary.clone().into_os_string(),
            "run".into(),
            "--rm".into(),
            "--cap-add".into(),
            "SYS_PTRACE".into(),
            "-e".into(),
            format!("FUZZING_ENGINE={}", params.engine).into(),
            "-e".into(),
            format!("SANITIZER={}", params.sanitizer).into(),
            "-e".into(),
            format!("ARCHITECTURE={}", params.architecture).into(),
        ];
        for (key, value) in &request.env {
            args.push("-e".into());
            args.push(format!("{key}={value}").into());
        }
        args.push("-v".into());
        args.push(volume(&request.source_path, &request.mount_location));
        args.push("-v".into());
        args.push(volume(&self.config.out_dir(project), "/out"));
        args.push("-v".into());
        args.push(volume(&self.config.work_dir(project), "/work"));
        args.push(self.image_tag(&ImageName::Project(request.project.clone())).into());
        args
    }

    async fn reset_dir(dir: &std::path::Path, clean: bool) -> Result<(), ExecutorError> {
        if clean {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ExecutorError::Io(e)),
            }
        }
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }
}

fn volume(host: &std::path::Path, container: &str) -> OsString {
    let mut mapping = host.as_os_str().to_owned();
    mapping.push(":");
    mapping.push(container);
    mapping
}

fn tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(FAILURE_TAIL_LINES);
    lines[start..].join("\n")
}

/// Tails of stdout and stderr, skipping whichever is empty.
fn failure_output(result: &CommandResult) -> String {
    [tail(&result.output), tail(&result.stderr)]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl BuildBackend for DockerBackend {
    async fn project_exists(&self, project: &ProjectName) -> bool {
        let dir = self.config.projects_dir().join(project.as_str());
        tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir())
    }

    async fn build_image(&self, image: &ImageName) -> Result<(), ExecutorError> {
        let tag = self.image_tag(image);
        let context = self.build_context(image);

        tracing::info!(image = %tag, context = %context.display(), "building image");

        let args: Vec<OsString> = vec![
            self.config.docker_binary.clone().into_os_string(),
            "build".into(),
            "-t".into(),
            tag.clone().into(),
            context.into_os_string(),
        ];
        let result = self
            .executor
            .execute(&args, Some(&self.config.oss_fuzz_dir), false)
            .await
            .map_err(|e| ExecutorError::ImageBuildFailed {
                image: tag.clone(),
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(ExecutorError::ImageBuildFailed {
                image: tag,
                reason: format!("exit code {}: {}", result.exit_code, failure_output(&result)),
            });
        }
        Ok(())
    }

    async fn run_probe(
        &self,
        project: &ProjectName,
        args: &[String],
    ) -> Result<CommandResult, ExecutorError> {
        let mut command: Vec<OsString> = vec![
            self.config.docker_binary.clone().into_os_string(),
            "run".into(),
            "--rm".into(),
            "-t".into(),
            self.image_tag(&ImageName::Project(project.clone())).into(),
            "python3".into(),
            self.config.detect_script.clone().into(),
        ];
        command.extend(args.iter().map(OsString::from));
        self.executor.execute(&command, None, false).await
    }

    async fn run_build(&self, request: &BuildRequest) -> Result<(), ExecutorError> {
        let project = request.project.as_str();
        Self::reset_dir(&self.config.out_dir(project), request.clean).await?;
        Self::reset_dir(&self.config.work_dir(project), request.clean).await?;

        let args = self.build_command(request);

        tracing::info!(
            project = %request.project,
            source = %request.source_path.display(),
            mount = %request.mount_location,
            engine = %request.params.engine,
            sanitizer = %request.params.sanitizer,
            architecture = %request.params.architecture,
            "building fuzzers"
        );

        let result = self
            .executor
            .execute(&args, Some(&self.config.oss_fuzz_dir), false)
            .await?;

        if !result.success() {
            let output = failure_output(&result);
            tracing::error!(
                project = %request.project,
                exit_code = result.exit_code,
                %output,
                "fuzzer build failed"
            );
            return Err(ExecutorError::BuildFailed {
                project: request.project.clone(),
                exit_code: result.exit_code,
                output,
            });
        }
        Ok(())
    }
}
