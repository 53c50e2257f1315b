//! Process-wide configuration, resolved once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming the build-system checkout.
pub const OSS_FUZZ_HOME_ENV: &str = "OSS_FUZZ_HOME";

/// Configuration for the commit-to-build pipeline.
///
/// Built once in `main` and threaded through every component; nothing reads
/// the base directory from ambient state after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ShimConfig {
    /// Root of the build-system checkout (contains `projects/` and `infra/`).
    pub oss_fuzz_dir: PathBuf,

    /// Parent directory for per-run scratch directories. `None` uses the
    /// system temp directory.
    pub scratch_parent: Option<PathBuf>,

    /// Container engine binary.
    pub docker_binary: PathBuf,

    /// Version-control binary.
    pub git_binary: PathBuf,

    /// Registry prefix for project images.
    pub project_image_prefix: String,

    /// Registry prefix for shared base images.
    pub base_image_prefix: String,

    /// Base image that must be rebuilt before name-driven detection.
    pub base_builder_image: String,

    /// Detection probe script inside the project image.
    pub detect_script: String,

    /// Source root inside the build container.
    pub container_src_root: String,
}

impl ShimConfig {
    /// Create a config rooted at `oss_fuzz_dir` with defaults for the rest.
    #[must_use]
    pub fn new(oss_fuzz_dir: PathBuf) -> Self {
        Self {
            oss_fuzz_dir,
            scratch_parent: None,
            docker_binary: PathBuf::from("docker"),
            git_binary: PathBuf::from("git"),
            project_image_prefix: "gcr.io/oss-fuzz".to_owned(),
            base_image_prefix: "gcr.io/oss-fuzz-base".to_owned(),
            base_builder_image: "base-builder".to_owned(),
            detect_script: "/src/detect_repo.py".to_owned(),
            container_src_root: "/src".to_owned(),
        }
    }

    /// Resolve the base directory from an explicit value, then
    /// `$OSS_FUZZ_HOME`, then the current directory.
    ///
    /// # Errors
    /// Returns an I/O error if the current directory is needed and cannot be
    /// read.
    pub fn resolve(explicit: Option<PathBuf>) -> std::io::Result<Self> {
        let dir = match explicit {
            Some(dir) => dir,
            None => match std::env::var_os(OSS_FUZZ_HOME_ENV) {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => std::env::current_dir()?,
            },
        };
        Ok(Self::new(dir))
    }

    /// Use `parent` for scratch directories instead of the system temp dir.
    #[must_use]
    pub fn with_scratch_parent(mut self, parent: PathBuf) -> Self {
        self.scratch_parent = Some(parent);
        self
    }

    /// Directory holding one subdirectory per known project.
    #[must_use]
    pub fn projects_dir(&self) -> PathBuf {
        self.oss_fuzz_dir.join("projects")
    }

    /// Host directory that receives built fuzz targets for `project`.
    #[must_use]
    pub fn out_dir(&self, project: &str) -> PathBuf {
        self.oss_fuzz_dir.join("build").join("out").join(project)
    }

    /// Host scratch directory the build container uses as `/work`.
    #[must_use]
    pub fn work_dir(&self, project: &str) -> PathBuf {
        self.oss_fuzz_dir.join("build").join("work").join(project)
    }

    /// Parent directory for per-run scratch directories.
    #[must_use]
    pub fn scratch_parent(&self) -> PathBuf {
        self.scratch_parent.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Base directory, for log fields.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.oss_fuzz_dir
    }
}
