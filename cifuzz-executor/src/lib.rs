//! Commit-to-build pipeline for CIFuzz.
//!
//! Detects a project's main repository inside its build image, checks the
//! requested commit out in a scratch clone, and runs the containerized fuzzer
//! build against exactly that tree.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod detect;
pub mod docker;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod working_copy;

pub use backend::{BuildBackend, BuildRequest, ImageName};
pub use config::ShimConfig;
pub use detect::{parse_detected_repo, DetectionKey, RepoDetector, DETECTION_MARKER};
pub use docker::DockerBackend;
pub use error::{CheckoutError, DetectError, ExecutorError, OrchestratorError};
pub use orchestrator::CommitBuildOrchestrator;
pub use process::CommandExecutor;
pub use working_copy::{GitCli, VersionControl, WorkingCopy};
