//! Core types for the CIFuzz commit-to-build pipeline.
//!
//! Defines the domain values passed between repo detection, the managed
//! working copy and the containerized build: project and commit identifiers,
//! repository locations, build parameters, captured command results and the
//! per-run build report.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod command;
pub mod error;
pub mod id;
pub mod params;
pub mod repo;
pub mod report;

pub use command::CommandResult;
pub use error::CoreError;
pub use id::{CommitRef, ProjectName, RunId};
pub use params::{Architecture, BuildParameters, Engine, Sanitizer};
pub use repo::RepoLocation;
pub use report::{BuildReport, BuildStatus};
