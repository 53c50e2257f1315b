//! Managed local clone of a source repository.
//!
//! A [`WorkingCopy`] is cloned once into a caller-owned directory and then
//! moved to exactly the requested commit before the build reads it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cifuzz_core::{CommitRef, RepoLocation};

use crate::{CheckoutError, CommandExecutor, ExecutorError};

/// Clone and checkout primitives of a version-control system.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `origin` into `dest`, which must not exist yet.
    ///
    /// # Errors
    /// Returns an [`ExecutorError`] if the clone command fails.
    async fn clone_repo(&self, origin: &str, dest: &Path) -> Result<(), ExecutorError>;

    /// Move the working tree at `repo_dir` to exactly `commit`.
    ///
    /// # Errors
    /// Returns a [`CheckoutError`] if the commit does not exist or the tree
    /// cannot be moved to it.
    async fn checkout(&self, repo_dir: &Path, commit: &CommitRef) -> Result<(), CheckoutError>;
}

/// `git` command-line implementation of [`VersionControl`].
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    executor: CommandExecutor,
}

impl GitCli {
    #[must_use]
    pub fn new(binary: PathBuf) -> Self {
        Self { binary, executor: CommandExecutor::new() }
    }

    fn args(&self, rest: &[&str]) -> Vec<OsString> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(self.binary.clone().into_os_string());
        args.extend(rest.iter().map(OsString::from));
        args
    }

    /// Full SHA of the commit `commit` names (SHA prefix in any case, tag or
    /// branch), or `None` if the clone does not contain it.
    async fn resolve_commit(&self, repo_dir: &Path, commit: &CommitRef) -> Option<String> {
        let object = format!("{commit}^{{commit}}");
        let result = self
            .executor
            .execute(
                &self.args(&["rev-parse", "--verify", "--quiet", object.as_str()]),
                Some(repo_dir),
                false,
            )
            .await
            .ok()?;
        let sha = result.output.trim();
        (result.success() && !sha.is_empty()).then(|| sha.to_owned())
    }

    async fn git(&self, repo_dir: &Path, commit: &CommitRef, rest: &[&str]) -> Result<String, CheckoutError> {
        let result = self
            .executor
            .execute(&self.args(rest), Some(repo_dir), false)
            .await
            .map_err(|source| CheckoutError::Command { commit: commit.clone(), source })?;
        if !result.success() {
            return Err(CheckoutError::Command {
                commit: commit.clone(),
                source: ExecutorError::CommandFailed {
                    command: crate::process::render_command(&self.args(rest)),
                    output: format!("{}{}", result.output, result.stderr),
                    exit_code: result.exit_code,
                },
            });
        }
        Ok(result.output)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(PathBuf::from("git"))
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn clone_repo(&self, origin: &str, dest: &Path) -> Result<(), ExecutorError> {
        let mut args = self.args(&["clone", "--"]);
        args.push(origin.into());
        args.push(dest.as_os_str().to_owned());

        // git reports progress on stderr, so success is judged by exit code.
        let result = self.executor.execute(&args, None, false).await?;
        if !result.success() {
            return Err(ExecutorError::CommandFailed {
                command: crate::process::render_command(&args),
                output: format!("{}{}", result.output, result.stderr),
                exit_code: result.exit_code,
            });
        }
        Ok(())
    }

    async fn checkout(&self, repo_dir: &Path, commit: &CommitRef) -> Result<(), CheckoutError> {
        let sha = match self.resolve_commit(repo_dir, commit).await {
            Some(sha) => sha,
            None => {
                tracing::info!(%commit, "commit not in clone, fetching full history");
                if let Err(e) = self.git(repo_dir, commit, &["fetch", "--unshallow"]).await {
                    tracing::debug!(%commit, error = %e, "fetch --unshallow failed");
                }
                self.resolve_commit(repo_dir, commit)
                    .await
                    .ok_or_else(|| CheckoutError::CommitNotFound(commit.clone()))?
            }
        };

        self.git(repo_dir, commit, &["checkout", "--force", sha.as_str(), "--"])
            .await?;
        self.git(repo_dir, commit, &["clean", "-fxd"]).await?;

        let head = self.git(repo_dir, commit, &["rev-parse", "HEAD"]).await?;
        let head = head.trim();
        if head != sha {
            return Err(CheckoutError::HeadMismatch {
                expected: commit.clone(),
                actual: head.to_owned(),
            });
        }
        Ok(())
    }
}

/// A clone of one repository, rooted at `<base_dir>/<local_name>`.
///
/// The working copy does not own `base_dir`; whoever created it is
/// responsible for removing it.
#[derive(Debug)]
pub struct WorkingCopy<'a, V: VersionControl> {
    vcs: &'a V,
    location: RepoLocation,
    root: PathBuf,
}

impl<'a, V: VersionControl> WorkingCopy<'a, V> {
    /// Clone `location.origin` into `base_dir/location.local_name`.
    ///
    /// # Errors
    /// Returns [`CheckoutError::Clone`] if the clone fails.
    pub async fn clone_into(
        vcs: &'a V,
        location: RepoLocation,
        base_dir: &Path,
    ) -> Result<Self, CheckoutError> {
        let root = base_dir.join(&location.local_name);
        tracing::info!(origin = %location.origin, dest = %root.display(), "cloning repository");
        vcs.clone_repo(&location.origin, &root)
            .await
            .map_err(|source| CheckoutError::Clone {
                origin: location.origin.clone(),
                dest: root.clone(),
                source,
            })?;
        Ok(Self { vcs, location, root })
    }

    /// Move the working copy to exactly `commit`.
    ///
    /// # Errors
    /// Returns a [`CheckoutError`] if the commit is unknown or the checkout
    /// fails. The tree must not be built after an error.
    pub async fn checkout_commit(&mut self, commit: &CommitRef) -> Result<(), CheckoutError> {
        self.vcs.checkout(&self.root, commit).await
    }

    /// Root directory of the checked-out tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository this copy was cloned from.
    #[must_use]
    pub fn location(&self) -> &RepoLocation {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a repository with two commits and returns (dir, [first, second]).
    async fn seeded_repo() -> Option<(tempfile::TempDir, Vec<String>)> {
        let exec = CommandExecutor::new();
        if exec.execute(&["git", "--version"], None, false).await.is_err() {
            return None;
        }
        let dir = tempfile::tempdir().ok()?;
        let path = dir.path();
        let steps: [&[&str]; 4] = [
            &["git", "init", "-q"],
            &["git", "config", "user.email", "ci@example.com"],
            &["git", "config", "user.name", "ci"],
            &["git", "config", "commit.gpgsign", "false"],
        ];
        for step in steps {
            exec.execute(step, Some(path), false).await.ok()?;
        }
        let mut commits = Vec::new();
        for content in ["one", "two"] {
            std::fs::write(path.join("file.txt"), content).ok()?;
            exec.execute(&["git", "add", "file.txt"], Some(path), false).await.ok()?;
            exec.execute(&["git", "commit", "-q", "-m", content], Some(path), false)
                .await
                .ok()?;
            let head = exec.execute(&["git", "rev-parse", "HEAD"], Some(path), false).await.ok()?;
            commits.push(head.output.trim().to_owned());
            if content == "one" {
                exec.execute(&["git", "tag", "v1.0"], Some(path), false).await.ok()?;
            }
        }
        Some((dir, commits))
    }

    fn commit(sha: &str) -> CommitRef {
        match CommitRef::new(sha) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn git_working_copy_checks_out_requested_commit() {
        let Some((origin, commits)) = seeded_repo().await else {
            eprintln!("git not available; skipping");
            return;
        };
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let location = match RepoLocation::new(origin.path().to_string_lossy(), "r") {
            Ok(l) => l,
            Err(e) => panic!("location: {e}"),
        };
        let git = GitCli::default();
        let mut copy = match WorkingCopy::clone_into(&git, location, scratch.path()).await {
            Ok(c) => c,
            Err(e) => panic!("clone failed: {e}"),
        };
        assert_eq!(copy.root(), scratch.path().join("r"));

        if let Err(e) = copy.checkout_commit(&commit(&commits[0])).await {
            panic!("checkout failed: {e}");
        }
        let content = std::fs::read_to_string(copy.root().join("file.txt")).unwrap_or_default();
        assert_eq!(content, "one", "tree must match the first commit");

        // Abbreviated SHAs resolve too.
        if let Err(e) = copy.checkout_commit(&commit(&commits[1][..10])).await {
            panic!("short checkout failed: {e}");
        }
        let content = std::fs::read_to_string(copy.root().join("file.txt")).unwrap_or_default();
        assert_eq!(content, "two");
    }

    #[tokio::test]
    async fn git_working_copy_resolves_tags_and_upper_case_shas() {
        let Some((origin, commits)) = seeded_repo().await else {
            eprintln!("git not available; skipping");
            return;
        };
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let location = match RepoLocation::new(origin.path().to_string_lossy(), "r") {
            Ok(l) => l,
            Err(e) => panic!("location: {e}"),
        };
        let git = GitCli::default();
        let mut copy = match WorkingCopy::clone_into(&git, location, scratch.path()).await {
            Ok(c) => c,
            Err(e) => panic!("clone failed: {e}"),
        };

        if let Err(e) = copy.checkout_commit(&commit("v1.0")).await {
            panic!("tag checkout failed: {e}");
        }
        let content = std::fs::read_to_string(copy.root().join("file.txt")).unwrap_or_default();
        assert_eq!(content, "one", "tag must check out the tagged commit");

        let upper = commits[1].to_ascii_uppercase();
        if let Err(e) = copy.checkout_commit(&commit(&upper)).await {
            panic!("upper-case sha checkout failed: {e}");
        }
        let content = std::fs::read_to_string(copy.root().join("file.txt")).unwrap_or_default();
        assert_eq!(content, "two");
    }

    #[tokio::test]
    async fn git_working_copy_unknown_commit_is_checkout_error() {
        let Some((origin, _commits)) = seeded_repo().await else {
            eprintln!("git not available; skipping");
            return;
        };
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let location = match RepoLocation::new(origin.path().to_string_lossy(), "r") {
            Ok(l) => l,
            Err(e) => panic!("location: {e}"),
        };
        let git = GitCli::default();
        let mut copy = match WorkingCopy::clone_into(&git, location, scratch.path()).await {
            Ok(c) => c,
            Err(e) => panic!("clone failed: {e}"),
        };
        let result = copy
            .checkout_commit(&commit("0123456789abcdef0123456789abcdef01234567"))
            .await;
        assert!(
            matches!(result, Err(CheckoutError::CommitNotFound(_))),
            "unknown commit must be CommitNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn clone_of_missing_origin_is_clone_error() {
        let scratch = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let missing = scratch.path().join("no-such-repo");
        let location = match RepoLocation::new(missing.to_string_lossy(), "r") {
            Ok(l) => l,
            Err(e) => panic!("location: {e}"),
        };
        let git = GitCli::default();
        let result = WorkingCopy::clone_into(&git, location, scratch.path()).await;
        assert!(matches!(result, Err(CheckoutError::Clone { .. })));
    }
}
