//! Main-repository detection.
//!
//! Runs the detection probe inside a project's build image and reads back the
//! one structured line it prints:
//!
//! ```text
//! line      = *any-prefix "Detected repo:" 1*WSP origin 1*WSP local-name *WSP EOL
//! origin    = 1*non-whitespace
//! local-name = 1*non-whitespace
//! ```
//!
//! Trailing whitespace (including the `\r` a container TTY adds) is trimmed
//! before matching. Exactly one matching line must be present.

use std::sync::OnceLock;

use cifuzz_core::{CommitRef, ProjectName, RepoLocation};
use regex::Regex;

use crate::backend::{BuildBackend, ImageName};
use crate::DetectError;

/// Marker that starts the probe's result line.
pub const DETECTION_MARKER: &str = "Detected repo:";

/// What the probe is asked to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectionKey {
    /// Find the checkout whose directory or remote matches this name.
    RepoName(String),
    /// Find the checkout that contains this commit.
    ExampleCommit(CommitRef),
}

impl DetectionKey {
    /// Pick the key from the optional inputs. The repo name wins when both
    /// are given.
    ///
    /// # Errors
    /// Returns [`DetectError::InsufficientInput`] if neither is given.
    pub fn from_inputs(
        repo_name: Option<&str>,
        example_commit: Option<&CommitRef>,
    ) -> Result<Self, DetectError> {
        let repo_name = repo_name.map(str::trim).filter(|n| !n.is_empty());
        match (repo_name, example_commit) {
            (Some(name), commit) => {
                if commit.is_some() {
                    tracing::info!(
                        repo_name = name,
                        "both repo name and example commit given; using repo name for detection"
                    );
                }
                Ok(Self::RepoName(name.to_owned()))
            }
            (None, Some(commit)) => Ok(Self::ExampleCommit(commit.clone())),
            (None, None) => Err(DetectError::InsufficientInput),
        }
    }

    /// Probe arguments: the source root plus the single discriminating flag.
    #[must_use]
    pub fn probe_args(&self, container_src_root: &str) -> Vec<String> {
        let (flag, value) = match self {
            Self::RepoName(name) => ("--repo_name", name.clone()),
            Self::ExampleCommit(commit) => ("--example_commit", commit.to_string()),
        };
        vec![
            "--src_dir".to_owned(),
            container_src_root.to_owned(),
            flag.to_owned(),
            value,
        ]
    }
}

fn detection_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)] // constant pattern
        let re = Regex::new(r"\bDetected repo:\s+(\S+)\s+(\S+)$").expect("detection pattern is valid");
        re
    })
}

/// Parse probe output into a [`RepoLocation`].
///
/// # Errors
/// Returns [`DetectError::NoDetectionLine`] if no line matches,
/// [`DetectError::AmbiguousDetection`] if more than one does, and
/// [`DetectError::InvalidLocation`] if the tokens are not a valid location.
pub fn parse_detected_repo(output: &str) -> Result<RepoLocation, DetectError> {
    let matches: Vec<(&str, &str)> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| line.contains(DETECTION_MARKER))
        .filter_map(|line| detection_line().captures(line))
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    match matches.as_slice() {
        [] => Err(DetectError::NoDetectionLine { output: output.to_owned() }),
        [(origin, local_name)] => Ok(RepoLocation::new(*origin, *local_name)?),
        many => Err(DetectError::AmbiguousDetection {
            count: many.len(),
            output: output.to_owned(),
        }),
    }
}

/// Determines a project's main source repository by probing its build image.
pub struct RepoDetector<'a, B: BuildBackend> {
    backend: &'a B,
    container_src_root: String,
}

impl<'a, B: BuildBackend> RepoDetector<'a, B> {
    /// Create a detector that probes through `backend`.
    #[must_use]
    pub fn new(backend: &'a B, container_src_root: impl Into<String>) -> Self {
        Self { backend, container_src_root: container_src_root.into() }
    }

    /// Detect the main repo, absorbing every failure into `None`.
    ///
    /// Failures are logged, never raised: `None` is the "not found" outcome
    /// callers must check for.
    pub async fn detect_main_repo(
        &self,
        project: &ProjectName,
        repo_name: Option<&str>,
        example_commit: Option<&CommitRef>,
    ) -> Option<RepoLocation> {
        match self.detect(project, repo_name, example_commit).await {
            Ok(location) => {
                tracing::info!(
                    project = %project,
                    origin = %location.origin,
                    local_name = %location.local_name,
                    "detected main repo"
                );
                Some(location)
            }
            Err(DetectError::InsufficientInput) => {
                tracing::error!(project = %project, "{}", DetectError::InsufficientInput);
                None
            }
            Err(e) => {
                let output = match &e {
                    DetectError::ProbeFailed { output, .. }
                    | DetectError::NoDetectionLine { output }
                    | DetectError::AmbiguousDetection { output, .. } => Some(output.as_str()),
                    _ => None,
                };
                tracing::error!(project = %project, error = %e, "no main repo found");
                if let Some(output) = output {
                    tracing::debug!(project = %project, %output, "detection probe output");
                }
                None
            }
        }
    }

    /// Detect the main repo, reporting why detection failed.
    ///
    /// When driven by a repo name, the base builder image is rebuilt first so
    /// the project image is not detected against a stale base. Commit-driven
    /// detection skips that step.
    ///
    /// # Errors
    /// See [`DetectError`]. Nothing is built or run for
    /// [`DetectError::InsufficientInput`] or [`DetectError::ProjectNotFound`].
    pub async fn detect(
        &self,
        project: &ProjectName,
        repo_name: Option<&str>,
        example_commit: Option<&CommitRef>,
    ) -> Result<RepoLocation, DetectError> {
        let key = DetectionKey::from_inputs(repo_name, example_commit)?;

        if !self.backend.project_exists(project).await {
            return Err(DetectError::ProjectNotFound(project.clone()));
        }

        if matches!(key, DetectionKey::RepoName(_)) {
            self.backend
                .build_image(&ImageName::BaseBuilder)
                .await
                .map_err(DetectError::ImageBuild)?;
        }
        self.backend
            .build_image(&ImageName::Project(project.clone()))
            .await
            .map_err(DetectError::ImageBuild)?;

        let args = key.probe_args(&self.container_src_root);
        tracing::debug!(project = %project, args = ?args, "running detection probe");

        let result = self
            .backend
            .run_probe(project, &args)
            .await
            .map_err(DetectError::Probe)?;

        if !result.success() {
            return Err(DetectError::ProbeFailed {
                exit_code: result.exit_code,
                output: result.output,
            });
        }

        parse_detected_repo(&result.output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cifuzz_core::CommandResult;

    use super::*;
    use crate::backend::BuildRequest;
    use crate::ExecutorError;

    /// Fake backend recording image builds and probe arguments.
    struct ProbeBackend {
        known: bool,
        probe_output: String,
        probe_exit: i32,
        images: Mutex<Vec<ImageName>>,
        probes: Mutex<Vec<Vec<String>>>,
    }

    impl ProbeBackend {
        fn new(probe_output: &str) -> Self {
            Self {
                known: true,
                probe_output: probe_output.to_owned(),
                probe_exit: 0,
                images: Mutex::new(Vec::new()),
                probes: Mutex::new(Vec::new()),
            }
        }

        fn images(&self) -> Vec<ImageName> {
            self.images.lock().map(|g| g.clone()).unwrap_or_default()
        }

        fn probes(&self) -> Vec<Vec<String>> {
            self.probes.lock().map(|g| g.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl BuildBackend for ProbeBackend {
        async fn project_exists(&self, _project: &ProjectName) -> bool {
            self.known
        }

        async fn build_image(&self, image: &ImageName) -> Result<(), ExecutorError> {
            if let Ok(mut images) = self.images.lock() {
                images.push(image.clone());
            }
            Ok(())
        }

        async fn run_probe(
            &self,
            _project: &ProjectName,
            args: &[String],
        ) -> Result<CommandResult, ExecutorError> {
            if let Ok(mut probes) = self.probes.lock() {
                probes.push(args.to_vec());
            }
            Ok(CommandResult::new(self.probe_output.clone(), String::new(), self.probe_exit))
        }

        async fn run_build(&self, _request: &BuildRequest) -> Result<(), ExecutorError> {
            Ok(())
        }
    }

    fn project() -> ProjectName {
        match ProjectName::new("example") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    fn commit(sha: &str) -> CommitRef {
        match CommitRef::new(sha) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn parse_detected_repo_reads_origin_and_local_name() {
        let parsed = parse_detected_repo("Detected repo: https://example.com/r.git r\n");
        let loc = match parsed {
            Ok(l) => l,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(loc.origin, "https://example.com/r.git");
        assert_eq!(loc.local_name, "r");
    }

    #[test]
    fn parse_detected_repo_ignores_surrounding_output_and_crlf() {
        let output = "Step 1/3 : FROM base\nDetected repo: https://github.com/curl/curl.git curl\r\ndone\n";
        let loc = match parse_detected_repo(output) {
            Ok(l) => l,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(loc.origin, "https://github.com/curl/curl.git");
        assert_eq!(loc.local_name, "curl");
    }

    #[test]
    fn parse_detected_repo_without_marker_is_no_line() {
        assert!(matches!(
            parse_detected_repo("nothing to see here\n"),
            Err(DetectError::NoDetectionLine { .. })
        ));
        assert!(matches!(parse_detected_repo(""), Err(DetectError::NoDetectionLine { .. })));
    }

    #[test]
    fn parse_detected_repo_rejects_wrong_token_count() {
        assert!(parse_detected_repo("Detected repo: only-one\n").is_err());
        assert!(parse_detected_repo("Detected repo: a b c\n").is_err());
    }

    #[test]
    fn parse_detected_repo_rejects_multiple_lines() {
        let output = "Detected repo: https://a/x.git x\nDetected repo: https://b/y.git y\n";
        assert!(matches!(
            parse_detected_repo(output),
            Err(DetectError::AmbiguousDetection { count: 2, .. })
        ));
    }

    #[test]
    fn detection_key_prefers_repo_name() {
        let c = commit("abc123");
        let key = DetectionKey::from_inputs(Some("curl"), Some(&c));
        assert!(matches!(key, Ok(DetectionKey::RepoName(ref n)) if n == "curl"));
        let key = DetectionKey::from_inputs(None, Some(&c));
        assert!(matches!(key, Ok(DetectionKey::ExampleCommit(_))));
        assert!(matches!(
            DetectionKey::from_inputs(Some("  "), None),
            Err(DetectError::InsufficientInput)
        ));
    }

    #[tokio::test]
    async fn detect_by_repo_name_rebuilds_base_image_first() {
        let backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        let detector = RepoDetector::new(&backend, "/src");
        let loc = detector.detect_main_repo(&project(), Some("r"), None).await;
        assert_eq!(loc.map(|l| l.local_name), Some("r".to_owned()));
        assert_eq!(
            backend.images(),
            vec![ImageName::BaseBuilder, ImageName::Project(project())]
        );
        assert_eq!(
            backend.probes(),
            vec![vec!["--src_dir", "/src", "--repo_name", "r"]
                .into_iter()
                .map(str::to_owned)
                .collect::<Vec<_>>()]
        );
    }

    #[tokio::test]
    async fn detect_by_commit_skips_base_image() {
        let backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        let detector = RepoDetector::new(&backend, "/src");
        let c = commit("abc123");
        let loc = detector.detect_main_repo(&project(), None, Some(&c)).await;
        assert!(loc.is_some());
        assert_eq!(backend.images(), vec![ImageName::Project(project())]);
        let probes = backend.probes();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0][2], "--example_commit");
        assert_eq!(probes[0][3], "abc123");
    }

    #[tokio::test]
    async fn detect_with_both_inputs_probes_once_by_name() {
        let backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        let detector = RepoDetector::new(&backend, "/src");
        let c = commit("abc123");
        let loc = detector.detect_main_repo(&project(), Some("r"), Some(&c)).await;
        assert!(loc.is_some());
        let probes = backend.probes();
        assert_eq!(probes.len(), 1, "exactly one probe invocation");
        assert!(probes[0].contains(&"--repo_name".to_owned()));
        assert!(!probes[0].contains(&"--example_commit".to_owned()));
    }

    #[tokio::test]
    async fn detect_without_inputs_has_no_side_effects() {
        let backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        let detector = RepoDetector::new(&backend, "/src");
        let result = detector.detect(&project(), None, None).await;
        assert!(matches!(result, Err(DetectError::InsufficientInput)));
        assert!(backend.images().is_empty());
        assert!(backend.probes().is_empty());
        assert!(detector.detect_main_repo(&project(), None, None).await.is_none());
    }

    #[tokio::test]
    async fn detect_unknown_project_returns_not_found_without_builds() {
        let mut backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        backend.known = false;
        let detector = RepoDetector::new(&backend, "/src");
        let result = detector.detect(&project(), Some("r"), None).await;
        assert!(matches!(result, Err(DetectError::ProjectNotFound(_))));
        assert!(backend.images().is_empty());
        assert!(detector.detect_main_repo(&project(), Some("r"), None).await.is_none());
    }

    #[tokio::test]
    async fn detect_malformed_output_is_none() {
        let backend = ProbeBackend::new("Traceback (most recent call last):\n  boom\n");
        let detector = RepoDetector::new(&backend, "/src");
        assert!(detector.detect_main_repo(&project(), Some("r"), None).await.is_none());
    }

    #[tokio::test]
    async fn detect_non_zero_probe_exit_is_none() {
        let mut backend = ProbeBackend::new("Detected repo: https://example.com/r.git r\n");
        backend.probe_exit = 1;
        let detector = RepoDetector::new(&backend, "/src");
        let result = detector.detect(&project(), Some("r"), None).await;
        assert!(matches!(result, Err(DetectError::ProbeFailed { exit_code: 1, .. })));
        assert!(detector.detect_main_repo(&project(), Some("r"), None).await.is_none());
    }

    proptest::proptest! {
        #[test]
        fn proptest_detection_line_round_trips(
            origin in "[A-Za-z0-9:/._-]{1,40}",
            local_name in "[A-Za-z0-9_-]{1,20}",
            noise in "[a-z ]{0,30}",
        ) {
            let output = format!("{noise}\nDetected repo: {origin} {local_name}  \n{noise}\n");
            let loc = parse_detected_repo(&output);
            proptest::prop_assert!(loc.is_ok(), "well-formed line must parse: {output:?}");
            if let Ok(loc) = loc {
                proptest::prop_assert_eq!(loc.origin, origin);
                proptest::prop_assert_eq!(loc.local_name, local_name);
            }
        }

        #[test]
        fn proptest_parse_never_panics(output in "\\PC{0,200}") {
            let _ = parse_detected_repo(&output);
        }
    }
}
