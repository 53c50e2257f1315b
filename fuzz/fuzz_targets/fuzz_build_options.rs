//! Fuzz target: build option and identifier parsing.
//!
//! Parsing any string as an engine, sanitizer, architecture, project name or
//! commit must not panic, and accepted options must print back to a form that
//! parses to the same value.
#![no_main]

use cifuzz_core::{Architecture, CommitRef, Engine, ProjectName, Sanitizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(engine) = data.parse::<Engine>() {
        assert_eq!(engine.to_string().parse::<Engine>().ok(), Some(engine));
    }
    if let Ok(sanitizer) = data.parse::<Sanitizer>() {
        assert_eq!(sanitizer.to_string().parse::<Sanitizer>().ok(), Some(sanitizer));
    }
    if let Ok(arch) = data.parse::<Architecture>() {
        assert_eq!(arch.to_string().parse::<Architecture>().ok(), Some(arch));
    }
    if let Ok(project) = ProjectName::new(data) {
        assert!(!project.as_str().contains('/'));
    }
    if let Ok(commit) = CommitRef::new(data) {
        assert!(!commit.as_str().is_empty());
    }
});
