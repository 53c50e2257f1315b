//! Engine, sanitizer and architecture options for a containerized build.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Fuzzing engine the build links fuzz targets against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Engine {
    #[default]
    Libfuzzer,
    Afl,
    Honggfuzz,
    Dataflow,
    /// Build without an engine (reproducer binaries only).
    None,
}

impl Engine {
    const EXPECTED: &'static str = "libfuzzer, afl, honggfuzz, dataflow, none";

    /// The value passed as `FUZZING_ENGINE` to the build container.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libfuzzer => "libfuzzer",
            Self::Afl => "afl",
            Self::Honggfuzz => "honggfuzz",
            Self::Dataflow => "dataflow",
            Self::None => "none",
        }
    }
}

/// Runtime instrumentation compiled into the fuzz targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Sanitizer {
    #[default]
    Address,
    Memory,
    Undefined,
    Coverage,
    Dataflow,
}

impl Sanitizer {
    const EXPECTED: &'static str = "address, memory, undefined, coverage, dataflow";

    /// The value passed as `SANITIZER` to the build container.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Memory => "memory",
            Self::Undefined => "undefined",
            Self::Coverage => "coverage",
            Self::Dataflow => "dataflow",
        }
    }
}

/// Target CPU architecture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Architecture {
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "i386")]
    I386,
}

impl Architecture {
    const EXPECTED: &'static str = "x86_64, i386";

    /// The value passed as `ARCHITECTURE` to the build container.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::I386 => "i386",
        }
    }
}

macro_rules! impl_option_str {
    ($ty:ty, $kind:literal, [$($name:literal => $variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(CoreError::UnknownBuildOption {
                        kind: $kind,
                        value: other.to_owned(),
                        expected: <$ty>::EXPECTED,
                    }),
                }
            }
        }
    };
}

impl_option_str!(Engine, "engine", [
    "libfuzzer" => Engine::Libfuzzer,
    "afl" => Engine::Afl,
    "honggfuzz" => Engine::Honggfuzz,
    "dataflow" => Engine::Dataflow,
    "none" => Engine::None,
]);

impl_option_str!(Sanitizer, "sanitizer", [
    "address" => Sanitizer::Address,
    "memory" => Sanitizer::Memory,
    "undefined" => Sanitizer::Undefined,
    "coverage" => Sanitizer::Coverage,
    "dataflow" => Sanitizer::Dataflow,
]);

impl_option_str!(Architecture, "architecture", [
    "x86_64" => Architecture::X86_64,
    "i386" => Architecture::I386,
]);

/// The `{engine, sanitizer, architecture}` bundle for one build invocation.
///
/// Defaults to `{libfuzzer, address, x86_64}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BuildParameters {
    pub engine: Engine,
    pub sanitizer: Sanitizer,
    pub architecture: Architecture,
}

impl BuildParameters {
    #[must_use]
    pub fn new(engine: Engine, sanitizer: Sanitizer, architecture: Architecture) -> Self {
        Self { engine, sanitizer, architecture }
    }
}
