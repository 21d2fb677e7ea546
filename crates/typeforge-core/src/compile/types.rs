//! Common types for the validation pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::Diagnostic;
use crate::generate::GeneratedDefinition;

/// How generated source is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Parse with `syn`, then type-check with `rustc`.
    #[default]
    Toolchain,
    /// Parse with `syn` only.
    Embedded,
}

/// Configuration for the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub mode: ValidationMode,

    /// Upper bound on one toolchain run, in seconds.
    pub timeout_secs: u64,

    /// Rust edition passed to rustc.
    pub edition: String,

    /// Explicit rustc path. Looked up on PATH when unset.
    pub rustc: Option<PathBuf>,

    /// Parent directory for scratch workspaces (system temp dir if unset).
    pub scratch_dir: Option<PathBuf>,

    /// Additional rustc flags
    pub extra_rustc_flags: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Toolchain,
            timeout_secs: 60,
            edition: "2021".to_string(),
            rustc: None,
            scratch_dir: None,
            extra_rustc_flags: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    /// Config that never starts a subprocess.
    pub fn embedded() -> Self {
        Self {
            mode: ValidationMode::Embedded,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Why a generated definition was rejected.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    /// Diagnostic output exactly as the validator produced it.
    pub raw: String,

    /// Structured diagnostics parsed from `raw`, when available.
    pub diagnostics: Vec<Diagnostic>,

    /// The toolchain did not finish within the configured timeout.
    pub timed_out: bool,
}

impl CompileReport {
    /// A report carrying only raw text.
    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Default::default()
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            raw: format!("validation timed out after {}s", after.as_secs()),
            diagnostics: Vec::new(),
            timed_out: true,
        }
    }
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            return write!(f, "compilation failed: {}", self.raw);
        }
        write!(f, "compilation failed:\n{}", self.raw.trim_end())
    }
}

/// A definition that passed validation.
///
/// Only validators inside this crate can produce one, so publishing is
/// statically tied to a successful validation of the exact same source.
#[derive(Debug, Clone)]
pub struct ValidatedDefinition(GeneratedDefinition);

impl ValidatedDefinition {
    pub(crate) fn new(definition: GeneratedDefinition) -> Self {
        Self(definition)
    }

    pub fn definition(&self) -> &GeneratedDefinition {
        &self.0
    }

    pub fn into_definition(self) -> GeneratedDefinition {
        self.0
    }
}
