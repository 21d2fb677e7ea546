//! Validation of generated record types.
//!
//! This module provides:
//! - Structural checks with `syn` (always on)
//! - Toolchain location and bounded `rustc` runs
//! - Scratch workspaces holding a copy of the catalog
//! - Diagnostic parsing (rustc JSON → [`Diagnostic`])
//!
//! # Architecture
//!
//! ```text
//! GeneratedDefinition
//!     │
//!     ├── check_structure (syn) ──► MalformedFieldType / CompileError
//!     │
//!     └── ScratchWorkspace ──► rustc --emit=metadata ──► CompileReport
//!               │
//!               └── copy of catalog/ + candidate + lib.rs
//! ```

mod errors;
mod toolchain;
mod types;
mod validator;
mod workspace;

pub use errors::{Diagnostic, DiagnosticParser, Level, SourceLocation};
pub use toolchain::{RunOutcome, ToolchainManager, ToolchainOutput};
pub use types::{CompileReport, ValidatedDefinition, ValidationMode, ValidatorConfig};
pub use validator::{CompileValidator, Validator, check_structure};
pub use workspace::ScratchWorkspace;
