//! Parsing rustc diagnostics for the validation pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Diagnostic message
    pub message: String,

    /// Error code (e.g., "E0412")
    pub code: Option<String>,

    /// Severity level
    pub level: Level,

    /// Primary source location
    pub location: Option<SourceLocation>,

    /// Rendered message as rustc prints it
    pub rendered: Option<String>,
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
}

/// A location in generated source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// File name relative to the validation workspace
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

/// Rustc JSON diagnostic format.
#[derive(Debug, Deserialize)]
struct RustcDiagnostic {
    message: String,
    code: Option<RustcCode>,
    level: String,
    spans: Vec<RustcSpan>,
    rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RustcCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct RustcSpan {
    file_name: String,
    line_start: usize,
    column_start: usize,
    is_primary: bool,
}

/// Parses `--error-format=json` output from a run inside a workspace.
pub struct DiagnosticParser {
    /// Workspace root, stripped from reported file names
    workspace_root: PathBuf,
}

impl DiagnosticParser {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// Parse rustc JSON output, one diagnostic per line.
    ///
    /// Lines that are not JSON diagnostics are skipped.
    pub fn parse(&self, json_output: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for line in json_output.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RustcDiagnostic>(line) {
                Ok(diagnostic) => {
                    if let Some(mapped) = self.map_diagnostic(&diagnostic) {
                        diagnostics.push(mapped);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        "Failed to parse rustc JSON: {} (line: {})",
                        e,
                        line.chars().take(100).collect::<String>()
                    );
                }
            }
        }

        diagnostics
    }

    fn map_diagnostic(&self, diagnostic: &RustcDiagnostic) -> Option<Diagnostic> {
        let level = match diagnostic.level.as_str() {
            "error" => Level::Error,
            "warning" => Level::Warning,
            "note" => Level::Note,
            "help" => Level::Help,
            _ => return None,
        };

        let location = diagnostic
            .spans
            .iter()
            .find(|s| s.is_primary)
            .map(|span| SourceLocation {
                file: self.relative_name(&span.file_name),
                line: span.line_start,
                column: span.column_start,
            });

        Some(Diagnostic {
            message: diagnostic.message.clone(),
            code: diagnostic.code.as_ref().map(|c| c.code.clone()),
            level,
            location,
            rendered: diagnostic.rendered.clone(),
        })
    }

    fn relative_name(&self, file_name: &str) -> String {
        Path::new(file_name)
            .strip_prefix(&self.workspace_root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| file_name.to_string())
    }
}

impl Diagnostic {
    /// A plain error without location, for failures outside rustc.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            level: Level::Error,
            location: None,
            rendered: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// One-line summary: `error[E0412]: message (order.rs:12:14)`.
    pub fn summary(&self) -> String {
        let level = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
            Level::Help => "help",
        };
        let mut out = match &self.code {
            Some(code) => format!("{level}[{code}]: {}", self.message),
            None => format!("{level}: {}", self.message),
        };
        if let Some(loc) = &self.location {
            out.push_str(&format!(" ({}:{}:{})", loc.file, loc.line, loc.column));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rustc_json() {
        let json = r#"{"message":"cannot find type `Strng` in this scope","code":{"code":"E0412"},"level":"error","spans":[{"file_name":"/tmp/ws/order.rs","line_start":14,"line_end":14,"column_start":14,"column_end":19,"is_primary":true,"label":"not found in this scope"}],"rendered":"error[E0412]: cannot find type `Strng` in this scope"}"#;

        let parser = DiagnosticParser::new("/tmp/ws");
        let diagnostics = parser.parse(json);

        assert_eq!(diagnostics.len(), 1);
        let diag = &diagnostics[0];
        assert_eq!(diag.code.as_deref(), Some("E0412"));
        assert!(diag.is_error());
        let loc = diag.location.as_ref().unwrap();
        assert_eq!(loc.file, "order.rs");
        assert_eq!((loc.line, loc.column), (14, 14));
    }

    #[test]
    fn test_skips_noise() {
        let output = "not json\n\n{\"message\":\"x\",\"code\":null,\"level\":\"failure-note\",\"spans\":[],\"rendered\":null}\n";
        let diagnostics = DiagnosticParser::new("/tmp/ws").parse(output);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_summary() {
        let diag = Diagnostic {
            message: "test error".to_string(),
            code: Some("E0001".to_string()),
            level: Level::Error,
            location: Some(SourceLocation {
                file: "order.rs".to_string(),
                line: 10,
                column: 5,
            }),
            rendered: None,
        };

        let summary = diag.summary();
        assert_eq!(summary, "error[E0001]: test error (order.rs:10:5)");
        assert_eq!(Diagnostic::error("boom").summary(), "error: boom");
    }
}
