//! Caller-facing submission responses.

use serde::Serialize;

use crate::compile::Diagnostic;
use crate::error::{Error, Result};
use crate::registry::PublishReceipt;

/// Outcome status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Successful,
    Failed,
}

/// JSON body returned for a submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResponse {
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Whether the published type is already visible to lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl SubmissionResponse {
    pub fn success(receipt: &PublishReceipt) -> Self {
        Self {
            status: Status::Successful,
            type_name: Some(receipt.type_name.clone()),
            active: Some(receipt.active),
            kind: None,
            reason: None,
            diagnostics: Vec::new(),
        }
    }

    /// Failure response. Compiler output is passed through verbatim.
    pub fn failure(error: &Error) -> Self {
        let (reason, diagnostics) = match error {
            Error::Compile(report) => (report.raw.clone(), report.diagnostics.clone()),
            other => (other.to_string(), Vec::new()),
        };
        Self {
            status: Status::Failed,
            type_name: None,
            active: None,
            kind: Some(error.kind().to_string()),
            reason: Some(reason),
            diagnostics,
        }
    }

    pub fn from_result(result: &Result<PublishReceipt>) -> Self {
        match result {
            Ok(receipt) => Self::success(receipt),
            Err(e) => Self::failure(e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Successful
    }
}
