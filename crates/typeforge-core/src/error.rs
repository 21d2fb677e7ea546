//! Error types for typeforge-core.

use std::fmt;

use thiserror::Error;

use crate::compile::CompileReport;

/// Result type for typeforge-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a schema into a published type.
///
/// Every variant is recoverable: the pipeline reports it to the caller and
/// leaves the catalog untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema name is unusable or already taken.
    #[error("invalid type name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// A field key canonicalizes to something that cannot name a field.
    #[error("invalid field name `{key}`: {reason}")]
    InvalidFieldName { key: String, reason: String },

    /// Two field keys canonicalize to the same identifier.
    #[error("fields `{first}` and `{second}` both canonicalize to `{ident}`")]
    DuplicateField {
        first: String,
        second: String,
        ident: String,
    },

    /// A declared field type is empty or does not parse as a type.
    #[error("malformed type `{declared}` for field `{field}`: {reason}")]
    MalformedFieldType {
        field: String,
        declared: String,
        reason: String,
    },

    /// The generated source was rejected during validation.
    #[error("{0}")]
    Compile(CompileReport),

    /// Writing a validated definition to the catalog failed.
    #[error("failed to publish `{name}`: {source}")]
    Publish {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The external toolchain could not be located or started.
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// The durable catalog could not be read back.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// The submission payload could not be decoded.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    DuplicateFieldError,
    MalformedFieldType,
    CompileError,
    PublishError,
    /// The request body was not a schema at all.
    InvalidPayload,
    /// Faults outside the submission taxonomy (startup, configuration).
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidName => "InvalidName",
            Self::DuplicateFieldError => "DuplicateFieldError",
            Self::MalformedFieldType => "MalformedFieldType",
            Self::CompileError => "CompileError",
            Self::PublishError => "PublishError",
            Self::InvalidPayload => "InvalidPayload",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error for the submitting caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } | Self::InvalidFieldName { .. } => ErrorKind::InvalidName,
            Self::DuplicateField { .. } => ErrorKind::DuplicateFieldError,
            Self::MalformedFieldType { .. } => ErrorKind::MalformedFieldType,
            Self::Compile(_) | Self::Toolchain(_) => ErrorKind::CompileError,
            Self::Publish { .. } => ErrorKind::PublishError,
            Self::Payload(_) => ErrorKind::InvalidPayload,
            Self::Catalog(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Render the error together with a recovery hint for operators.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::InvalidName { .. } => "choose a different type name",
            Self::InvalidFieldName { .. } => "field keys need at least one letter or digit",
            Self::DuplicateField { .. } => "rename one of the conflicting field keys",
            Self::MalformedFieldType { .. } => "declared types must be Rust type expressions",
            Self::Compile(report) if report.timed_out => {
                "raise validation.timeout_secs or simplify the declared types"
            }
            Self::Compile(_) => "fix the declared types reported above",
            Self::Publish { .. } => "check that the catalog directory is writable",
            Self::Toolchain(_) => "install rustc or set validation.rustc in the config",
            Self::Catalog(_) => "repair or remove the offending catalog entry",
            Self::Payload(_) => "submit a JSON object with `name` and `fields`",
            Self::Config(_) => "check the configuration file",
            Self::Io(_) => "check file permissions and free space",
        };
        format!("{self}\n  hint: {hint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::InvalidFieldName {
            key: "!!".to_string(),
            reason: "no usable characters".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidName);

        let err = Error::Toolchain("rustc not found".to_string());
        assert_eq!(err.kind(), ErrorKind::CompileError);
        assert_eq!(err.kind().as_str(), "CompileError");
    }

    #[test]
    fn test_with_hint() {
        let err = Error::DuplicateField {
            first: "user_id".to_string(),
            second: "userId".to_string(),
            ident: "UserID".to_string(),
        };
        let rendered = err.with_hint();
        assert!(rendered.contains("UserID"));
        assert!(rendered.contains("hint:"));
    }
}
