//! Error types for treegrant operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Wire code carried by every failed listing call.
pub const LIST_FILES_CODE: &str = "E_LIST_FILES";

/// Structured error payload shared between the service and the CLI.
///
/// Listing failures all share [`LIST_FILES_CODE`]; `kind` and `message`
/// keep the four failure kinds apart on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    pub hint: String,
}

impl ErrorEnvelope {
    pub fn new(
        code: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            kind,
            message: message.into(),
            hint: hint.into(),
        }
    }
}

/// Classification of a [`TreeGrantError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedHandle,
    GrantDenied,
    QueryUnavailable,
    MalformedRow,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedHandle => "malformed_handle",
            Self::GrantDenied => "grant_denied",
            Self::QueryUnavailable => "query_unavailable",
            Self::MalformedRow => "malformed_row",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }

    /// True for the four kinds a listing call can fail with.
    pub fn is_listing_failure(self) -> bool {
        matches!(
            self,
            Self::MalformedHandle | Self::GrantDenied | Self::QueryUnavailable | Self::MalformedRow
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeGrantError {
    #[error("Malformed tree handle {input:?}: {reason}")]
    MalformedHandle { input: String, reason: String },

    #[error("Grant denied for {handle}: {reason}")]
    GrantDenied { handle: String, reason: String },

    #[error("Query unavailable for {target}: {reason}")]
    QueryUnavailable { target: String, reason: String },

    #[error("Malformed row {index}: missing required field {field}")]
    MalformedRow { index: usize, field: &'static str },

    #[error("Config already exists at {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TreeGrantError {
    pub(crate) fn malformed_handle(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHandle {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHandle { .. } => ErrorKind::MalformedHandle,
            Self::GrantDenied { .. } => ErrorKind::GrantDenied,
            Self::QueryUnavailable { .. } => ErrorKind::QueryUnavailable,
            Self::MalformedRow { .. } => ErrorKind::MalformedRow,
            Self::ConfigExists(_) | Self::ConfigParse(_) => ErrorKind::Config,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Wire form of this error; the message text is preserved verbatim.
    pub fn envelope(&self) -> ErrorEnvelope {
        let kind = self.kind();
        let (code, hint) = match kind {
            ErrorKind::MalformedHandle => (
                LIST_FILES_CODE,
                "Pass a handle of the form tree://<authority>/<tree-id>",
            ),
            ErrorKind::GrantDenied => (
                LIST_FILES_CODE,
                "Ask the user to select the directory again",
            ),
            ErrorKind::QueryUnavailable => (
                LIST_FILES_CODE,
                "The provider could not open the query; retry later",
            ),
            ErrorKind::MalformedRow => (
                LIST_FILES_CODE,
                "The provider returned an incomplete row",
            ),
            ErrorKind::Config => ("E_CONFIG", "Check the treegrant config file"),
            ErrorKind::Internal => ("E_INTERNAL", "Check logs for details"),
        };
        ErrorEnvelope::new(code, kind, self.to_string(), hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_kinds_share_wire_code() {
        let errors = [
            TreeGrantError::malformed_handle("x", "no scheme"),
            TreeGrantError::GrantDenied {
                handle: "tree://a/b".into(),
                reason: "no consent".into(),
            },
            TreeGrantError::QueryUnavailable {
                target: "t".into(),
                reason: "null result".into(),
            },
            TreeGrantError::MalformedRow {
                index: 3,
                field: "mime_type",
            },
        ];
        for err in &errors {
            let env = err.envelope();
            assert_eq!(env.code, LIST_FILES_CODE);
            assert!(env.kind.is_listing_failure());
            assert_eq!(env.message, err.to_string());
        }
    }

    #[test]
    fn envelope_serializes_kind_as_snake_case() {
        let env = TreeGrantError::malformed_handle("not-a-uri", "missing scheme").envelope();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], "E_LIST_FILES");
        assert_eq!(json["kind"], "malformed_handle");
        assert!(json["message"].as_str().unwrap().contains("not-a-uri"));
    }

    #[test]
    fn config_errors_are_not_listing_failures() {
        let err = TreeGrantError::ConfigParse("bad".into());
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.envelope().code, "E_CONFIG");
    }
}
