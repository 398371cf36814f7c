//! Adapter error types and the user-facing error translation.
//!
//! All adapter subsystems surface errors through [`AdapterError`]. Each
//! variant carries enough context for callers to decide how to handle the
//! failure without inspecting opaque strings. [`AdapterError::user_message`]
//! is the total mapping from any error to the fixed display string a tool
//! invocation returns; the registry applies it so nothing is ever raised past
//! the tool boundary.

/// One violated constraint discovered during parameter validation.
///
/// Validation collects every violation before failing, so a caller fixing
/// their input sees the whole list at once rather than one field per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending parameter name.
    pub field: String,
    /// The constraint that was violated (e.g. "required", "must be <= 100").
    pub constraint: String,
    /// The value received, rendered for display ("missing" when absent).
    pub received: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}`: {} (got {})",
            self.field, self.constraint, self.received
        )
    }
}

/// Unified error type for Concierge adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Missing or invalid local setup (credential env var, default id).
    /// Raised before any network call is attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// One or more caller-supplied parameters violated their constraints.
    /// Raised before any network call is attempted.
    #[error("invalid parameters for tool `{tool_name}`: {}", format_violations(violations))]
    Validation {
        tool_name: String,
        violations: Vec<Violation>,
    },

    /// The upstream API answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The request exceeded its time limit.
    #[error("timeout after {seconds}s")]
    Timeout { seconds: u64 },

    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors. Prefer a typed variant
    /// whenever possible.
    #[error("unexpected error: {kind}: {message}")]
    Unexpected { kind: String, message: String },
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AdapterError {
    /// Shorthand for wrapping an arbitrary failure into the catch-all variant.
    pub fn unexpected(kind: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Unexpected {
            kind: kind.into(),
            message: message.to_string(),
        }
    }

    /// Translate this error into the fixed user-facing message.
    ///
    /// The mapping is total and priority-ordered: configuration first, then
    /// the known HTTP statuses, then timeout, validation, and the generic
    /// fallback. Tool invocations return these strings; they never propagate
    /// the error itself.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(msg) => format!("Configuration Error: {msg}"),
            Self::HttpStatus { status: 400, body } => {
                format!("Error: Bad request. {body}")
            }
            Self::HttpStatus { status: 401, .. } => {
                "Error: Authentication failed. Please check your access token.".to_string()
            }
            Self::HttpStatus { status: 403, .. } => {
                "Error: Permission denied. You don't have access to this resource.".to_string()
            }
            Self::HttpStatus { status: 404, .. } => {
                "Error: Resource not found. Please check the ID.".to_string()
            }
            Self::HttpStatus { status: 429, .. } => {
                "Error: Rate limit exceeded. Please wait before making more requests.".to_string()
            }
            Self::HttpStatus { status, body } => {
                format!("Error: API request failed with status {status}: {body}")
            }
            Self::Timeout { .. } => "Error: Request timed out. Please try again.".to_string(),
            Self::Validation { violations, .. } => {
                format!("Error: Invalid parameters: {}", format_violations(violations))
            }
            Self::ToolNotFound { tool_name, .. } => {
                format!("Error: Unknown tool `{tool_name}`.")
            }
            Self::Serialization(e) => {
                format!("Error: Unexpected error occurred: Serialization: {e}")
            }
            Self::Unexpected { kind, message } => {
                format!("Error: Unexpected error occurred: {kind}: {message}")
            }
        }
    }
}

/// Convenience alias used throughout the Concierge crates.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, body: &str) -> AdapterError {
        AdapterError::HttpStatus {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn config_error_message() {
        let err = AdapterError::Config("ASANA_ACCESS_TOKEN environment variable not set".into());
        assert_eq!(
            err.user_message(),
            "Configuration Error: ASANA_ACCESS_TOKEN environment variable not set"
        );
    }

    #[test]
    fn bad_request_includes_upstream_body() {
        let msg = http(400, "due_on: Not a valid date").user_message();
        assert_eq!(msg, "Error: Bad request. due_on: Not a valid date");
    }

    #[test]
    fn known_statuses_use_fixed_messages() {
        assert_eq!(
            http(401, "ignored").user_message(),
            "Error: Authentication failed. Please check your access token."
        );
        assert_eq!(
            http(403, "ignored").user_message(),
            "Error: Permission denied. You don't have access to this resource."
        );
        assert_eq!(
            http(404, "ignored").user_message(),
            "Error: Resource not found. Please check the ID."
        );
        assert_eq!(
            http(429, "ignored").user_message(),
            "Error: Rate limit exceeded. Please wait before making more requests."
        );
    }

    #[test]
    fn other_status_carries_code_and_body() {
        assert_eq!(
            http(502, "bad gateway").user_message(),
            "Error: API request failed with status 502: bad gateway"
        );
    }

    #[test]
    fn timeout_message_is_fixed() {
        let err = AdapterError::Timeout { seconds: 30 };
        assert_eq!(err.user_message(), "Error: Request timed out. Please try again.");
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = AdapterError::Validation {
            tool_name: "asana_create_task".into(),
            violations: vec![
                Violation {
                    field: "name".into(),
                    constraint: "required".into(),
                    received: "missing".into(),
                },
                Violation {
                    field: "limit".into(),
                    constraint: "must be <= 100".into(),
                    received: "500".into(),
                },
            ],
        };
        let msg = err.user_message();
        assert!(msg.starts_with("Error: Invalid parameters:"));
        assert!(msg.contains("`name`: required"));
        assert!(msg.contains("`limit`: must be <= 100 (got 500)"));
    }

    #[test]
    fn unexpected_names_kind_and_text() {
        let err = AdapterError::unexpected("ParseFloatError", "invalid float literal");
        assert_eq!(
            err.user_message(),
            "Error: Unexpected error occurred: ParseFloatError: invalid float literal"
        );
    }
}
