/// Errors returned by the remote Assistants API operations before they are
/// folded into a generation outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The request or the streaming read failed at the transport level.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl ApiError {
    /// Creates an error for a non-2xx response.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Terminal failure for one generation invocation.
///
/// The orchestrator never propagates these past its own boundary: every
/// variant ends up as an `"Error: <message>"` output string plus the error
/// signal on the sink, so the `Display` text here is user-visible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// Invalid client configuration (missing key, bad HTTP client setup).
    #[error("config error: {0}")]
    Config(String),
    /// A required input was missing; checked before any network call.
    #[error("Please enter all required fields.")]
    Validation,
    /// A remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The run reached the terminal `failed` status.
    #[error("Run failed: {message}")]
    RunFailed { message: String },
    /// An exchange invariant was violated (for example a created thread
    /// arriving without an id).
    #[error("{message}")]
    Protocol { message: String },
    /// The caller aborted the invocation.
    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerateError {
    pub(crate) fn run_failed(message: impl Into<String>) -> Self {
        Self::RunFailed {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_failed_display_carries_server_message() {
        let err = GenerateError::run_failed("rate_limited");
        assert_eq!(err.to_string(), "Run failed: rate_limited");
    }

    #[test]
    fn validation_display_is_the_fixed_user_message() {
        assert_eq!(
            GenerateError::Validation.to_string(),
            "Please enter all required fields."
        );
    }

    #[test]
    fn api_status_display_includes_status_and_body() {
        let err = ApiError::status(401, "unauthorized");
        assert_eq!(
            err.to_string(),
            "request failed with status 401: unauthorized"
        );
    }
}
