use thiserror::Error;

/// Failure of a call to the Q&A server.
///
/// `Status` is a completed exchange with a non-success HTTP status; `message`
/// is what the server said in its `error` field, or a generic line naming the
/// status when it said nothing usable. `Transport` covers everything that
/// kept us from getting a usable response at all (connection refused, bad
/// JSON, truncated body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Server responded with status: {}", status));
        ApiError::Status { status, message }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

/// Attempt to resolve a placeholder that can't be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("message {0} does not exist")]
    UnknownMessage(u64),
    #[error("message {0} is not an unresolved placeholder")]
    AlreadyResolved(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_server_message() {
        let err = ApiError::status(500, Some("db down".to_string()));
        assert_eq!(err.to_string(), "db down");
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn test_status_without_message_names_code() {
        let err = ApiError::status(502, None);
        assert_eq!(err.to_string(), "Server responded with status: 502");
    }

    #[test]
    fn test_status_with_empty_message_names_code() {
        let err = ApiError::status(500, Some(String::new()));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_transport_has_no_status() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "connection refused");
    }
}
