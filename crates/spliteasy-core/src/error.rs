use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response from server: {0}")]
    Decode(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl ApiError {
    pub fn http(status: u16, body_message: Option<String>) -> Self {
        let message = body_message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| message_for_status(status).to_string());
        Self::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Human-readable text for a status when the body carries no message.
pub fn message_for_status(status: u16) -> &'static str {
    match status {
        400 => "The request was not valid",
        401 => "Your session has expired, sign in again",
        403 => "You do not have permission to do that",
        404 => "The requested resource does not exist",
        409 => "The resource was changed by someone else",
        413 => "The file is too large",
        422 => "Some fields were rejected by the server",
        500..=599 => "The server is unavailable, try again later",
        _ => "The request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_message_wins_over_status_text() {
        let err = ApiError::http(400, Some("Email already registered".to_string()));
        assert_eq!(err.to_string(), "Email already registered (HTTP 400)");
    }

    #[test]
    fn blank_body_message_falls_back_to_status_text() {
        let err = ApiError::http(503, Some("  ".to_string()));
        assert_eq!(
            err,
            ApiError::Http {
                status: 503,
                message: "The server is unavailable, try again later".to_string()
            }
        );
    }

    #[test]
    fn not_found_is_recognized_for_both_sources() {
        assert!(ApiError::http(404, None).is_not_found());
        assert!(ApiError::NotFound("bill 4".to_string()).is_not_found());
        assert!(!ApiError::Unauthenticated.is_not_found());
    }
}
