use thiserror::Error;

/// Message shown on the login view when the server rejects the credentials.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Incorrect email or password";

/// Errors from `SessionManager::login`.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    #[error("Network error: {0}")]
    NetworkUnavailable(String),

    #[error("Malformed login response: {0}")]
    MalformedResponse(String),

    #[error("Failed to persist session: {0}")]
    Storage(String),
}

impl AuthError {
    /// Short message suitable for inline display on the login view.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            AuthError::NetworkUnavailable(_) | AuthError::MalformedResponse(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            AuthError::Storage(_) => {
                "Signed in, but the session could not be saved on this machine.".to_string()
            }
        }
    }

    /// Whether re-submitting the same credentials may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::NetworkUnavailable(_) | AuthError::MalformedResponse(_)
        )
    }
}

/// Errors from authorized requests made through `AuthorizedClient`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session has been ended")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "no"),
            ApiError::AccessDenied(ref b) if b == "no"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));

        // Multi-byte characters are not split
        let cyrillic = "ж".repeat(400);
        let truncated = ApiError::truncate_body(&cyrillic);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Incorrect email or password"
        );
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            INVALID_CREDENTIALS_MESSAGE
        );
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(AuthError::NetworkUnavailable("refused".into()).is_retryable());
        assert!(AuthError::MalformedResponse("missing token".into()).is_retryable());
        assert_eq!(
            AuthError::MalformedResponse("x".into()).user_message(),
            AuthError::NetworkUnavailable("y".into()).user_message()
        );
    }
}
