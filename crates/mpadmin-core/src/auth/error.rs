use thiserror::Error;

use crate::api::ApiError;
use crate::models::Role;

/// Fallback message when the backend gives no usable reason for a rejected login.
const DEFAULT_LOGIN_FAILURE: &str = "Login failed. Please check your credentials.";

/// Shown when the login went through but its result could not be used.
const LOGIN_RETRY: &str = "Login failed. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Credential has expired")]
    ExpiredCredential,

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Your role ({role}) does not have permission to access this page")]
    InsufficientRole { role: Role, path: String },

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Request superseded by a newer session change")]
    Superseded,
}

impl AuthError {
    /// Message suitable for showing on the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(msg) if !msg.trim().is_empty() => msg.clone(),
            AuthError::InvalidCredentials(_) => DEFAULT_LOGIN_FAILURE.to_string(),
            AuthError::NetworkFailure(_) => {
                "Unable to connect to server. Check your connection and try again.".to_string()
            }
            AuthError::InsufficientRole { .. } => self.to_string(),
            AuthError::MalformedCredential(_) | AuthError::ExpiredCredential | AuthError::Storage(_) => {
                LOGIN_RETRY.to_string()
            }
            AuthError::Superseded => "Login was cancelled.".to_string(),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) | ApiError::AccessDenied(msg) => {
                AuthError::InvalidCredentials(msg)
            }
            ApiError::InvalidResponse(msg) => AuthError::MalformedCredential(msg),
            ApiError::NetworkError(e) => AuthError::NetworkFailure(e.to_string()),
            other @ (ApiError::NotFound(_) | ApiError::RateLimited | ApiError::ServerError(_)) => {
                AuthError::NetworkFailure(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Storage(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_uses_backend_text() {
        let err = AuthError::InvalidCredentials("Account is disabled".to_string());
        assert_eq!(err.user_message(), "Account is disabled");
        assert_eq!(
            AuthError::InvalidCredentials(String::new()).user_message(),
            DEFAULT_LOGIN_FAILURE
        );
    }

    #[test]
    fn test_network_failure_suggests_retry() {
        let msg = AuthError::NetworkFailure("connection refused".to_string()).user_message();
        assert!(msg.contains("try again"));
        assert!(!msg.contains("refused"));
    }

    #[test]
    fn test_unusable_login_result_suggests_retry() {
        let malformed = AuthError::from(ApiError::InvalidResponse("missing access_token".to_string()));
        assert_eq!(malformed.user_message(), LOGIN_RETRY);
        assert_eq!(AuthError::ExpiredCredential.user_message(), LOGIN_RETRY);
        assert!(!malformed.user_message().contains("expired"));
    }

    #[test]
    fn test_api_error_mapping() {
        assert_eq!(
            AuthError::from(ApiError::Unauthorized("Invalid credentials".to_string())),
            AuthError::InvalidCredentials("Invalid credentials".to_string())
        );
        assert!(matches!(
            AuthError::from(ApiError::ServerError("boom".to_string())),
            AuthError::NetworkFailure(_)
        ));
        assert!(matches!(
            AuthError::from(ApiError::InvalidResponse("not json".to_string())),
            AuthError::MalformedCredential(_)
        ));
    }

    #[test]
    fn test_insufficient_role_message() {
        let err = AuthError::InsufficientRole {
            role: Role::Worker,
            path: "/customers".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Your role (worker) does not have permission to access this page"
        );
    }
}
