use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::{DecodeError, StoreError};
use crate::schema::ValidationErrors;

/// Message used when the server gives no usable `detail`.
pub const LOGIN_FAILED: &str = "Login Failed";

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Login failures. `Display` is the message shown to the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Login Failed: unable to reach the server")]
    Unreachable(#[source] reqwest::Error),

    #[error("Login Failed: unexpected response ({0})")]
    InvalidResponse(String),

    #[error("Login Failed: the issued token could not be read")]
    InvalidToken(#[source] DecodeError),

    #[error("Login Failed: the session could not be saved")]
    Storage(#[from] StoreError),

    #[error("Login Failed: signed out while signing in")]
    Superseded,
}

impl AuthError {
    /// Build the rejection error from a non-2xx login response body.
    /// Uses the body's string `detail` when there is one.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| LOGIN_FAILED.to_string());
        AuthError::Rejected { status, message }
    }
}

/// The resource operation a `FetchError` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListProducts,
    GetProduct,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::ListProducts => "Failed to fetch products",
            Operation::GetProduct => "Failed to fetch product",
            Operation::CreateProduct => "Failed to create product",
            Operation::UpdateProduct => "Failed to update product",
            Operation::DeleteProduct => "Failed to delete product",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_message())
    }
}

/// Resource client failures. Messages are generic per operation; server
/// bodies are logged, not surfaced.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{op}")]
    Status { op: Operation, status: StatusCode },

    #[error("{op}")]
    Transport {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op}")]
    InvalidResponse {
        op: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: no tenant is available for this session")]
    NoTenant { op: Operation },

    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Invalid tenant id `{0}`")]
    InvalidTenant(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }
}

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_uses_server_detail() {
        let err = AuthError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail":"Invalid credentials"}"#);
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_auth_error_falls_back() {
        // Validation errors carry a list, not a string
        let err = AuthError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","username"],"msg":"field required"}]}"#,
        );
        assert_eq!(err.to_string(), LOGIN_FAILED);

        let err = AuthError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), LOGIN_FAILED);
    }

    #[test]
    fn test_fetch_error_messages() {
        let err = FetchError::Status {
            op: Operation::DeleteProduct,
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "Failed to delete product");
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());

        let err = FetchError::NoTenant { op: Operation::ListProducts };
        assert_eq!(err.status(), None);
        assert!(err.to_string().starts_with("Failed to fetch products"));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(400);
        let truncated = truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
