//! Client error taxonomy.
//!
//! Every operation returns `Result<T, ClientError>`. Failures never mutate
//! local state; the store that caught the error shows
//! [`ClientError::user_message`] as a transient notice.

use freshmart_core::{CartError, CheckoutError, OrderError};
use thiserror::Error;

/// Message shown when the server gave nothing usable.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required field is missing or malformed; nothing was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No unit is known for a line that needs one to be identified.
    #[error("Missing rate: {0}")]
    MissingRate(String),

    /// Transport failure (connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("(no message)"))]
    Http {
        /// Status code.
        status: u16,
        /// Message extracted from the error body, if it had one.
        message: Option<String>,
    },

    /// Response body is not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but violates the data model.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The order action is not offered in the order's current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] OrderError),

    /// Configured URL could not be joined with an endpoint path.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Text to show the user.
    ///
    /// HTTP errors show the server's message when the body carried one;
    /// validation errors show their own text; everything else falls back to
    /// [`GENERIC_FAILURE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => msg.clone(),
            Self::Validation(msg) | Self::MissingRate(msg) => msg.clone(),
            Self::InvalidTransition(err) => err.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    /// Whether this is the given HTTP status.
    #[must_use]
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Http { status, .. } if *status == code)
    }
}

impl From<CheckoutError> for ClientError {
    fn from(err: CheckoutError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CartError> for ClientError {
    fn from(err: CartError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = ClientError::Http {
            status: 404,
            message: Some("Cart not found".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 404: Cart not found");

        let err = ClientError::Http {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 502: (no message)");
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ClientError::Http {
            status: 400,
            message: Some("Out of stock".to_string()),
        };
        assert_eq!(err.user_message(), "Out of stock");
    }

    #[test]
    fn test_user_message_fallback() {
        let err = ClientError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ClientError::Malformed("quantity 0".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ClientError::Parse(parse).user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_validation_message_shown() {
        let err = ClientError::Validation("quantity is required".to_string());
        assert_eq!(err.user_message(), "quantity is required");
    }

    #[test]
    fn test_is_status() {
        let err = ClientError::Http {
            status: 500,
            message: None,
        };
        assert!(err.is_status(500));
        assert!(!err.is_status(404));
    }
}
