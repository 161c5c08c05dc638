//! Token error types.

/// Errors that can occur during token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token string cannot be parsed.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of why the token cannot be parsed.
        message: String,
    },

    /// The token signature does not match the signing secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token expiry has passed.
    #[error("Token expired")]
    Expired,

    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns `true` if this failure means the client's token was
    /// rejected (as opposed to a server-side issuance failure).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::InvalidSignature | Self::Expired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}
