//! Token issuance and verification.
//!
//! Tokens are self-contained JWTs signed with HS256 (symmetric HMAC)
//! using a single process-held secret. The claim carries the user
//! identifier and an absolute expiry set at issuance to now plus the
//! configured lifetime (24 hours by default). Verification checks the
//! signature against the same secret and the expiry with zero leeway, so
//! a claim whose expiry instant has passed is rejected no matter how the
//! rest of the token looks.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AuthError;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// The decoded, verified payload of an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user identifier.
    pub user_id: u64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Issues and verifies signed, time-bound identity tokens.
///
/// Built once at startup from configuration and shared behind an `Arc`;
/// there is no global state and no server-side token store.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: std::time::Duration,
}

impl TokenService {
    /// Creates a token service with the default 24-hour lifetime.
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, DEFAULT_TOKEN_TTL)
    }

    /// Creates a token service with an explicit token lifetime.
    pub fn with_ttl(secret: &str, ttl: std::time::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a signed token for the given user identifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Encoding` if signing fails.
    pub fn issue(&self, user_id: u64) -> Result<String, AuthError> {
        let claims = Claims {
            user_id,
            exp: OffsetDateTime::now_utc().unix_timestamp() + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::encoding(e.to_string()))
    }

    /// Verifies a token string and returns the embedded claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Malformed` if the string cannot be parsed,
    /// `AuthError::InvalidSignature` if the signature does not match the
    /// secret, and `AuthError::Expired` if the expiry has passed.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
