//! Authentication for the todos server.
//!
//! Stateless, symmetric-key tokens: [`TokenService`] issues and verifies
//! HMAC-signed identity claims, and [`middleware::require_auth`] gates
//! protected routes, attaching the verified user to the request.
//!
//! Verification is stateless by design (no server-side session store),
//! which trades revocability for simplicity; the signing secret is a
//! single long-lived in-process value with no rotation path.

pub mod error;
pub mod middleware;
pub mod token;

pub use error::AuthError;
pub use middleware::{AuthUser, require_auth};
pub use token::{Claims, TokenService};
