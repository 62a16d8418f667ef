//! Credential primitives shared by services:
//! - Password hashing (Argon2id)
//! - Purpose-tagged JWT signing and verification with separate session
//!   and reset secrets
//!
//! Services own their lifecycle rules (revocation, rotation, reset
//! bookkeeping) and build them on top of these primitives.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_cost(1024, 1, 1).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! assert!(!hasher.verify("not_my_password", &hash));
//! ```
//!
//! ## Signing Tokens
//! ```
//! use auth::{JwtError, TokenPurpose, TokenSigner};
//! use chrono::Duration;
//!
//! let signer = TokenSigner::new(
//!     b"session_secret_at_least_32_bytes_long!",
//!     b"reset_secret_at_least_32_bytes_long!!!",
//! );
//!
//! let access = signer.sign("user123", TokenPurpose::Access, Duration::hours(24)).unwrap();
//! let claims = signer.verify(&access.token, TokenPurpose::Access).unwrap();
//! assert_eq!(claims.sub, "user123");
//!
//! // An access token is never accepted as a refresh token
//! assert!(matches!(
//!     signer.verify(&access.token, TokenPurpose::Refresh),
//!     Err(JwtError::WrongPurpose { .. })
//! ));
//! ```

pub mod jwt;
pub mod password;
pub mod signer;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenPurpose;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use signer::SignedToken;
pub use signer::TokenSigner;
