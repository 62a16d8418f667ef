use auth::JwtError;
use auth::PasswordError;
use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for DisplayName validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisplayNameError {
    #[error("Name must not be empty")]
    Empty,

    #[error("Name too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for plaintext password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// Failures reported by a credential store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialStoreError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for token lifecycle operations.
///
/// Token and credential failures are deliberately coarse: callers learn
/// that a check failed, never which one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    // Internal errors
    #[error("Token signing failed: {0}")]
    SigningError(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::SigningFailed(msg) => AuthError::SigningError(msg),
            JwtError::InvalidSignature
            | JwtError::Malformed(_)
            | JwtError::Expired
            | JwtError::WrongPurpose { .. } => AuthError::InvalidToken,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::HashingError(err.to_string())
    }
}

impl From<CredentialStoreError> for AuthError {
    fn from(err: CredentialStoreError) -> Self {
        match err {
            CredentialStoreError::NotFound(_) => AuthError::UserNotFound,
            CredentialStoreError::EmailAlreadyExists(email) => AuthError::UserAlreadyExists(email),
            CredentialStoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use auth::TokenPurpose;

    use super::*;

    #[test]
    fn test_token_failures_collapse_to_invalid_token() {
        let failures = [
            JwtError::InvalidSignature,
            JwtError::Malformed("bad".to_string()),
            JwtError::Expired,
            JwtError::WrongPurpose {
                expected: TokenPurpose::Access,
                actual: TokenPurpose::Refresh,
            },
        ];

        for failure in failures {
            assert_eq!(AuthError::from(failure), AuthError::InvalidToken);
        }
    }

    #[test]
    fn test_signing_failure_is_internal() {
        let err = AuthError::from(JwtError::SigningFailed("boom".to_string()));
        assert_eq!(err, AuthError::SigningError("boom".to_string()));
    }

    #[test]
    fn test_store_errors() {
        assert_eq!(
            AuthError::from(CredentialStoreError::NotFound("x".to_string())),
            AuthError::UserNotFound
        );
        assert_eq!(
            AuthError::from(CredentialStoreError::EmailAlreadyExists("a@x.com".to_string())),
            AuthError::UserAlreadyExists("a@x.com".to_string())
        );
        assert!(matches!(
            AuthError::from(CredentialStoreError::Unavailable("down".to_string())),
            AuthError::StoreUnavailable(_)
        ));
    }
}
