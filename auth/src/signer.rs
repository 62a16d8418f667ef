use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::TokenPurpose;

/// Signs and verifies purpose-tagged, time-bounded tokens.
///
/// Holds two independent secrets: one for session tokens (access and
/// refresh) and one for password-reset tokens. A token minted under one
/// secret never verifies under the other.
pub struct TokenSigner {
    session: JwtHandler,
    reset: JwtHandler,
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

impl SignedToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }
}

impl TokenSigner {
    /// Create a signer.
    ///
    /// # Arguments
    /// * `session_secret` - Secret for access and refresh tokens
    /// * `reset_secret` - Secret for password-reset tokens
    pub fn new(session_secret: &[u8], reset_secret: &[u8]) -> Self {
        Self {
            session: JwtHandler::new(session_secret),
            reset: JwtHandler::new(reset_secret),
        }
    }

    fn handler_for(&self, purpose: TokenPurpose) -> &JwtHandler {
        match purpose {
            TokenPurpose::Access | TokenPurpose::Refresh => &self.session,
            TokenPurpose::Reset => &self.reset,
        }
    }

    /// Sign a token for `subject` valid for `ttl` from now.
    ///
    /// # Errors
    /// * `SigningFailed` - Claims could not be serialized or signed
    pub fn sign(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<SignedToken, JwtError> {
        self.sign_claims(Claims::new(subject, purpose, Utc::now(), ttl))
    }

    /// Sign a password-reset token bound to `email` and a fresh request id.
    ///
    /// # Errors
    /// * `SigningFailed` - Claims could not be serialized or signed
    pub fn sign_reset(&self, email: &str, ttl: Duration) -> Result<SignedToken, JwtError> {
        self.sign_claims(Claims::for_reset(email, Utc::now(), ttl))
    }

    /// Sign prepared claims with the secret matching their purpose.
    pub fn sign_claims(&self, claims: Claims) -> Result<SignedToken, JwtError> {
        let token = self.handler_for(claims.purpose).encode(&claims)?;
        Ok(SignedToken { token, claims })
    }

    /// Verify signature, purpose and expiry against the current time.
    ///
    /// # Errors
    /// * `InvalidSignature` - Token was not signed with the secret for `expected`
    /// * `Malformed` - Token cannot be decoded
    /// * `WrongPurpose` - Token was issued for another purpose
    /// * `Expired` - `exp` is not in the future
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims, JwtError> {
        self.verify_at(token, expected, Utc::now())
    }

    /// Same as [`TokenSigner::verify`] with an explicit clock.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Claims, JwtError> {
        let claims = self.inspect(token, expected)?;

        if claims.is_expired(now.timestamp()) {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    /// Verify signature and purpose only, ignoring expiry.
    ///
    /// Used where the caller needs the claims of a token that may already
    /// have expired (e.g. to read `exp` when revoking it).
    pub fn inspect(&self, token: &str, expected: TokenPurpose) -> Result<Claims, JwtError> {
        let claims: Claims = self.handler_for(expected).decode(token)?;

        if claims.purpose != expected {
            return Err(JwtError::WrongPurpose {
                expected,
                actual: claims.purpose,
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            b"test_session_secret_at_least_32_bytes!",
            b"test_reset_secret_at_least_32_bytes!!",
        )
    }

    #[test]
    fn test_sign_and_verify_access() {
        let signer = signer();

        let signed = signer
            .sign("user123", TokenPurpose::Access, Duration::hours(1))
            .expect("Failed to sign token");

        let claims = signer
            .verify(&signed.token, TokenPurpose::Access)
            .expect("Token verification failed");

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.purpose, TokenPurpose::Access);
        assert_eq!(claims, signed.claims);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let signer = signer();

        let signed = signer
            .sign("user123", TokenPurpose::Refresh, Duration::days(30))
            .unwrap();

        let result = signer.verify(&signed.token, TokenPurpose::Access);
        assert_eq!(
            result,
            Err(JwtError::WrongPurpose {
                expected: TokenPurpose::Access,
                actual: TokenPurpose::Refresh,
            })
        );
    }

    #[test]
    fn test_access_token_rejected_as_reset() {
        let signer = signer();

        let signed = signer
            .sign("user123", TokenPurpose::Access, Duration::hours(1))
            .unwrap();

        // Different secret, so the signature check fails before the purpose check
        let result = signer.verify(&signed.token, TokenPurpose::Reset);
        assert_eq!(result, Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_reset_token_carries_email_and_uid() {
        let signer = signer();

        let signed = signer.sign_reset("a@x.com", Duration::hours(1)).unwrap();
        let claims = signer.verify(&signed.token, TokenPurpose::Reset).unwrap();

        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert!(claims.uid.is_some());
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();

        let issued_at = Utc::now() - Duration::hours(2);
        let signed = signer
            .sign_claims(Claims::new(
                "user123",
                TokenPurpose::Access,
                issued_at,
                Duration::hours(1),
            ))
            .unwrap();

        assert_eq!(
            signer.verify(&signed.token, TokenPurpose::Access),
            Err(JwtError::Expired)
        );

        // Still readable when expiry is ignored
        let claims = signer.inspect(&signed.token, TokenPurpose::Access).unwrap();
        assert_eq!(claims.sub, "user123");
    }

    #[test]
    fn test_verify_at_clock_offsets() {
        let signer = signer();
        let signed = signer
            .sign("user123", TokenPurpose::Access, Duration::hours(1))
            .unwrap();
        let expires_at = signed.expires_at().unwrap();

        for offset_secs in [-3600_i64, -60, -1] {
            let now = expires_at + Duration::seconds(offset_secs);
            assert!(signer
                .verify_at(&signed.token, TokenPurpose::Access, now)
                .is_ok());
        }

        for offset_secs in [0_i64, 1, 86_400] {
            let now = expires_at + Duration::seconds(offset_secs);
            assert_eq!(
                signer.verify_at(&signed.token, TokenPurpose::Access, now),
                Err(JwtError::Expired)
            );
        }
    }

    #[test]
    fn test_verify_with_other_signer() {
        let signed = signer()
            .sign("user123", TokenPurpose::Access, Duration::hours(1))
            .unwrap();

        let other = TokenSigner::new(
            b"another_session_secret_32_bytes_long",
            b"another_reset_secret_32_bytes_long!!",
        );
        assert_eq!(
            other.verify(&signed.token, TokenPurpose::Access),
            Err(JwtError::InvalidSignature)
        );
    }

    #[test]
    fn test_verify_garbage() {
        let result = signer().verify("invalid.token.here", TokenPurpose::Access);
        assert!(matches!(result, Err(JwtError::Malformed(_))));
    }
}
