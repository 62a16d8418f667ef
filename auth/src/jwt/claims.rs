use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// What a token may be used for.
///
/// Carried in every token so that a credential minted for one flow
/// (e.g. refresh) is never accepted by another (e.g. access).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
    Reset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Refresh => "refresh",
            TokenPurpose::Reset => "reset",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set signed into every token.
///
/// `jti` is a fresh UUID per token, so two tokens for the same subject
/// issued within the same second are still distinct strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id, or the account email for reset tokens)
    pub sub: String,

    /// Intended use of the token
    pub purpose: TokenPurpose,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,

    /// Account email (reset tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Reset request identifier (reset tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl Claims {
    /// Create claims valid from `issued_at` for `ttl`.
    ///
    /// # Arguments
    /// * `subject` - Subject identifier
    /// * `purpose` - Purpose tag
    /// * `issued_at` - Issue instant
    /// * `ttl` - Lifetime of the token
    pub fn new(
        subject: impl ToString,
        purpose: TokenPurpose,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            purpose,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            email: None,
            uid: None,
        }
    }

    /// Create reset claims bound to an email and a fresh request id.
    pub fn for_reset(email: impl ToString, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let email = email.to_string();
        Self::new(&email, TokenPurpose::Reset, issued_at, ttl)
            .with_email(email)
            .with_uid(Uuid::new_v4().to_string())
    }

    /// Set email.
    pub fn with_email(mut self, email: impl ToString) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set reset request id.
    pub fn with_uid(mut self, uid: impl ToString) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    /// Check if token is expired. A token is valid only while `exp > now`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }

    /// Expiration as a timestamp, `None` if `exp` is out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Issue instant as a timestamp, `None` if `iat` is out of range.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}
