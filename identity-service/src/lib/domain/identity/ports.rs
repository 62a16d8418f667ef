use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::identity::errors::AuthError;
use crate::identity::errors::CredentialStoreError;
use crate::identity::models::AuthSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Password;
use crate::identity::models::RegisterCommand;
use crate::identity::models::ResetTicket;
use crate::identity::models::User;
use crate::identity::models::UserId;

/// Port for token lifecycle operations exposed to inbound adapters.
#[async_trait]
pub trait TokenLifecyclePort: Send + Sync + 'static {
    /// Create an account and open a session for it.
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Email is already registered
    /// * `HashingError` / `SigningError` / `StoreUnavailable` - Internal failure
    async fn register(&self, command: RegisterCommand) -> Result<AuthSession, AuthError>;

    /// Open a session for existing credentials.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (not distinguished)
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Resolve an access token to the subject it was issued for.
    ///
    /// # Errors
    /// * `InvalidToken` - Revoked, badly signed, expired, wrong purpose, or unknown subject
    async fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError>;

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// # Errors
    /// * `InvalidToken` - Token fails verification, was superseded, or its subject is gone
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Issue a password-reset token.
    ///
    /// Succeeds whether or not the email belongs to an account.
    async fn forgot_password(&self, email: &EmailAddress) -> Result<ResetTicket, AuthError>;

    /// Consume a reset token and set a new password.
    ///
    /// # Errors
    /// * `InvalidToken` - Token fails verification or does not match the pending reset
    /// * `UserNotFound` - The token's email has no account
    async fn reset_password(&self, token: &str, new_password: Password) -> Result<(), AuthError>;

    /// Revoke an access token before its natural expiry.
    ///
    /// # Errors
    /// * `InvalidToken` - Token cannot be parsed as an access token
    async fn blacklist_token(&self, access_token: &str) -> Result<(), AuthError>;

    /// Whether the token has been revoked.
    async fn is_revoked(&self, token: &str) -> bool;

    /// Load the profile of an authenticated subject.
    ///
    /// # Errors
    /// * `UserNotFound` - Subject has no account
    async fn get_profile(&self, id: &UserId) -> Result<User, AuthError>;
}

/// Persistence of user records and pending reset tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Persist new user.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Unavailable` - Storage operation failed
    async fn create(&self, user: User) -> Result<User, CredentialStoreError>;

    /// Retrieve user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_email(&self, email: &EmailAddress)
        -> Result<Option<User>, CredentialStoreError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CredentialStoreError>;

    /// Record a pending reset token for the account with `email`,
    /// replacing any previous one.
    ///
    /// # Errors
    /// * `NotFound` - No account with this email
    /// * `Unavailable` - Storage operation failed
    async fn save_reset_token(
        &self,
        email: &EmailAddress,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError>;

    /// Retrieve the user holding this unexpired reset token.
    ///
    /// # Returns
    /// Optional user entity (None if no such pending reset)
    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, CredentialStoreError>;

    /// Clear the pending reset token of `id` only if it is exactly `token`
    /// and still unexpired.
    ///
    /// # Returns
    /// `true` if this call cleared it; `false` if it was absent, expired,
    /// different, or already consumed
    async fn consume_reset_token(&self, id: &UserId, token: &str)
        -> Result<bool, CredentialStoreError>;

    /// Replace the password hash and clear any pending reset token.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Unavailable` - Storage operation failed
    async fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), CredentialStoreError>;
}
