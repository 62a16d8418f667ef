use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenPurpose;
use auth::TokenSigner;
use chrono::DateTime;
use chrono::Utc;

use crate::identity::errors::AuthError;
use crate::identity::errors::CredentialStoreError;
use crate::identity::models::AuthSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::LifecycleSettings;
use crate::identity::models::Password;
use crate::identity::models::RefreshPolicy;
use crate::identity::models::RegisterCommand;
use crate::identity::models::ResetTicket;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;
use crate::identity::ports::TokenLifecyclePort;
use crate::identity::registry::RefreshTokenIndex;
use crate::identity::registry::ResetRecord;
use crate::identity::registry::ResetTokenIndex;
use crate::identity::registry::RevocationSet;

/// Domain service issuing, validating, rotating and revoking credentials.
///
/// Owns the in-process revocation, refresh and reset state; each map sits
/// behind its own lock, and no lock is held across a store call.
pub struct TokenLifecycleManager<CS>
where
    CS: CredentialStore,
{
    store: Arc<CS>,
    signer: TokenSigner,
    password_hasher: PasswordHasher,
    settings: LifecycleSettings,
    revoked: RevocationSet,
    refresh_tokens: RefreshTokenIndex,
    reset_tokens: ResetTokenIndex,
}

impl<CS> TokenLifecycleManager<CS>
where
    CS: CredentialStore,
{
    /// Create a new lifecycle manager with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential store implementation
    /// * `signer` - Token signer holding the session and reset secrets
    /// * `password_hasher` - Password hasher with the configured cost
    /// * `settings` - Token lifetimes and policies
    pub fn new(
        store: Arc<CS>,
        signer: TokenSigner,
        password_hasher: PasswordHasher,
        settings: LifecycleSettings,
    ) -> Self {
        let revoked = RevocationSet::new(settings.revocation_sweep_every);
        Self {
            store,
            signer,
            password_hasher,
            settings,
            revoked,
            refresh_tokens: RefreshTokenIndex::new(),
            reset_tokens: ResetTokenIndex::new(),
        }
    }

    /// Sign an access/refresh pair for `user` and make the refresh token
    /// the subject's authoritative one.
    async fn issue_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let subject = user.id.to_string();

        let access = self.signer.sign(
            &subject,
            TokenPurpose::Access,
            self.settings.access_token_ttl,
        )?;
        let refresh = self.signer.sign(
            &subject,
            TokenPurpose::Refresh,
            self.settings.refresh_token_ttl,
        )?;

        self.refresh_tokens
            .record(user.id, refresh.token.clone())
            .await;

        Ok(AuthSession {
            access_token: access.token,
            refresh_token: refresh.token,
            user,
        })
    }

    fn subject_of(sub: &str) -> Result<UserId, AuthError> {
        UserId::from_string(sub).map_err(|_| AuthError::InvalidToken)
    }

    /// Put a claimed reset token back after a later step of the reset failed.
    async fn restore_reset(
        &self,
        user: &User,
        token: &str,
        expires_at: DateTime<Utc>,
        indexed: Option<ResetRecord>,
    ) {
        if let Err(e) = self
            .store
            .save_reset_token(&user.email, token, expires_at)
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to restore reset token");
            return;
        }

        if let Some(record) = indexed {
            self.reset_tokens.insert(token.to_string(), record).await;
        }
    }
}

#[async_trait]
impl<CS> TokenLifecyclePort for TokenLifecycleManager<CS>
where
    CS: CredentialStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<AuthSession, AuthError> {
        if self.store.find_by_email(&command.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists(command.email.to_string()));
        }

        let password_hash = self.password_hasher.hash(command.password.expose())?;
        let user = self
            .store
            .create(User::new(command.name, command.email, password_hash))
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.issue_session(user).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email =
            EmailAddress::new(email.to_string()).map_err(|_| AuthError::InvalidCredentials)?;

        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.password_hasher.verify(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.issue_session(user).await
    }

    async fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        if self.revoked.contains(token).await {
            return Err(AuthError::InvalidToken);
        }

        let claims = self.signer.verify(token, TokenPurpose::Access)?;
        let user_id = Self::subject_of(&claims.sub)?;

        match self.store.find_by_id(&user_id).await? {
            Some(_) => Ok(user_id),
            None => Err(AuthError::InvalidToken),
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let claims = self
            .signer
            .verify(refresh_token, TokenPurpose::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AuthError::InvalidToken
            })?;
        let user_id = Self::subject_of(&claims.sub)?;

        if self.settings.refresh_policy == RefreshPolicy::RejectSuperseded
            && !self.refresh_tokens.is_current(&user_id, refresh_token).await
        {
            tracing::warn!(user_id = %user_id, "Superseded refresh token presented");
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .store
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        tracing::info!(user_id = %user.id, "Session refreshed");

        self.issue_session(user).await
    }

    async fn forgot_password(&self, email: &EmailAddress) -> Result<ResetTicket, AuthError> {
        let signed = self
            .signer
            .sign_reset(email.as_str(), self.settings.reset_token_ttl)?;
        let expires_at = signed
            .expires_at()
            .ok_or_else(|| AuthError::SigningError("reset expiry out of range".to_string()))?;

        let Some(user) = self.store.find_by_email(email).await? else {
            // Same answer as for a real account; nothing is persisted
            tracing::debug!("Reset requested for unknown email");
            return Ok(ResetTicket {
                token: signed.token,
                expires_at,
            });
        };

        match self
            .store
            .save_reset_token(email, &signed.token, expires_at)
            .await
        {
            Ok(()) => {}
            // Account removed between lookup and save
            Err(CredentialStoreError::NotFound(_)) => {
                return Ok(ResetTicket {
                    token: signed.token,
                    expires_at,
                })
            }
            Err(e) => return Err(e.into()),
        }

        self.reset_tokens
            .insert(
                signed.token.clone(),
                ResetRecord {
                    subject_id: user.id,
                    expires_at,
                },
            )
            .await;

        tracing::info!(user_id = %user.id, %expires_at, "Password reset token issued");

        Ok(ResetTicket {
            token: signed.token,
            expires_at,
        })
    }

    async fn reset_password(&self, token: &str, new_password: Password) -> Result<(), AuthError> {
        let claims = self.signer.verify(token, TokenPurpose::Reset)?;
        let expires_at = claims.expires_at().ok_or(AuthError::InvalidToken)?;
        let email = claims
            .email
            .and_then(|email| EmailAddress::new(email).ok())
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Claim the token before any slow work; the conditional store clear
        // lets exactly one concurrent caller through
        let indexed = self.reset_tokens.take(token, &user.id, Utc::now()).await;
        match self.store.consume_reset_token(&user.id, token).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(user_id = %user.id, "Reset token does not match pending reset");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => {
                if let Some(record) = indexed {
                    self.reset_tokens.insert(token.to_string(), record).await;
                }
                return Err(e.into());
            }
        }

        let updated = match self.password_hasher.hash(new_password.expose()) {
            Ok(password_hash) => self
                .store
                .update_password(&user.id, &password_hash)
                .await
                .map_err(AuthError::from),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = updated {
            self.restore_reset(&user, token, expires_at, indexed).await;
            return Err(e);
        }

        self.refresh_tokens.forget(&user.id).await;

        tracing::info!(user_id = %user.id, "Password reset completed");

        Ok(())
    }

    async fn blacklist_token(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.signer.inspect(access_token, TokenPurpose::Access)?;
        let expires_at = claims.expires_at().ok_or(AuthError::InvalidToken)?;

        if expires_at <= Utc::now() {
            // Already terminal
            return Ok(());
        }

        self.revoked
            .revoke(access_token.to_string(), expires_at)
            .await;

        tracing::info!(user_id = %claims.sub, "Access token revoked");

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> bool {
        self.revoked.contains(token).await
    }

    async fn get_profile(&self, id: &UserId) -> Result<User, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
