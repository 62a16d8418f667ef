use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::identity::errors::CredentialStoreError;
use crate::identity::models::EmailAddress;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;

/// Process-local credential store.
///
/// Used when no database is configured and by the test suite.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, user: User) -> Result<User, CredentialStoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(CredentialStoreError::EmailAlreadyExists(
                user.email.to_string(),
            ));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, CredentialStoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CredentialStoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn save_reset_token(
        &self,
        email: &EmailAddress,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError> {
        let mut users = self.users.write().await;

        let user = users
            .values_mut()
            .find(|user| &user.email == email)
            .ok_or_else(|| CredentialStoreError::NotFound(email.to_string()))?;

        user.reset_token = Some(token.to_string());
        user.reset_token_expires_at = Some(expires_at);
        user.updated_at = Utc::now();

        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, CredentialStoreError> {
        let now = Utc::now();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.has_reset_token(token, now))
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        id: &UserId,
        token: &str,
    ) -> Result<bool, CredentialStoreError> {
        let mut users = self.users.write().await;

        match users.get_mut(id) {
            Some(user) if user.has_reset_token(token, Utc::now()) => {
                user.reset_token = None;
                user.reset_token_expires_at = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), CredentialStoreError> {
        let mut users = self.users.write().await;

        let user = users
            .get_mut(id)
            .ok_or_else(|| CredentialStoreError::NotFound(id.to_string()))?;

        user.password_hash = password_hash.to_string();
        user.reset_token = None;
        user.reset_token_expires_at = None;
        user.updated_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::identity::models::DisplayName;

    fn user(email: &str) -> User {
        User::new(
            DisplayName::new("A".to_string()).unwrap(),
            EmailAddress::new(email.to_string()).unwrap(),
            "$argon2id$test_hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();

        let by_id = store.find_by_id(&created.id).await.unwrap();
        let by_email = store.find_by_email(&created.email).await.unwrap();

        assert_eq!(by_id, Some(created.clone()));
        assert_eq!(by_email, Some(created));
        assert_eq!(store.find_by_id(&UserId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let store = InMemoryCredentialStore::new();
        store.create(user("a@x.com")).await.unwrap();

        let result = store.create(user("A@X.com")).await;
        assert_eq!(
            result,
            Err(CredentialStoreError::EmailAlreadyExists("a@x.com".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();
        let expires_at = Utc::now() + Duration::hours(1);

        store
            .save_reset_token(&created.email, "tok", expires_at)
            .await
            .unwrap();
        let holder = store.find_by_reset_token("tok").await.unwrap().unwrap();
        assert_eq!(holder.id, created.id);

        store
            .update_password(&created.id, "$argon2id$new_hash")
            .await
            .unwrap();

        assert_eq!(store.find_by_reset_token("tok").await.unwrap(), None);
        let updated = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new_hash");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_not_found() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();

        store
            .save_reset_token(&created.email, "tok", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.find_by_reset_token("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_consume_reset_token_once() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();
        store
            .save_reset_token(&created.email, "tok", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(!store.consume_reset_token(&created.id, "other").await.unwrap());
        assert!(!store.consume_reset_token(&UserId::new(), "tok").await.unwrap());

        assert!(store.consume_reset_token(&created.id, "tok").await.unwrap());
        assert!(!store.consume_reset_token(&created.id, "tok").await.unwrap());
        assert_eq!(store.find_by_reset_token("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_consume_expired_reset_token() {
        let store = InMemoryCredentialStore::new();
        let created = store.create(user("a@x.com")).await.unwrap();
        store
            .save_reset_token(&created.email, "tok", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert!(!store.consume_reset_token(&created.id, "tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_accounts() {
        let store = InMemoryCredentialStore::new();
        let email = EmailAddress::new("ghost@x.com".to_string()).unwrap();

        assert!(matches!(
            store
                .save_reset_token(&email, "tok", Utc::now() + Duration::hours(1))
                .await,
            Err(CredentialStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_password(&UserId::new(), "hash").await,
            Err(CredentialStoreError::NotFound(_))
        ));
    }
}
