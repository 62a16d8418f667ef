use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::identity::errors::CredentialStoreError;
use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::CredentialStore;

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_token, reset_token_expires_at, created_at, updated_at";

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> Result<User, CredentialStoreError> {
        let read = |e: sqlx::Error| CredentialStoreError::Unavailable(e.to_string());
        let corrupt = |e: String| CredentialStoreError::Unavailable(format!("Corrupt user row: {}", e));

        let id: Uuid = row.try_get("id").map_err(read)?;
        let name: String = row.try_get("name").map_err(read)?;
        let email: String = row.try_get("email").map_err(read)?;

        Ok(User {
            id: UserId(id),
            name: DisplayName::new(name).map_err(|e| corrupt(e.to_string()))?,
            email: EmailAddress::new(email).map_err(|e| corrupt(e.to_string()))?,
            password_hash: row.try_get("password_hash").map_err(read)?,
            reset_token: row.try_get("reset_token").map_err(read)?,
            reset_token_expires_at: row.try_get("reset_token_expires_at").map_err(read)?,
            created_at: row.try_get("created_at").map_err(read)?,
            updated_at: row.try_get("updated_at").map_err(read)?,
        })
    }

    async fn fetch_one_user(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Option<User>, CredentialStoreError> {
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?
            .map(Self::map_row)
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn create(&self, user: User) -> Result<User, CredentialStoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.0)
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return CredentialStoreError::EmailAlreadyExists(user.email.to_string());
                }
            }
            CredentialStoreError::Unavailable(e.to_string())
        })?;

        Ok(user)
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, CredentialStoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        self.fetch_one_user(sqlx::query(&sql).bind(email.as_str()))
            .await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, CredentialStoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        self.fetch_one_user(sqlx::query(&sql).bind(id.0)).await
    }

    async fn save_reset_token(
        &self,
        email: &EmailAddress,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $1, reset_token_expires_at = $2, updated_at = $3
            WHERE email = $4
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(email.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CredentialStoreError::NotFound(email.to_string()));
        }

        Ok(())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, CredentialStoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_token = $1 AND reset_token_expires_at > $2",
            USER_COLUMNS
        );
        self.fetch_one_user(sqlx::query(&sql).bind(token).bind(Utc::now()))
            .await
    }

    async fn consume_reset_token(
        &self,
        id: &UserId,
        token: &str,
    ) -> Result<bool, CredentialStoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_token = NULL, reset_token_expires_at = NULL, updated_at = $3
            WHERE id = $1 AND reset_token = $2 AND reset_token_expires_at > $3
            "#,
        )
        .bind(id.0)
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), CredentialStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_token_expires_at = NULL, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CredentialStoreError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
