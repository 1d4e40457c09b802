//! User accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vendora_core::{Email, Role, UserId};

use super::{conflict_on_unique, deleted, finish_update};
use crate::db::{RepositoryError, UserStore};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    password_hash: Option<String>,
    role: Role,
    avatar_url: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            password_hash: row.password_hash,
            role: row.role,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

const SELECT_USER: &str = r"
    SELECT id, name, email, password_hash, role, avatar_url, version, created_at, updated_at
    FROM users
";

/// `PostgreSQL`-backed [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE lower(email) = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO users
                (id, name, email, password_hash, role, avatar_url, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_deref())
        .bind(user.role)
        .bind(user.avatar_url.as_deref())
        .bind(user.version)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;
        Ok(())
    }

    async fn update(&self, user: &mut User) -> Result<(), RepositoryError> {
        let returned = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r"
            UPDATE users
            SET name = $3, email = $4, password_hash = $5, role = $6, avatar_url = $7,
                version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            ",
        )
        .bind(user.id)
        .bind(user.version)
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_deref())
        .bind(user.role)
        .bind(user.avatar_url.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        finish_update(
            &self.pool,
            "users",
            user.id.into(),
            returned,
            &mut user.version,
            &mut user.updated_at,
        )
        .await
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        deleted(result.rows_affected())
    }
}
