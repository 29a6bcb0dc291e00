//! User persistence
//!
//! Thin repository over the `users` table. Email uniqueness is enforced by
//! the database; the repository surfaces it as a distinguishable error.

use sqlx::PgPool;
use thiserror::Error;

use crate::models::User;

/// User persistence errors
#[derive(Error, Debug)]
pub enum UserRepositoryError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for user records
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health probes
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, full_name, hashed_password, is_active, is_superuser, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as(
            r#"
            SELECT id, email, full_name, hashed_password, is_active, is_superuser, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn insert(
        &self,
        email: &str,
        full_name: Option<&str>,
        hashed_password: &str,
    ) -> Result<User, UserRepositoryError> {
        let user = sqlx::query_as(
            r#"
            INSERT INTO users (email, full_name, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, full_name, hashed_password, is_active, is_superuser, created_at
            "#,
        )
        .bind(email)
        .bind(full_name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                UserRepositoryError::DuplicateEmail
            }
            _ => UserRepositoryError::Database(e),
        })?;

        Ok(user)
    }

    pub async fn update_password_hash(
        &self,
        user_id: i64,
        new_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
