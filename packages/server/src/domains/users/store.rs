use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::models::{NewUser, User, UserContact, UserRole, UserRow, UserStatus};
use crate::common::{StatusChange, UserId};

/// Account records and credentials.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Store a new account with its initial password.
    ///
    /// Returns `None` when the username is already taken.
    async fn insert_user(&self, new_user: NewUser, initial_password: &str) -> Result<Option<User>>;

    /// Remove an account that never made it into review.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn lookup_user_role(&self, id: UserId) -> Result<Option<UserRole>>;

    async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<StatusChange>;

    async fn get_user_contact(&self, id: UserId) -> Result<Option<UserContact>>;

    async fn initial_password(&self, id: UserId) -> Result<Option<String>>;

    async fn ping(&self) -> Result<()>;
}

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: UserId) -> Result<bool> {
        let found: Option<(UserId,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check user")?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn insert_user(&self, new_user: NewUser, initial_password: &str) -> Result<Option<User>> {
        let user = new_user.into_user(Utc::now());
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users
                (id, username, full_name, role, email, mobile, preferred_contact,
                 associate_id, hospital_reference, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (username) DO NOTHING
             RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.preferred_contact)
        .bind(user.associate_id)
        .bind(&user.hospital_reference)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to insert user")?;

        let Some(row) = inserted else {
            return Ok(None);
        };

        sqlx::query("INSERT INTO user_credentials (user_id, secret) VALUES ($1, $2)")
            .bind(row.id)
            .bind(initial_password)
            .execute(&mut *tx)
            .await
            .context("Failed to store user credentials")?;

        tx.commit().await?;
        Ok(Some(row.try_into()?))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load user")?
            .map(User::try_from)
            .transpose()
    }

    async fn lookup_user_role(&self, id: UserId) -> Result<Option<UserRole>> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up user role")?;
        role.map(|(role,)| role.parse()).transpose()
    }

    async fn set_user_status(&self, id: UserId, status: UserStatus) -> Result<StatusChange> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1 AND status <> $2")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update user status")?;

        if result.rows_affected() > 0 {
            return Ok(StatusChange::Applied);
        }
        Ok(if self.exists(id).await? {
            StatusChange::Unchanged
        } else {
            StatusChange::Missing
        })
    }

    async fn get_user_contact(&self, id: UserId) -> Result<Option<UserContact>> {
        let contact: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT username, email FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load user contact")?;
        Ok(contact.map(|(username, email)| UserContact { username, email }))
    }

    async fn initial_password(&self, id: UserId) -> Result<Option<String>> {
        let secret: Option<(String,)> =
            sqlx::query_as("SELECT secret FROM user_credentials WHERE user_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load user credentials")?;
        Ok(secret.map(|(secret,)| secret))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("User directory unreachable")?;
        Ok(())
    }
}
