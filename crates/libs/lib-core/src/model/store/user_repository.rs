//! # User Repository
//!
//! Database access layer for user accounts, including the seeded assistant
//! account that group chats can include.

use super::models::User;
use super::DbPool;
use crate::error::Result;
use chrono::Utc;
use sqlx::query_as;
use uuid::Uuid;

/// Reserved email of the seeded assistant account.
pub const ASSISTANT_EMAIL: &str = "assistant@ripple.chat";

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Create a new user account and return the stored row.
    pub async fn create(
        pool: &DbPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, avatar, is_ai, created_at)
            VALUES (?, ?, ?, ?, NULL, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(User {
            id,
            name: name.to_string(),
            email: Some(email.to_string()),
            password_hash: Some(password_hash.to_string()),
            avatar: None,
            is_ai: false,
            created_at: now,
        })
    }

    /// Find a user by their email address.
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
        let user = query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, is_ai, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<User>> {
        let user = query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, is_ai, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// The seeded assistant account, if present.
    pub async fn assistant(pool: &DbPool) -> Result<Option<User>> {
        Self::find_by_email(pool, ASSISTANT_EMAIL).await
    }

    /// All users, for the contact picker.
    pub async fn list_all(pool: &DbPool) -> Result<Vec<User>> {
        let users = query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, is_ai, created_at
            FROM users
            ORDER BY name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let pool = setup_test_db().await;

        let user = UserRepository::create(&pool, "alice", "alice@example.com", "hash")
            .await
            .expect("User creation should succeed");

        let found = UserRepository::find_by_email(&pool, "alice@example.com")
            .await
            .expect("Lookup should succeed")
            .expect("User should exist");

        assert_eq!(found.id, user.id);
        assert_eq!(found.name, "alice");
        assert!(!found.is_ai);
    }

    #[tokio::test]
    async fn test_find_missing_user_is_none() {
        let pool = setup_test_db().await;

        let found = UserRepository::find_by_email(&pool, "nobody@example.com")
            .await
            .expect("Lookup should succeed");

        assert!(found.is_none());
    }
}
