//! # User Repository
//!
//! Staff and administrator records.
//!
//! Authentication (password verification, sessions) lives in the external
//! identity provider; this repository only stores the records it manages
//! and hands back `(id, role)` material. The password hash is an opaque
//! string to us.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pos_core::validation::validate_email;
use pos_core::{CoreError, Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Headcount statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub total_cashiers: i64,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a new user. Duplicate emails are rejected.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> DbResult<User> {
        let email = email.trim().to_ascii_lowercase();
        validate_email(&email).map_err(CoreError::from)?;

        if self.get_by_email(&email).await?.is_some() {
            return Err(DbError::duplicate("email", &email));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };

        debug!(email = %user.email, role = ?user.role, "Inserting user");

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Gets a user by email (the identity provider's lookup key).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email.trim().to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists users, newest first, paged.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Lists cashiers, for the report filter dropdown.
    pub async fn list_cashiers(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY name"
        ))
        .bind(Role::Staff)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Updates a user's name, email, role, and optionally the password
    /// hash (None keeps the existing one).
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: Role,
        password_hash: Option<&str>,
    ) -> DbResult<User> {
        let email = email.trim().to_ascii_lowercase();
        validate_email(&email).map_err(CoreError::from)?;

        if let Some(existing) = self.get_by_email(&email).await? {
            if existing.id != id {
                return Err(DbError::duplicate("email", &email));
            }
        }

        let result = match password_hash {
            Some(hash) => {
                sqlx::query(
                    "UPDATE users SET name = ?2, email = ?3, role = ?4, password_hash = ?5 \
                     WHERE id = ?1",
                )
                .bind(id)
                .bind(name.trim())
                .bind(&email)
                .bind(role)
                .bind(hash)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("UPDATE users SET name = ?2, email = ?3, role = ?4 WHERE id = ?1")
                    .bind(id)
                    .bind(name.trim())
                    .bind(&email)
                    .bind(role)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes a user.
    ///
    /// Two guards:
    /// - actors cannot delete their own account
    /// - a cashier with committed transactions cannot be deleted, since
    ///   transactions are historical records that must keep a valid
    ///   cashier reference
    pub async fn delete(&self, id: &str, acting_user_id: &str) -> DbResult<()> {
        if id == acting_user_id {
            return Err(DbError::SelfDeletion);
        }

        let referencing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE cashier_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referencing > 0 {
            return Err(DbError::still_referenced("User", id));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        debug!(id = %id, "Deleted user");
        Ok(())
    }

    /// Headcount statistics for the admin dashboard.
    pub async fn stats(&self) -> DbResult<UserStats> {
        let (total_users, total_admins, total_cashiers): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COALESCE(SUM(role = 'admin'), 0), \
                    COALESCE(SUM(role = 'staff'), 0) \
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total_users,
            total_admins,
            total_cashiers,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo
            .create("Thandi", "thandi@example.com", "hash", Role::Staff)
            .await
            .unwrap();

        let found = repo.get_by_email("Thandi@Example.com").await.unwrap();
        assert_eq!(found.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_malformed_email_is_validation_error() {
        let db = test_db().await;
        let repo = db.users();

        for bad in ["", "   ", "no-at-sign", "@domain"] {
            let err = repo.create("Thandi", bad, "hash", Role::Staff).await.unwrap_err();
            assert!(
                matches!(err, DbError::Core(CoreError::Validation(_))),
                "expected validation error for {bad:?}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        let repo = db.users();

        repo.create("Thandi", "thandi@example.com", "hash", Role::Staff)
            .await
            .unwrap();
        let err = repo
            .create("Other", "thandi@example.com", "hash2", Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_none() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo
            .create("Thandi", "thandi@example.com", "original-hash", Role::Staff)
            .await
            .unwrap();

        let updated = repo
            .update(&user.id, "Thandi M", "thandi@example.com", Role::Admin, None)
            .await
            .unwrap();

        assert_eq!(updated.name, "Thandi M");
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.password_hash, "original-hash");
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo
            .create("Admin", "admin@example.com", "hash", Role::Admin)
            .await
            .unwrap();

        let err = repo.delete(&user.id, &user.id).await.unwrap_err();
        assert!(matches!(err, DbError::SelfDeletion));
        assert!(repo.get_by_id(&user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_counts_roles() {
        let db = test_db().await;
        let repo = db.users();

        repo.create("A", "a@example.com", "h", Role::Admin)
            .await
            .unwrap();
        repo.create("B", "b@example.com", "h", Role::Staff)
            .await
            .unwrap();
        repo.create("C", "c@example.com", "h", Role::Staff)
            .await
            .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_admins, 1);
        assert_eq!(stats.total_cashiers, 2);
    }
}
