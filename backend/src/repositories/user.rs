//! Directory of registered users.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::user::{User, UserRole};
use crate::repositories::common::conflict_on_unique;
use crate::types::UserId;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

/// Repository trait for user lookups.
///
/// Use `MockUserRepositoryTrait` in tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Lookup by normalized (trimmed, lowercase) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, AppError>;

    /// Fails with `Conflict` when the email is already registered.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Persists `name`, `email` and `role`. `NotFound` when the row is gone,
    /// `Conflict` when the new email belongs to someone else.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError>;
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let query = format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY name",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(raw)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| conflict_on_unique(err, "Email is already registered"))
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let query = format!(
            "UPDATE users SET name = $2, email = $3, role = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| conflict_on_unique(err, "Email is already registered"))?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let query = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, AppError> {
        let query = format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY name",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
