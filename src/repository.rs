use crate::{
    error::ApiError,
    models::{Post, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository
///
/// Abstract contract for all persistence operations. Handlers and resolvers
/// never touch the database directly; they go through the service layer,
/// which talks to this trait. The indirection keeps the auth and ownership
/// logic testable against an in-memory implementation.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---

    /// Inserts a new user row. A duplicate email surfaces as `Conflict` via
    /// the unique constraint on `users.email`.
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        status: &str,
    ) -> Result<User, ApiError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    /// Returns false when no such user exists.
    async fn set_user_status(&self, id: Uuid, status: &str) -> Result<bool, ApiError>;

    // --- Posts ---

    /// Persists a post and appends its id to the owner's post set. The two
    /// writes are one logical unit and must commit or fail together.
    async fn create_post(&self, post: &Post) -> Result<(), ApiError>;

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError>;

    /// Looks up the post (if any) that references a stored image path. Used
    /// to stop one user from releasing an image attached to another user's
    /// post.
    async fn find_post_by_image(&self, image_path: &str) -> Result<Option<Post>, ApiError>;

    /// Rewrites a post's mutable fields. Ownership has already been checked
    /// by the caller; `creator` is never touched.
    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        image_path: &str,
    ) -> Result<Option<Post>, ApiError>;

    /// Removes the post row and its id from the owner's post set, together.
    /// Returns false when the post no longer exists.
    async fn delete_post(&self, id: Uuid, owner: Uuid) -> Result<bool, ApiError>;

    /// Posts ordered by creation time descending.
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, ApiError>;

    async fn count_posts(&self) -> Result<i64, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share persistence access across the application
/// state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of `Repository`, backed by Postgres. Queries
/// are runtime-checked and parameterized via bind; the owner post-set lives
/// as a `uuid[]` column mutated only through single-statement
/// `array_append`/`array_remove` updates, never read-modify-write.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, name, password_hash, status, post_ids";
const POST_COLUMNS: &str = "id, title, content, image_path, creator, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        status: &str,
    ) -> Result<User, ApiError> {
        let query = format!(
            "INSERT INTO users (id, email, name, password_hash, status, post_ids) \
             VALUES ($1, $2, $3, $4, $5, '{{}}') RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(name)
            .bind(password_hash)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_user_status(&self, id: Uuid, status: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The post insert and the owner-set append commit atomically; a crash
    /// between the two rolls both back, so no dangling post id can appear in
    /// a user's set.
    async fn create_post(&self, post: &Post) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO posts (id, title, content, image_path, creator, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.image_path)
        .bind(post.creator)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET post_ids = array_append(post_ids, $1) WHERE id = $2")
            .bind(post.id)
            .bind(post.creator)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_post_by_image(&self, image_path: &str) -> Result<Option<Post>, ApiError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE image_path = $1 LIMIT 1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(image_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        image_path: &str,
    ) -> Result<Option<Post>, ApiError> {
        let query = format!(
            "UPDATE posts SET title = $2, content = $3, image_path = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(title)
            .bind(content)
            .bind(image_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid, owner: Uuid) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET post_ids = array_remove(post_ids, $1) WHERE id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, ApiError> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn count_posts(&self) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
