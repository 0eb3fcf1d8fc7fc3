use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical identity record from the `users` table. The password hash is
/// stored here but never serialized out; it only crosses into the
/// credential-store functions for verification.
#[derive(Debug, Clone, Serialize, SimpleObject, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    #[graphql(skip)]
    pub password_hash: String,
    /// Free-text status line, defaults to "I am new!" on signup.
    pub status: String,
    /// Ids of the posts this user owns. Maintained alongside the posts table
    /// via single-statement array updates; order is irrelevant.
    pub post_ids: Vec<Uuid>,
}

/// Post
///
/// A content unit with an attached image. `creator` is set exactly once at
/// creation and never reassigned; mutation and deletion are owner-only.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Storage path of the attached image, relative to the image root.
    pub image_path: String,
    /// Owning user id. Immutable after creation.
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// Input for user signup, shared by POST /signup and the `createUser`
/// mutation.
#[derive(Debug, Clone, Serialize, Deserialize, InputObject, ToSchema)]
#[graphql(name = "UserInput")]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Input for creating a post. The image is uploaded beforehand (PUT
/// /post-image) and referenced here by its storage path.
#[derive(Debug, Clone, Serialize, Deserialize, InputObject, ToSchema)]
#[serde(rename_all = "camelCase")]
#[graphql(name = "PostInput")]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub image_path: String,
}

/// Input for updating a post. Omitting `imagePath` keeps the stored image;
/// providing a different path releases the old image resource.
#[derive(Debug, Clone, Serialize, Deserialize, InputObject, ToSchema)]
#[serde(rename_all = "camelCase")]
#[graphql(name = "UpdatePostInput")]
pub struct UpdatePostInput {
    pub title: String,
    pub content: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// --- Response Schemas (Output) ---

/// Result of a successful login on either surface.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub user_id: Uuid,
}

/// One page of the post listing, newest first, plus the total count for
/// client-side pagination.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    #[serde(rename = "totalItems")]
    #[graphql(name = "totalPosts")]
    pub total_items: i64,
}

/// Minimal creator info echoed back when a post is created over REST.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatorSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedPostResponse {
    pub message: String,
    pub post: Post,
    pub creator: CreatorSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostBody {
    pub message: String,
    pub post: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
