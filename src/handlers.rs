use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, FieldError},
    identity::AuthUser,
    models::{
        AuthPayload, CreatedPostResponse, CreatorSummary, LoginRequest, MessageResponse, PostBody,
        PostInput, PostPage, SignupRequest, SignupResponse, StatusResponse, UpdatePostInput,
        UpdateStatusRequest, UploadResponse,
    },
    service,
};

/// Accepted query parameters for the post listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// 1-based page number; defaults to the first page.
    pub page: Option<u64>,
}

// --- Public Handlers ---

/// [Public Route] Registers a new account. Validation violations are
/// aggregated in the 422 body; a duplicate email is a 409.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = SignupResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed", body = [FieldError])
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let user = service::signup(state.repo.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created!".to_string(),
            user_id: user.id,
        }),
    ))
}

/// [Public Route] Exchanges credentials for a signed identity token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthPayload),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthPayload>, ApiError> {
    let auth = service::login(
        state.repo.as_ref(),
        &state.tokens,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(auth))
}

// --- Authenticated Handlers ---

/// [Authenticated Route] Accepts a multipart image upload ahead of post
/// creation and returns the storage path to reference in the post payload.
/// An optional `oldPath` part releases a previously uploaded image, provided
/// it is not attached to another user's post.
#[utoipa::path(
    put,
    path = "/post-image",
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "oldPath belongs to another user's post"),
        (status = 422, description = "No image or unsupported type")
    )
)]
pub async fn upload_image(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut stored: Option<String> = None;
    let mut old_path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("image") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !matches!(
                    content_type.as_str(),
                    "image/png" | "image/jpeg" | "image/jpg"
                ) {
                    return Err(ApiError::ValidationFailed(vec![FieldError::new(
                        "image",
                        "only png and jpeg images are accepted",
                    )]));
                }
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Internal(format!("failed to read upload: {e}")))?;
                stored = Some(state.images.save(&file_name, bytes.to_vec()).await?);
            }
            Some("oldPath") => {
                old_path = field.text().await.ok().filter(|p| !p.is_empty());
            }
            _ => {}
        }
    }

    let file_path = stored.ok_or_else(|| {
        ApiError::ValidationFailed(vec![FieldError::new("image", "no image provided")])
    })?;

    if let Some(old) = old_path {
        service::release_replaced_image(state.repo.as_ref(), &state.images, user.id, old).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File stored.".to_string(),
            file_path,
        }),
    ))
}

/// [Authenticated Route] Lists posts newest-first, two per page. A page past
/// the end returns an empty list, not an error.
#[utoipa::path(
    get,
    path = "/posts",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of posts", body = PostPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_posts(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let page = service::list_posts(state.repo.as_ref(), query.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

/// [Authenticated Route] Fetches a single post.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post found", body = PostBody),
        (status = 404, description = "No such post")
    )
)]
pub async fn get_post(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostBody>, ApiError> {
    let post = service::get_post(state.repo.as_ref(), id).await?;
    Ok(Json(PostBody {
        message: "Post fetched.".to_string(),
        post,
    }))
}

/// [Authenticated Route] Creates a post owned by the requesting identity.
/// Ownership is taken from the token, never from the payload.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Post created", body = CreatedPostResponse),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Validation failed", body = [FieldError])
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostInput>,
) -> Result<(StatusCode, Json<CreatedPostResponse>), ApiError> {
    let (post, creator) = service::create_post(state.repo.as_ref(), user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedPostResponse {
            message: "Post created successfully!".to_string(),
            post,
            creator: CreatorSummary {
                id: creator.id,
                name: creator.name,
            },
        }),
    ))
}

/// [Authenticated Route] Updates a post. Owner-only: a non-owner gets 403,
/// a missing post 404, before any validation runs.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = UpdatePostInput,
    responses(
        (status = 200, description = "Post updated", body = PostBody),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Validation failed", body = [FieldError])
    )
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostInput>,
) -> Result<Json<PostBody>, ApiError> {
    let post =
        service::update_post(state.repo.as_ref(), &state.images, id, user.id, payload).await?;
    Ok(Json(PostBody {
        message: "Post updated!".to_string(),
        post,
    }))
}

/// [Authenticated Route] Deletes a post the requester owns, releasing its
/// image and removing it from the owner's post set.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such post")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::delete_post(state.repo.as_ref(), &state.images, id, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Deleted post.".to_string(),
    }))
}

/// [Authenticated Route] Returns the requesting user's status line.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_status(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = service::get_status(state.repo.as_ref(), user.id).await?;
    Ok(Json(StatusResponse { status }))
}

/// [Authenticated Route] Replaces the requesting user's status line.
#[utoipa::path(
    patch,
    path = "/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MessageResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_status(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::update_status(state.repo.as_ref(), user.id, payload.status).await?;
    Ok(Json(MessageResponse {
        message: "User updated.".to_string(),
    }))
}
