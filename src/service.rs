use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{ApiError, FieldError},
    identity::ensure_owner,
    models::{AuthPayload, Post, PostInput, PostPage, SignupRequest, UpdatePostInput, User},
    repository::Repository,
    security,
    storage::ImageStoreState,
    token::TokenService,
};

/// Fixed page size for the post listing.
pub const POSTS_PER_PAGE: i64 = 2;

/// Status line every new account starts with.
const DEFAULT_STATUS: &str = "I am new!";

/// Minimum length for titles, content and passwords.
const MIN_FIELD_LEN: usize = 5;

// --- Validation ---

/// Syntactic email check: one '@' with a non-empty local part and a dotted,
/// whitespace-free domain. Deliverability is not this layer's concern.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Collects every violation instead of failing on the first; a request with
/// a bad title *and* bad content reports both.
fn validate_post_fields(title: &str, content: &str, image_path: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if title.trim().len() < MIN_FIELD_LEN {
        errors.push(FieldError::new(
            "title",
            "title must be at least 5 characters",
        ));
    }
    if content.trim().len() < MIN_FIELD_LEN {
        errors.push(FieldError::new(
            "content",
            "content must be at least 5 characters",
        ));
    }
    if image_path.trim().is_empty() {
        errors.push(FieldError::new("imagePath", "an image is required"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationFailed(errors))
    }
}

fn validate_signup(email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "email address is invalid"));
    }
    if password.len() < MIN_FIELD_LEN {
        errors.push(FieldError::new(
            "password",
            "password must be at least 5 characters",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationFailed(errors))
    }
}

// --- Users & Authentication ---

/// Registers a new user: validates input (violations aggregated), rejects an
/// already-registered email with `Conflict`, and stores only the salted
/// password hash.
pub async fn signup(repo: &dyn Repository, input: SignupRequest) -> Result<User, ApiError> {
    validate_signup(&input.email, &input.password)?;

    if repo.find_user_by_email(&input.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "a user with this email already exists".to_string(),
        ));
    }

    let password_hash = security::hash_password(&input.password)?;

    // The unique constraint on email still backs us up if a concurrent
    // signup won the race between the check above and this insert.
    repo.create_user(&input.email, &input.name, &password_hash, DEFAULT_STATUS)
        .await
}

/// Authenticates by email and password and issues an identity token. Unknown
/// email and wrong password produce the same `Unauthenticated` outcome so
/// responses cannot be used to probe which accounts exist.
pub async fn login(
    repo: &dyn Repository,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> Result<AuthPayload, ApiError> {
    let Some(user) = repo.find_user_by_email(email).await? else {
        return Err(ApiError::Unauthenticated);
    };

    if !security::verify_password(password, &user.password_hash) {
        return Err(ApiError::Unauthenticated);
    }

    let token = tokens.issue(user.id, &user.email)?;
    Ok(AuthPayload {
        token,
        user_id: user.id,
    })
}

pub async fn get_status(repo: &dyn Repository, user_id: Uuid) -> Result<String, ApiError> {
    let user = repo.get_user(user_id).await?.ok_or(ApiError::NotFound)?;
    Ok(user.status)
}

pub async fn update_status(
    repo: &dyn Repository,
    user_id: Uuid,
    status: String,
) -> Result<(), ApiError> {
    if repo.set_user_status(user_id, &status).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Posts ---

/// Creates a post owned by `owner_id`. The post row and the owner's post-set
/// entry are written as one logical unit by the repository.
pub async fn create_post(
    repo: &dyn Repository,
    owner_id: Uuid,
    input: PostInput,
) -> Result<(Post, User), ApiError> {
    validate_post_fields(&input.title, &input.content, &input.image_path)?;

    // The token may outlive its account; a missing owner row means the
    // identity is no longer valid.
    let user = repo
        .get_user(owner_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        title: input.title,
        content: input.content,
        image_path: input.image_path,
        creator: owner_id,
        created_at: now,
        updated_at: now,
    };

    repo.create_post(&post).await?;
    Ok((post, user))
}

/// Updates a post's title, content and (optionally) image. Order of checks:
/// existence, then ownership, then validation. A changed image path releases
/// the old image best-effort before the record is overwritten.
pub async fn update_post(
    repo: &dyn Repository,
    images: &ImageStoreState,
    post_id: Uuid,
    requester: Uuid,
    input: UpdatePostInput,
) -> Result<Post, ApiError> {
    let post = repo.get_post(post_id).await?.ok_or(ApiError::NotFound)?;
    ensure_owner(post.creator, requester)?;

    let image_path = input.image_path.unwrap_or_else(|| post.image_path.clone());
    validate_post_fields(&input.title, &input.content, &image_path)?;

    if image_path != post.image_path {
        release_image(images, post.image_path.clone());
    }

    repo.update_post(post_id, &input.title, &input.content, &image_path)
        .await?
        // The post vanished between the ownership check and the write;
        // concurrent deletion by the owner.
        .ok_or(ApiError::NotFound)
}

/// Deletes a post after existence and ownership checks. The image is released
/// first (fire-and-forget), then the record and the owner-set entry go
/// together through the repository.
pub async fn delete_post(
    repo: &dyn Repository,
    images: &ImageStoreState,
    post_id: Uuid,
    requester: Uuid,
) -> Result<(), ApiError> {
    let post = repo.get_post(post_id).await?.ok_or(ApiError::NotFound)?;
    ensure_owner(post.creator, requester)?;

    release_image(images, post.image_path.clone());

    if repo.delete_post(post_id, post.creator).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

pub async fn get_post(repo: &dyn Repository, id: Uuid) -> Result<Post, ApiError> {
    repo.get_post(id).await?.ok_or(ApiError::NotFound)
}

/// One page of posts, newest first. Pages beyond the end yield an empty list
/// with the true total, which is a valid result, not an error.
pub async fn list_posts(repo: &dyn Repository, page: u64) -> Result<PostPage, ApiError> {
    // The page number arrives unbounded from the query string; clamp before
    // the signed cast so huge values stay a far-past-the-end offset instead
    // of wrapping negative.
    let page = page.clamp(1, i64::MAX as u64) as i64;
    let offset = (page - 1).saturating_mul(POSTS_PER_PAGE);

    let total_items = repo.count_posts().await?;
    let posts = repo.list_posts(POSTS_PER_PAGE, offset).await?;

    Ok(PostPage { posts, total_items })
}

/// Releases an image the uploader is replacing. A path referenced by someone
/// else's post is `Forbidden`; an unreferenced path (a not-yet-attached
/// upload) or one on the requester's own post is released.
pub async fn release_replaced_image(
    repo: &dyn Repository,
    images: &ImageStoreState,
    requester: Uuid,
    path: String,
) -> Result<(), ApiError> {
    if let Some(post) = repo.find_post_by_image(&path).await? {
        ensure_owner(post.creator, requester)?;
    }
    release_image(images, path);
    Ok(())
}

/// Releases an image resource without tying the request's outcome to it: the
/// removal runs on its own task and a failure is logged, not propagated or
/// retried.
pub fn release_image(images: &ImageStoreState, path: String) {
    let images = images.clone();
    tokio::spawn(async move {
        if let Err(e) = images.remove(&path).await {
            tracing::warn!(path = %path, error = %e, "failed to release image");
        }
    });
}
