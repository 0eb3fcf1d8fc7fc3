#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use feedbox::{
    AppState, MockImageStore, TokenService,
    config::AppConfig,
    error::ApiError,
    models::{Post, User},
    repository::{Repository, RepositoryState},
    storage::ImageStoreState,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-value-1234567890";

/// In-memory Repository used by service, GraphQL and handler tests. Mirrors
/// the Postgres implementation's contract, including the unique-email
/// constraint and the paired post/owner-set writes.
#[derive(Default)]
pub struct MemoryRepository {
    users: Mutex<Vec<User>>,
    posts: Mutex<Vec<Post>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_post_ids(&self, user_id: Uuid) -> Vec<Uuid> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.post_ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        status: &str,
    ) -> Result<User, ApiError> {
        let mut users = self.users.lock().unwrap();
        // Emulates the unique constraint on users.email.
        if users.iter().any(|u| u.email == email) {
            return Err(ApiError::Conflict("resource already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            status: status.to_string(),
            post_ids: vec![],
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn set_user_status(&self, id: Uuid, status: &str) -> Result<bool, ApiError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.status = status.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_post(&self, post: &Post) -> Result<(), ApiError> {
        self.posts.lock().unwrap().push(post.clone());
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == post.creator) {
            user.post_ids.push(post.id);
        }
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, ApiError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_post_by_image(&self, image_path: &str) -> Result<Option<Post>, ApiError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.image_path == image_path)
            .cloned())
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        content: &str,
        image_path: &str,
    ) -> Result<Option<Post>, ApiError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.title = title.to_string();
                post.content = content.to_string();
                post.image_path = image_path.to_string();
                post.updated_at = Utc::now();
                Ok(Some(post.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_post(&self, id: Uuid, owner: Uuid) -> Result<bool, ApiError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        let existed = posts.len() < before;

        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == owner) {
            user.post_ids.retain(|pid| *pid != id);
        }
        Ok(existed)
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, ApiError> {
        let posts = self.posts.lock().unwrap();
        // Newest first; later insertions win timestamp ties.
        let mut ordered: Vec<Post> = posts.iter().rev().cloned().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ordered
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_posts(&self) -> Result<i64, ApiError> {
        Ok(self.posts.lock().unwrap().len() as i64)
    }
}

/// Builds a full AppState over the in-memory repository and mock image store,
/// with a known signing secret so tests can mint their own tokens.
pub fn test_state(repo: Arc<MemoryRepository>) -> AppState {
    let images = Arc::new(MockImageStore::new()) as ImageStoreState;
    let tokens = TokenService::new(TEST_SECRET);
    AppState::new(repo as RepositoryState, images, tokens, AppConfig::default())
}
