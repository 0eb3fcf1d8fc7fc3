use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::ApiError;

/// ImageStore
///
/// Abstract contract for the image storage layer. The disk implementation
/// backs production; the mock keeps handler and service tests off the
/// filesystem. Paths handed out (and accepted back) are relative storage
/// paths of the form `images/<name>`, which is also how they are referenced
/// from post records and served over HTTP.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists an uploaded image and returns its storage path.
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ApiError>;

    /// Removes a previously stored image. Callers treat this as best-effort:
    /// release failures are logged, never propagated into a request outcome.
    async fn remove(&self, path: &str) -> Result<(), ApiError>;
}

/// ImageStoreState
///
/// The concrete type used to share image storage across the application state.
pub type ImageStoreState = Arc<dyn ImageStore>;

/// sanitize_file_name
///
/// Strips directory components from a client-supplied name so a stored path
/// can never escape the image root.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("upload")
        .replace("..", "");
    if base.is_empty() {
        "upload".to_string()
    } else {
        base
    }
}

/// DiskImageStore
///
/// Stores images as files under a configured root directory. File names are
/// prefixed with a fresh UUID so concurrent uploads of identically named
/// files never collide.
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a public storage path (`images/<name>`) to a file inside the
    /// root, rejecting anything that tries to point elsewhere.
    fn resolve(&self, path: &str) -> Result<PathBuf, ApiError> {
        let name = path.strip_prefix("images/").unwrap_or(path);
        let sanitized = sanitize_file_name(name);
        if sanitized != name {
            return Err(ApiError::NotFound);
        }
        Ok(self.root.join(sanitized))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
        let target = self.root.join(&name);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ApiError::Internal(format!("image root unavailable: {e}")))?;
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to store image: {e}")))?;

        Ok(format!("images/{name}"))
    }

    async fn remove(&self, path: &str) -> Result<(), ApiError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| ApiError::Internal(format!("failed to remove image {path}: {e}")))
    }
}

/// MockImageStore
///
/// In-memory implementation for tests: records every save and removal so
/// assertions can observe the image lifecycle without touching a disk.
#[derive(Default)]
pub struct MockImageStore {
    pub saved: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_removals: bool,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_removals() -> Self {
        Self {
            fail_removals: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn save(&self, file_name: &str, _bytes: Vec<u8>) -> Result<String, ApiError> {
        let path = format!("images/{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
        self.saved.lock().unwrap().push(path.clone());
        Ok(path)
    }

    async fn remove(&self, path: &str) -> Result<(), ApiError> {
        if self.fail_removals {
            return Err(ApiError::Internal("simulated removal failure".to_string()));
        }
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
