use async_trait::async_trait;
use axum::body::Bytes;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use uuid::Uuid;

/// URL prefix under which stored uploads are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// UploadError
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image upload failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("multipart field `file` is required")]
    MissingFile,
}

// 1. UploadStore Contract
/// UploadStore
///
/// Defines the contract for persisting uploaded images. Handlers only see this trait, so
/// the filesystem implementation can be swapped for the failing mock in tests.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persists `bytes` under a freshly generated, collision-free name derived from
    /// `original_name` and returns the public-relative URL (`/uploads/<name>`).
    async fn store(&self, original_name: &str, bytes: Bytes) -> Result<String, UploadError>;
}

// 2. The Real Implementation (local directory)
/// LocalUploadStore
///
/// Writes uploads into a directory on the local filesystem. The directory is created on
/// first use, so a fresh deployment needs no manual setup.
#[derive(Clone, Debug)]
pub struct LocalUploadStore {
    dir: PathBuf,
}

impl LocalUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn store(&self, original_name: &str, bytes: Bytes) -> Result<String, UploadError> {
        let file_name = generated_file_name(original_name);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), &bytes).await?;

        tracing::info!(file = %file_name, size = bytes.len(), "upload stored");
        Ok(format!("{UPLOADS_URL_PREFIX}/{file_name}"))
    }
}

/// generated_file_name
///
/// `<uuid v4>_<sanitized original name>`. The random prefix keeps names unique even when
/// two clients upload the same file name.
pub fn generated_file_name(original_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name))
}

/// sanitize_file_name
///
/// Reduces a client-supplied file name to something that cannot leave the upload
/// directory: only the last path component survives (either separator), characters
/// outside `[A-Za-z0-9._-]` become `_`, and leading dots are dropped so the result is
/// never `.`, `..` or a hidden file.
pub fn sanitize_file_name(original_name: &str) -> String {
    let last_component = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = last_component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

// 3. The Mock Implementation (For Tests)
/// MockUploadStore
///
/// Records nothing and touches no disk. Returns a deterministic URL, or an IO error when
/// `should_fail` is set, so handler error mapping can be tested in isolation.
#[derive(Clone, Default)]
pub struct MockUploadStore {
    /// When true, every store call fails with a simulated IO error.
    pub should_fail: bool,
}

impl MockUploadStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl UploadStore for MockUploadStore {
    async fn store(&self, original_name: &str, _bytes: Bytes) -> Result<String, UploadError> {
        if self.should_fail {
            return Err(UploadError::Io(std::io::Error::other(
                "mock upload store: simulated failure",
            )));
        }
        Ok(format!(
            "{UPLOADS_URL_PREFIX}/mock_{}",
            sanitize_file_name(original_name)
        ))
    }
}

/// UploadState
///
/// The concrete type used to share the upload store across the application state.
pub type UploadState = Arc<dyn UploadStore>;
