//! Temporary artifact storage.
//!
//! Artifacts (original uploads, generated PDFs) are written once and handed
//! back as a time-limited URL. Expiry is owned by the backend: an S3 lifecycle
//! rule, or the in-memory store's own clock check. Nothing here deletes.

mod memory;
mod s3;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageError;

pub use memory::{MemoryArtifactStore, StoredBlob};
pub use s3::S3ArtifactStore;

const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Upload,
    Pdf,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "uploads",
            Self::Pdf => "pdfs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArtifact {
    pub key: String,
    pub url: String,
    /// When `url` stops being guaranteed to resolve.
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredArtifact, StorageError>;
}

/// Backend for `STORAGE_BACKEND=none`.
#[derive(Debug, Clone, Default)]
pub struct DisabledArtifactStore;

#[async_trait]
impl ArtifactStore for DisabledArtifactStore {
    async fn put(
        &self,
        _kind: ArtifactKind,
        _filename: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredArtifact, StorageError> {
        Err(StorageError::Disabled)
    }
}

/// `{prefix}/{kind}/{YYYYmmdd_HHMMSS}_{uuid}_{filename}`
pub fn build_key(prefix: &str, kind: ArtifactKind, filename: &str, now: DateTime<Utc>) -> String {
    let prefix = prefix.trim_matches('/');
    let name = format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().simple(),
        sanitize_filename(filename)
    );

    if prefix.is_empty() {
        format!("{}/{}", kind.as_str(), name)
    } else {
        format!("{}/{}/{}", prefix, kind.as_str(), name)
    }
}

/// Reduce a client-supplied filename to a safe single key segment.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `min(created + url_ttl, created + retention)`
pub fn expiry_instant(
    created: DateTime<Utc>,
    url_ttl_secs: u64,
    retention: chrono::Duration,
) -> DateTime<Utc> {
    let ttl = chrono::Duration::seconds(i64::try_from(url_ttl_secs).unwrap_or(i64::MAX / 1000));
    created + ttl.min(retention)
}

pub(crate) async fn with_timeout<T, F>(timeout_secs: u64, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(timeout_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_build_key_layout() {
        let key = build_key("ocr", ArtifactKind::Upload, "page 1.png", fixed_now());
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ocr");
        assert_eq!(parts[1], "uploads");
        assert!(parts[2].starts_with("20240309_140507_"));
        assert!(parts[2].ends_with("_page_1.png"));
    }

    #[test]
    fn test_build_key_is_unique() {
        let a = build_key("ocr", ArtifactKind::Pdf, "a.pdf", fixed_now());
        let b = build_key("ocr", ArtifactKind::Pdf, "a.pdf", fixed_now());
        assert_ne!(a, b);
    }

    #[test]
    fn test_build_key_without_prefix() {
        let key = build_key("/", ArtifactKind::Pdf, "doc.pdf", fixed_now());
        assert!(key.starts_with("pdfs/"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\scans\\p 2.jpg"), "p_2.jpg");
        assert_eq!(sanitize_filename("책 페이지.png"), "책_페이지.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("a?b&c"), "a_b_c");
    }

    #[test]
    fn test_expiry_is_capped_by_retention() {
        let now = fixed_now();
        let retention = chrono::Duration::hours(1);
        assert_eq!(
            expiry_instant(now, 600, retention),
            now + chrono::Duration::seconds(600)
        );
        assert_eq!(expiry_instant(now, 86_400, retention), now + retention);
    }

    #[tokio::test]
    async fn test_disabled_store_rejects() {
        let result = DisabledArtifactStore
            .put(ArtifactKind::Upload, "a.png", vec![1], "image/png")
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, StorageError::Disabled));
        assert_eq!(err.to_string(), "storage disabled");
    }

    #[tokio::test]
    async fn test_with_timeout_maps_expiry() {
        let result: Result<(), StorageError> = with_timeout(0, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StorageError::Timeout(0))));
    }
}
