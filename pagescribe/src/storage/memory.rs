use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::StorageConfig;
use crate::error::StorageError;

use super::{build_key, expiry_instant, ArtifactKind, ArtifactStore, StoredArtifact};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug)]
struct Entry {
    blob: StoredBlob,
    expires_at: DateTime<Utc>,
}

/// In-process artifact store for local development and tests.
///
/// URLs point back at this service (`{base}/api/artifacts/{key}`), and reads
/// take the current instant as an argument so expiry can be checked without
/// waiting for the clock.
pub struct MemoryArtifactStore {
    objects: RwLock<HashMap<String, Entry>>,
    public_base_url: String,
    prefix: String,
    url_ttl_secs: u64,
    retention: chrono::Duration,
}

impl MemoryArtifactStore {
    pub fn new(config: &StorageConfig, public_base_url: &str) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            prefix: config.prefix.clone(),
            url_ttl_secs: config.url_ttl_secs,
            retention: config.retention(),
        }
    }

    /// Store at an explicit creation instant.
    pub async fn put_at(
        &self,
        kind: ArtifactKind,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
        now: DateTime<Utc>,
    ) -> StoredArtifact {
        let key = build_key(&self.prefix, kind, filename, now);
        let expires_at = expiry_instant(now, self.url_ttl_secs, self.retention);

        self.objects.write().await.insert(
            key.clone(),
            Entry {
                blob: StoredBlob {
                    bytes,
                    content_type: content_type.to_string(),
                },
                expires_at,
            },
        );

        StoredArtifact {
            url: format!("{}/api/artifacts/{}", self.public_base_url, key),
            key,
            expires_at,
        }
    }

    /// Fetch an artifact as seen at `now`; expired entries are not returned.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<StoredBlob> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.blob.clone())
    }

    /// Drop entries that expired before `now`. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut objects = self.objects.write().await;
        let before = objects.len();
        objects.retain(|_, entry| now < entry.expires_at);
        before - objects.len()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredArtifact, StorageError> {
        let now = Utc::now();
        self.purge_expired(now).await;
        Ok(self.put_at(kind, filename, bytes, content_type, now).await)
    }
}
