//! S3-compatible artifact store.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{retry::RetryConfig, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{
        BucketLifecycleConfiguration, CorsConfiguration, CorsRule, ExpirationStatus,
        LifecycleExpiration, LifecycleRule, LifecycleRuleFilter,
    },
    Client,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::StorageError;

use super::{build_key, expiry_instant, with_timeout, ArtifactKind, ArtifactStore, StoredArtifact};

const LIFECYCLE_RULE_ID: &str = "pagescribe-expire-temporary";

#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    prefix: String,
    url_ttl_secs: u64,
    retention: chrono::Duration,
    retention_hours: u64,
    timeout_secs: u64,
}

impl S3ArtifactStore {
    /// Credentials and region come from the standard AWS provider chain;
    /// `AWS_REGION` and `S3_ENDPOINT` override them when set.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &config.endpoint_url {
            // MinIO and other S3-compatible services need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        info!(bucket = %config.bucket, prefix = %config.prefix, "S3 artifact store initialized");

        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            url_ttl_secs: config.effective_url_ttl_secs(),
            retention: config.retention(),
            retention_hours: config.retention_hours,
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Install the expiry lifecycle rule for this store's prefix and a CORS
    /// rule allowing browsers at `allowed_origins` to GET/HEAD artifacts.
    pub async fn configure_bucket(&self, allowed_origins: &[String]) -> Result<(), StorageError> {
        with_timeout(self.timeout_secs, self.configure_bucket_inner(allowed_origins)).await
    }

    async fn configure_bucket_inner(&self, allowed_origins: &[String]) -> Result<(), StorageError> {
        let days = lifecycle_days(self.retention_hours);

        let rule = LifecycleRule::builder()
            .id(LIFECYCLE_RULE_ID)
            .filter(
                LifecycleRuleFilter::builder()
                    .prefix(format!("{}/", self.prefix.trim_matches('/')))
                    .build(),
            )
            .status(ExpirationStatus::Enabled)
            .expiration(LifecycleExpiration::builder().days(days).build())
            .build()
            .map_err(|e| StorageError::BucketConfig(e.to_string()))?;

        let lifecycle = BucketLifecycleConfiguration::builder()
            .rules(rule)
            .build()
            .map_err(|e| StorageError::BucketConfig(e.to_string()))?;

        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(&self.bucket)
            .lifecycle_configuration(lifecycle)
            .send()
            .await
            .map_err(|e| StorageError::BucketConfig(format!("lifecycle: {e}")))?;

        let mut cors_rule = CorsRule::builder()
            .allowed_methods("GET")
            .allowed_methods("HEAD")
            .allowed_headers("*")
            .max_age_seconds(3000);
        for origin in allowed_origins {
            cors_rule = cors_rule.allowed_origins(origin);
        }

        let cors = CorsConfiguration::builder()
            .cors_rules(
                cors_rule
                    .build()
                    .map_err(|e| StorageError::BucketConfig(e.to_string()))?,
            )
            .build()
            .map_err(|e| StorageError::BucketConfig(e.to_string()))?;

        self.client
            .put_bucket_cors()
            .bucket(&self.bucket)
            .cors_configuration(cors)
            .send()
            .await
            .map_err(|e| StorageError::BucketConfig(format!("cors: {e}")))?;

        info!(bucket = %self.bucket, expiration_days = days, "Bucket lifecycle and CORS rules installed");
        Ok(())
    }

    async fn put_inner(
        &self,
        key: String,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;

        debug!(key = %key, size, "Object uploaded");

        let presigning = PresigningConfig::expires_in(Duration::from_secs(self.url_ttl_secs))
            .map_err(|e| StorageError::Presign {
                key: key.clone(),
                message: e.to_string(),
            })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign {
                key: key.clone(),
                message: e.to_string(),
            })?;

        Ok(presigned.uri().to_string())
    }
}

/// Lifecycle rules count whole days; round the retention window up.
fn lifecycle_days(retention_hours: u64) -> i32 {
    let days = retention_hours.div_ceil(24).max(1);
    i32::try_from(days).unwrap_or(i32::MAX)
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredArtifact, StorageError> {
        let now = Utc::now();
        let key = build_key(&self.prefix, kind, filename, now);

        let url = with_timeout(
            self.timeout_secs,
            self.put_inner(key.clone(), bytes, content_type),
        )
        .await?;

        Ok(StoredArtifact {
            key,
            url,
            expires_at: expiry_instant(now, self.url_ttl_secs, self.retention),
        })
    }
}
