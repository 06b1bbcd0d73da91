use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lifetime of presigned upload URLs.
const PRESIGNED_TTL: Duration = Duration::from_secs(600);

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to presign upload: {0}")]
    Presign(String),

    #[error("failed to store object: {0}")]
    Put(String),
}

/// StorageService
///
/// Contract for the object store holding trip covers, city images and receipts.
/// Handlers depend on this trait only, so the S3 client can be replaced by
/// `MockStorageService` in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Generates a short-lived URL allowing a client to PUT `key` directly,
    /// constrained to `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Stores `body` under `key` and returns its public URL.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint (MinIO locally).
/// Path-style addressing is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    /// SDK client built from static credentials (no AWS profile lookup).
    client: s3::Client,
    /// Endpoint without a trailing slash; public object URLs are built from it.
    endpoint: String,
    /// Single bucket holding every upload under the `uploads/` prefix.
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Configures the SDK by hand instead of through `aws_config`: explicit
    /// credentials, region and endpoint, with path-style URLs
    /// (`endpoint/bucket/key`) that MinIO expects.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket already exists.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        let presigning = PresigningConfig::expires_in(PRESIGNED_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Put(e.to_string()))?;

        Ok(self.object_url(&key))
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never escape its prefix.
/// Applied by every `StorageService` implementation before touching the bucket.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory `StorageService` for tests. Records the keys it was asked to store.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    stored: Arc<Mutex<Vec<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys passed to `put_object`, in call order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.stored
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign("simulated failure".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn put_object(
        &self,
        key: &str,
        _body: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Put("simulated failure".to_string()));
        }
        let key = sanitize_key(key);
        if let Ok(mut stored) = self.stored.lock() {
            stored.push(key.clone());
        }
        Ok(format!("http://localhost:9000/mock-bucket/{key}"))
    }
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
