use std::{
    fmt,
    future::Future,
    path::{Component, Path, PathBuf},
};

use mime::Mime;
use reqwest::{Client, header};
use tracing::error;
use uuid::Uuid;

use crate::config::StorageSettings;

const MAX_EXTENSION_CHARS: usize = 10;

/// A selected file held in memory until the submission uploads it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFile {
    pub original_name: String,
    pub content_type: Mime,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(original_name: impl Into<String>, content_type: Mime, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased, sanitized extension of the original filename, if any.
    pub fn extension(&self) -> Option<String> {
        let sanitized = sanitize_filename::sanitize(&self.original_name);
        let extension = Path::new(&sanitized)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        let valid = !extension.is_empty()
            && extension.len() <= MAX_EXTENSION_CHARS
            && extension.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then_some(extension)
    }
}

/// Error returned when an object could not be stored.
#[derive(Debug)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

/// Public bucket holding submission attachments.
pub trait ObjectStorage: Send + Sync {
    /// Stores one file under a fresh randomized name and returns its path in the bucket.
    fn upload(
        &self,
        file: &PendingFile,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Base URL that stored paths are appended to for public links.
    fn public_base_url(&self) -> &str;

    fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url(), path.trim_start_matches('/'))
    }
}

/// Randomized object name that keeps the original extension.
pub fn stored_object_name(file: &PendingFile) -> String {
    let stem = Uuid::new_v4().simple().to_string();
    match file.extension() {
        Some(extension) => format!("{stem}.{extension}"),
        None => stem,
    }
}

/// Storage backend selected at startup.
#[derive(Clone)]
pub enum StorageBackend {
    Remote(RemoteBucket),
    Local(LocalBucket),
}

impl StorageBackend {
    pub fn from_settings(settings: &StorageSettings) -> Self {
        match settings {
            StorageSettings::Remote {
                api_url,
                bucket,
                service_key,
                public_base_url,
            } => StorageBackend::Remote(RemoteBucket::new(
                api_url,
                bucket,
                service_key,
                public_base_url,
            )),
            StorageSettings::Local {
                root,
                public_base_url,
            } => StorageBackend::Local(LocalBucket::new(root.clone(), public_base_url)),
        }
    }

    pub fn local(&self) -> Option<&LocalBucket> {
        match self {
            StorageBackend::Local(bucket) => Some(bucket),
            StorageBackend::Remote(_) => None,
        }
    }
}

impl ObjectStorage for StorageBackend {
    async fn upload(&self, file: &PendingFile) -> Result<String, StorageError> {
        match self {
            StorageBackend::Remote(bucket) => bucket.upload(file).await,
            StorageBackend::Local(bucket) => bucket.upload(file).await,
        }
    }

    fn public_base_url(&self) -> &str {
        match self {
            StorageBackend::Remote(bucket) => bucket.public_base_url(),
            StorageBackend::Local(bucket) => bucket.public_base_url(),
        }
    }
}

/// Bucket behind an HTTP object-storage API (`POST /object/{bucket}/{path}`).
#[derive(Clone)]
pub struct RemoteBucket {
    http: Client,
    api_url: String,
    bucket: String,
    service_key: String,
    public_base_url: String,
}

impl RemoteBucket {
    pub fn new(api_url: &str, bucket: &str, service_key: &str, public_base_url: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
            public_base_url: public_base_url.to_string(),
        }
    }

    fn object_endpoint(&self, object_name: &str) -> String {
        format!("{}/object/{}/{}", self.api_url, self.bucket, object_name)
    }
}

impl ObjectStorage for RemoteBucket {
    async fn upload(&self, file: &PendingFile) -> Result<String, StorageError> {
        let object_name = stored_object_name(file);

        let response = self
            .http
            .post(self.object_endpoint(&object_name))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(header::CONTENT_TYPE, file.content_type.as_ref())
            .header("x-upsert", "false")
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|err| {
                error!(?err, file = %file.original_name, "object storage request failed");
                StorageError::new(format!("could not upload {}", file.original_name))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                %status,
                body = %body,
                file = %file.original_name,
                "object storage rejected upload"
            );
            return Err(StorageError::new(format!(
                "storage rejected {} ({status})",
                file.original_name
            )));
        }

        Ok(object_name)
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}

/// Bucket kept in a local directory and served by the application itself.
#[derive(Clone)]
pub struct LocalBucket {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBucket {
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.to_string(),
        }
    }

    /// Resolves a stored path inside the bucket root, refusing traversal.
    pub fn resolve(&self, object_path: &str) -> Option<PathBuf> {
        let relative = Path::new(object_path);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (safe && !object_path.is_empty()).then(|| self.root.join(relative))
    }
}

impl ObjectStorage for LocalBucket {
    async fn upload(&self, file: &PendingFile) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            error!(?err, root = %self.root.display(), "failed to create storage directory");
            StorageError::new("storage directory is unavailable")
        })?;

        let object_name = stored_object_name(file);
        let destination = self.root.join(&object_name);
        tokio::fs::write(&destination, &file.bytes)
            .await
            .map_err(|err| {
                error!(?err, file = %destination.display(), "failed to write stored object");
                StorageError::new(format!("could not store {}", file.original_name))
            })?;

        Ok(object_name)
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}

/// Content type served for a stored object, derived from its extension.
pub fn content_type_for(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "pdf" => mime::APPLICATION_PDF,
        "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "heic" => "image/heic".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
pub mod testing {
    use std::{sync::Mutex, time::Duration};

    use super::*;

    /// In-memory bucket that can fail for a given filename and delay uploads.
    #[derive(Default)]
    pub struct MemoryStorage {
        pub fail_for: Option<String>,
        pub stored: Mutex<Vec<(String, String)>>,
        pub delay_by_size: bool,
    }

    impl MemoryStorage {
        pub fn failing_for(name: &str) -> Self {
            Self {
                fail_for: Some(name.to_string()),
                ..Self::default()
            }
        }

        pub fn stored_names(&self) -> Vec<String> {
            self.stored
                .lock()
                .unwrap()
                .iter()
                .map(|(original, _)| original.clone())
                .collect()
        }
    }

    impl ObjectStorage for MemoryStorage {
        async fn upload(&self, file: &PendingFile) -> Result<String, StorageError> {
            if self.delay_by_size {
                tokio::time::sleep(Duration::from_millis(file.bytes.len() as u64)).await;
            }
            if self.fail_for.as_deref() == Some(file.original_name.as_str()) {
                return Err(StorageError::new(format!(
                    "could not upload {}",
                    file.original_name
                )));
            }
            let object_name = format!("{}-{}", file.original_name, stored_object_name(file));
            self.stored
                .lock()
                .unwrap()
                .push((file.original_name.clone(), object_name.clone()));
            Ok(object_name)
        }

        fn public_base_url(&self) -> &str {
            "https://files.example/"
        }
    }
}
