//! Content-addressed image storage
//!
//! Stores uploaded images in a local directory structure using SHA256 hashes
//! as filenames. A reference looks like `sha256-<hex>.<ext>`; the extension is
//! derived from the verified MIME type so the file can be served back with the
//! right `Content-Type`.

use crate::error::CmsError;
use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// MIME types accepted for ordinary image fields
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Size and type limits for one image field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    pub max_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl UploadConstraints {
    /// JPEG, PNG and WebP up to `max_size_bytes`
    pub fn images(max_size_bytes: u64) -> Self {
        Self {
            max_size_bytes,
            allowed_mime_types: IMAGE_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Also accept `mime_type`
    pub fn allow(mut self, mime_type: &str) -> Self {
        if !self.allowed_mime_types.iter().any(|m| m == mime_type) {
            self.allowed_mime_types.push(mime_type.to_string());
        }
        self
    }

    /// Check an upload against these limits, returning a user-facing message
    pub fn check(&self, upload: &ImageUpload) -> Result<(), String> {
        if upload.data.is_empty() {
            return Err("file is empty".to_string());
        }
        if upload.data.len() as u64 > self.max_size_bytes {
            return Err(format!(
                "file must be at most {}",
                human_size(self.max_size_bytes)
            ));
        }
        if !self.allowed_mime_types.iter().any(|m| m == &upload.mime_type) {
            return Err(format!(
                "file type '{}' is not allowed (allowed: {})",
                upload.mime_type,
                self.allowed_mime_types.join(", ")
            ));
        }
        match sniff_mime(&upload.data) {
            Some(actual) if actual == upload.mime_type => Ok(()),
            Some(actual) => Err(format!(
                "file content is {} but was declared as {}",
                actual, upload.mime_type
            )),
            None => Err("file content is not a recognised image".to_string()),
        }
    }
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{} MB", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Detect the image type from its leading bytes
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn mime_for(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// A decoded image upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Decode a base64 payload as sent by the admin front end.
    /// Accepts a bare base64 string or a `data:<mime>;base64,` URL.
    pub fn from_base64(mime_type: &str, data: &str) -> Result<Self, String> {
        let encoded = match data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| format!("image data is not valid base64: {}", e))?;
        Ok(Self::new(mime_type.trim().to_ascii_lowercase(), bytes))
    }
}

/// What a save does to one image field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(ImageUpload),
}

/// Result of storing an image
#[derive(Debug, Clone)]
pub struct StoreResult {
    /// Opaque reference persisted in content records
    pub reference: String,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Whether the same bytes were already stored
    pub already_existed: bool,
}

/// Blob collaborator used by services. Implemented by [`BlobStore`].
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Validate and persist an image, returning its reference
    async fn store(
        &self,
        upload: &ImageUpload,
        constraints: &UploadConstraints,
    ) -> Result<StoreResult, CmsError>;

    /// Remove a stored image. Missing references are not an error.
    async fn delete(&self, reference: &str) -> Result<(), CmsError>;

    /// Public URL for a reference
    fn resolve(&self, reference: &str) -> String;
}

/// Image storage manager
pub struct BlobStore {
    /// Root directory for image storage
    root_dir: PathBuf,
    /// Base URL media references resolve against
    public_base_url: String,
}

impl BlobStore {
    /// Create a new blob store at the given directory
    pub async fn new<P: AsRef<Path>>(root_dir: P, public_base_url: &str) -> Result<Self, CmsError> {
        let root_dir = root_dir.as_ref().to_path_buf();

        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Initialized blob store");

        Ok(Self {
            root_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Compute the reference for image bytes of a given type
    pub fn compute_reference(data: &[u8], mime_type: &str) -> Option<String> {
        let ext = extension_for(mime_type)?;
        let mut hasher = Sha256::new();
        hasher.update(data);
        Some(format!("sha256-{}.{}", hex::encode(hasher.finalize()), ext))
    }

    /// Whether a string has the shape of a reference produced by this store
    pub fn is_valid_reference(reference: &str) -> bool {
        let Some(rest) = reference.strip_prefix("sha256-") else {
            return false;
        };
        let Some((hash, ext)) = rest.split_once('.') else {
            return false;
        };
        hash.len() == 64
            && hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            && mime_for(ext).is_some()
    }

    /// MIME type of a stored reference, from its extension
    pub fn mime_type_of(reference: &str) -> Option<&'static str> {
        reference.rsplit_once('.').and_then(|(_, ext)| mime_for(ext))
    }

    /// Get path for a blob by reference
    fn blob_path(&self, reference: &str) -> PathBuf {
        // First 4 hex chars as subdirectory for better filesystem distribution
        let hash_part = reference.strip_prefix("sha256-").unwrap_or(reference);
        let subdir = &hash_part[..4.min(hash_part.len())];
        self.root_dir.join(subdir).join(reference)
    }

    /// Check if an image exists
    pub async fn exists(&self, reference: &str) -> bool {
        Self::is_valid_reference(reference) && fs::metadata(self.blob_path(reference)).await.is_ok()
    }

    /// Retrieve image bytes and their MIME type
    pub async fn get(&self, reference: &str) -> Result<(Vec<u8>, &'static str), CmsError> {
        if !Self::is_valid_reference(reference) {
            return Err(CmsError::NotFound(format!("media {}", reference)));
        }
        let mime = Self::mime_type_of(reference)
            .ok_or_else(|| CmsError::NotFound(format!("media {}", reference)))?;

        match fs::read(self.blob_path(reference)).await {
            Ok(data) => Ok((data, mime)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CmsError::NotFound(format!("media {}", reference)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get storage statistics
    pub async fn stats(&self) -> Result<StorageStats, CmsError> {
        let mut total_blobs = 0u64;
        let mut total_bytes = 0u64;

        let mut entries = match fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageStats::default());
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let mut subentries = fs::read_dir(entry.path()).await?;
            while let Some(subentry) = subentries.next_entry().await? {
                let metadata = subentry.metadata().await?;
                if metadata.is_file() {
                    total_blobs += 1;
                    total_bytes += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            total_blobs,
            total_bytes,
        })
    }
}

#[async_trait]
impl ImageStore for BlobStore {
    async fn store(
        &self,
        upload: &ImageUpload,
        constraints: &UploadConstraints,
    ) -> Result<StoreResult, CmsError> {
        constraints
            .check(upload)
            .map_err(|msg| CmsError::invalid("image", msg))?;

        let reference = Self::compute_reference(&upload.data, &upload.mime_type)
            .ok_or_else(|| CmsError::invalid("image", "unsupported image type"))?;
        let blob_path = self.blob_path(&reference);

        if fs::metadata(&blob_path).await.is_ok() {
            debug!(reference = %reference, "Image already exists");
            return Ok(StoreResult {
                reference,
                size_bytes: upload.data.len() as u64,
                already_existed: true,
            });
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp name first so readers never see a partial file
        let tmp_path = blob_path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, &upload.data).await?;
        if let Err(e) = fs::rename(&tmp_path, &blob_path).await {
            fs::remove_file(&tmp_path).await.ok();
            return Err(e.into());
        }

        info!(reference = %reference, size = upload.data.len(), "Stored image");

        Ok(StoreResult {
            reference,
            size_bytes: upload.data.len() as u64,
            already_existed: false,
        })
    }

    async fn delete(&self, reference: &str) -> Result<(), CmsError> {
        if !Self::is_valid_reference(reference) {
            warn!(reference = %reference, "Refusing to delete malformed media reference");
            return Ok(());
        }
        match fs::remove_file(self.blob_path(reference)).await {
            Ok(()) => {
                info!(reference = %reference, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, reference: &str) -> String {
        format!("{}/media/{}", self.public_base_url, reference)
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StorageStats {
    pub total_blobs: u64,
    pub total_bytes: u64,
}

#[cfg(test)]
pub(crate) mod test_images {
    /// Smallest byte strings that pass magic-byte sniffing
    pub fn png(seed: u8) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[seed; 16]);
        data
    }

    pub fn jpeg(seed: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
        data.extend_from_slice(&[seed; 16]);
        data
    }
}
