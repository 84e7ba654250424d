/// Photo validation and content-addressed storage
use crate::{
    error::{CivicError, CivicResult},
    photos::{DiskPhotoBackend, PhotoBackend},
};
use image::ImageFormat;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::{path::PathBuf, sync::Arc};

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// A photo accepted into storage
#[derive(Debug, Clone, Serialize)]
pub struct StoredPhoto {
    pub key: String,
    pub content_type: &'static str,
    pub size: usize,
}

/// Photo store
#[derive(Clone)]
pub struct PhotoStore {
    backend: Arc<dyn PhotoBackend>,
    max_size: usize,
}

impl PhotoStore {
    pub fn new(backend: Arc<dyn PhotoBackend>, max_size: usize) -> Self {
        Self { backend, max_size }
    }

    /// Photo store on local disk
    pub fn disk(directory: PathBuf, max_size: usize) -> Self {
        Self::new(Arc::new(DiskPhotoBackend::new(directory)), max_size)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Validate and store an uploaded photo
    ///
    /// The file name must carry an image extension and the bytes must sniff as
    /// JPEG, PNG or GIF. Identical uploads map to the same key.
    pub async fn save(&self, filename: Option<&str>, data: Vec<u8>) -> CivicResult<StoredPhoto> {
        if data.is_empty() {
            return Err(CivicError::Validation("The submitted file is empty.".to_string()));
        }
        if data.len() > self.max_size {
            return Err(CivicError::Validation(format!(
                "Photo must be at most {} bytes",
                self.max_size
            )));
        }

        let extension = filename
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(CivicError::Validation(format!(
                "File extension \"{}\" is not allowed. Allowed extensions are: {}.",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let format = image::guess_format(&data).map_err(|_| Self::not_an_image())?;
        let canonical = Self::canonical_extension(format).ok_or_else(Self::not_an_image)?;

        let key = format!("{}.{}", hex::encode(Sha256::digest(&data)), canonical);
        let size = data.len();

        if !self.backend.exists(&key).await? {
            self.backend.put(&key, data).await?;
            tracing::debug!(key = %key, size, "Stored photo");
        }

        Ok(StoredPhoto {
            content_type: Self::content_type(canonical),
            key,
            size,
        })
    }

    /// Photo bytes and content type
    pub async fn open(&self, key: &str) -> CivicResult<(Vec<u8>, &'static str)> {
        let not_found = || CivicError::NotFound("Photo not found".to_string());

        let extension = Self::parse_key(key).ok_or_else(not_found)?;
        let data = self.backend.get(key).await?.ok_or_else(not_found)?;

        Ok((data, Self::content_type(extension)))
    }

    /// Remove a stored photo
    pub async fn remove(&self, key: &str) -> CivicResult<()> {
        if Self::parse_key(key).is_none() {
            return Ok(());
        }
        self.backend.delete(key).await
    }

    /// Extension of a well-formed key: 64 lowercase hex digits, a dot and an image extension
    fn parse_key(key: &str) -> Option<&str> {
        let (digest, extension) = key.split_once('.')?;
        let well_formed = digest.len() == 64
            && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
            && ALLOWED_EXTENSIONS.contains(&extension);
        well_formed.then_some(extension)
    }

    fn canonical_extension(format: ImageFormat) -> Option<&'static str> {
        match format {
            ImageFormat::Jpeg => Some("jpg"),
            ImageFormat::Png => Some("png"),
            ImageFormat::Gif => Some("gif"),
            _ => None,
        }
    }

    fn content_type(extension: &str) -> &'static str {
        match extension {
            "png" => "image/png",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }

    fn not_an_image() -> CivicError {
        CivicError::Validation(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_string(),
        )
    }
}
