use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No image file provided")]
    MissingImage,
    #[error("No image selected")]
    EmptyFilename,
    #[error("Invalid file type. Allowed: png, jpg, jpeg, gif, bmp, tiff")]
    InvalidFileType,
    #[error("File too large (max 16 MiB)")]
    TooLarge,
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
}

pub struct UploadedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Extension check, case-insensitive. A name without an extension is rejected.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn calculate_image_hash(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

/// Reads the `image` field from a multipart body. Other fields are drained
/// and ignored.
pub async fn read_image_field(mut payload: Multipart) -> Result<UploadedImage, UploadError> {
    let mut found = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let is_image = field.name() == Some(IMAGE_FIELD);
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            if is_image {
                if bytes.len() + data.len() > MAX_UPLOAD_BYTES {
                    return Err(UploadError::TooLarge);
                }
                bytes.extend_from_slice(&data);
            }
        }

        if is_image && found.is_none() {
            found = Some((filename, bytes));
        }
    }

    let (filename, bytes) = found.ok_or(UploadError::MissingImage)?;
    let filename = filename.unwrap_or_default();
    if filename.trim().is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    if !allowed_file(&filename) {
        return Err(UploadError::InvalidFileType);
    }
    Ok(UploadedImage { filename, bytes })
}
