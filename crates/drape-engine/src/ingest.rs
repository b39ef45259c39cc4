use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Checks applied to a local file before it becomes a decal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestLimits {
    pub max_bytes: Option<u64>,
    pub allowed_mime_types: Option<Vec<String>>,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_bytes: Some(DEFAULT_MAX_BYTES),
            allowed_mime_types: Some(
                DEFAULT_ALLOWED_MIME_TYPES
                    .iter()
                    .map(|mime| (*mime).to_string())
                    .collect(),
            ),
        }
    }
}

impl IngestLimits {
    /// Accepts any file of any size.
    pub fn unrestricted() -> Self {
        Self {
            max_bytes: None,
            allowed_mime_types: None,
        }
    }

    fn check_size(&self, size: u64) -> Result<(), IngestError> {
        match self.max_bytes {
            Some(max) if size > max => Err(IngestError::TooLarge { size, max }),
            _ => Ok(()),
        }
    }

    fn check_mime(&self, mime: &str) -> Result<(), IngestError> {
        match &self.allowed_mime_types {
            Some(allowed) if !allowed.iter().any(|item| item == mime) => {
                Err(IngestError::UnsupportedType {
                    mime: mime.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("{message}")]
    FileRead { path: PathBuf, message: String },
    #[error("file is {size} bytes, over the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("unsupported image type '{mime}'")]
    UnsupportedType { mime: String },
}

/// Turns local image files into `data:` URIs.
#[derive(Debug, Clone, Default)]
pub struct FileIngestService {
    limits: IngestLimits,
}

impl FileIngestService {
    pub fn new(limits: IngestLimits) -> Self {
        Self { limits }
    }

    pub async fn ingest(&self, path: &Path) -> Result<String, IngestError> {
        let read_error = |err: std::io::Error| IngestError::FileRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
        self.limits.check_size(metadata.len())?;
        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        self.encode_bytes(&bytes)
    }

    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<String, IngestError> {
        self.limits.check_size(bytes.len() as u64)?;
        let mime = sniff_mime(bytes);
        self.limits.check_mime(mime)?;
        Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MIME)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FileIngestService, IngestError, IngestLimits};
    use crate::acquisition::tests::PNG_MAGIC;

    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[tokio::test]
    async fn reads_png_as_data_uri() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logo.png");
        fs::write(&path, PNG_MAGIC)?;

        let uri = FileIngestService::default().ingest(&path).await?;
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > "data:image/png;base64,".len());
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_reports_read_error_message() {
        let path = std::env::temp_dir().join("drape-ingest-missing").join("nope.png");
        let err = FileIngestService::default().ingest(&path).await.unwrap_err();
        match err {
            IngestError::FileRead { path: failed, message } => {
                assert_eq!(failed, path);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_reading() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("big.png");
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(64, 0);
        fs::write(&path, &bytes)?;

        let service = FileIngestService::new(IngestLimits {
            max_bytes: Some(32),
            ..IngestLimits::default()
        });
        assert_eq!(
            service.ingest(&path).await.unwrap_err(),
            IngestError::TooLarge { size: 64, max: 32 }
        );
        Ok(())
    }

    #[test]
    fn detects_jpeg_and_rejects_unknown_types() {
        let service = FileIngestService::default();
        assert!(service
            .encode_bytes(JPEG_MAGIC)
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(
            service.encode_bytes(b"plain text").unwrap_err(),
            IngestError::UnsupportedType {
                mime: "application/octet-stream".to_string()
            }
        );
    }

    #[test]
    fn unrestricted_limits_accept_anything() {
        let service = FileIngestService::new(IngestLimits::unrestricted());
        assert_eq!(
            service.encode_bytes(b"test").unwrap(),
            "data:application/octet-stream;base64,dGVzdA=="
        );
    }
}
