use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::config::AcquisitionConfig;
use crate::providers::{ImageBytes, ImageProvider, PicsumProvider, PollinationsProvider};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const ERROR_TEXT_MAX_CHARS: usize = 512;

/// Base64 image bytes plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub base64: String,
    pub mime_type: Option<String>,
    pub provider: String,
}

impl EncodedImage {
    pub fn to_data_uri(&self) -> String {
        let mime = self.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
        format!("data:{mime};base64,{}", self.base64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Prompt is required")]
    InvalidPrompt,
    #[error("{provider}: {message}")]
    Upstream { provider: String, message: String },
    #[error("Failed to generate base64 image")]
    EncodingFailure,
}

impl AcquisitionError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AcquisitionError::InvalidPrompt)
    }
}

/// Anything that turns a prompt into an encoded image.
pub trait PromptSource: Send + Sync {
    fn acquire(&self, prompt: &str) -> Result<EncodedImage, AcquisitionError>;
}

/// Primary generator with a single prompt-independent fallback.
pub struct ImageAcquisitionService {
    primary: Box<dyn ImageProvider>,
    fallback: Box<dyn ImageProvider>,
}

impl ImageAcquisitionService {
    pub fn new(primary: Box<dyn ImageProvider>, fallback: Box<dyn ImageProvider>) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config(config: &AcquisitionConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            Box::new(PollinationsProvider::new(config)?),
            Box::new(PicsumProvider::new(config)?),
        ))
    }

    pub fn provider_names(&self) -> [&str; 2] {
        [self.primary.name(), self.fallback.name()]
    }

    pub fn generate(&self, prompt: &str) -> Result<EncodedImage, AcquisitionError> {
        let prompt = validate_prompt(prompt)?;
        let (provider, image) = match self.primary.fetch(prompt) {
            Ok(image) => (self.primary.name(), image),
            Err(err) => {
                tracing::warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "primary image provider failed, using fallback: {}",
                    error_chain_text(&err, ERROR_TEXT_MAX_CHARS)
                );
                let image = self
                    .fallback
                    .fetch(prompt)
                    .map_err(|err| AcquisitionError::Upstream {
                        provider: self.fallback.name().to_string(),
                        message: error_chain_text(&err, ERROR_TEXT_MAX_CHARS),
                    })?;
                (self.fallback.name(), image)
            }
        };
        encode_image(provider, image)
    }
}

impl PromptSource for ImageAcquisitionService {
    fn acquire(&self, prompt: &str) -> Result<EncodedImage, AcquisitionError> {
        self.generate(prompt)
    }
}

/// Trimmed prompt, or `InvalidPrompt` when nothing is left.
pub fn validate_prompt(prompt: &str) -> Result<&str, AcquisitionError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(AcquisitionError::InvalidPrompt);
    }
    Ok(trimmed)
}

fn encode_image(provider: &str, image: ImageBytes) -> Result<EncodedImage, AcquisitionError> {
    let base64 = BASE64.encode(&image.bytes);
    if base64.is_empty() {
        return Err(AcquisitionError::EncodingFailure);
    }
    let mime_type = image.mime_type.or_else(|| {
        image::guess_format(&image.bytes)
            .ok()
            .map(|format| format.to_mime_type().to_string())
    });
    Ok(EncodedImage {
        base64,
        mime_type,
        provider: provider.to_string(),
    })
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return crate::providers::truncate_text(&err.to_string(), max_chars);
    }
    crate::providers::truncate_text(&parts.join(" | caused by: "), max_chars)
}
