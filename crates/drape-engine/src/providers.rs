use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use crate::config::AcquisitionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// A remote source of image bytes.
///
/// Implementations fail on transport errors, timeouts and non-success
/// statuses; an empty body is a successful (if useless) response.
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, prompt: &str) -> Result<ImageBytes>;
}

/// Prompt-driven generator: `{base}/prompt/{prompt}?width=N&height=N&nologo=true`.
pub struct PollinationsProvider {
    api_base: String,
    size: u32,
    http: HttpClient,
}

impl PollinationsProvider {
    pub fn new(config: &AcquisitionConfig) -> Result<Self> {
        Ok(Self {
            api_base: config.primary_api_base.clone(),
            size: config.image_size,
            http: http_client(config.timeout)?,
        })
    }

    pub fn request_url(&self, prompt: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("invalid Pollinations API base ({})", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Pollinations API base cannot hold a path ({})", self.api_base))?
            .pop_if_empty()
            .push("prompt")
            .push(prompt);
        let size = self.size.to_string();
        url.query_pairs_mut()
            .append_pair("width", &size)
            .append_pair("height", &size)
            .append_pair("nologo", "true");
        Ok(url)
    }
}

impl ImageProvider for PollinationsProvider {
    fn name(&self) -> &str {
        "pollinations"
    }

    fn fetch(&self, prompt: &str) -> Result<ImageBytes> {
        let url = self.request_url(prompt)?;
        download_image(&self.http, "Pollinations", url)
    }
}

/// Placeholder photos that ignore the prompt: `{base}/{N}/{N}`.
pub struct PicsumProvider {
    api_base: String,
    size: u32,
    http: HttpClient,
}

impl PicsumProvider {
    pub fn new(config: &AcquisitionConfig) -> Result<Self> {
        Ok(Self {
            api_base: config.fallback_api_base.clone(),
            size: config.image_size,
            http: http_client(config.timeout)?,
        })
    }

    pub fn request_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("invalid Picsum API base ({})", self.api_base))?;
        let size = self.size.to_string();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Picsum API base cannot hold a path ({})", self.api_base))?
            .pop_if_empty()
            .push(&size)
            .push(&size);
        Ok(url)
    }
}

impl ImageProvider for PicsumProvider {
    fn name(&self) -> &str {
        "picsum"
    }

    fn fetch(&self, _prompt: &str) -> Result<ImageBytes> {
        let url = self.request_url()?;
        download_image(&self.http, "Picsum", url)
    }
}

fn http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

fn download_image(http: &HttpClient, provider: &str, url: Url) -> Result<ImageBytes> {
    let response = http
        .get(url.clone())
        .send()
        .with_context(|| format!("{provider} request failed ({url})"))?;
    if !response.status().is_success() {
        let code = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        bail!(
            "{provider} failed with status: {code}: {}",
            truncate_text(&body, 512)
        );
    }
    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .filter(|value| value.starts_with("image/"));
    let bytes = response
        .bytes()
        .with_context(|| format!("failed reading {provider} image bytes"))?
        .to_vec();
    Ok(ImageBytes { bytes, mime_type })
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
