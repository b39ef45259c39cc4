use std::time::Duration;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::acquisition::{
    error_chain_text, validate_prompt, AcquisitionError, EncodedImage, PromptSource,
};
use crate::providers::truncate_text;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    photo: String,
}

/// Talks to a running `drape serve` (or any server with the same contract).
pub struct BackendClient {
    url: String,
    http: HttpClient,
}

impl BackendClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            http: HttpClient::builder()
                .timeout(timeout)
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    fn post(&self, prompt: &str) -> anyhow::Result<(u16, String)> {
        let response = self
            .http
            .post(&self.url)
            .json(&GenerateRequest { prompt })
            .send()
            .with_context(|| format!("backend request failed ({})", self.url))?;
        let code = response.status().as_u16();
        let body = response
            .text()
            .context("backend response body read failed")?;
        Ok((code, body))
    }
}

impl PromptSource for BackendClient {
    fn acquire(&self, prompt: &str) -> Result<EncodedImage, AcquisitionError> {
        let prompt = validate_prompt(prompt)?;
        let (code, body) = self.post(prompt).map_err(|err| AcquisitionError::Upstream {
            provider: "backend".to_string(),
            message: error_chain_text(&err, 512),
        })?;
        interpret_response(code, &body)
    }
}

fn interpret_response(code: u16, body: &str) -> Result<EncodedImage, AcquisitionError> {
    match code {
        200 => {
            let parsed: GenerateResponse =
                serde_json::from_str(body).map_err(|err| AcquisitionError::Upstream {
                    provider: "backend".to_string(),
                    message: format!("backend returned invalid JSON payload: {err}"),
                })?;
            if parsed.photo.is_empty() {
                return Err(AcquisitionError::EncodingFailure);
            }
            let mime_type = sniff_photo_mime(&parsed.photo);
            Ok(EncodedImage {
                base64: parsed.photo,
                mime_type,
                provider: "backend".to_string(),
            })
        }
        400 => Err(AcquisitionError::InvalidPrompt),
        _ => {
            let detail = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|payload| {
                    payload
                        .get("error")
                        .or_else(|| payload.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| truncate_text(body, 512));
            Err(AcquisitionError::Upstream {
                provider: "backend".to_string(),
                message: format!("backend request failed ({code}): {detail}"),
            })
        }
    }
}

// Unrecognized or undecodable photos are left unlabeled and render as PNG.
fn sniff_photo_mime(photo: &str) -> Option<String> {
    let bytes = BASE64.decode(photo.trim()).ok()?;
    image::guess_format(&bytes)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}
