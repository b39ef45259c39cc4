use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use drape_contracts::decals::{DecalAssignment, DecalKind, StateSlot};
use drape_contracts::{CustomizationStore, FilterActivationController, HexColor, TextureFilters};

use crate::acquisition::{validate_prompt, AcquisitionError, PromptSource};
use crate::ingest::{FileIngestService, IngestError};

pub const STATE_FILE_NAME: &str = "customization.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("image acquisition task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub state_path: PathBuf,
    pub decal_paths: Vec<PathBuf>,
}

/// Wires prompt and file sources into the filter controller.
///
/// A failed acquisition or ingest never touches the store.
pub struct CustomizationSession {
    controller: FilterActivationController,
    source: Arc<dyn PromptSource>,
    ingest: FileIngestService,
}

impl CustomizationSession {
    pub fn new(
        store: CustomizationStore,
        source: Arc<dyn PromptSource>,
        ingest: FileIngestService,
    ) -> Self {
        Self {
            controller: FilterActivationController::new(store),
            source,
            ingest,
        }
    }

    pub fn store(&self) -> &CustomizationStore {
        self.controller.store()
    }

    pub async fn apply_prompt(
        &self,
        kind: DecalKind,
        prompt: &str,
    ) -> Result<DecalAssignment, SessionError> {
        let prompt = validate_prompt(prompt)?.to_string();
        let source = Arc::clone(&self.source);
        let image = tokio::task::spawn_blocking(move || source.acquire(&prompt))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))??;
        let assignment = DecalAssignment::new(kind, image.to_data_uri());
        tracing::info!(kind = %kind, provider = %image.provider, "assigning generated decal");
        self.controller.assign(assignment.clone());
        Ok(assignment)
    }

    pub async fn apply_file(
        &self,
        kind: DecalKind,
        path: &Path,
    ) -> Result<DecalAssignment, SessionError> {
        let payload = self.ingest.ingest(path).await?;
        let assignment = DecalAssignment::new(kind, payload);
        tracing::info!(kind = %kind, path = %path.display(), "assigning uploaded decal");
        self.controller.assign(assignment.clone());
        Ok(assignment)
    }

    pub fn set_color(&self, color: HexColor) {
        self.store().set_color(color);
    }

    pub fn toggle_filter(&self, tab_name: &str) -> TextureFilters {
        self.controller.toggle_filter_by_name(tab_name)
    }

    pub fn toggle_intro(&self) -> bool {
        self.store().toggle_intro()
    }

    /// Writes the state snapshot plus every embedded decal image to `dir`.
    pub fn export(&self, dir: &Path) -> anyhow::Result<ExportSummary> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let snapshot = self.store().snapshot();

        let state_path = dir.join(STATE_FILE_NAME);
        let raw = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(&state_path, raw)
            .with_context(|| format!("failed to write {}", state_path.display()))?;

        let mut decal_paths = Vec::new();
        for (slot, stem) in [(StateSlot::LogoDecal, "logo"), (StateSlot::FullDecal, "full")] {
            let Some((mime, bytes)) = decode_data_uri(snapshot.decal(slot))? else {
                continue;
            };
            let path = dir.join(format!("{stem}.{}", extension_for_mime(&mime)));
            fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
            decal_paths.push(path);
        }

        Ok(ExportSummary {
            state_path,
            decal_paths,
        })
    }
}

/// `Ok(None)` for plain asset references, decoded bytes for `data:` URIs.
fn decode_data_uri(value: &str) -> anyhow::Result<Option<(String, Vec<u8>)>> {
    let Some(rest) = value.strip_prefix("data:") else {
        return Ok(None);
    };
    let Some((header, data)) = rest.split_once(',') else {
        anyhow::bail!("malformed data URI: missing ',' separator");
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        anyhow::bail!("unsupported data URI encoding '{header}'");
    };
    let bytes = BASE64
        .decode(data.trim())
        .context("data URI payload is not valid base64")?;
    Ok(Some((mime.to_string(), bytes)))
}

fn extension_for_mime(mime: &str) -> &'static str {
    image::ImageFormat::from_mime_type(mime)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}
