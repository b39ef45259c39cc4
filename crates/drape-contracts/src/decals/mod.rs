mod registry;

pub use registry::{resolve, DecalRoute, DECAL_ROUTES};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Region of the garment a decal is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecalKind {
    Logo,
    Full,
}

impl DecalKind {
    pub const ALL: [DecalKind; 2] = [DecalKind::Logo, DecalKind::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            DecalKind::Logo => "logo",
            DecalKind::Full => "full",
        }
    }
}

impl fmt::Display for DecalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown decal kind '{0}' (expected 'logo' or 'full')")]
pub struct UnknownDecalKind(pub String);

impl FromStr for DecalKind {
    type Err = UnknownDecalKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "logo" => Ok(DecalKind::Logo),
            "full" => Ok(DecalKind::Full),
            _ => Err(UnknownDecalKind(raw.to_string())),
        }
    }
}

/// Decal slot in the customization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateSlot {
    LogoDecal,
    FullDecal,
}

impl StateSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            StateSlot::LogoDecal => "logoDecal",
            StateSlot::FullDecal => "fullDecal",
        }
    }
}

/// Texture-enable flag in the customization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterSlot {
    LogoTextureEnabled,
    FullTextureEnabled,
}

impl FilterSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterSlot::LogoTextureEnabled => "logoTextureEnabled",
            FilterSlot::FullTextureEnabled => "fullTextureEnabled",
        }
    }
}

/// A freshly acquired decal waiting to be routed into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecalAssignment {
    pub kind: DecalKind,
    pub payload: String,
}

impl DecalAssignment {
    pub fn new(kind: DecalKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}
