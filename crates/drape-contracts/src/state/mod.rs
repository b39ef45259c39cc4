mod store;

pub use store::{CustomizationStore, Observer, SubscriptionId};

use serde::{Deserialize, Serialize};

use crate::color::HexColor;
use crate::decals::{FilterSlot, StateSlot};

/// Asset shown in both decal slots until something else is assigned.
pub const DEFAULT_DECAL: &str = "./threejs.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationState {
    pub intro_mode: bool,
    pub base_color: HexColor,
    pub logo_texture_enabled: bool,
    pub full_texture_enabled: bool,
    pub logo_decal: String,
    pub full_decal: String,
}

impl Default for CustomizationState {
    fn default() -> Self {
        Self {
            intro_mode: true,
            base_color: HexColor::default(),
            logo_texture_enabled: true,
            full_texture_enabled: false,
            logo_decal: DEFAULT_DECAL.to_string(),
            full_decal: DEFAULT_DECAL.to_string(),
        }
    }
}

impl CustomizationState {
    pub fn decal(&self, slot: StateSlot) -> &str {
        match slot {
            StateSlot::LogoDecal => &self.logo_decal,
            StateSlot::FullDecal => &self.full_decal,
        }
    }

    pub fn filters(&self) -> TextureFilters {
        TextureFilters {
            logo: self.logo_texture_enabled,
            full: self.full_texture_enabled,
        }
    }

    pub fn filter(&self, slot: FilterSlot) -> bool {
        self.filters().get(slot)
    }

    fn decal_mut(&mut self, slot: StateSlot) -> &mut String {
        match slot {
            StateSlot::LogoDecal => &mut self.logo_decal,
            StateSlot::FullDecal => &mut self.full_decal,
        }
    }

    fn filter_mut(&mut self, slot: FilterSlot) -> &mut bool {
        match slot {
            FilterSlot::LogoTextureEnabled => &mut self.logo_texture_enabled,
            FilterSlot::FullTextureEnabled => &mut self.full_texture_enabled,
        }
    }
}

/// The `(logo, full)` texture flag pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureFilters {
    pub logo: bool,
    pub full: bool,
}

impl TextureFilters {
    pub fn get(self, slot: FilterSlot) -> bool {
        match slot {
            FilterSlot::LogoTextureEnabled => self.logo,
            FilterSlot::FullTextureEnabled => self.full,
        }
    }

    pub fn set(&mut self, slot: FilterSlot, enabled: bool) {
        match slot {
            FilterSlot::LogoTextureEnabled => self.logo = enabled,
            FilterSlot::FullTextureEnabled => self.full = enabled,
        }
    }
}

/// What a store write changed. Observers receive one per changed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ColorChanged(HexColor),
    DecalChanged(StateSlot),
    FilterChanged { slot: FilterSlot, enabled: bool },
    IntroChanged(bool),
}

impl Mutation {
    pub fn event_type(&self) -> &'static str {
        match self {
            Mutation::ColorChanged(_) => "color_changed",
            Mutation::DecalChanged(_) => "decal_changed",
            Mutation::FilterChanged { .. } => "filter_changed",
            Mutation::IntroChanged(_) => "intro_toggled",
        }
    }
}
