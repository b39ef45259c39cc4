use crate::decals::{self, DecalAssignment, DecalKind, FilterSlot};
use crate::state::{CustomizationStore, TextureFilters};

/// Named filter tabs shown next to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTab {
    LogoShirt,
    StylishShirt,
}

impl FilterTab {
    pub const ALL: [FilterTab; 2] = [FilterTab::LogoShirt, FilterTab::StylishShirt];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "logoShirt" => Some(FilterTab::LogoShirt),
            "stylishShirt" => Some(FilterTab::StylishShirt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterTab::LogoShirt => "logoShirt",
            FilterTab::StylishShirt => "stylishShirt",
        }
    }

    pub fn slot(self) -> FilterSlot {
        match self {
            FilterTab::LogoShirt => FilterSlot::LogoTextureEnabled,
            FilterTab::StylishShirt => FilterSlot::FullTextureEnabled,
        }
    }
}

/// State after the reset transition triggered by an unrecognized tab name.
pub const RESET_FILTERS: TextureFilters = TextureFilters {
    logo: true,
    full: false,
};

/// Drives the texture flags from decal assignments and tab clicks.
#[derive(Clone)]
pub struct FilterActivationController {
    store: CustomizationStore,
}

impl FilterActivationController {
    pub fn new(store: CustomizationStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CustomizationStore {
        &self.store
    }

    /// Writes the decal, then turns its texture on if it was off.
    pub fn assign_decal(&self, kind: DecalKind, payload: impl Into<String>) {
        let route = decals::resolve(kind);
        self.store.set_decal(route.state_slot, payload);
        self.store.update_filters(|mut filters| {
            filters.set(route.filter_slot, true);
            filters
        });
    }

    pub fn assign(&self, assignment: DecalAssignment) {
        self.assign_decal(assignment.kind, assignment.payload);
    }

    /// Flips the named tab's flag. Unknown names reset to logo-only.
    pub fn toggle_filter_by_name(&self, tab_name: &str) -> TextureFilters {
        let tab = FilterTab::from_name(tab_name);
        self.store.update_filters(|mut filters| match tab {
            Some(tab) => {
                let slot = tab.slot();
                filters.set(slot, !filters.get(slot));
                filters
            }
            None => RESET_FILTERS,
        })
    }
}
