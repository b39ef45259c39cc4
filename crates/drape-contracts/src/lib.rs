pub mod color;
pub mod decals;
pub mod events;
pub mod filters;
pub mod state;

pub use color::{HexColor, InvalidColor};
pub use decals::{DecalAssignment, DecalKind, DecalRoute, FilterSlot, StateSlot, UnknownDecalKind};
pub use filters::{FilterActivationController, FilterTab};
pub use state::{CustomizationState, CustomizationStore, Mutation, SubscriptionId, TextureFilters};
