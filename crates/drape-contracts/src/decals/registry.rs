use super::{DecalKind, FilterSlot, StateSlot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecalRoute {
    pub kind: DecalKind,
    pub state_slot: StateSlot,
    pub filter_slot: FilterSlot,
}

pub const DECAL_ROUTES: &[DecalRoute] = &[
    DecalRoute {
        kind: DecalKind::Logo,
        state_slot: StateSlot::LogoDecal,
        filter_slot: FilterSlot::LogoTextureEnabled,
    },
    DecalRoute {
        kind: DecalKind::Full,
        state_slot: StateSlot::FullDecal,
        filter_slot: FilterSlot::FullTextureEnabled,
    },
];

pub fn resolve(kind: DecalKind) -> DecalRoute {
    match kind {
        DecalKind::Logo => DECAL_ROUTES[0],
        DecalKind::Full => DECAL_ROUTES[1],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{resolve, DECAL_ROUTES};
    use crate::decals::{DecalKind, FilterSlot, StateSlot};

    #[test]
    fn logo_routes_to_logo_slot_and_filter() {
        let route = resolve(DecalKind::Logo);
        assert_eq!(route.kind, DecalKind::Logo);
        assert_eq!(route.state_slot, StateSlot::LogoDecal);
        assert_eq!(route.filter_slot, FilterSlot::LogoTextureEnabled);
    }

    #[test]
    fn full_routes_to_full_slot_and_filter() {
        let route = resolve(DecalKind::Full);
        assert_eq!(route.kind, DecalKind::Full);
        assert_eq!(route.state_slot, StateSlot::FullDecal);
        assert_eq!(route.filter_slot, FilterSlot::FullTextureEnabled);
    }

    #[test]
    fn route_table_has_one_entry_per_kind() {
        assert_eq!(DECAL_ROUTES.len(), DecalKind::ALL.len());
        let state_slots: HashSet<_> = DECAL_ROUTES.iter().map(|row| row.state_slot).collect();
        let filter_slots: HashSet<_> = DECAL_ROUTES.iter().map(|row| row.filter_slot).collect();
        assert_eq!(state_slots.len(), DECAL_ROUTES.len());
        assert_eq!(filter_slots.len(), DECAL_ROUTES.len());
        for kind in DecalKind::ALL {
            assert_eq!(resolve(kind).kind, kind);
        }
    }

    #[test]
    fn kind_parses_known_names_and_rejects_others() {
        assert_eq!("logo".parse::<DecalKind>(), Ok(DecalKind::Logo));
        assert_eq!(" Full ".parse::<DecalKind>(), Ok(DecalKind::Full));
        let err = "sleeve".parse::<DecalKind>().unwrap_err();
        assert_eq!(err.0, "sleeve");
        assert!(err.to_string().contains("unknown decal kind"));
    }
}
