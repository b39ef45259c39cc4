use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use super::{CustomizationState, Mutation, TextureFilters};
use crate::color::HexColor;
use crate::decals::{FilterSlot, StateSlot};

pub type Observer = Arc<dyn Fn(&CustomizationState, &Mutation) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Shared, observable customization state.
///
/// Clones share the same state. Writes that change a field notify every
/// observer synchronously on the writing thread, in registration order, with
/// a snapshot taken right after that write. Writes that leave a field
/// unchanged are silent. Observers run without any store lock held, so they
/// may read or write the store themselves.
///
/// Notifications follow write order only for a single writer. Writers on
/// different threads deliver their notifications independently, so an
/// observer can see a later write before an earlier one; each snapshot still
/// matches the write it reports. Read [`CustomizationStore::snapshot`] for the
/// current value.
#[derive(Clone, Default)]
pub struct CustomizationStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    state: Mutex<CustomizationState>,
    observers: Mutex<IndexMap<SubscriptionId, Observer>>,
    next_id: AtomicU64,
}

impl CustomizationStore {
    pub fn new(initial: CustomizationState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(initial),
                observers: Mutex::new(IndexMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> CustomizationState {
        self.lock_state().clone()
    }

    pub fn set_color(&self, color: HexColor) {
        self.mutate(|state| {
            if state.base_color == color {
                return Vec::new();
            }
            state.base_color = color;
            vec![Mutation::ColorChanged(color)]
        });
    }

    pub fn set_decal(&self, slot: StateSlot, payload: impl Into<String>) {
        let payload = payload.into();
        self.mutate(|state| {
            let current = state.decal_mut(slot);
            if *current == payload {
                return Vec::new();
            }
            *current = payload;
            vec![Mutation::DecalChanged(slot)]
        });
    }

    pub fn set_filter(&self, slot: FilterSlot, enabled: bool) {
        self.mutate(|state| {
            let current = state.filter_mut(slot);
            if *current == enabled {
                return Vec::new();
            }
            *current = enabled;
            vec![Mutation::FilterChanged { slot, enabled }]
        });
    }

    /// Reads both texture flags and writes the next pair under one lock.
    pub fn update_filters<F>(&self, transition: F) -> TextureFilters
    where
        F: FnOnce(TextureFilters) -> TextureFilters,
    {
        let mut next = TextureFilters {
            logo: false,
            full: false,
        };
        self.mutate(|state| {
            let current = state.filters();
            next = transition(current);
            let mut changed = Vec::new();
            for slot in [FilterSlot::LogoTextureEnabled, FilterSlot::FullTextureEnabled] {
                let enabled = next.get(slot);
                if current.get(slot) != enabled {
                    *state.filter_mut(slot) = enabled;
                    changed.push(Mutation::FilterChanged { slot, enabled });
                }
            }
            changed
        });
        next
    }

    pub fn toggle_intro(&self) -> bool {
        let mut intro = false;
        self.mutate(|state| {
            state.intro_mode = !state.intro_mode;
            intro = state.intro_mode;
            vec![Mutation::IntroChanged(intro)]
        });
        intro
    }

    pub fn set_intro(&self, intro: bool) {
        self.mutate(|state| {
            if state.intro_mode == intro {
                return Vec::new();
            }
            state.intro_mode = intro;
            vec![Mutation::IntroChanged(intro)]
        });
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&CustomizationState, &Mutation) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_observers().insert(id, Arc::new(observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock_observers().shift_remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.lock_observers().len()
    }

    fn mutate<F>(&self, write: F)
    where
        F: FnOnce(&mut CustomizationState) -> Vec<Mutation>,
    {
        let (snapshot, mutations) = {
            let mut state = self.lock_state();
            let mutations = write(&mut state);
            if mutations.is_empty() {
                return;
            }
            (state.clone(), mutations)
        };
        let observers: Vec<Observer> = self.lock_observers().values().cloned().collect();
        for mutation in &mutations {
            for observer in &observers {
                observer(&snapshot, mutation);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CustomizationState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> MutexGuard<'_, IndexMap<SubscriptionId, Observer>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
