use crate::key::{IdMap, ItemId};
use crate::{AnimationScheduler, EffectKind, Priority, Result};

/// Host primitive that reports viewport intersection for registered surfaces.
pub trait VisibilityObserver<K> {
    /// Starts observing `id`, reporting intersection `margin_px` early on every edge.
    fn observe(&mut self, id: &K, margin_px: u32) -> Result<()>;

    fn unobserve(&mut self, id: &K);
}

/// Side effect that fetches deferred content (thumbnails and similar) for an item.
pub trait ContentLoader<K> {
    fn load(&mut self, id: &K);
}

/// One transition reported by the observer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intersection<K> {
    pub id: K,
    pub is_intersecting: bool,
}

impl<K> Intersection<K> {
    pub fn entered(id: K) -> Self {
        Self {
            id,
            is_intersecting: true,
        }
    }

    pub fn left(id: K) -> Self {
        Self {
            id,
            is_intersecting: false,
        }
    }
}

/// Result of [`VisibilityTracker::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Observed,
    /// The observer refused the surface. The caller shows it without animation and loads its
    /// content right away.
    Fallback,
}

#[derive(Clone, Copy, Debug, Default)]
struct Tracked {
    visible: bool,
    done: bool,
    loaded: bool,
}

/// Turns intersection transitions into entrance requests and lazy loads.
#[derive(Debug)]
pub struct VisibilityTracker<K> {
    entries: IdMap<K, Tracked>,
    margin_px: u32,
    fallbacks: u64,
}

impl<K: ItemId> VisibilityTracker<K> {
    pub fn new(margin_px: u32) -> Self {
        Self {
            entries: IdMap::default(),
            margin_px,
            fallbacks: 0,
        }
    }

    pub fn margin_px(&self) -> u32 {
        self.margin_px
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_registered(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_visible(&self, id: &K) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.visible)
    }

    /// Registrations that fell back to unobserved display.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Starts tracking a freshly materialized item.
    ///
    /// `done` and `loaded` seed the state from the item record so a re-materialized card never
    /// replays its entrance or reloads its content.
    pub fn register<O: VisibilityObserver<K> + ?Sized>(
        &mut self,
        id: &K,
        done: bool,
        loaded: bool,
        observer: &mut O,
    ) -> Registration {
        match observer.observe(id, self.margin_px) {
            Ok(()) => {
                self.entries.insert(
                    id.clone(),
                    Tracked {
                        visible: false,
                        done,
                        loaded,
                    },
                );
                Registration::Observed
            }
            Err(_err) => {
                vwarn!(id = ?id, error = %_err, "observation unavailable; showing without animation");
                self.fallbacks = self.fallbacks.saturating_add(1);
                Registration::Fallback
            }
        }
    }

    /// Stops tracking `id`. Safe to call for ids that were never registered.
    pub fn unregister<O: VisibilityObserver<K> + ?Sized>(&mut self, id: &K, observer: &mut O) {
        if self.entries.remove(id).is_some() {
            observer.unobserve(id);
        }
    }

    /// Records that `id` finished its presentation effect.
    pub fn mark_done(&mut self, id: &K) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.done = true;
        }
    }

    pub fn is_done(&self, id: &K) -> bool {
        self.entries.get(id).is_some_and(|entry| entry.done)
    }

    /// Applies a batch of observer transitions.
    ///
    /// Returns the number of entrance requests submitted.
    pub fn handle<L: ContentLoader<K> + ?Sized>(
        &mut self,
        events: &[Intersection<K>],
        scheduler: &mut AnimationScheduler<K>,
        loader: &mut L,
        suppress_entrance: bool,
    ) -> usize {
        let mut submitted = 0usize;
        for event in events {
            let Some(entry) = self.entries.get_mut(&event.id) else {
                vtrace!(id = ?event.id, "intersection for unregistered id ignored");
                continue;
            };

            let entered = event.is_intersecting && !entry.visible;
            entry.visible = event.is_intersecting;
            if !entered {
                continue;
            }

            if !entry.loaded {
                entry.loaded = true;
                loader.load(&event.id);
            }

            if entry.done || suppress_entrance || scheduler.is_tracked(&event.id) {
                continue;
            }
            if scheduler.add(event.id.clone(), EffectKind::Entrance, Priority::Low) {
                submitted += 1;
            }
        }
        if submitted > 0 {
            vtrace!(submitted, "entrance requests submitted");
        }
        submitted
    }
}
