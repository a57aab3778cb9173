use alloc::vec::Vec;

use crate::key::{IdMap, IdSet, ItemId};
use crate::{ItemRecord, ItemStore, MaterializationState, Result, Window};

/// Allocates and frees visual surfaces on behalf of the pool.
pub trait SurfaceHost<K> {
    /// Handle to a materialized surface. The pool owns it until it is passed back to
    /// [`SurfaceHost::release_surface`].
    type Surface;

    fn create_surface(&mut self, item: &ItemRecord<K>) -> Result<Self::Surface>;

    fn release_surface(&mut self, id: &K, surface: Self::Surface);
}

/// Hooks invoked by [`ItemPool::reconcile`] around surface lifetime changes.
///
/// `retiring` runs before a surface is released, so anything that could still call back into the
/// surface (visibility observation, running effects) must be detached there.
pub trait ReconcileHooks<K, H: ?Sized> {
    fn retiring(&mut self, _id: &K, _host: &mut H) {}

    fn materialized(&mut self, _item: &mut ItemRecord<K>, _host: &mut H) {}
}

impl<K, H: ?Sized> ReconcileHooks<K, H> for () {}

/// Instructions produced by diffing the materialized set against a window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan<K> {
    pub to_create: Vec<K>,
    pub to_reuse: Vec<K>,
    pub to_destroy: Vec<K>,
}

impl<K> ReconcilePlan<K> {
    /// `true` when the pass changes nothing structurally.
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_destroy.is_empty()
    }
}

#[derive(Debug)]
struct PoolEntry<S> {
    surface: S,
    index: usize,
}

/// Owns the surfaces of every materialized item, keyed by item id.
#[derive(Debug)]
pub struct ItemPool<K, S> {
    entries: IdMap<K, PoolEntry<S>>,
    materialized_total: u64,
    released_total: u64,
}

impl<K: ItemId, S> Default for ItemPool<K, S> {
    fn default() -> Self {
        Self {
            entries: IdMap::default(),
            materialized_total: 0,
            released_total: 0,
        }
    }
}

impl<K: ItemId, S> ItemPool<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    pub fn surface(&self, id: &K) -> Option<&S> {
        self.entries.get(id).map(|entry| &entry.surface)
    }

    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Lifetime counters: surfaces created, surfaces released.
    pub fn totals(&self) -> (u64, u64) {
        (self.materialized_total, self.released_total)
    }

    /// Diffs the materialized set against `window` without touching anything.
    ///
    /// `to_create` and `to_reuse` follow window order; `to_destroy` follows the last known index
    /// of each retiring entry.
    pub fn plan(&self, window: Window, store: &ItemStore<K>) -> ReconcilePlan<K> {
        let window = window.clip(store.len());
        let mut wanted = IdSet::default();
        let mut plan = ReconcilePlan {
            to_create: Vec::new(),
            to_reuse: Vec::new(),
            to_destroy: Vec::new(),
        };

        for index in window.start_index..window.end_index {
            let Some(item) = store.at(index) else {
                continue;
            };
            wanted.insert(item.id.clone());
            if self.entries.contains_key(&item.id) {
                plan.to_reuse.push(item.id.clone());
            } else {
                plan.to_create.push(item.id.clone());
            }
        }

        let mut retiring: Vec<(usize, &K)> = self
            .entries
            .iter()
            .filter(|(id, _)| !wanted.contains(*id))
            .map(|(id, entry)| (entry.index, id))
            .collect();
        retiring.sort_by_key(|(index, _)| *index);
        plan.to_destroy = retiring.into_iter().map(|(_, id)| id.clone()).collect();

        plan
    }

    /// Brings the materialized set in line with `window`.
    ///
    /// Destroys run first, each one calling `hooks.retiring` before the surface is released.
    /// Creates follow, each one calling `hooks.materialized` once the surface exists. A surface
    /// that fails to materialize leaves its item unmaterialized; the next pass retries it.
    pub fn reconcile<H, R>(
        &mut self,
        window: Window,
        store: &mut ItemStore<K>,
        host: &mut H,
        hooks: &mut R,
    ) -> ReconcilePlan<K>
    where
        H: SurfaceHost<K, Surface = S> + ?Sized,
        R: ReconcileHooks<K, H> + ?Sized,
    {
        let mut plan = self.plan(window, store);

        for id in &plan.to_destroy {
            self.destroy(id, store, host, hooks);
        }

        for id in &plan.to_reuse {
            if let (Some(entry), Some(index)) = (self.entries.get_mut(id), store.index_of(id)) {
                entry.index = index;
            }
        }

        let mut created = Vec::with_capacity(plan.to_create.len());
        for id in plan.to_create.drain(..) {
            let Some(item) = store.get_mut(&id) else {
                continue;
            };
            item.state = MaterializationState::Materializing;
            match host.create_surface(item) {
                Ok(surface) => {
                    item.state = MaterializationState::Materialized;
                    self.entries.insert(
                        id.clone(),
                        PoolEntry {
                            surface,
                            index: item.index,
                        },
                    );
                    self.materialized_total = self.materialized_total.saturating_add(1);
                    hooks.materialized(item, host);
                    created.push(id);
                }
                Err(_err) => {
                    vwarn!(id = ?id, error = %_err, "surface creation failed");
                    item.state = MaterializationState::Unmaterialized;
                }
            }
        }
        plan.to_create = created;

        vtrace!(
            start = window.start_index,
            end = window.end_index,
            created = plan.to_create.len(),
            reused = plan.to_reuse.len(),
            destroyed = plan.to_destroy.len(),
            "reconcile"
        );
        plan
    }

    /// Destroys every materialized surface through the normal retire path.
    pub fn release_all<H, R>(&mut self, store: &mut ItemStore<K>, host: &mut H, hooks: &mut R)
    where
        H: SurfaceHost<K, Surface = S> + ?Sized,
        R: ReconcileHooks<K, H> + ?Sized,
    {
        let ids: Vec<K> = self.entries.keys().cloned().collect();
        for id in &ids {
            self.destroy(id, store, host, hooks);
        }
    }

    /// Destroys a single surface when its item leaves the data set.
    ///
    /// Returns `false` if `id` was not materialized.
    pub fn retire<H, R>(
        &mut self,
        id: &K,
        store: &mut ItemStore<K>,
        host: &mut H,
        hooks: &mut R,
    ) -> bool
    where
        H: SurfaceHost<K, Surface = S> + ?Sized,
        R: ReconcileHooks<K, H> + ?Sized,
    {
        if !self.entries.contains_key(id) {
            return false;
        }
        self.destroy(id, store, host, hooks);
        true
    }

    fn destroy<H, R>(&mut self, id: &K, store: &mut ItemStore<K>, host: &mut H, hooks: &mut R)
    where
        H: SurfaceHost<K, Surface = S> + ?Sized,
        R: ReconcileHooks<K, H> + ?Sized,
    {
        hooks.retiring(id, host);
        if let Some(entry) = self.entries.remove(id) {
            host.release_surface(id, entry.surface);
            self.released_total = self.released_total.saturating_add(1);
        }
        if let Some(item) = store.get_mut(id) {
            item.state = MaterializationState::Unmaterialized;
        }
    }
}
