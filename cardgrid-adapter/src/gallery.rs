use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use cardgrid::{
    AnimationScheduler, ContentLoader, EffectKind, EffectOutcome, Intersection, ItemId, ItemPool,
    ItemRecord, ItemStore, LayoutOptions, Mark, MarkChange, MaterializationState,
    Priority, ReconcileHooks, Registration, Resolution, Result, ScrollClass, SurfaceHost,
    VelocityClassifier, VisibilityTracker, Window, compute_window, content_height,
    items_per_row_for_width, row_offset,
};

use crate::{
    CardAction, GalleryHost, GalleryOptions, Introspection, ItemEvent, Metrics, ScrollTween,
};

/// Detaches observation and effects before a surface is released, and wires up fresh ones.
struct Hooks<'a, K> {
    tracker: &'a mut VisibilityTracker<K>,
    scheduler: &'a mut AnimationScheduler<K>,
    /// Inserted items waiting for their `New` effect. They never get an entrance.
    fresh: &'a [(K, u64)],
}

impl<K: ItemId, H: GalleryHost<K>> ReconcileHooks<K, H> for Hooks<'_, K> {
    fn retiring(&mut self, id: &K, host: &mut H) {
        self.tracker.unregister(id, host);
        self.scheduler.cancel(id, host);
    }

    fn materialized(&mut self, item: &mut ItemRecord<K>, host: &mut H) {
        let fresh = self.fresh.iter().any(|(pending, _)| *pending == item.id);
        let done = item.animated || fresh;
        if self.tracker.register(&item.id, done, item.loaded, host) == Registration::Observed {
            return;
        }
        item.animated = true;
        item.loaded = true;
        if let Err(_err) = host.apply(&item.id, MarkChange::Add(Mark::Done)) {
            vwarn!(id = ?item.id, error = %_err, "could not mark fallback surface done");
        }
        host.load(&item.id);
    }
}

/// Forwards lazy loads to the host and remembers which ids were loaded.
struct TrackLoads<'a, K, H: ?Sized> {
    host: &'a mut H,
    loaded: Vec<K>,
}

impl<K: Clone, H: ContentLoader<K> + ?Sized> ContentLoader<K> for TrackLoads<'_, K, H> {
    fn load(&mut self, id: &K) {
        self.host.load(id);
        self.loaded.push(id.clone());
    }
}

/// A framework-neutral controller that runs a card grid against one host.
///
/// This type does not hold any UI objects. Hosts drive it by calling:
/// - `on_scroll` / `on_resize` / `on_intersections` / `on_transition_end` when UI events occur
/// - `tick(now_ms)` once per display refresh
///
/// Scroll events only mark the window dirty; the next `tick` performs a single recompute. When
/// `tick` returns an offset (scroll-to-top after an insert), the host applies it to the real
/// scroll container without reporting it back through `on_scroll`.
pub struct Gallery<K: ItemId, H: GalleryHost<K>> {
    host: H,
    options: GalleryOptions,
    layout: LayoutOptions,
    store: ItemStore<K>,
    pool: ItemPool<K, <H as SurfaceHost<K>>::Surface>,
    tracker: VisibilityTracker<K>,
    scheduler: AnimationScheduler<K>,
    velocity: VelocityClassifier,
    scroll_offset: u64,
    viewport_height: u32,
    container_width: Option<u32>,
    /// Debounced width and the time it takes effect.
    pending_width: Option<(u32, u64)>,
    window: Window,
    recompute_pending: bool,
    tween: Option<ScrollTween>,
    pending_new: Vec<(K, u64)>,
    removing: Vec<K>,
    animating: Option<K>,
    total_renders: u64,
    last_render_duration_ms: f64,
}

impl<K: ItemId, H: GalleryHost<K>> Gallery<K, H> {
    pub fn new(
        host: H,
        options: GalleryOptions,
        records: impl IntoIterator<Item = ItemRecord<K>>,
    ) -> Result<Self> {
        options.validate()?;
        let store = ItemStore::new(records)?;
        vdebug!(count = store.len(), "Gallery::new");
        Ok(Self {
            host,
            layout: options.layout.clone(),
            store,
            pool: ItemPool::new(),
            tracker: VisibilityTracker::new(options.layout.visibility_margin_px),
            scheduler: AnimationScheduler::new(options.scheduler.clone()),
            velocity: VelocityClassifier::new(options.velocity),
            scroll_offset: 0,
            viewport_height: 0,
            container_width: None,
            pending_width: None,
            window: Window::EMPTY,
            recompute_pending: true,
            tween: None,
            pending_new: Vec::new(),
            removing: Vec::new(),
            animating: None,
            total_renders: 0,
            last_render_duration_ms: 0.0,
            options,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> &GalleryOptions {
        &self.options
    }

    /// The live layout. `items_per_row` follows the container width.
    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn store(&self) -> &ItemStore<K> {
        &self.store
    }

    pub fn scheduler(&self) -> &AnimationScheduler<K> {
        &self.scheduler
    }

    pub fn tracker(&self) -> &VisibilityTracker<K> {
        &self.tracker
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn is_materialized(&self, id: &K) -> bool {
        self.pool.contains(id)
    }

    pub fn surface(&self, id: &K) -> Option<&<H as SurfaceHost<K>>::Surface> {
        self.pool.surface(id)
    }

    pub fn is_scrolling_to_top(&self) -> bool {
        self.tween.is_some()
    }

    /// `true` while `id` plays its removal and still occupies its slot.
    pub fn is_removing(&self, id: &K) -> bool {
        self.removing.contains(id)
    }

    /// Call this when the UI reports a scroll offset change.
    ///
    /// This cancels any active scroll-to-top tween.
    pub fn on_scroll(&mut self, scroll_offset: u64, now_ms: u64) -> ScrollClass {
        if self.tween.take().is_some() {
            vtrace!(scroll_offset, "user scroll cancelled scroll-to-top");
        }
        self.scroll_offset = scroll_offset;
        self.recompute_pending = true;
        self.velocity.on_scroll(scroll_offset, now_ms)
    }

    /// Call this when the container or viewport size changes.
    ///
    /// The viewport height applies on the next tick. A width change is debounced before cards
    /// per row are recomputed, except for the very first layout.
    pub fn on_resize(&mut self, container_width: u32, viewport_height: u32, now_ms: u64) {
        if viewport_height != self.viewport_height {
            self.viewport_height = viewport_height;
            self.recompute_pending = true;
        }
        match self.container_width {
            None => self.apply_width(container_width),
            Some(current) if current == container_width => self.pending_width = None,
            Some(_) => {
                let due_ms = now_ms.saturating_add(self.options.resize_debounce_ms);
                self.pending_width = Some((container_width, due_ms));
            }
        }
    }

    fn apply_width(&mut self, width: u32) {
        self.container_width = Some(width);
        let per_row = items_per_row_for_width(width, self.layout.card_width, self.layout.card_gap);
        if per_row != self.layout.items_per_row {
            vdebug!(width, from = self.layout.items_per_row, to = per_row, "items per row");
            self.layout.items_per_row = per_row;
        }
        self.recompute_pending = true;
    }

    /// Feeds a batch of visibility transitions. Returns the number of entrances submitted.
    pub fn on_intersections(&mut self, events: &[Intersection<K>]) -> usize {
        let suppress = self.velocity.is_fast();
        let mut loader = TrackLoads {
            host: &mut self.host,
            loaded: Vec::new(),
        };
        let submitted = self
            .tracker
            .handle(events, &mut self.scheduler, &mut loader, suppress);

        for id in loader.loaded {
            if let Some(item) = self.store.get_mut(&id) {
                item.loaded = true;
            }
        }
        for event in events {
            if !self.pool.contains(&event.id) {
                continue;
            }
            if let Some(item) = self.store.get_mut(&event.id) {
                match (event.is_intersecting, item.state) {
                    (true, MaterializationState::Materialized) => {
                        item.state = MaterializationState::Visible;
                    }
                    (false, MaterializationState::Visible) => {
                        item.state = MaterializationState::Materialized;
                    }
                    _ => {}
                }
            }
        }
        submitted
    }

    pub fn on_transition_end(&mut self, id: &K) {
        self.scheduler.notify_transition_end(id);
    }

    /// Advances the gallery by one display refresh.
    ///
    /// - Steps the scroll-to-top tween and returns its offset while it is active.
    /// - Applies a due resize, then performs the pending window recompute, if any.
    /// - Re-submits entrances once fast scrolling settles and starts due `New` effects.
    /// - Ticks the animation scheduler.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        let tween_offset = self.step_tween(now_ms);

        if let Some((width, due_ms)) = self.pending_width {
            if now_ms >= due_ms {
                self.pending_width = None;
                self.apply_width(width);
            }
        }

        if self.recompute_pending {
            self.render();
        }

        if self.velocity.tick(now_ms) {
            self.resubmit_entrances();
        }
        self.submit_due_new(now_ms);

        if let Some(resolution) = self.scheduler.tick(now_ms, &mut self.host) {
            self.on_resolution(resolution);
        }
        self.sync_animating();

        tween_offset
    }

    fn step_tween(&mut self, now_ms: u64) -> Option<u64> {
        let tween = self.tween?;
        let offset = tween.sample(now_ms);
        self.scroll_offset = offset;
        self.recompute_pending = true;
        if tween.is_done(now_ms) {
            self.tween = None;
        }
        Some(offset)
    }

    fn render(&mut self) {
        #[cfg(feature = "std")]
        let started = std::time::Instant::now();

        // At rest the animation rows trail forward, whatever the last motion was.
        let direction = if self.velocity.is_scrolling() {
            self.velocity.direction()
        } else {
            None
        };
        let window = compute_window(
            &self.layout,
            self.scroll_offset,
            self.viewport_height,
            self.store.len(),
            direction,
        );
        let mut hooks = Hooks {
            tracker: &mut self.tracker,
            scheduler: &mut self.scheduler,
            fresh: &self.pending_new,
        };
        let _plan = self
            .pool
            .reconcile(window, &mut self.store, &mut self.host, &mut hooks);

        self.window = window;
        self.recompute_pending = false;
        self.total_renders = self.total_renders.saturating_add(1);

        #[cfg(feature = "std")]
        {
            self.last_render_duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        }

        vtrace!(
            start = window.start_index,
            end = window.end_index,
            created = _plan.to_create.len(),
            destroyed = _plan.to_destroy.len(),
            "render"
        );

        // A removal whose card left the window has nothing left to animate.
        let orphaned: Vec<K> = self
            .removing
            .iter()
            .filter(|id| !self.pool.contains(id))
            .cloned()
            .collect();
        for id in &orphaned {
            self.finish_removal(id);
        }
    }

    fn resubmit_entrances(&mut self) -> usize {
        let mut submitted = 0usize;
        for index in self.window.start_index..self.window.end_index {
            let Some(item) = self.store.at(index) else {
                continue;
            };
            if item.animated
                || !self.tracker.is_registered(&item.id)
                || self.tracker.is_done(&item.id)
                || self.removing.contains(&item.id)
            {
                continue;
            }
            if self
                .scheduler
                .add(item.id.clone(), EffectKind::Entrance, Priority::Low)
            {
                submitted += 1;
            }
        }
        if submitted > 0 {
            vdebug!(submitted, "scroll settled; entrances resubmitted");
        }
        submitted
    }

    fn submit_due_new(&mut self, now_ms: u64) {
        let mut index = 0;
        while index < self.pending_new.len() {
            if self.pending_new[index].1 > now_ms {
                index += 1;
                continue;
            }
            let (id, _) = self.pending_new.remove(index);
            if !self.pool.contains(&id) {
                continue;
            }
            self.scheduler.cancel(&id, &mut self.host);
            self.scheduler
                .add(id, EffectKind::New, EffectKind::New.default_priority());
        }
    }

    fn on_resolution(&mut self, resolution: Resolution<K>) {
        match (resolution.kind, resolution.outcome) {
            (EffectKind::Entrance | EffectKind::New, EffectOutcome::Completed) => {
                if let Some(item) = self.store.get_mut(&resolution.id) {
                    item.animated = true;
                }
                self.tracker.mark_done(&resolution.id);
            }
            (EffectKind::Remove, _) if self.removing.contains(&resolution.id) => {
                self.finish_removal(&resolution.id);
            }
            _ => {}
        }
    }

    fn sync_animating(&mut self) {
        let executing = self.scheduler.executing().cloned();
        if self.animating == executing {
            return;
        }
        if let Some(previous) = self.animating.take() {
            let visible = self.tracker.is_visible(&previous);
            if let Some(item) = self.store.get_mut(&previous) {
                if item.state == MaterializationState::Animating {
                    item.state = if visible {
                        MaterializationState::Visible
                    } else {
                        MaterializationState::Materialized
                    };
                }
            }
        }
        if let Some(id) = &executing {
            if let Some(item) = self.store.get_mut(id) {
                if matches!(
                    item.state,
                    MaterializationState::Materialized | MaterializationState::Visible
                ) {
                    item.state = MaterializationState::Animating;
                }
            }
        }
        self.animating = executing;
    }

    fn finish_removal(&mut self, id: &K) {
        self.removing.retain(|removing| removing != id);
        let mut hooks = Hooks {
            tracker: &mut self.tracker,
            scheduler: &mut self.scheduler,
            fresh: &self.pending_new,
        };
        self.pool
            .retire(id, &mut self.store, &mut self.host, &mut hooks);
        if self.store.remove(id).is_some() {
            vdebug!(id = ?id, total = self.store.len(), "item removed");
        }
        self.recompute_pending = true;
    }

    /// Inserts `record` at the head of the list.
    ///
    /// Scrolls back to the top and plays the `New` effect on the card once it has had time to
    /// materialize.
    pub fn insert_item(&mut self, record: ItemRecord<K>, now_ms: u64) -> Result<()> {
        let id = record.id.clone();
        self.store.insert_front(record)?;
        self.pending_new.push((
            id.clone(),
            now_ms.saturating_add(self.options.new_effect_delay_ms),
        ));
        if self.scroll_offset > 0 {
            self.tween = Some(ScrollTween::new(
                self.scroll_offset,
                0,
                now_ms,
                self.options.scroll_to_top_ms,
                self.options.scroll_to_top_easing,
            ));
        }
        self.recompute_pending = true;
        vdebug!(id = ?id, total = self.store.len(), "item inserted");
        Ok(())
    }

    /// Removes `id` from the list.
    ///
    /// A materialized card plays its removal first and leaves the list when it resolves; any
    /// other card leaves immediately. Returns `false` if `id` is unknown.
    pub fn remove_item(&mut self, id: &K) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        if self.removing.contains(id) {
            return true;
        }
        self.pending_new.retain(|(pending, _)| pending != id);

        if !self.pool.contains(id) {
            self.store.remove(id);
            self.recompute_pending = true;
            vdebug!(id = ?id, total = self.store.len(), "item removed");
            return true;
        }

        self.scheduler.cancel(id, &mut self.host);
        self.removing.push(id.clone());
        if let Some(item) = self.store.get_mut(id) {
            item.state = MaterializationState::Retiring;
        }
        if !self
            .scheduler
            .add(id.clone(), EffectKind::Remove, EffectKind::Remove.default_priority())
        {
            self.finish_removal(id);
        }
        true
    }

    /// Applies an externally computed order (e.g. after a drag) and returns the positions to
    /// persist.
    pub fn reorder(&mut self, order: &[K]) -> Result<Vec<(K, usize)>> {
        self.store.reorder(order)?;
        self.recompute_pending = true;
        vdebug!(count = order.len(), "reordered");
        Ok(self.store.order_positions())
    }

    /// Replaces the content of `id` and pulses its card if it is materialized.
    pub fn update_item(
        &mut self,
        id: &K,
        content: impl Into<String>,
        title: Option<String>,
        description: Option<String>,
    ) -> bool {
        let Some(item) = self.store.get_mut(id) else {
            return false;
        };
        item.content = content.into();
        item.title = title;
        item.description = description;
        self.animate_update(id);
        true
    }

    /// Pulses a materialized card. Returns `false` if nothing was submitted.
    pub fn animate_update(&mut self, id: &K) -> bool {
        if !self.pool.contains(id) || self.removing.contains(id) {
            return false;
        }
        self.scheduler.add(
            id.clone(),
            EffectKind::Update,
            EffectKind::Update.default_priority(),
        )
    }

    /// Routes a card activation to the host as a structural event.
    ///
    /// Returns `true` if an event was emitted.
    pub fn activate(&mut self, id: &K, action: CardAction) -> bool {
        let Some(kind) = action.event_kind() else {
            return false;
        };
        let Some(item) = self.store.get(id) else {
            return false;
        };
        if action == CardAction::SeeMore && !item.has_more_description() {
            return false;
        }
        let event = ItemEvent {
            kind,
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
        };
        vtrace!(id = ?event.id, kind = ?event.kind, "emit");
        self.host.emit(event);
        true
    }

    pub fn add_animation(&mut self, id: K, kind: EffectKind, priority: Priority) -> bool {
        self.scheduler.add(id, kind, priority)
    }

    pub fn add_animation_with_completion(
        &mut self,
        id: K,
        kind: EffectKind,
        priority: Priority,
        completion: impl FnOnce(&K, EffectOutcome) + 'static,
    ) -> bool {
        self.scheduler
            .add_with_completion(id, kind, priority, completion)
    }

    /// Cancels every request for `id`. A pending removal completes right away.
    pub fn cancel_animation(&mut self, id: &K) -> usize {
        let cancelled = self.scheduler.cancel(id, &mut self.host);
        if self.removing.contains(id) {
            self.finish_removal(id);
        }
        cancelled
    }

    /// Drops every queued and running effect. Pending removals complete right away.
    pub fn clear_animations(&mut self) {
        self.scheduler.clear();
        for id in mem::take(&mut self.removing) {
            self.finish_removal(&id);
        }
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            total_items: self.store.len(),
            materialized_count: self.pool.len(),
            visible_range: self.window,
            last_render_duration_ms: self.last_render_duration_ms,
            queue_length: self.scheduler.queue_len(),
            total_renders: self.total_renders,
            is_scrolling: self.velocity.is_scrolling(),
            items_per_row: self.layout.items_per_row,
        }
    }

    pub fn introspect(&self) -> Introspection<K> {
        Introspection {
            queue_length: self.scheduler.queue_len(),
            executing: self.scheduler.executing().cloned(),
            executing_kind: self.scheduler.executing_kind(),
            scroll_class: self.velocity.class(),
            processing: self.scheduler.is_processing(),
        }
    }

    /// Height of the scrollable content (the host's spacer).
    pub fn content_height(&self) -> u64 {
        content_height(&self.layout, self.store.len())
    }

    /// Offset of the first rendered row.
    pub fn row_offset(&self) -> u64 {
        row_offset(&self.layout, self.window)
    }

    /// Stops every effect and releases every surface. Pending removals leave the list.
    ///
    /// The gallery can be driven again afterwards; the next tick re-renders from scratch.
    pub fn teardown(&mut self) {
        self.scheduler.clear();
        let mut hooks = Hooks {
            tracker: &mut self.tracker,
            scheduler: &mut self.scheduler,
            fresh: &self.pending_new,
        };
        self.pool
            .release_all(&mut self.store, &mut self.host, &mut hooks);
        for id in mem::take(&mut self.removing) {
            self.store.remove(&id);
        }
        self.tween = None;
        self.pending_new.clear();
        self.pending_width = None;
        self.animating = None;
        self.window = Window::EMPTY;
        self.recompute_pending = true;
        vdebug!(total = self.store.len(), "teardown");
    }

    pub fn into_host(mut self) -> H {
        self.teardown();
        self.host
    }
}

impl<K: ItemId, H: GalleryHost<K>> fmt::Debug for Gallery<K, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gallery")
            .field("items", &self.store.len())
            .field("materialized", &self.pool.len())
            .field("window", &self.window)
            .field("scroll_offset", &self.scroll_offset)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
