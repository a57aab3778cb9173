use crate::*;

use alloc::string::ToString;
use alloc::vec::Vec;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum HostEvent {
    Created(u32),
    Released(u32),
    Retiring(u32),
    Materialized(u32),
}

/// Records every host call and checks that no id ever has two live surfaces.
#[derive(Debug, Default)]
struct RecordingHost {
    live: HashSet<u32>,
    detached: HashSet<u32>,
    fail_create: HashSet<u32>,
    fail_apply: HashSet<u32>,
    observe_fails: bool,
    observed: HashSet<u32>,
    observe_margin: Option<u32>,
    marks: Vec<(u32, MarkChange)>,
    loads: Vec<u32>,
    log: Vec<HostEvent>,
    max_live: usize,
}

impl RecordingHost {
    /// A host with every id in `ids` attached, for scheduler-only tests.
    fn attached(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut host = Self::default();
        host.live.extend(ids);
        host
    }

    fn marks_for(&self, id: u32) -> Vec<MarkChange> {
        self.marks
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, change)| *change)
            .collect()
    }
}

impl SurfaceHost<u32> for RecordingHost {
    type Surface = u32;

    fn create_surface(&mut self, item: &ItemRecord<u32>) -> Result<u32> {
        if self.fail_create.contains(&item.id) {
            return Err(Error::SurfaceUnavailable(item.id.to_string()));
        }
        assert!(self.live.insert(item.id), "two live surfaces for {}", item.id);
        self.max_live = self.max_live.max(self.live.len());
        self.log.push(HostEvent::Created(item.id));
        Ok(item.id)
    }

    fn release_surface(&mut self, id: &u32, surface: u32) {
        assert_eq!(*id, surface);
        assert!(self.live.remove(id), "release of a surface that is not live");
        self.log.push(HostEvent::Released(*id));
    }
}

impl MarkHost<u32> for RecordingHost {
    fn is_attached(&self, id: &u32) -> bool {
        self.live.contains(id) && !self.detached.contains(id)
    }

    fn apply(&mut self, id: &u32, change: MarkChange) -> Result<()> {
        if self.fail_apply.contains(id) {
            return Err(Error::Host("style write failed".to_string()));
        }
        self.marks.push((*id, change));
        Ok(())
    }
}

impl VisibilityObserver<u32> for RecordingHost {
    fn observe(&mut self, id: &u32, margin_px: u32) -> Result<()> {
        if self.observe_fails {
            return Err(Error::ObserverUnavailable("no observer".to_string()));
        }
        self.observe_margin = Some(margin_px);
        self.observed.insert(*id);
        Ok(())
    }

    fn unobserve(&mut self, id: &u32) {
        self.observed.remove(id);
    }
}

impl ContentLoader<u32> for RecordingHost {
    fn load(&mut self, id: &u32) {
        self.loads.push(*id);
    }
}

struct LoggingHooks;

impl ReconcileHooks<u32, RecordingHost> for LoggingHooks {
    fn retiring(&mut self, id: &u32, host: &mut RecordingHost) {
        host.log.push(HostEvent::Retiring(*id));
    }

    fn materialized(&mut self, item: &mut ItemRecord<u32>, host: &mut RecordingHost) {
        host.log.push(HostEvent::Materialized(item.id));
    }
}

fn store_of(count: u32) -> ItemStore<u32> {
    ItemStore::new((0..count).map(|id| ItemRecord::new(id, "card"))).unwrap()
}

fn grid_layout() -> LayoutOptions {
    LayoutOptions::default()
        .with_item_height(420)
        .with_items_per_row(5)
        .with_buffer_rows(5)
        .with_animation_buffer_rows(2)
}

/// Ticks every `step` ms until the scheduler is idle and empty.
fn drain(
    scheduler: &mut AnimationScheduler<u32>,
    host: &mut RecordingHost,
    mut now: u64,
    step: u64,
) -> (Vec<Resolution<u32>>, u64) {
    let mut out = Vec::new();
    for _ in 0..100_000 {
        if let Some(resolution) = scheduler.tick(now, host) {
            out.push(resolution);
        }
        if !scheduler.is_processing() && scheduler.queue_len() == 0 {
            break;
        }
        now += step;
    }
    (out, now)
}

fn ids_of(resolutions: &[Resolution<u32>]) -> Vec<u32> {
    resolutions.iter().map(|r| r.id).collect()
}

#[test]
fn window_matches_row_formula() {
    let layout = grid_layout();
    // row 10, two visible rows, five buffer rows each side, two animation rows trailing.
    let w = compute_window(&layout, 4200, 800, 1000, None);
    assert_eq!(w, Window::new(25, 95));

    let w = compute_window(&layout, 4200, 800, 1000, Some(ScrollDirection::Forward));
    assert_eq!(w, Window::new(25, 95));

    // Scrolling backward moves the animation rows to the leading edge.
    let w = compute_window(&layout, 4200, 800, 1000, Some(ScrollDirection::Backward));
    assert_eq!(w, Window::new(15, 85));
}

#[test]
fn window_clips_to_item_count() {
    let layout = grid_layout();
    assert_eq!(compute_window(&layout, 0, 800, 0, None), Window::EMPTY);

    let w = compute_window(&layout, 0, 800, 12, None);
    assert_eq!(w, Window::new(0, 12));

    // Far past the end: the window collapses onto the tail.
    let w = compute_window(&layout, 10_000_000, 800, 1000, None);
    assert!(w.end_index <= 1000);
    assert!(w.start_index <= w.end_index);
}

#[test]
fn window_honors_scroll_margin() {
    let layout = grid_layout().with_scroll_margin(300);
    assert_eq!(
        compute_window(&layout, 4500, 800, 1000, None),
        compute_window(&grid_layout(), 4200, 800, 1000, None)
    );
    assert_eq!(
        compute_window(&layout, 100, 800, 1000, None),
        compute_window(&layout, 0, 800, 1000, None)
    );
}

#[test]
fn window_randomized_invariants() {
    let mut rng = Lcg::new(7);
    for _ in 0..2000 {
        let per_row = rng.gen_range_usize(1, 8);
        let layout = LayoutOptions::default()
            .with_item_height(rng.gen_range_u32(1, 600))
            .with_items_per_row(per_row)
            .with_buffer_rows(rng.gen_range_usize(0, 6))
            .with_animation_buffer_rows(rng.gen_range_usize(0, 4));
        let count = rng.gen_range_usize(0, 5000);
        let offset = rng.gen_range_u64(0, 3_000_000);
        let viewport = rng.gen_range_u32(0, 2000);
        let direction = match rng.gen_range_u32(0, 3) {
            0 => None,
            1 => Some(ScrollDirection::Forward),
            _ => Some(ScrollDirection::Backward),
        };

        let w = compute_window(&layout, offset, viewport, count, direction);
        assert!(w.start_index <= w.end_index);
        assert!(w.end_index <= count);
        if w.start_index < count {
            assert_eq!(w.start_index % per_row, 0);
        }
    }
}

#[test]
fn items_per_row_from_container_width() {
    assert_eq!(items_per_row_for_width(1000, 250, 20), 3);
    assert_eq!(items_per_row_for_width(1330, 250, 20), 5);
    assert_eq!(items_per_row_for_width(0, 250, 20), 1);
    assert_eq!(items_per_row_for_width(249, 250, 20), 1);
}

#[test]
fn content_height_and_row_offset() {
    let layout = grid_layout();
    assert_eq!(content_height(&layout, 1000), 200 * 420);
    assert_eq!(content_height(&layout, 1001), 201 * 420);
    assert_eq!(content_height(&layout, 0), 0);
    assert_eq!(row_offset(&layout, Window::new(25, 95)), 5 * 420);
}

#[test]
fn store_rejects_duplicate_ids() {
    let err = ItemStore::new([ItemRecord::new(1u32, "a"), ItemRecord::new(1u32, "b")]).unwrap_err();
    assert!(matches!(err, Error::DuplicateId(_)));

    let mut store = store_of(3);
    let err = store.insert_front(ItemRecord::new(2, "dup")).unwrap_err();
    assert!(matches!(err, Error::DuplicateId(_)));
    assert_eq!(store.len(), 3);
}

#[test]
fn store_keeps_indexes_dense() {
    let mut store = store_of(4);
    store.insert_front(ItemRecord::new(10, "new")).unwrap();
    assert_eq!(store.ids().copied().collect::<Vec<_>>(), [10, 0, 1, 2, 3]);
    assert_eq!(store.index_of(&2), Some(3));

    let removed = store.remove(&0).unwrap();
    assert_eq!(removed.id, 0);
    assert!(store.remove(&0).is_none());
    for (index, item) in store.iter().enumerate() {
        assert_eq!(item.index, index);
        assert_eq!(store.index_of(&item.id), Some(index));
    }
}

#[test]
fn store_reorder_requires_a_permutation() {
    let mut store = store_of(3);
    assert!(matches!(store.reorder(&[0, 1]), Err(Error::InvalidOrder(_))));
    assert!(matches!(store.reorder(&[0, 1, 7]), Err(Error::InvalidOrder(_))));
    assert!(matches!(store.reorder(&[0, 1, 1]), Err(Error::InvalidOrder(_))));

    store.reorder(&[2, 0, 1]).unwrap();
    assert_eq!(store.ids().copied().collect::<Vec<_>>(), [2, 0, 1]);
    assert_eq!(store.order_positions(), [(2, 3), (0, 2), (1, 1)]);
}

#[test]
fn long_descriptions_get_see_more() {
    let short = ItemRecord::new(1u32, "c").with_description("x".repeat(120));
    let long = ItemRecord::new(2u32, "c").with_description("é".repeat(121));
    assert!(!short.has_more_description());
    assert!(long.has_more_description());
    assert!(!ItemRecord::new(3u32, "c").has_more_description());
}

#[test]
fn reconcile_twice_is_noop() {
    let mut store = store_of(100);
    let mut pool = ItemPool::new();
    let mut host = RecordingHost::default();

    let first = pool.reconcile(Window::new(0, 20), &mut store, &mut host, &mut ());
    assert_eq!(first.to_create.len(), 20);
    assert!(first.to_destroy.is_empty());

    let second = pool.reconcile(Window::new(0, 20), &mut store, &mut host, &mut ());
    assert!(second.is_noop());
    assert_eq!(second.to_reuse.len(), 20);
    assert_eq!(pool.len(), 20);
    assert_eq!(pool.totals(), (20, 0));
}

#[test]
fn reconcile_destroys_before_creating() {
    let mut store = store_of(100);
    let mut pool = ItemPool::new();
    let mut host = RecordingHost::default();
    pool.reconcile(Window::new(0, 10), &mut store, &mut host, &mut LoggingHooks);
    host.log.clear();

    let plan = pool.reconcile(Window::new(5, 15), &mut store, &mut host, &mut LoggingHooks);
    assert_eq!(plan.to_destroy, [0, 1, 2, 3, 4]);
    assert_eq!(plan.to_create, [10, 11, 12, 13, 14]);
    assert_eq!(plan.to_reuse, [5, 6, 7, 8, 9]);

    let first_create = host
        .log
        .iter()
        .position(|e| matches!(e, HostEvent::Created(_)))
        .unwrap();
    let last_release = host
        .log
        .iter()
        .rposition(|e| matches!(e, HostEvent::Released(_)))
        .unwrap();
    assert!(last_release < first_create);

    // Each retire hook runs right before its release.
    for id in 0..5 {
        let retiring = host.log.iter().position(|e| *e == HostEvent::Retiring(id));
        let released = host.log.iter().position(|e| *e == HostEvent::Released(id));
        assert_eq!(retiring.map(|i| i + 1), released);
    }
    assert_eq!(store.get(&0).unwrap().state, MaterializationState::Unmaterialized);
    assert_eq!(store.get(&14).unwrap().state, MaterializationState::Materialized);
}

#[test]
fn recreated_ids_never_hold_two_surfaces() {
    let mut store = store_of(200);
    let mut pool = ItemPool::new();
    let mut host = RecordingHost::default();
    let mut rng = Lcg::new(42);

    for _ in 0..500 {
        let start = rng.gen_range_usize(0, 200);
        let end = (start + rng.gen_range_usize(0, 40)).min(200);
        let window = Window::new(start, end);
        pool.reconcile(window, &mut store, &mut host, &mut ());

        assert_eq!(pool.len(), window.len());
        assert_eq!(host.live.len(), window.len());
        for index in start..end {
            assert!(pool.contains(&(index as u32)));
        }
    }
    assert!(host.max_live <= 40);

    pool.release_all(&mut store, &mut host, &mut ());
    assert!(pool.is_empty());
    assert!(host.live.is_empty());
}

#[test]
fn failed_surface_creation_is_retried() {
    let mut store = store_of(20);
    let mut pool = ItemPool::new();
    let mut host = RecordingHost::default();
    host.fail_create.insert(5);

    let plan = pool.reconcile(Window::new(0, 10), &mut store, &mut host, &mut ());
    assert_eq!(plan.to_create.len(), 9);
    assert!(!pool.contains(&5));
    assert_eq!(store.get(&5).unwrap().state, MaterializationState::Unmaterialized);

    host.fail_create.clear();
    let plan = pool.reconcile(Window::new(0, 10), &mut store, &mut host, &mut ());
    assert_eq!(plan.to_create, [5]);
    assert!(pool.contains(&5));
}

#[test]
fn retire_releases_a_single_surface() {
    let mut store = store_of(10);
    let mut pool = ItemPool::new();
    let mut host = RecordingHost::default();
    pool.reconcile(Window::new(0, 10), &mut store, &mut host, &mut ());

    assert!(pool.retire(&3, &mut store, &mut host, &mut LoggingHooks));
    assert!(!pool.retire(&3, &mut store, &mut host, &mut LoggingHooks));
    assert!(!host.live.contains(&3));
    assert_eq!(pool.len(), 9);
}

#[test]
fn duplicate_submissions_are_dropped() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1]);
    let calls = Rc::new(RefCell::new(Vec::new()));

    for _ in 0..3 {
        let calls = Rc::clone(&calls);
        scheduler.add_with_completion(1, EffectKind::Update, Priority::Medium, move |id, outcome| {
            calls.borrow_mut().push((*id, outcome));
        });
    }
    assert_eq!(scheduler.queue_len(), 1);

    // Still a duplicate while executing.
    scheduler.tick(0, &mut host);
    assert_eq!(scheduler.executing(), Some(&1));
    assert!(!scheduler.add(1, EffectKind::Entrance, Priority::Low));

    let (resolutions, _) = drain(&mut scheduler, &mut host, 0, 10);
    assert_eq!(resolutions.len(), 1);
    assert_eq!(calls.borrow().as_slice(), [(1, EffectOutcome::Completed)]);
    assert!(!scheduler.is_tracked(&1));

    // Resolved ids can be submitted again.
    assert!(scheduler.add(1, EffectKind::Update, Priority::Medium));
}

#[test]
fn high_priority_preempts_queued_low() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1, 2, 3]);
    scheduler.add(1, EffectKind::Entrance, Priority::Low);
    scheduler.add(2, EffectKind::Entrance, Priority::Low);
    scheduler.add(3, EffectKind::Remove, Priority::High);

    assert_eq!(scheduler.queued_ids().copied().collect::<Vec<_>>(), [3, 1, 2]);
    let (resolutions, _) = drain(&mut scheduler, &mut host, 0, 16);
    assert_eq!(ids_of(&resolutions), [3, 1, 2]);
    assert!(resolutions.iter().all(|r| r.outcome == EffectOutcome::Completed));
}

#[test]
fn equal_priorities_run_in_submission_order() {
    let mut scheduler = AnimationScheduler::default();
    scheduler.add(1, EffectKind::Update, Priority::Medium);
    scheduler.add(2, EffectKind::Entrance, Priority::Low);
    scheduler.add(3, EffectKind::New, Priority::Medium);
    scheduler.add(4, EffectKind::Remove, Priority::High);
    scheduler.add(5, EffectKind::Remove, Priority::High);

    assert_eq!(
        scheduler.queued_ids().copied().collect::<Vec<_>>(),
        [4, 5, 1, 3, 2]
    );
}

#[test]
fn overflow_sheds_low_backlog_beyond_prefix() {
    let mut scheduler = AnimationScheduler::default();
    let shed = Rc::new(RefCell::new(Vec::new()));
    for id in 0..250u32 {
        let shed = Rc::clone(&shed);
        scheduler.add_with_completion(id, EffectKind::Entrance, Priority::Low, move |id, outcome| {
            assert_eq!(outcome, EffectOutcome::Shed);
            shed.borrow_mut().push(*id);
        });
    }

    assert!(scheduler.queue_len() <= 200);
    let expected: Vec<u32> = (0..150).chain(201..250).collect();
    assert_eq!(scheduler.queued_ids().copied().collect::<Vec<_>>(), expected);
    assert_eq!(*shed.borrow(), (150..=200).collect::<Vec<u32>>());
    assert_eq!(scheduler.shed_total(), 51);

    // Shed ids are no longer tracked.
    assert!(!scheduler.is_tracked(&150));
    assert!(scheduler.add(150, EffectKind::Entrance, Priority::Low));
}

#[test]
fn overflow_keeps_non_low_entries() {
    let options = SchedulerOptions::default().with_queue_bounds(10, 4);
    let mut scheduler = AnimationScheduler::new(options);
    for id in 0..10u32 {
        scheduler.add(id, EffectKind::Entrance, Priority::Low);
    }
    // Medium entries are inserted ahead of every low one, inside the prefix.
    scheduler.add(100, EffectKind::Update, Priority::Medium);

    let queued: Vec<u32> = scheduler.queued_ids().copied().collect();
    assert_eq!(queued, [100, 0, 1, 2]);

    for id in 0..8u32 {
        scheduler.add(200 + id, EffectKind::Remove, Priority::High);
    }
    // Every high entry survives even past the prefix; the low tail is shed.
    let queued: Vec<u32> = scheduler.queued_ids().copied().collect();
    assert_eq!(queued, [200, 201, 202, 203, 204, 205, 206, 207, 100]);
    scheduler.add(300, EffectKind::Remove, Priority::High);
    let queued: Vec<u32> = scheduler.queued_ids().copied().collect();
    assert_eq!(queued, [200, 201, 202, 203, 204, 205, 206, 207, 300, 100]);
}

#[test]
fn cancel_mid_flight_neutralizes_and_releases() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([7, 8]);
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    {
        let outcomes = Rc::clone(&outcomes);
        scheduler.add_with_completion(7, EffectKind::Entrance, Priority::Low, move |_, o| {
            outcomes.borrow_mut().push(o);
        });
    }
    scheduler.add(8, EffectKind::Entrance, Priority::Low);

    scheduler.tick(0, &mut host);
    assert_eq!(scheduler.executing(), Some(&7));
    assert_eq!(host.marks_for(7), [MarkChange::Add(Mark::Entering)]);

    assert_eq!(scheduler.cancel(&7, &mut host), 1);
    assert_eq!(host.marks_for(7).last(), Some(&MarkChange::Reset));
    assert!(scheduler.queued_ids().all(|id| *id != 7));
    assert!(!scheduler.is_tracked(&7));
    assert_eq!(scheduler.executing(), None);
    assert_eq!(scheduler.executing_kind(), None);

    // No further visual steps once cancelled.
    let marks_before = host.marks_for(7).len();
    let resolution = scheduler.tick(16, &mut host).unwrap();
    assert_eq!(resolution.id, 7);
    assert_eq!(resolution.outcome, EffectOutcome::Cancelled);
    assert_eq!(host.marks_for(7).len(), marks_before);
    assert_eq!(*outcomes.borrow(), [EffectOutcome::Cancelled]);

    scheduler.clear();
    assert_eq!(scheduler.queue_len(), 0);
    assert!(!scheduler.is_processing());
    assert_eq!(scheduler.live_len(), 0);
}

#[test]
fn cancel_removes_queued_entries() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::default();
    scheduler.add(1, EffectKind::Entrance, Priority::Low);
    scheduler.add(2, EffectKind::Entrance, Priority::Low);

    assert_eq!(scheduler.cancel(&2, &mut host), 1);
    assert_eq!(scheduler.cancel(&2, &mut host), 0);
    assert_eq!(scheduler.queued_ids().copied().collect::<Vec<_>>(), [1]);
    // Queued cancels never touch visuals.
    assert!(host.marks.is_empty());
}

#[test]
fn resubmission_after_cancel_survives_old_resolution() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([7]);
    scheduler.add(7, EffectKind::Entrance, Priority::Low);
    scheduler.tick(0, &mut host);
    scheduler.cancel(&7, &mut host);

    assert!(scheduler.add(7, EffectKind::Remove, Priority::High));
    let resolution = scheduler.tick(16, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Cancelled);
    // The stale release did not drop the newer request.
    assert!(scheduler.is_tracked(&7));

    let (resolutions, _) = drain(&mut scheduler, &mut host, 16, 16);
    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].kind, EffectKind::Remove);
    assert_eq!(resolutions[0].outcome, EffectOutcome::Completed);
    assert!(!scheduler.is_tracked(&7));
}

#[test]
fn clear_invokes_completions_without_touching_visuals() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1, 2]);
    let outcomes = Rc::new(RefCell::new(Vec::new()));
    for id in [1u32, 2] {
        let outcomes = Rc::clone(&outcomes);
        scheduler.add_with_completion(id, EffectKind::Update, Priority::Medium, move |id, o| {
            outcomes.borrow_mut().push((*id, o));
        });
    }
    scheduler.tick(0, &mut host);
    let marks = host.marks.len();

    scheduler.clear();
    assert_eq!(host.marks.len(), marks);
    assert_eq!(scheduler.executing(), None);
    assert!(!scheduler.is_processing());
    let mut seen = outcomes.borrow().clone();
    seen.sort_by_key(|(id, _)| *id);
    assert_eq!(
        seen,
        [(1, EffectOutcome::Cancelled), (2, EffectOutcome::Cancelled)]
    );
}

#[test]
fn detached_targets_resolve_stale() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([3]);
    scheduler.add(3, EffectKind::Update, Priority::Medium);
    scheduler.tick(0, &mut host);
    assert_eq!(host.marks_for(3), [MarkChange::Reset, MarkChange::Add(Mark::Pulse)]);

    host.detached.insert(3);
    let resolution = scheduler.tick(10, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Stale);
    assert!(resolution.error.is_none());
    assert!(!scheduler.is_tracked(&3));
    assert_eq!(host.marks_for(3).len(), 2);
}

#[test]
fn stale_requests_never_start_visuals() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::default();
    scheduler.add(9, EffectKind::Entrance, Priority::Low);
    let resolution = scheduler.tick(0, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Stale);
    assert!(host.marks.is_empty());
}

#[test]
fn watchdog_fails_stuck_effects() {
    let timings = EffectTimings {
        update_ms: 10_000,
        ..EffectTimings::default()
    };
    let options = SchedulerOptions::default()
        .with_watchdog_ms(100)
        .with_timings(timings);
    let mut scheduler = AnimationScheduler::new(options);
    let mut host = RecordingHost::attached([4]);
    scheduler.add(4, EffectKind::Update, Priority::Medium);

    assert!(scheduler.tick(0, &mut host).is_none());
    assert_eq!(scheduler.executing_kind(), Some(EffectKind::Update));
    assert!(scheduler.tick(100, &mut host).is_none());
    let resolution = scheduler.tick(101, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Failed);
    assert_eq!(
        resolution.error,
        Some(Error::Watchdog {
            kind: EffectKind::Update,
            elapsed_ms: 101,
        })
    );
    assert!(!scheduler.is_tracked(&4));
}

#[test]
fn failing_effects_do_not_stop_the_loop() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([5, 6]);
    host.fail_apply.insert(5);
    scheduler.add(5, EffectKind::Update, Priority::Medium);
    scheduler.add(6, EffectKind::Update, Priority::Medium);

    let (resolutions, _) = drain(&mut scheduler, &mut host, 0, 10);
    assert_eq!(ids_of(&resolutions), [5, 6]);
    assert_eq!(resolutions[0].outcome, EffectOutcome::Failed);
    assert!(matches!(resolutions[0].error, Some(Error::Host(_))));
    assert_eq!(resolutions[1].outcome, EffectOutcome::Completed);
}

#[test]
fn settle_delay_separates_effects() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1, 2]);
    scheduler.add(1, EffectKind::Remove, Priority::High);
    scheduler.add(2, EffectKind::Remove, Priority::High);

    scheduler.tick(0, &mut host);
    assert!(scheduler.tick(499, &mut host).is_none());
    assert_eq!(scheduler.tick(500, &mut host).map(|r| r.id), Some(1));

    assert!(scheduler.tick(549, &mut host).is_none());
    assert_eq!(scheduler.executing(), None);
    assert!(scheduler.is_processing());

    scheduler.tick(550, &mut host);
    assert_eq!(scheduler.executing(), Some(&2));
}

#[test]
fn new_effect_follows_transition_end() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1]);
    scheduler.add(1, EffectKind::New, Priority::Medium);

    scheduler.tick(0, &mut host);
    assert!(scheduler.tick(16, &mut host).is_none());
    scheduler.notify_transition_end(&1);
    assert!(scheduler.tick(32, &mut host).is_none());
    assert!(scheduler.tick(531, &mut host).is_none());
    let resolution = scheduler.tick(532, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Completed);

    assert_eq!(
        host.marks_for(1),
        [
            MarkChange::Reset,
            MarkChange::Add(Mark::New),
            MarkChange::Remove(Mark::New),
            MarkChange::Add(Mark::Pulse),
            MarkChange::Remove(Mark::Pulse),
            MarkChange::Add(Mark::Done),
            MarkChange::PersistAnimated,
        ]
    );
}

#[test]
fn new_effect_falls_back_without_transition_end() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([1]);
    scheduler.add(1, EffectKind::New, Priority::Medium);

    scheduler.tick(0, &mut host);
    scheduler.tick(1499, &mut host);
    assert_eq!(host.marks_for(1).len(), 2);
    scheduler.tick(1500, &mut host);
    assert_eq!(host.marks_for(1).last(), Some(&MarkChange::Add(Mark::Pulse)));
    let resolution = scheduler.tick(2000, &mut host).unwrap();
    assert_eq!(resolution.outcome, EffectOutcome::Completed);
}

#[test]
fn entrance_waits_two_frames_before_revealing() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([2]);
    scheduler.add(2, EffectKind::Entrance, Priority::Low);

    scheduler.tick(0, &mut host);
    scheduler.tick(16, &mut host);
    assert_eq!(host.marks_for(2), [MarkChange::Add(Mark::Entering)]);
    scheduler.tick(32, &mut host);
    assert_eq!(
        host.marks_for(2),
        [
            MarkChange::Add(Mark::Entering),
            MarkChange::Remove(Mark::Entering),
            MarkChange::Add(Mark::Visible),
        ]
    );
    assert!(scheduler.tick(331, &mut host).is_none());
    let resolution = scheduler.tick(332, &mut host).unwrap();
    assert_eq!(resolution.kind, EffectKind::Entrance);
    assert_eq!(host.marks_for(2).last(), Some(&MarkChange::Add(Mark::Done)));
}

#[test]
fn update_effect_clears_its_pulse() {
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::attached([3]);
    scheduler.add(3, EffectKind::Update, Priority::Medium);
    let (resolutions, _) = drain(&mut scheduler, &mut host, 0, 100);
    assert_eq!(resolutions[0].outcome, EffectOutcome::Completed);
    assert_eq!(
        host.marks_for(3),
        [
            MarkChange::Reset,
            MarkChange::Add(Mark::Pulse),
            MarkChange::Remove(Mark::Pulse),
        ]
    );
}

#[test]
fn scheduler_randomized_invariants() {
    let options = SchedulerOptions::default().with_queue_bounds(40, 30);
    let mut scheduler = AnimationScheduler::new(options);
    let mut host = RecordingHost::attached(0..64);
    let mut rng = Lcg::new(0xC0FFEE);
    let kinds = [
        EffectKind::New,
        EffectKind::Remove,
        EffectKind::Update,
        EffectKind::Entrance,
    ];
    let mut now = 0u64;

    for _ in 0..5000 {
        match rng.gen_range_u32(0, 10) {
            0..=4 => {
                let id = rng.gen_range_u32(0, 64);
                let kind = kinds[rng.gen_range_usize(0, kinds.len())];
                let was_tracked = scheduler.is_tracked(&id);
                let added = scheduler.add(id, kind, kind.default_priority());
                assert_eq!(added, !was_tracked);
            }
            5 => {
                let id = rng.gen_range_u32(0, 64);
                scheduler.cancel(&id, &mut host);
                assert!(!scheduler.is_tracked(&id));
            }
            6 => {
                if rng.gen_range_u32(0, 20) == 0 {
                    scheduler.clear();
                }
            }
            _ => {
                now += rng.gen_range_u64(1, 120);
                scheduler.tick(now, &mut host);
            }
        }

        assert!(scheduler.queue_len() <= 40);
        let queued: Vec<(&u32, EffectKind, Priority)> = scheduler.queued().collect();
        let mut seen = HashSet::new();
        for (id, _, _) in &queued {
            assert!(seen.insert(**id), "id {id} queued twice");
            assert!(scheduler.is_tracked(id));
        }
        if let Some(executing) = scheduler.executing() {
            assert!(!seen.contains(executing));
        }
        assert!(queued.windows(2).all(|pair| pair[0].2 >= pair[1].2));
    }
}

#[test]
fn visibility_submits_entrance_once() {
    let mut tracker = VisibilityTracker::new(50);
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::default();

    assert_eq!(
        tracker.register(&1, false, false, &mut host),
        Registration::Observed
    );
    assert!(host.observed.contains(&1));
    assert_eq!(host.observe_margin, Some(tracker.margin_px()));

    let n = tracker.handle(&[Intersection::entered(1)], &mut scheduler, &mut host, false);
    assert_eq!(n, 1);
    assert_eq!(host.loads, [1]);
    assert!(tracker.is_visible(&1));

    // Still live in the scheduler: no resubmission, no reload.
    let events = [Intersection::left(1), Intersection::entered(1)];
    assert_eq!(tracker.handle(&events, &mut scheduler, &mut host, false), 0);
    assert_eq!(host.loads, [1]);
    assert_eq!(scheduler.queue_len(), 1);
}

#[test]
fn visibility_skips_done_and_unknown_items() {
    let mut tracker = VisibilityTracker::new(50);
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::default();

    tracker.register(&2, true, true, &mut host);
    let events = [Intersection::entered(2), Intersection::entered(99)];
    assert_eq!(tracker.handle(&events, &mut scheduler, &mut host, false), 0);
    assert!(host.loads.is_empty());

    tracker.register(&3, false, true, &mut host);
    tracker.mark_done(&3);
    assert_eq!(
        tracker.handle(&[Intersection::entered(3)], &mut scheduler, &mut host, false),
        0
    );
    assert_eq!(scheduler.queue_len(), 0);
}

#[test]
fn suppressed_entrance_still_loads_content() {
    let mut tracker = VisibilityTracker::new(50);
    let mut scheduler = AnimationScheduler::default();
    let mut host = RecordingHost::default();
    tracker.register(&4, false, false, &mut host);

    assert_eq!(
        tracker.handle(&[Intersection::entered(4)], &mut scheduler, &mut host, true),
        0
    );
    assert_eq!(host.loads, [4]);

    let events = [Intersection::left(4), Intersection::entered(4)];
    assert_eq!(tracker.handle(&events, &mut scheduler, &mut host, false), 1);
}

#[test]
fn unavailable_observer_falls_back() {
    let mut tracker = VisibilityTracker::new(50);
    let mut host = RecordingHost {
        observe_fails: true,
        ..RecordingHost::default()
    };
    assert_eq!(
        tracker.register(&5, false, false, &mut host),
        Registration::Fallback
    );
    assert!(!tracker.is_registered(&5));
    assert_eq!(tracker.fallbacks(), 1);
}

#[test]
fn unregister_stops_observation() {
    let mut tracker = VisibilityTracker::new(50);
    let mut host = RecordingHost::default();
    tracker.register(&6, false, false, &mut host);
    tracker.unregister(&6, &mut host);
    tracker.unregister(&6, &mut host);
    assert!(!host.observed.contains(&6));
    assert!(tracker.is_empty());
}

#[test]
fn velocity_classifies_and_settles_once() {
    let mut velocity = VelocityClassifier::default();
    assert_eq!(velocity.class(), ScrollClass::Settled);

    assert_eq!(velocity.on_scroll(0, 0), ScrollClass::Moving);
    assert_eq!(velocity.on_scroll(3, 10), ScrollClass::Moving);
    assert_eq!(velocity.direction(), Some(ScrollDirection::Forward));
    assert_eq!(velocity.on_scroll(100, 20), ScrollClass::Fast);
    assert!(velocity.is_fast());

    assert!(!velocity.tick(169));
    assert!(velocity.tick(170));
    assert!(!velocity.tick(200));
    assert_eq!(velocity.class(), ScrollClass::Settled);

    assert_eq!(velocity.on_scroll(50, 300), ScrollClass::Fast);
    assert_eq!(velocity.direction(), Some(ScrollDirection::Backward));
}

#[test]
fn options_validate() {
    assert!(LayoutOptions::default().validate().is_ok());
    assert!(LayoutOptions::default().with_item_height(0).validate().is_err());
    assert!(SchedulerOptions::default().validate().is_ok());
    assert!(
        SchedulerOptions::default()
            .with_queue_bounds(10, 20)
            .validate()
            .is_err()
    );
    assert!(
        SchedulerOptions::default()
            .with_watchdog_ms(1000)
            .validate()
            .is_err()
    );
    let extreme = EffectTimings {
        new_fallback_ms: u64::MAX,
        new_pulse_ms: 1,
        ..EffectTimings::default()
    };
    assert!(matches!(
        SchedulerOptions::default()
            .with_watchdog_ms(u64::MAX)
            .with_timings(extreme)
            .validate(),
        Err(Error::Config(_))
    ));
}
