use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use crate::effect::{EffectCx, EffectMachine, MarkSink, Step};
use crate::key::{IdMap, ItemId};
use crate::{EffectKind, EffectOutcome, Error, MarkChange, Priority, Result, SchedulerOptions};

/// Visual state of materialized surfaces, as seen by running effects.
pub trait MarkHost<K> {
    /// `false` once the surface for `id` has been released or detached.
    fn is_attached(&self, id: &K) -> bool;

    fn apply(&mut self, id: &K, change: MarkChange) -> Result<()>;
}

/// Completion notification attached to a request.
pub type Completion<K> = Box<dyn FnOnce(&K, EffectOutcome)>;

/// A queued "animate this element" request.
pub struct AnimationRequest<K> {
    pub target: K,
    pub kind: EffectKind,
    pub priority: Priority,
    /// Monotonic submission id. Breaks priority ties and keys the live set.
    pub seq: u64,
    completion: Option<Completion<K>>,
}

impl<K: fmt::Debug> fmt::Debug for AnimationRequest<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationRequest")
            .field("target", &self.target)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

/// Reported by [`AnimationScheduler::tick`] when a request resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<K> {
    pub id: K,
    pub kind: EffectKind,
    pub outcome: EffectOutcome,
    pub error: Option<Error>,
}

struct Running<K> {
    request: AnimationRequest<K>,
    machine: Box<dyn EffectMachine>,
    started_ms: u64,
    transition_ended: bool,
    cancelled: bool,
}

enum Phase<K> {
    Idle,
    Running(Running<K>),
    Settling { until_ms: u64 },
}

struct BoundSink<'a, K, H: ?Sized> {
    id: &'a K,
    host: &'a mut H,
}

impl<K, H: MarkHost<K> + ?Sized> MarkSink for BoundSink<'_, K, H> {
    fn apply(&mut self, change: MarkChange) -> Result<()> {
        self.host.apply(self.id, change)
    }
}

impl<K: ItemId> Running<K> {
    fn step<H: MarkHost<K> + ?Sized>(
        &mut self,
        now_ms: u64,
        host: &mut H,
        watchdog_ms: u64,
    ) -> Option<(EffectOutcome, Option<Error>)> {
        if self.cancelled {
            return Some((EffectOutcome::Cancelled, None));
        }

        let id = &self.request.target;
        if !host.is_attached(id) {
            vdebug!(id = ?id, kind = ?self.request.kind, "target detached; resolving");
            return Some((EffectOutcome::Stale, None));
        }

        let elapsed_ms = now_ms.saturating_sub(self.started_ms);
        if elapsed_ms > watchdog_ms {
            let err = Error::Watchdog {
                kind: self.machine.kind(),
                elapsed_ms,
            };
            verror!(id = ?id, error = %err, "effect watchdog expired");
            return Some((EffectOutcome::Failed, Some(err)));
        }

        let mut sink = BoundSink { id, host };
        let mut cx = EffectCx {
            now_ms,
            transition_ended: self.transition_ended,
            sink: &mut sink,
        };
        match self.machine.poll(&mut cx) {
            Ok(Step::Pending) => None,
            Ok(Step::Ready) => Some((EffectOutcome::Completed, None)),
            Err(err) => {
                verror!(id = ?id, kind = ?self.request.kind, error = %err, "effect failed");
                Some((EffectOutcome::Failed, Some(err)))
            }
        }
    }
}

/// Single-flight, priority-ordered executor of presentation effects.
///
/// The scheduler never runs on its own: the host calls [`Self::tick`] once per display refresh.
/// At most one request is live per target id, and at most one effect executes at a time.
pub struct AnimationScheduler<K> {
    options: SchedulerOptions,
    queue: VecDeque<AnimationRequest<K>>,
    live: IdMap<K, u64>,
    phase: Phase<K>,
    next_seq: u64,
    shed_total: u64,
}

impl<K: ItemId> AnimationScheduler<K> {
    pub fn new(options: SchedulerOptions) -> Self {
        vdebug!(
            max_queue_len = options.max_queue_len,
            retained_prefix = options.retained_prefix,
            settle_delay_ms = options.settle_delay_ms,
            "AnimationScheduler::new"
        );
        Self {
            options,
            queue: VecDeque::new(),
            live: IdMap::default(),
            phase: Phase::Idle,
            next_seq: 0,
            shed_total: 0,
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Submits an effect for `id`.
    ///
    /// Returns `false` (and does nothing) when `id` already has a queued or executing request.
    pub fn add(&mut self, id: K, kind: EffectKind, priority: Priority) -> bool {
        self.enqueue(id, kind, priority, None)
    }

    /// Same as [`Self::add`], with a notification fired once the request resolves.
    ///
    /// The notification is dropped without being called when the submission is a duplicate.
    pub fn add_with_completion(
        &mut self,
        id: K,
        kind: EffectKind,
        priority: Priority,
        completion: impl FnOnce(&K, EffectOutcome) + 'static,
    ) -> bool {
        self.enqueue(id, kind, priority, Some(Box::new(completion)))
    }

    fn enqueue(
        &mut self,
        id: K,
        kind: EffectKind,
        priority: Priority,
        completion: Option<Completion<K>>,
    ) -> bool {
        if self.live.contains_key(&id) {
            vtrace!(id = ?id, kind = ?kind, "duplicate animation request dropped");
            return false;
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.live.insert(id.clone(), seq);

        let at = self
            .queue
            .iter()
            .position(|queued| queued.priority < priority)
            .unwrap_or(self.queue.len());
        vtrace!(id = ?id, kind = ?kind, priority = ?priority, seq, at, "enqueue");
        self.queue.insert(
            at,
            AnimationRequest {
                target: id,
                kind,
                priority,
                seq,
                completion,
            },
        );

        if self.queue.len() > self.options.max_queue_len {
            self.shed();
        }
        true
    }

    fn shed(&mut self) {
        let retain = self.options.retained_prefix;
        let mut dropped = Vec::new();
        for (index, request) in mem::take(&mut self.queue).into_iter().enumerate() {
            if index < retain || request.priority > Priority::Low {
                self.queue.push_back(request);
            } else {
                dropped.push(request);
            }
        }
        vwarn!(
            kept = self.queue.len(),
            shed = dropped.len(),
            "animation queue overflow; shedding low-priority backlog"
        );
        self.shed_total = self.shed_total.saturating_add(dropped.len() as u64);
        for request in dropped {
            self.finish(request, EffectOutcome::Shed);
        }
    }

    /// Drops every queued request for `id` and neutralizes it if it is executing.
    ///
    /// An executing effect has its marks reset right away and performs no further steps; it
    /// resolves as [`EffectOutcome::Cancelled`] on the next tick. `id` may be resubmitted
    /// immediately. Returns the number of requests cancelled.
    pub fn cancel<H: MarkHost<K> + ?Sized>(&mut self, id: &K, host: &mut H) -> usize {
        let mut cancelled = 0usize;

        let mut index = 0;
        while index < self.queue.len() {
            if self.queue[index].target != *id {
                index += 1;
                continue;
            }
            if let Some(request) = self.queue.remove(index) {
                self.finish(request, EffectOutcome::Cancelled);
                cancelled += 1;
            }
        }

        if let Phase::Running(run) = &mut self.phase {
            if run.request.target == *id && !run.cancelled {
                run.cancelled = true;
                cancelled += 1;
                if host.is_attached(id) {
                    if let Err(_err) = host.apply(id, MarkChange::Reset) {
                        vwarn!(id = ?id, error = %_err, "could not reset cancelled effect");
                    }
                }
                let seq = run.request.seq;
                if self.live.get(id) == Some(&seq) {
                    self.live.remove(id);
                }
            }
        }

        if cancelled > 0 {
            vdebug!(id = ?id, cancelled, "cancel");
        }
        cancelled
    }

    /// Drops the whole queue and the executing effect without touching any surface.
    pub fn clear(&mut self) {
        let queued = mem::take(&mut self.queue);
        let running = mem::replace(&mut self.phase, Phase::Idle);
        vdebug!(queued = queued.len(), "clear");
        self.live.clear();
        for request in queued {
            if let Some(completion) = request.completion {
                completion(&request.target, EffectOutcome::Cancelled);
            }
        }
        if let Phase::Running(run) = running {
            if let Some(completion) = run.request.completion {
                completion(&run.request.target, EffectOutcome::Cancelled);
            }
        }
    }

    /// Forwards the host's transition-end signal to the effect running on `id`, if any.
    pub fn notify_transition_end(&mut self, id: &K) {
        if let Phase::Running(run) = &mut self.phase {
            if run.request.target == *id {
                run.transition_ended = true;
            }
        }
    }

    /// Advances the single-flight loop.
    ///
    /// Call once per display refresh. Starts the next request when idle, polls the executing
    /// effect, and honors the settle delay between effects. Returns the request that resolved
    /// during this tick, if any.
    pub fn tick<H: MarkHost<K> + ?Sized>(
        &mut self,
        now_ms: u64,
        host: &mut H,
    ) -> Option<Resolution<K>> {
        loop {
            match mem::replace(&mut self.phase, Phase::Idle) {
                Phase::Settling { until_ms } => {
                    if now_ms < until_ms {
                        self.phase = Phase::Settling { until_ms };
                        return None;
                    }
                }
                Phase::Idle => {
                    let request = self.queue.pop_front()?;
                    vtrace!(id = ?request.target, kind = ?request.kind, seq = request.seq, "start");
                    let machine = request.kind.machine(&self.options.timings);
                    self.phase = Phase::Running(Running {
                        request,
                        machine,
                        started_ms: now_ms,
                        transition_ended: false,
                        cancelled: false,
                    });
                }
                Phase::Running(mut run) => {
                    let Some((outcome, error)) = run.step(now_ms, host, self.options.watchdog_ms)
                    else {
                        self.phase = Phase::Running(run);
                        return None;
                    };
                    self.phase = Phase::Settling {
                        until_ms: now_ms.saturating_add(self.options.settle_delay_ms),
                    };
                    let id = run.request.target.clone();
                    let kind = run.request.kind;
                    self.finish(run.request, outcome);
                    return Some(Resolution {
                        id,
                        kind,
                        outcome,
                        error,
                    });
                }
            }
        }
    }

    fn finish(&mut self, request: AnimationRequest<K>, outcome: EffectOutcome) {
        if self.live.get(&request.target) == Some(&request.seq) {
            self.live.remove(&request.target);
        }
        vtrace!(id = ?request.target, kind = ?request.kind, outcome = ?outcome, "resolved");
        if let Some(completion) = request.completion {
            completion(&request.target, outcome);
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// `true` while an effect is executing or the settle delay is pending.
    pub fn is_processing(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Target of the executing effect. Cancelled effects awaiting their final tick are excluded.
    pub fn executing(&self) -> Option<&K> {
        match &self.phase {
            Phase::Running(run) if !run.cancelled => Some(&run.request.target),
            _ => None,
        }
    }

    pub fn executing_kind(&self) -> Option<EffectKind> {
        match &self.phase {
            Phase::Running(run) if !run.cancelled => Some(run.machine.kind()),
            _ => None,
        }
    }

    /// `true` when `id` has a queued or executing request.
    pub fn is_tracked(&self, id: &K) -> bool {
        self.live.contains_key(id)
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Queued targets in execution order.
    pub fn queued_ids(&self) -> impl Iterator<Item = &K> {
        self.queue.iter().map(|request| &request.target)
    }

    /// Queued requests in execution order.
    pub fn queued(&self) -> impl Iterator<Item = (&K, EffectKind, Priority)> {
        self.queue
            .iter()
            .map(|request| (&request.target, request.kind, request.priority))
    }

    /// Requests dropped by the overflow policy since construction.
    pub fn shed_total(&self) -> u64 {
        self.shed_total
    }
}

impl<K: ItemId> Default for AnimationScheduler<K> {
    fn default() -> Self {
        Self::new(SchedulerOptions::default())
    }
}

impl<K: fmt::Debug> fmt::Debug for AnimationScheduler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let executing = match &self.phase {
            Phase::Running(run) => Some(&run.request.target),
            _ => None,
        };
        f.debug_struct("AnimationScheduler")
            .field("options", &self.options)
            .field("queue_len", &self.queue.len())
            .field("live", &self.live.len())
            .field("executing", &executing)
            .finish_non_exhaustive()
    }
}
