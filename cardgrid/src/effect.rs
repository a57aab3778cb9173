//! Per-effect state machines.
//!
//! Each machine is polled by the scheduler once per tick until it reports [`Step::Ready`]. A
//! machine only ever touches its own target through the [`MarkSink`] it is handed, and every
//! wait has a deadline, so polling always makes progress.

use alloc::boxed::Box;

use crate::{EffectKind, EffectTimings, Mark, MarkChange, Result};

/// Receives the visual mutations of the running effect, already bound to its target.
pub trait MarkSink {
    fn apply(&mut self, change: MarkChange) -> Result<()>;
}

/// Everything a machine can observe during one poll.
pub struct EffectCx<'a> {
    pub now_ms: u64,
    /// The host reported the end of the target's CSS-style transition since the effect started.
    pub transition_ended: bool,
    pub sink: &'a mut dyn MarkSink,
}

impl EffectCx<'_> {
    fn reset(&mut self) -> Result<()> {
        self.sink.apply(MarkChange::Reset)
    }

    fn add(&mut self, mark: Mark) -> Result<()> {
        self.sink.apply(MarkChange::Add(mark))
    }

    fn remove(&mut self, mark: Mark) -> Result<()> {
        self.sink.apply(MarkChange::Remove(mark))
    }

    fn swap(&mut self, from: Mark, to: Mark) -> Result<()> {
        self.remove(from)?;
        self.add(to)
    }

    fn elapsed(&self, deadline_ms: u64) -> bool {
        self.now_ms >= deadline_ms
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pending,
    Ready,
}

/// A finite presentation effect driven to resolution by repeated polling.
pub trait EffectMachine {
    fn kind(&self) -> EffectKind;

    fn poll(&mut self, cx: &mut EffectCx<'_>) -> Result<Step>;
}

impl EffectKind {
    /// Builds the state machine bound to this effect kind.
    pub fn machine(self, timings: &EffectTimings) -> Box<dyn EffectMachine> {
        match self {
            Self::New => Box::new(NewEffect::new(timings)),
            Self::Remove => Box::new(RemoveEffect::new(timings)),
            Self::Update => Box::new(UpdateEffect::new(timings)),
            Self::Entrance => Box::new(EntranceEffect::new(timings)),
        }
    }
}

/// `New` → (transition end | fallback) → `Pulse` → `Done` + persisted flag.
#[derive(Clone, Copy, Debug)]
pub struct NewEffect {
    fallback_ms: u64,
    pulse_ms: u64,
    stage: NewStage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NewStage {
    Start,
    Marked { fallback_at: u64 },
    Pulsing { until: u64 },
}

impl NewEffect {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            fallback_ms: timings.new_fallback_ms,
            pulse_ms: timings.new_pulse_ms,
            stage: NewStage::Start,
        }
    }
}

impl EffectMachine for NewEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::New
    }

    fn poll(&mut self, cx: &mut EffectCx<'_>) -> Result<Step> {
        match self.stage {
            NewStage::Start => {
                cx.reset()?;
                cx.add(Mark::New)?;
                self.stage = NewStage::Marked {
                    fallback_at: cx.now_ms.saturating_add(self.fallback_ms),
                };
                Ok(Step::Pending)
            }
            NewStage::Marked { fallback_at } => {
                if cx.transition_ended || cx.elapsed(fallback_at) {
                    cx.swap(Mark::New, Mark::Pulse)?;
                    self.stage = NewStage::Pulsing {
                        until: cx.now_ms.saturating_add(self.pulse_ms),
                    };
                }
                Ok(Step::Pending)
            }
            NewStage::Pulsing { until } => {
                if !cx.elapsed(until) {
                    return Ok(Step::Pending);
                }
                cx.swap(Mark::Pulse, Mark::Done)?;
                cx.sink.apply(MarkChange::PersistAnimated)?;
                Ok(Step::Ready)
            }
        }
    }
}

/// `Removing`, held for a fixed duration. The caller tears the surface down afterwards.
#[derive(Clone, Copy, Debug)]
pub struct RemoveEffect {
    hold_ms: u64,
    until: Option<u64>,
}

impl RemoveEffect {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            hold_ms: timings.remove_ms,
            until: None,
        }
    }
}

impl EffectMachine for RemoveEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Remove
    }

    fn poll(&mut self, cx: &mut EffectCx<'_>) -> Result<Step> {
        match self.until {
            None => {
                cx.reset()?;
                cx.add(Mark::Removing)?;
                self.until = Some(cx.now_ms.saturating_add(self.hold_ms));
                Ok(Step::Pending)
            }
            Some(until) if cx.elapsed(until) => Ok(Step::Ready),
            Some(_) => Ok(Step::Pending),
        }
    }
}

/// A single `Pulse`, cleared when it ends.
#[derive(Clone, Copy, Debug)]
pub struct UpdateEffect {
    hold_ms: u64,
    until: Option<u64>,
}

impl UpdateEffect {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            hold_ms: timings.update_ms,
            until: None,
        }
    }
}

impl EffectMachine for UpdateEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Update
    }

    fn poll(&mut self, cx: &mut EffectCx<'_>) -> Result<Step> {
        match self.until {
            None => {
                cx.reset()?;
                cx.add(Mark::Pulse)?;
                self.until = Some(cx.now_ms.saturating_add(self.hold_ms));
                Ok(Step::Pending)
            }
            Some(until) if cx.elapsed(until) => {
                cx.remove(Mark::Pulse)?;
                Ok(Step::Ready)
            }
            Some(_) => Ok(Step::Pending),
        }
    }
}

/// `Entering` for a couple of frames, then `Visible`, then `Done`.
///
/// Frames are counted in polls: the scheduler polls once per display refresh.
#[derive(Clone, Copy, Debug)]
pub struct EntranceEffect {
    frames: u32,
    visible_ms: u64,
    stage: EntranceStage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntranceStage {
    Start,
    Entering { frames_left: u32 },
    Visible { until: u64 },
}

impl EntranceEffect {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            frames: timings.entrance_frames,
            visible_ms: timings.entrance_visible_ms,
            stage: EntranceStage::Start,
        }
    }

    fn reveal(&mut self, cx: &mut EffectCx<'_>) -> Result<Step> {
        cx.swap(Mark::Entering, Mark::Visible)?;
        self.stage = EntranceStage::Visible {
            until: cx.now_ms.saturating_add(self.visible_ms),
        };
        Ok(Step::Pending)
    }
}

impl EffectMachine for EntranceEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Entrance
    }

    fn poll(&mut self, cx: &mut EffectCx<'_>) -> Result<Step> {
        match self.stage {
            EntranceStage::Start => {
                cx.add(Mark::Entering)?;
                if self.frames == 0 {
                    return self.reveal(cx);
                }
                self.stage = EntranceStage::Entering {
                    frames_left: self.frames,
                };
                Ok(Step::Pending)
            }
            EntranceStage::Entering { frames_left } => {
                let frames_left = frames_left.saturating_sub(1);
                if frames_left > 0 {
                    self.stage = EntranceStage::Entering { frames_left };
                    return Ok(Step::Pending);
                }
                self.reveal(cx)
            }
            EntranceStage::Visible { until } => {
                if !cx.elapsed(until) {
                    return Ok(Step::Pending);
                }
                cx.add(Mark::Done)?;
                Ok(Step::Ready)
            }
        }
    }
}
