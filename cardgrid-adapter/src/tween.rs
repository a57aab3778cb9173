/// Adapter-driven scroll animation between two offsets.
///
/// The tween is sampled from `tick(now_ms)`; it owns no timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollTween {
    pub from: u64,
    pub to: u64,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub easing: Easing,
}

impl ScrollTween {
    pub fn new(from: u64, to: u64, start_ms: u64, duration_ms: u64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_ms,
            duration_ms: duration_ms.max(1),
            easing,
        }
    }

    /// A tween that brings `from` back to the top of the list.
    pub fn to_top(from: u64, start_ms: u64, duration_ms: u64) -> Self {
        Self::new(from, 0, start_ms, duration_ms, Easing::EaseOutCubic)
    }

    pub fn is_done(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_ms) >= self.duration_ms
    }

    /// Offset at `now_ms`. Exactly `to` once the tween is done.
    pub fn sample(&self, now_ms: u64) -> u64 {
        if self.is_done(now_ms) {
            return self.to;
        }
        let elapsed = now_ms.saturating_sub(self.start_ms);
        let t = (elapsed as f64 / self.duration_ms as f64).clamp(0.0, 1.0);
        let eased = self.easing.sample(t);

        let from = self.from as f64;
        let to = self.to as f64;
        (from + (to - from) * eased).max(0.0) as u64
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    Linear,
    SmoothStep,
    /// Fast start, gentle landing.
    #[default]
    EaseOutCubic,
}

impl Easing {
    pub fn sample(self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::EaseOutCubic => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
        }
    }
}
