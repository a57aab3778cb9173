use crate::{ScrollClass, ScrollDirection, VelocityOptions};

/// Classifies scroll motion from successive offsets.
///
/// `on_scroll` classifies each event by its displacement; `tick` reports the settle edge once the
/// stream has been quiet for `settle_ms`.
#[derive(Clone, Debug)]
pub struct VelocityClassifier {
    options: VelocityOptions,
    last_offset: Option<u64>,
    last_event_ms: u64,
    class: ScrollClass,
    direction: Option<ScrollDirection>,
}

impl VelocityClassifier {
    pub fn new(options: VelocityOptions) -> Self {
        Self {
            options,
            last_offset: None,
            last_event_ms: 0,
            class: ScrollClass::Settled,
            direction: None,
        }
    }

    pub fn options(&self) -> &VelocityOptions {
        &self.options
    }

    /// Feeds one scroll event and returns the resulting class.
    pub fn on_scroll(&mut self, offset: u64, now_ms: u64) -> ScrollClass {
        let previous = self.last_offset.replace(offset);
        self.last_event_ms = now_ms;

        let Some(previous) = previous else {
            self.class = ScrollClass::Moving;
            return self.class;
        };

        if offset > previous {
            self.direction = Some(ScrollDirection::Forward);
        } else if offset < previous {
            self.direction = Some(ScrollDirection::Backward);
        }

        self.class = if offset.abs_diff(previous) > self.options.fast_threshold_px {
            ScrollClass::Fast
        } else {
            ScrollClass::Moving
        };
        self.class
    }

    /// Returns `true` exactly once per burst of motion, on the first tick at least `settle_ms`
    /// after the last scroll event.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.class == ScrollClass::Settled {
            return false;
        }
        if now_ms.saturating_sub(self.last_event_ms) < self.options.settle_ms {
            return false;
        }
        self.class = ScrollClass::Settled;
        vtrace!(now_ms, "scroll settled");
        true
    }

    pub fn class(&self) -> ScrollClass {
        self.class
    }

    pub fn is_fast(&self) -> bool {
        self.class == ScrollClass::Fast
    }

    pub fn is_scrolling(&self) -> bool {
        self.class != ScrollClass::Settled
    }

    /// Direction of the most recent non-zero displacement. `None` before any motion.
    pub fn direction(&self) -> Option<ScrollDirection> {
        self.direction
    }

    /// Forgets the previous offset, e.g. after a programmatic jump.
    pub fn reset(&mut self) {
        self.last_offset = None;
        self.class = ScrollClass::Settled;
        self.direction = None;
    }
}

impl Default for VelocityClassifier {
    fn default() -> Self {
        Self::new(VelocityOptions::default())
    }
}
