use alloc::format;

use crate::{Error, Result};

/// Grid geometry and buffering for the window calculator.
///
/// All lengths are in host pixels along the scroll axis unless noted otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutOptions {
    /// Height of one card row.
    pub item_height: u32,
    /// Cards per row. Recomputed from the container width on resize.
    pub items_per_row: usize,
    /// Rows materialized above and below the viewport.
    pub buffer_rows: usize,
    /// Extra rows materialized ahead of the scroll direction, so entrance effects can start
    /// before a card scrolls in.
    pub animation_buffer_rows: usize,
    /// Where the grid starts inside the scroll container. Offsets above it count as 0.
    pub scroll_margin: u64,
    /// Estimated card width, used to derive `items_per_row` from the container width.
    pub card_width: u32,
    /// Horizontal gap between cards.
    pub card_gap: u32,
    /// Margin around the real viewport used by the visibility observer.
    pub visibility_margin_px: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            item_height: 420,
            items_per_row: 5,
            buffer_rows: 3,
            animation_buffer_rows: 2,
            scroll_margin: 0,
            card_width: 250,
            card_gap: 20,
            visibility_margin_px: 50,
        }
    }
}

impl LayoutOptions {
    pub fn with_item_height(mut self, item_height: u32) -> Self {
        self.item_height = item_height;
        self
    }

    pub fn with_items_per_row(mut self, items_per_row: usize) -> Self {
        self.items_per_row = items_per_row;
        self
    }

    pub fn with_buffer_rows(mut self, buffer_rows: usize) -> Self {
        self.buffer_rows = buffer_rows;
        self
    }

    pub fn with_animation_buffer_rows(mut self, rows: usize) -> Self {
        self.animation_buffer_rows = rows;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u64) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_card_size(mut self, card_width: u32, card_gap: u32) -> Self {
        self.card_width = card_width;
        self.card_gap = card_gap;
        self
    }

    pub fn with_visibility_margin(mut self, margin_px: u32) -> Self {
        self.visibility_margin_px = margin_px;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_height == 0 {
            return Err(Error::Config("item_height must be > 0".into()));
        }
        if self.items_per_row == 0 {
            return Err(Error::Config("items_per_row must be > 0".into()));
        }
        if self.card_width == 0 {
            return Err(Error::Config("card_width must be > 0".into()));
        }
        Ok(())
    }
}

/// Durations of the per-effect state machines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectTimings {
    /// Longest wait for the host's transition-end signal on a `New` mark.
    pub new_fallback_ms: u64,
    pub new_pulse_ms: u64,
    pub remove_ms: u64,
    pub update_ms: u64,
    /// Display-refresh ticks between `Entering` and `Visible`.
    pub entrance_frames: u32,
    pub entrance_visible_ms: u64,
}

impl Default for EffectTimings {
    fn default() -> Self {
        Self {
            new_fallback_ms: 1500,
            new_pulse_ms: 500,
            remove_ms: 500,
            update_ms: 1000,
            entrance_frames: 2,
            entrance_visible_ms: 300,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerOptions {
    /// Queue length above which the low-priority backlog is shed.
    pub max_queue_len: usize,
    /// Entries at the head of the queue that survive shedding regardless of priority.
    pub retained_prefix: usize,
    /// Pause between two consecutive effects.
    pub settle_delay_ms: u64,
    /// Hard upper bound on a single effect. Anything still running past it resolves as failed.
    pub watchdog_ms: u64,
    pub timings: EffectTimings,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_queue_len: 200,
            retained_prefix: 150,
            settle_delay_ms: 50,
            watchdog_ms: 5000,
            timings: EffectTimings::default(),
        }
    }
}

impl SchedulerOptions {
    pub fn with_queue_bounds(mut self, max_queue_len: usize, retained_prefix: usize) -> Self {
        self.max_queue_len = max_queue_len;
        self.retained_prefix = retained_prefix;
        self
    }

    pub fn with_settle_delay_ms(mut self, settle_delay_ms: u64) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn with_watchdog_ms(mut self, watchdog_ms: u64) -> Self {
        self.watchdog_ms = watchdog_ms;
        self
    }

    pub fn with_timings(mut self, timings: EffectTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queue_len == 0 {
            return Err(Error::Config("max_queue_len must be > 0".into()));
        }
        if self.retained_prefix > self.max_queue_len {
            return Err(Error::Config(format!(
                "retained_prefix ({}) exceeds max_queue_len ({})",
                self.retained_prefix, self.max_queue_len
            )));
        }
        let t = &self.timings;
        let longest = t
            .new_fallback_ms
            .saturating_add(t.new_pulse_ms)
            .max(t.remove_ms)
            .max(t.update_ms)
            .max(t.entrance_visible_ms);
        if self.watchdog_ms <= longest {
            return Err(Error::Config(format!(
                "watchdog_ms ({}) must exceed the longest effect ({longest}ms)",
                self.watchdog_ms
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VelocityOptions {
    /// Per-event displacement above which scrolling counts as fast.
    pub fast_threshold_px: u64,
    /// Quiet time after the last scroll event before motion counts as settled.
    pub settle_ms: u64,
}

impl Default for VelocityOptions {
    fn default() -> Self {
        Self {
            fast_threshold_px: 5,
            settle_ms: 150,
        }
    }
}

impl VelocityOptions {
    pub fn with_fast_threshold_px(mut self, px: u64) -> Self {
        self.fast_threshold_px = px;
        self
    }

    pub fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }
}
