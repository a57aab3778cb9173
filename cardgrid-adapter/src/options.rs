use cardgrid::{Error, LayoutOptions, Result, SchedulerOptions, VelocityOptions};

use crate::Easing;

/// Everything a [`crate::Gallery`] needs besides its host and data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GalleryOptions {
    pub layout: LayoutOptions,
    pub scheduler: SchedulerOptions,
    pub velocity: VelocityOptions,
    /// Quiet time after the last resize before cards per row are recomputed.
    pub resize_debounce_ms: u64,
    /// Duration of the scroll-to-top animation that follows an insert.
    pub scroll_to_top_ms: u64,
    pub scroll_to_top_easing: Easing,
    /// Delay between inserting an item and starting its `New` effect.
    pub new_effect_delay_ms: u64,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            scheduler: SchedulerOptions::default(),
            velocity: VelocityOptions::default(),
            resize_debounce_ms: 250,
            scroll_to_top_ms: 400,
            scroll_to_top_easing: Easing::EaseOutCubic,
            new_effect_delay_ms: 500,
        }
    }
}

impl GalleryOptions {
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerOptions) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_velocity(mut self, velocity: VelocityOptions) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_resize_debounce_ms(mut self, ms: u64) -> Self {
        self.resize_debounce_ms = ms;
        self
    }

    pub fn with_scroll_to_top(mut self, duration_ms: u64, easing: Easing) -> Self {
        self.scroll_to_top_ms = duration_ms;
        self.scroll_to_top_easing = easing;
        self
    }

    pub fn with_new_effect_delay_ms(mut self, ms: u64) -> Self {
        self.new_effect_delay_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.scheduler.validate()?;
        if self.velocity.settle_ms == 0 {
            return Err(Error::Config("velocity.settle_ms must be > 0".into()));
        }
        Ok(())
    }
}
