use cardgrid::{EffectKind, ScrollClass, Window};

/// Render counters for diagnostics overlays.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    pub total_items: usize,
    pub materialized_count: usize,
    pub visible_range: Window,
    /// Wall time of the last window pass. Always 0 without `std`.
    pub last_render_duration_ms: f64,
    pub queue_length: usize,
    pub total_renders: u64,
    pub is_scrolling: bool,
    pub items_per_row: usize,
}

/// A snapshot of the effect pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Introspection<K> {
    pub queue_length: usize,
    pub executing: Option<K>,
    pub executing_kind: Option<EffectKind>,
    pub scroll_class: ScrollClass,
    pub processing: bool,
}
