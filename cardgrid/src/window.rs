//! Window math for a fixed-row-height card grid.
//!
//! Everything here is O(1) and allocation-free; the calculator never scans items.

use crate::{LayoutOptions, ScrollDirection, Window};

/// Computes the index range that should be materialized.
///
/// `scroll_offset` is measured from the scroll container origin; the grid begins at
/// `layout.scroll_margin`. `direction` selects the edge that receives the animation buffer:
/// the end when scrolling forward or at rest, the start when scrolling backward.
pub fn compute_window(
    layout: &LayoutOptions,
    scroll_offset: u64,
    viewport_height: u32,
    count: usize,
    direction: Option<ScrollDirection>,
) -> Window {
    if count == 0 {
        return Window::EMPTY;
    }

    let item_height = layout.item_height.max(1) as u64;
    let per_row = layout.items_per_row.max(1);

    let offset = scroll_offset.saturating_sub(layout.scroll_margin);
    let row = usize::try_from(offset / item_height).unwrap_or(usize::MAX);
    let visible_rows = usize::try_from((viewport_height as u64).div_ceil(item_height))
        .unwrap_or(usize::MAX);
    let total_rows = count.div_ceil(per_row);

    let (lead, trail) = match direction {
        Some(ScrollDirection::Backward) => (layout.animation_buffer_rows, 0),
        Some(ScrollDirection::Forward) | None => (0, layout.animation_buffer_rows),
    };

    let start_row = row.saturating_sub(layout.buffer_rows.saturating_add(lead));
    let end_row = row
        .saturating_add(visible_rows)
        .saturating_add(layout.buffer_rows)
        .saturating_add(trail)
        .min(total_rows);

    Window::new(
        start_row.saturating_mul(per_row),
        end_row.saturating_mul(per_row),
    )
    .clip(count)
}

/// Cards that fit in a container of `container_width`, never less than one.
pub fn items_per_row_for_width(container_width: u32, card_width: u32, card_gap: u32) -> usize {
    let slot = card_width.saturating_add(card_gap).max(1);
    let fit = container_width.saturating_add(card_gap) / slot;
    (fit as usize).max(1)
}

/// Total scrollable height of the grid (the host's spacer height).
pub fn content_height(layout: &LayoutOptions, count: usize) -> u64 {
    let rows = count.div_ceil(layout.items_per_row.max(1)) as u64;
    rows.saturating_mul(layout.item_height as u64)
}

/// Offset of the first materialized row, for translating the rendered block.
pub fn row_offset(layout: &LayoutOptions, window: Window) -> u64 {
    let row = (window.start_index / layout.items_per_row.max(1)) as u64;
    row.saturating_mul(layout.item_height as u64)
}
