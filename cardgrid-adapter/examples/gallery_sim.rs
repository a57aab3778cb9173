use std::collections::HashSet;

use cardgrid::{
    ContentLoader, Intersection, ItemRecord, MarkChange, MarkHost, Result, SurfaceHost,
    VisibilityObserver,
};
use cardgrid_adapter::{CardAction, EventSink, Gallery, GalleryOptions, ItemEvent};

/// A stand-in for a DOM bridge: tracks live cards and prints everything else.
#[derive(Default)]
struct ConsoleHost {
    live: HashSet<u64>,
}

impl SurfaceHost<u64> for ConsoleHost {
    type Surface = u64;

    fn create_surface(&mut self, item: &ItemRecord<u64>) -> Result<u64> {
        self.live.insert(item.id);
        Ok(item.id)
    }

    fn release_surface(&mut self, id: &u64, _surface: u64) {
        self.live.remove(id);
    }
}

impl MarkHost<u64> for ConsoleHost {
    fn is_attached(&self, id: &u64) -> bool {
        self.live.contains(id)
    }

    fn apply(&mut self, id: &u64, change: MarkChange) -> Result<()> {
        if matches!(change, MarkChange::Reset) {
            return Ok(());
        }
        println!("  card {id}: {change:?}");
        Ok(())
    }
}

impl VisibilityObserver<u64> for ConsoleHost {
    fn observe(&mut self, _id: &u64, _margin_px: u32) -> Result<()> {
        Ok(())
    }

    fn unobserve(&mut self, _id: &u64) {}
}

impl ContentLoader<u64> for ConsoleHost {
    fn load(&mut self, id: &u64) {
        println!("  load thumbnail {id}");
    }
}

impl EventSink<u64> for ConsoleHost {
    fn emit(&mut self, event: ItemEvent<u64>) {
        println!("  event {:?} for {} ({:?})", event.kind, event.id, event.title);
    }
}

fn main() -> Result<()> {
    // Example: a gallery driven frame by frame, as a browser bridge would.
    let records = (0..2_000u64).map(|id| ItemRecord::new(id, "{}").with_title(format!("Photo {id}")));
    let mut g = Gallery::new(ConsoleHost::default(), GalleryOptions::default(), records)?;
    g.on_resize(1330, 900, 0);
    g.tick(0);
    println!("first layout: {:?}", g.metrics());

    // The first row scrolls into view.
    let first_row: Vec<_> = (0..5).map(Intersection::entered).collect();
    println!("entrances submitted: {}", g.on_intersections(&first_row));

    let mut now_ms = 0u64;
    for _ in 0..120 {
        now_ms += 16;
        g.tick(now_ms);
    }

    // Fling down the list; entrances wait until the scroll settles.
    for step in 1..=10u64 {
        now_ms += 16;
        g.on_scroll(step * 2_000, now_ms);
        g.tick(now_ms);
    }
    println!("after fling: {:?}", g.introspect());

    // Upload a new photo: scroll back to the top and highlight it.
    g.insert_item(ItemRecord::new(10_000, "{}").with_title("Fresh upload"), now_ms)?;
    for _ in 0..200 {
        now_ms += 16;
        if let Some(offset) = g.tick(now_ms) {
            if offset == 0 {
                println!("t={now_ms} back at top");
            }
        }
    }

    g.activate(&10_000, CardAction::Edit);
    g.remove_item(&1);
    for _ in 0..60 {
        now_ms += 16;
        g.tick(now_ms);
    }
    println!("final: {:?}", g.metrics());

    g.teardown();
    Ok(())
}
