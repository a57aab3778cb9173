// Example: window math plus the reconciler against a host that only counts surfaces.
use cardgrid::{
    ItemPool, ItemRecord, ItemStore, LayoutOptions, Result, ScrollDirection, SurfaceHost,
    compute_window, content_height, items_per_row_for_width,
};

#[derive(Default)]
struct CountingHost {
    live: usize,
}

impl SurfaceHost<u32> for CountingHost {
    type Surface = String;

    fn create_surface(&mut self, item: &ItemRecord<u32>) -> Result<String> {
        self.live += 1;
        Ok(format!("<card #{}>", item.id))
    }

    fn release_surface(&mut self, _id: &u32, _surface: String) {
        self.live -= 1;
    }
}

fn main() -> Result<()> {
    let per_row = items_per_row_for_width(1330, 250, 20);
    let layout = LayoutOptions::default().with_items_per_row(per_row);
    let mut store = ItemStore::new((0..10_000u32).map(|id| ItemRecord::new(id, "{}")))?;
    let mut pool = ItemPool::new();
    let mut host = CountingHost::default();

    println!("items_per_row={per_row}");
    println!("content_height={}", content_height(&layout, store.len()));

    let mut last = 0u64;
    for offset in [0u64, 420, 4_200, 42_000, 40_000, 0] {
        let direction = if offset >= last {
            ScrollDirection::Forward
        } else {
            ScrollDirection::Backward
        };
        last = offset;

        let window = compute_window(&layout, offset, 800, store.len(), Some(direction));
        let plan = pool.reconcile(window, &mut store, &mut host, &mut ());
        println!(
            "offset={offset} window={window:?} create={} reuse={} destroy={} live={}",
            plan.to_create.len(),
            plan.to_reuse.len(),
            plan.to_destroy.len(),
            host.live
        );
    }

    if let Some(surface) = pool.surface(&0) {
        println!("surface for #0: {surface}");
    }
    Ok(())
}
