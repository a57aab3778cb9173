// Example: the single-flight scheduler driven by a 60 Hz tick, printing every mark it applies.
use cardgrid::{
    AnimationScheduler, EffectKind, MarkChange, MarkHost, Priority, Result, SchedulerOptions,
};

struct PrintHost;

impl MarkHost<&'static str> for PrintHost {
    fn is_attached(&self, _id: &&'static str) -> bool {
        true
    }

    fn apply(&mut self, id: &&'static str, change: MarkChange) -> Result<()> {
        println!("    {id}: {change:?}");
        Ok(())
    }
}

fn main() {
    let mut scheduler = AnimationScheduler::new(SchedulerOptions::default());
    let mut host = PrintHost;

    // Entrances queue up, then a removal jumps ahead of them.
    scheduler.add("a", EffectKind::Entrance, Priority::Low);
    scheduler.add("b", EffectKind::Entrance, Priority::Low);
    scheduler.add_with_completion("c", EffectKind::Remove, Priority::High, |id, outcome| {
        println!("    completion: {id} -> {outcome:?}");
    });
    // Duplicate: dropped.
    let accepted = scheduler.add("a", EffectKind::Update, Priority::Medium);
    println!("duplicate accepted={accepted}");

    let mut now_ms = 0u64;
    while scheduler.is_processing() || scheduler.queue_len() > 0 {
        if let Some(resolution) = scheduler.tick(now_ms, &mut host) {
            println!(
                "t={now_ms} resolved {} {:?} -> {:?}",
                resolution.id, resolution.kind, resolution.outcome
            );
        }
        now_ms += 16;
    }
    println!("idle at t={now_ms}");
}
