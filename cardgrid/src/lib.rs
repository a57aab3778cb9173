//! A headless windowing and presentation-effect engine for large card grids.
//!
//! For the composed controller (coalesced scrolling, scroll-to-top, structural events), see the
//! `cardgrid-adapter` crate.
//!
//! The crate covers two cooperating concerns:
//! - structural windowing: O(1) window math over fixed-height rows and a reconciler that keeps
//!   exactly one surface per item in the window
//! - temporal scheduling: a single-flight, priority-ordered queue of per-item effects with at
//!   most one live request per item, bounded by an overflow shed policy
//!
//! It holds no UI objects. A host implements [`SurfaceHost`], [`MarkHost`],
//! [`VisibilityObserver`] and [`ContentLoader`], and drives everything with `now_ms`
//! timestamps, one [`AnimationScheduler::tick`] per display refresh.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod effect;
mod error;
mod key;
mod options;
mod pool;
mod scheduler;
mod store;
mod types;
mod velocity;
mod visibility;
mod window;

#[cfg(test)]
mod tests;

pub use effect::{
    EffectCx, EffectMachine, EntranceEffect, MarkSink, NewEffect, RemoveEffect, Step,
    UpdateEffect,
};
pub use error::{Error, Result};
pub use key::ItemId;
pub use options::{EffectTimings, LayoutOptions, SchedulerOptions, VelocityOptions};
pub use pool::{ItemPool, ReconcileHooks, ReconcilePlan, SurfaceHost};
pub use scheduler::{AnimationRequest, AnimationScheduler, Completion, MarkHost, Resolution};
pub use store::{DESCRIPTION_PREVIEW_CHARS, ItemRecord, ItemStore};
pub use types::{
    EffectKind, EffectOutcome, Mark, MarkChange, MaterializationState, Priority, ScrollClass,
    ScrollDirection, Window,
};
pub use velocity::VelocityClassifier;
pub use visibility::{ContentLoader, Intersection, Registration, VisibilityObserver, VisibilityTracker};
pub use window::{compute_window, content_height, items_per_row_for_width, row_offset};
