//! Gallery controller for the `cardgrid` engine.
//!
//! The `cardgrid` crate provides the building blocks (window math, reconciler, visibility
//! tracker, effect scheduler) and stays UI-agnostic. This crate composes them against a single
//! host and adds the workflows a card gallery needs:
//!
//! - Coalesced scroll handling and debounced resize
//! - Insert-at-head with scroll-to-top and a `New` effect
//! - Animated removal, reorder with persisted positions, content updates
//! - Structural card events, render metrics and pipeline introspection
//!
//! This crate is framework-agnostic (no DOM/egui bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod events;
mod gallery;
mod host;
mod metrics;
mod options;
mod tween;


pub use events::{CardAction, EventSink, ItemEvent, ItemEventKind};
pub use gallery::Gallery;
pub use host::GalleryHost;
pub use metrics::{Introspection, Metrics};
pub use options::GalleryOptions;
pub use tween::{Easing, ScrollTween};
