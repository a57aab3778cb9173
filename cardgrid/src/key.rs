#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "std")]
use std::collections::{HashMap, HashSet};

#[cfg(feature = "std")]
pub(crate) type IdMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type IdMap<K, V> = BTreeMap<K, V>;

#[cfg(feature = "std")]
pub(crate) type IdSet<K> = HashSet<K>;
#[cfg(not(feature = "std"))]
pub(crate) type IdSet<K> = BTreeSet<K>;

/// Identity of an item across the whole list.
///
/// Ids are assigned by the data source and never reused while the item exists. With `std` they
/// are hashed; without it they are ordered.
#[cfg(feature = "std")]
pub trait ItemId: core::hash::Hash + Eq + Clone + core::fmt::Debug {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone + core::fmt::Debug> ItemId for K {}

#[cfg(not(feature = "std"))]
pub trait ItemId: Ord + Clone + core::fmt::Debug {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone + core::fmt::Debug> ItemId for K {}
