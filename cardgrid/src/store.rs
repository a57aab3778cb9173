use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::key::{IdMap, IdSet, ItemId};
use crate::{Error, MaterializationState, Result};

/// Descriptions longer than this get a "see more" affordance.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 120;

/// One card in the list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRecord<K> {
    pub id: K,
    /// Dense ordinal, reassigned by the store on every mutation.
    pub index: usize,
    /// Serialized card content, opaque to the engine.
    pub content: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Lazy content (e.g. the thumbnail) has been requested.
    pub loaded: bool,
    /// The card has finished its presentation effect and must not replay it.
    pub animated: bool,
    pub state: MaterializationState,
}

impl<K> ItemRecord<K> {
    pub fn new(id: K, content: impl Into<String>) -> Self {
        Self {
            id,
            index: 0,
            content: content.into(),
            title: None,
            description: None,
            loaded: false,
            animated: false,
            state: MaterializationState::Unmaterialized,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_more_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| d.chars().count() > DESCRIPTION_PREVIEW_CHARS)
    }
}

/// The ordered, id-unique list of cards.
#[derive(Clone, Debug)]
pub struct ItemStore<K> {
    items: Vec<ItemRecord<K>>,
    index_of: IdMap<K, usize>,
}

impl<K: ItemId> Default for ItemStore<K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index_of: IdMap::default(),
        }
    }
}

impl<K: ItemId> ItemStore<K> {
    pub fn new(records: impl IntoIterator<Item = ItemRecord<K>>) -> Result<Self> {
        let mut store = Self::default();
        for record in records {
            if store.index_of.contains_key(&record.id) {
                return Err(Error::DuplicateId(format!("{:?}", record.id)));
            }
            store.index_of.insert(record.id.clone(), store.items.len());
            store.items.push(record);
        }
        store.reindex();
        vdebug!(count = store.items.len(), "ItemStore::new");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.index_of.contains_key(id)
    }

    pub fn index_of(&self, id: &K) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    pub fn get(&self, id: &K) -> Option<&ItemRecord<K>> {
        let index = *self.index_of.get(id)?;
        self.items.get(index)
    }

    pub fn get_mut(&mut self, id: &K) -> Option<&mut ItemRecord<K>> {
        let index = *self.index_of.get(id)?;
        self.items.get_mut(index)
    }

    pub fn at(&self, index: usize) -> Option<&ItemRecord<K>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemRecord<K>> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.items.iter().map(|item| &item.id)
    }

    /// Inserts a record at the head of the list.
    pub fn insert_front(&mut self, record: ItemRecord<K>) -> Result<()> {
        if self.index_of.contains_key(&record.id) {
            return Err(Error::DuplicateId(format!("{:?}", record.id)));
        }
        self.items.insert(0, record);
        self.reindex();
        Ok(())
    }

    pub fn remove(&mut self, id: &K) -> Option<ItemRecord<K>> {
        let index = self.index_of.remove(id)?;
        let record = self.items.remove(index);
        self.reindex();
        Some(record)
    }

    /// Rearranges the list to match `order`, which must name every current id exactly once.
    pub fn reorder(&mut self, order: &[K]) -> Result<()> {
        if order.len() != self.items.len() {
            return Err(Error::InvalidOrder(format!(
                "expected {} ids, got {}",
                self.items.len(),
                order.len()
            )));
        }
        let mut seen = IdSet::default();
        for id in order {
            if !self.index_of.contains_key(id) {
                return Err(Error::InvalidOrder(format!("unknown id {id:?}")));
            }
            if !seen.insert(id.clone()) {
                return Err(Error::InvalidOrder(format!("id {id:?} listed twice")));
            }
        }

        let mut slots: Vec<Option<ItemRecord<K>>> = self.items.drain(..).map(Some).collect();
        for id in order {
            let Some(&old) = self.index_of.get(id) else {
                continue;
            };
            if let Some(record) = slots.get_mut(old).and_then(Option::take) {
                self.items.push(record);
            }
        }
        self.reindex();
        Ok(())
    }

    /// `(id, position)` pairs for persistence, where the head of the list has the highest
    /// position.
    pub fn order_positions(&self) -> Vec<(K, usize)> {
        let total = self.items.len();
        self.items
            .iter()
            .map(|item| (item.id.clone(), total - item.index))
            .collect()
    }

    fn reindex(&mut self) {
        self.index_of.clear();
        for (index, item) in self.items.iter_mut().enumerate() {
            item.index = index;
            self.index_of.insert(item.id.clone(), index);
        }
    }
}
