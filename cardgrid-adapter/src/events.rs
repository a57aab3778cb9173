use alloc::string::String;

/// A structural request raised by a rendered card, for the host's dialogs and data source.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemEvent<K> {
    pub kind: ItemEventKind,
    pub id: K,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemEventKind {
    EditItem,
    DeleteItem,
    ViewDescription,
}

/// What the user activated on a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CardAction {
    Edit,
    Delete,
    /// The "see more" affordance under a long description.
    SeeMore,
    /// The title itself. Only a title the host had to truncate opens the description.
    Title { truncated: bool },
}

impl CardAction {
    pub(crate) fn event_kind(self) -> Option<ItemEventKind> {
        match self {
            Self::Edit => Some(ItemEventKind::EditItem),
            Self::Delete => Some(ItemEventKind::DeleteItem),
            Self::SeeMore | Self::Title { truncated: true } => Some(ItemEventKind::ViewDescription),
            Self::Title { truncated: false } => None,
        }
    }
}

/// Receives structural events.
pub trait EventSink<K> {
    fn emit(&mut self, event: ItemEvent<K>);
}
