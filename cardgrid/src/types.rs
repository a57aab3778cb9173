/// A half-open range of item indexes that should be materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    pub start_index: usize,
    pub end_index: usize, // exclusive
}

impl Window {
    pub const EMPTY: Window = Window {
        start_index: 0,
        end_index: 0,
    };

    /// Creates a window, collapsing inverted bounds to an empty window at `start_index`.
    pub fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index: end_index.max(start_index),
        }
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }

    /// Clips both bounds to `[0, count]`.
    pub fn clip(self, count: usize) -> Self {
        Self::new(self.start_index.min(count), self.end_index.min(count))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Motion classification reported by [`crate::VelocityClassifier`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollClass {
    /// No scroll event within the settle window.
    #[default]
    Settled,
    /// Scrolling, but below the fast threshold.
    Moving,
    /// Per-event displacement above the fast threshold. Entrance effects are suppressed.
    Fast,
}

/// Scheduling priority. Declared low to high so `Ord` matches urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    /// Ambient entrance effects.
    Low,
    /// Content updates and new-item pulses.
    Medium,
    /// Removals. Preempts all queued idle work.
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    New,
    Remove,
    Update,
    Entrance,
}

impl EffectKind {
    /// The priority the gallery submits this effect with.
    pub fn default_priority(self) -> Priority {
        match self {
            Self::Remove => Priority::High,
            Self::New | Self::Update => Priority::Medium,
            Self::Entrance => Priority::Low,
        }
    }
}

/// A named visual state carried by a surface. Hosts map marks to styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mark {
    New,
    Pulse,
    Done,
    Removing,
    Entering,
    Visible,
}

/// A single mutation an effect asks the host to perform on its target surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarkChange {
    /// Remove every transient mark (`New`, `Pulse`, `Removing`, `Entering`, `Visible`) and any
    /// inline animation state.
    Reset,
    Add(Mark),
    Remove(Mark),
    /// Persist the "already animated" flag on the item.
    PersistAnimated,
}

/// How an animation request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectOutcome {
    /// The state machine ran to its last step.
    Completed,
    /// The target surface was detached; the machine stopped without touching it.
    Stale,
    /// A step failed or the watchdog expired.
    Failed,
    /// Removed by `cancel` or `clear`.
    Cancelled,
    /// Dropped from the queue by the overflow policy before it started.
    Shed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterializationState {
    #[default]
    Unmaterialized,
    Materializing,
    Materialized,
    Visible,
    Animating,
    Retiring,
}
