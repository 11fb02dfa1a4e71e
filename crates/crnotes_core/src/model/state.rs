//! Per-entity load state.

/// Where an entity's cached fields stand relative to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Only the id is known; fields are fetched on first read.
    #[default]
    Unloaded,
    /// Fields were fetched from or written to the store.
    Loaded,
    /// Persisted fields were removed; the handle must not be used again.
    Deleted,
}

impl LoadState {
    pub fn is_loaded(self) -> bool {
        self == Self::Loaded
    }

    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}
