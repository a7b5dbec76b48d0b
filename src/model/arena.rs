//! Handle-addressed working storage.
//!
//! The merge working set lives in arenas addressed by stable integer
//! handles. Removing an element leaves a tombstone; slots are never reused
//! or spliced out, so handles stay valid for the whole merge.

/// Stable index into an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
    /// Position of the slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Handle for an explicit slot position.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Live(T),
    Tombstone,
}

/// Append-only storage with tombstoning.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Stores `value` and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        let handle = Handle(self.slots.len());
        self.slots.push(Slot::Live(value));
        self.live += 1;
        handle
    }

    /// Returns the element, or None if the handle is tombstoned or unknown.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.0) {
            Some(Slot::Live(value)) => Some(value),
            _ => None,
        }
    }

    /// Replaces the element with a tombstone and returns it.
    pub fn tombstone(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.0)?;
        match std::mem::replace(slot, Slot::Tombstone) {
            Slot::Live(value) => {
                self.live -= 1;
                Some(value)
            }
            Slot::Tombstone => None,
        }
    }

    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of slots ever allocated, tombstones included.
    #[must_use]
    pub fn capacity_used(&self) -> usize {
        self.slots.len()
    }

    /// Number of live elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live elements in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Live(value) => Some((Handle(i), value)),
            Slot::Tombstone => None,
        })
    }
}
