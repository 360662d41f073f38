use std::collections::HashMap;
use std::fmt;

use crate::error::{GeocError, Result};

/// Opaque integer the guest holds to refer to a host-side resource.
///
/// Handles are only meaningful within the table that issued them: a shader
/// handle and a buffer handle may carry the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

impl Handle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Handle(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe handle table mapping integer handles to owned resources.
/// The guest holds these handles and passes them back through imports.
///
/// The counter only ever grows, so a destroyed handle's value is never handed
/// out again while stale copies may still live in guest memory.
pub struct ResourceTable<T> {
    items: HashMap<Handle, T>,
    next: u32,
}

impl<T> ResourceTable<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next: 0,
        }
    }

    /// Store a resource and return its handle.
    pub fn create(&mut self, item: T) -> Result<Handle> {
        let handle = Handle(self.next);
        self.next = self.next.checked_add(1).ok_or(GeocError::HandlesExhausted)?;
        self.items.insert(handle, item);
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.items.get_mut(&handle)
    }

    /// Remove the entry and hand the resource back so the caller can release it.
    pub fn destroy(&mut self, handle: Handle) -> Option<T> {
        self.items.remove(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.items.contains_key(&handle)
    }

    /// Iterate live entries in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        let mut entries: Vec<_> = self.items.iter().map(|(h, v)| (*h, v)).collect();
        entries.sort_by_key(|(h, _)| *h);
        entries.into_iter()
    }

    /// The value the next `create` will return.
    pub fn next_handle(&self) -> Handle {
        Handle(self.next)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every entry, returning them for release. The counter is kept.
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        let mut entries: Vec<_> = self.items.drain().collect();
        entries.sort_by_key(|(h, _)| *h);
        entries
    }
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
