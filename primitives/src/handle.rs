//! Handle table — opaque integer handles to host values.
//!
//! The guest never sees host objects directly. It holds small integers that
//! index into a [`HandleTable`] owned by the bridge instance. Unused slots
//! form an intrusive free list (each free slot stores the index of the next
//! free slot), so allocate and release are O(1) and the table never compacts.
//!
//! The lowest [`RESERVED_HANDLES`] slots hold sentinel values
//! (`none`, `undefined`, `null`, `true`, `false`) and are never recycled.

use alloc::vec::Vec;
use core::fmt;

use crate::error::HandleError;
use crate::types::{
    HANDLE_FALSE, HANDLE_NONE, HANDLE_NULL, HANDLE_TRUE, HANDLE_UNDEFINED, RESERVED_HANDLES,
};

/// An opaque reference to a slot in a [`HandleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub const NONE: Handle = Handle(HANDLE_NONE);
    pub const UNDEFINED: Handle = Handle(HANDLE_UNDEFINED);
    pub const NULL: Handle = Handle(HANDLE_NULL);
    pub const TRUE: Handle = Handle(HANDLE_TRUE);
    pub const FALSE: Handle = Handle(HANDLE_FALSE);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Reinterpret an `i32` received across the ABI.
    pub fn from_abi(raw: i32) -> Self {
        Self(raw as u32)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The `i32` form passed back to the guest.
    pub fn to_abi(self) -> i32 {
        self.0 as i32
    }

    /// Sentinel handles live below [`RESERVED_HANDLES`].
    pub fn is_sentinel(self) -> bool {
        self.0 < RESERVED_HANDLES
    }

    /// The sentinel for a boolean value.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied(T),
    Free { next: u32 },
}

/// Slot table mapping [`Handle`]s to values.
///
/// `free_head == slots.len()` means the free list is empty and the next
/// allocation appends.
#[derive(Debug, Clone)]
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_head: u32,
    live: usize,
}

impl<T> HandleTable<T> {
    /// Create a table whose reserved slots hold `sentinels`, in the order
    /// `none, undefined, null, true, false`.
    pub fn with_sentinels(sentinels: [T; RESERVED_HANDLES as usize]) -> Self {
        Self::with_capacity(sentinels, 0)
    }

    /// Like [`with_sentinels`](Self::with_sentinels), reserving room for
    /// `capacity` additional live handles.
    pub fn with_capacity(sentinels: [T; RESERVED_HANDLES as usize], capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(RESERVED_HANDLES as usize + capacity);
        slots.extend(sentinels.into_iter().map(Slot::Occupied));
        Self {
            slots,
            free_head: RESERVED_HANDLES,
            live: 0,
        }
    }

    /// Store `value` and return a fresh handle for it.
    ///
    /// Reuses the most recently released slot before growing the table.
    pub fn allocate(&mut self, value: T) -> Handle {
        let idx = self.free_head;
        if idx as usize == self.slots.len() {
            self.slots.push(Slot::Occupied(value));
            self.free_head = idx + 1;
        } else {
            match core::mem::replace(&mut self.slots[idx as usize], Slot::Occupied(value)) {
                Slot::Free { next } => self.free_head = next,
                Slot::Occupied(_) => unreachable!("free list head {} is occupied", idx),
            }
        }
        self.live += 1;
        Handle(idx)
    }

    /// Resolve a handle to its value.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.0 as usize) {
            Some(Slot::Occupied(v)) => Some(v),
            _ => None,
        }
    }

    /// Resolve a handle to a mutable reference.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.0 as usize) {
            Some(Slot::Occupied(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns true if `handle` currently resolves.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Release a handle so its slot can be reused.
    ///
    /// Releasing a sentinel is a no-op.
    pub fn release(&mut self, handle: Handle) -> Result<(), HandleError> {
        self.remove(handle).map(|_| ())
    }

    /// Release a non-sentinel slot and hand back its value.
    ///
    /// Returns `Ok(None)` for sentinels, which stay in place.
    pub fn remove(&mut self, handle: Handle) -> Result<Option<T>, HandleError> {
        if handle.is_sentinel() {
            return Ok(None);
        }
        let idx = handle.0 as usize;
        let slot = self
            .slots
            .get_mut(idx)
            .ok_or(HandleError::OutOfRange(handle.0))?;
        if let Slot::Free { .. } = slot {
            return Err(HandleError::Released(handle.0));
        }
        let prev = core::mem::replace(slot, Slot::Free { next: self.free_head });
        self.free_head = handle.0;
        self.live -= 1;
        match prev {
            Slot::Occupied(v) => Ok(Some(v)),
            Slot::Free { .. } => unreachable!(),
        }
    }

    /// Number of live (non-sentinel) handles.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Total number of slots, including sentinels and free slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: Clone> HandleTable<T> {
    /// Resolve and release in one step.
    ///
    /// Taking a sentinel yields a copy of the sentinel value.
    pub fn take(&mut self, handle: Handle) -> Result<T, HandleError> {
        if handle.is_sentinel() {
            return self
                .get(handle)
                .cloned()
                .ok_or(HandleError::OutOfRange(handle.0));
        }
        match self.remove(handle)? {
            Some(v) => Ok(v),
            None => Err(HandleError::Released(handle.0)),
        }
    }

    /// Allocate a second, independently released handle for the same value.
    pub fn duplicate(&mut self, handle: Handle) -> Result<Handle, HandleError> {
        let value = match self.slots.get(handle.0 as usize) {
            Some(Slot::Occupied(v)) => v.clone(),
            Some(Slot::Free { .. }) => return Err(HandleError::Released(handle.0)),
            None => return Err(HandleError::OutOfRange(handle.0)),
        };
        Ok(self.allocate(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HandleTable<&'static str> {
        HandleTable::with_sentinels(["none", "undefined", "null", "true", "false"])
    }

    #[test]
    fn test_sentinels_resolve() {
        let t = table();
        assert_eq!(t.get(Handle::NONE), Some(&"none"));
        assert_eq!(t.get(Handle::UNDEFINED), Some(&"undefined"));
        assert_eq!(t.get(Handle::NULL), Some(&"null"));
        assert_eq!(t.get(Handle::TRUE), Some(&"true"));
        assert_eq!(t.get(Handle::FALSE), Some(&"false"));
        assert_eq!(t.live(), 0);
    }

    #[test]
    fn test_allocate_appends_after_reserved() {
        let mut t = table();
        let a = t.allocate("a");
        let b = t.allocate("b");
        assert_eq!(a.as_raw(), RESERVED_HANDLES);
        assert_eq!(b.as_raw(), RESERVED_HANDLES + 1);
        assert_eq!(t.get(a), Some(&"a"));
        assert_eq!(t.live(), 2);
    }

    #[test]
    fn test_release_reuses_most_recent_slot() {
        let mut t = table();
        let a = t.allocate("a");
        let b = t.allocate("b");
        let c = t.allocate("c");
        t.release(a).unwrap();
        t.release(c).unwrap();

        // LIFO: c's slot comes back first, then a's, then the table grows.
        assert_eq!(t.allocate("d"), c);
        assert_eq!(t.allocate("e"), a);
        let f = t.allocate("f");
        assert_eq!(f.as_raw(), RESERVED_HANDLES + 3);
        assert_eq!(t.get(b), Some(&"b"));
        assert_eq!(t.get(c), Some(&"d"));
    }

    #[test]
    fn test_release_sentinel_is_noop() {
        let mut t = table();
        t.release(Handle::NULL).unwrap();
        t.release(Handle::NULL).unwrap();
        assert_eq!(t.get(Handle::NULL), Some(&"null"));
        let h = t.allocate("x");
        assert!(!h.is_sentinel());
    }

    #[test]
    fn test_double_release_detected() {
        let mut t = table();
        let a = t.allocate("a");
        t.release(a).unwrap();
        assert_eq!(t.release(a), Err(HandleError::Released(a.as_raw())));
        assert_eq!(t.get(a), None);
    }

    #[test]
    fn test_out_of_range() {
        let mut t = table();
        let bogus = Handle::from_raw(999);
        assert_eq!(t.get(bogus), None);
        assert_eq!(t.release(bogus), Err(HandleError::OutOfRange(999)));
    }

    #[test]
    fn test_take_releases() {
        let mut t = table();
        let a = t.allocate("a");
        assert_eq!(t.take(a).unwrap(), "a");
        assert!(!t.contains(a));
        assert_eq!(t.live(), 0);
        assert_eq!(t.take(Handle::TRUE).unwrap(), "true");
        assert!(t.contains(Handle::TRUE));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut t = table();
        let a = t.allocate("a");
        let dup = t.duplicate(a).unwrap();
        assert_ne!(a, dup);
        t.release(a).unwrap();
        assert_eq!(t.get(dup), Some(&"a"));
    }

    #[test]
    fn test_abi_conversion() {
        let h = Handle::from_abi(42);
        assert_eq!(h.to_abi(), 42);
        assert_eq!(Handle::from_bool(true), Handle::TRUE);
        assert_eq!(Handle::from_bool(false), Handle::FALSE);
    }
}
