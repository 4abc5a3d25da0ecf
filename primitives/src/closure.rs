//! Reference counting for guest-owned closures.
//!
//! A guest closure is an opaque `(data, vtable)` pair plus the index of its
//! destructor. The host may call it any number of times (event listeners,
//! animation frames) and may still be holding it when the guest drops its own
//! reference, so the lifetime is tracked with a count:
//!
//! - registration holds one reference on behalf of the guest;
//! - every invocation holds one more for its duration;
//! - the guest's drop gives its reference back.
//!
//! Whoever brings the count to zero is responsible for cleanup: a guest drop
//! outside any invocation frees the closure itself, otherwise the in-flight
//! invocation's cleanup step receives a [`Destroy`] to run.

use alloc::collections::BTreeMap;

use crate::error::ClosureError;

/// Host-side identifier for a registered guest closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClosureId(u32);

impl ClosureId {
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// The guest's representation of a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestClosure {
    /// Pointer to the closure's environment in guest memory.
    pub data: u32,
    /// Pointer to the closure's vtable in guest memory.
    pub vtable: u32,
    /// Index of the guest function that destroys the environment.
    pub dtor: u32,
}

/// An invocation in progress. Must be handed back to
/// [`ClosureTable::end_invoke`] exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an invocation must be finished with `end_invoke`"]
pub struct Invocation {
    pub id: ClosureId,
    pub data: u32,
    pub vtable: u32,
}

/// Destructor call owed to the guest once the count reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destroy {
    pub dtor: u32,
    pub data: u32,
    pub vtable: u32,
}

#[derive(Debug, Clone)]
struct Entry {
    closure: GuestClosure,
    refs: u32,
    /// Zero while an invocation has taken the environment pointer.
    data: u32,
}

/// Registered guest closures, owned by one bridge instance.
#[derive(Debug, Clone, Default)]
pub struct ClosureTable {
    entries: BTreeMap<u32, Entry>,
    next_id: u32,
}

impl ClosureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure. The guest holds the initial reference.
    pub fn register(&mut self, closure: GuestClosure) -> ClosureId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.insert(
            id,
            Entry {
                closure,
                refs: 1,
                data: closure.data,
            },
        );
        ClosureId(id)
    }

    /// Take a reference for the duration of one call into the guest.
    ///
    /// Fails if the closure is unknown or its environment is currently taken
    /// (a re-entrant call from inside its own invocation).
    pub fn begin_invoke(&mut self, id: ClosureId) -> Result<Invocation, ClosureError> {
        let entry = self
            .entries
            .get_mut(&id.0)
            .ok_or(ClosureError::Unknown(id.0))?;
        if entry.data == 0 {
            return Err(ClosureError::Unavailable(id.0));
        }
        entry.refs += 1;
        let data = core::mem::take(&mut entry.data);
        Ok(Invocation {
            id,
            data,
            vtable: entry.closure.vtable,
        })
    }

    /// Give back the invocation's reference.
    ///
    /// Returns the destructor call to make if this was the last reference.
    pub fn end_invoke(&mut self, invocation: Invocation) -> Result<Option<Destroy>, ClosureError> {
        let key = invocation.id.0;
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or(ClosureError::Unknown(key))?;
        entry.refs -= 1;
        if entry.refs > 0 {
            entry.data = invocation.data;
            return Ok(None);
        }
        let dtor = entry.closure.dtor;
        self.entries.remove(&key);
        Ok(Some(Destroy {
            dtor,
            data: invocation.data,
            vtable: invocation.vtable,
        }))
    }

    /// The guest dropped its reference.
    ///
    /// Returns `true` when no invocation is in flight and the guest must
    /// free the closure itself; `false` when an invocation still holds a
    /// reference and will run the destructor during its cleanup.
    pub fn release(&mut self, id: ClosureId) -> Result<bool, ClosureError> {
        let entry = self
            .entries
            .get_mut(&id.0)
            .ok_or(ClosureError::Unknown(id.0))?;
        if entry.refs == 1 {
            self.entries.remove(&id.0);
            return Ok(true);
        }
        entry.refs -= 1;
        Ok(false)
    }

    /// Current reference count, if registered.
    pub fn refs(&self, id: ClosureId) -> Option<u32> {
        self.entries.get(&id.0).map(|e| e.refs)
    }

    pub fn contains(&self, id: ClosureId) -> bool {
        self.entries.contains_key(&id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSURE: GuestClosure = GuestClosure {
        data: 0x100,
        vtable: 0x200,
        dtor: 7,
    };

    #[test]
    fn test_register_holds_one_reference() {
        let mut t = ClosureTable::new();
        let id = t.register(CLOSURE);
        assert_eq!(t.refs(id), Some(1));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_invoke_while_referenced_never_destroys() {
        let mut t = ClosureTable::new();
        let id = t.register(CLOSURE);
        for _ in 0..5 {
            let inv = t.begin_invoke(id).unwrap();
            assert_eq!(inv.data, 0x100);
            assert_eq!(t.refs(id), Some(2));
            assert_eq!(t.end_invoke(inv).unwrap(), None);
            assert_eq!(t.refs(id), Some(1));
        }
        assert!(t.contains(id));
    }

    #[test]
    fn test_reentrant_invoke_is_unavailable() {
        let mut t = ClosureTable::new();
        let id = t.register(CLOSURE);
        let inv = t.begin_invoke(id).unwrap();
        assert_eq!(t.begin_invoke(id), Err(ClosureError::Unavailable(id.as_raw())));
        assert_eq!(t.end_invoke(inv).unwrap(), None);
        // Available again once the outer call finished.
        let inv = t.begin_invoke(id).unwrap();
        t.end_invoke(inv).unwrap();
    }

    #[test]
    fn test_release_outside_invocation_frees_in_guest() {
        let mut t = ClosureTable::new();
        let id = t.register(CLOSURE);
        assert!(t.release(id).unwrap());
        assert!(t.is_empty());
        assert_eq!(t.begin_invoke(id), Err(ClosureError::Unknown(id.as_raw())));
    }

    #[test]
    fn test_release_during_invocation_defers_destructor() {
        let mut t = ClosureTable::new();
        let id = t.register(CLOSURE);
        let inv = t.begin_invoke(id).unwrap();
        assert!(!t.release(id).unwrap());
        assert_eq!(t.refs(id), Some(1));
        let destroy = t.end_invoke(inv).unwrap();
        assert_eq!(
            destroy,
            Some(Destroy {
                dtor: 7,
                data: 0x100,
                vtable: 0x200
            })
        );
        assert!(!t.contains(id));
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut t = ClosureTable::new();
        let a = t.register(CLOSURE);
        let b = t.register(CLOSURE);
        assert_ne!(a, b);
        t.release(a).unwrap();
        assert!(t.contains(b));
    }
}
