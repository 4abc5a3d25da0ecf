//! Typed views over guest linear memory and their staleness rule.
//!
//! A view caches the identity of the buffer it was taken from. Growing the
//! guest's memory replaces the backing buffer, so every access first compares
//! the cached identity with the current one; a mismatch means the view is
//! stale and must be re-acquired before use.

use core::fmt;
use core::ops::Range;

/// Identity of the guest's current backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferIdentity {
    /// Host address of byte 0 of linear memory.
    pub base: usize,
    /// Current size of linear memory in bytes.
    pub len: usize,
}

/// Element type of a typed overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    U8,
    I32,
    F64,
}

impl ViewKind {
    const ALL: [ViewKind; 3] = [ViewKind::U8, ViewKind::I32, ViewKind::F64];

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I32 => 4,
            Self::F64 => 8,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::U8 => 0,
            Self::I32 => 1,
            Self::F64 => 2,
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::I32 => write!(f, "i32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// A view used after the buffer it was taken from was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleView {
    pub kind: ViewKind,
    pub taken: BufferIdentity,
    pub current: BufferIdentity,
}

impl fmt::Display for StaleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stale {} view: taken over {} bytes at {:#x}, memory is now {} bytes at {:#x}",
            self.kind, self.taken.len, self.taken.base, self.current.len, self.current.base
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StaleView {}

/// A typed overlay over one specific backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryView {
    kind: ViewKind,
    identity: BufferIdentity,
}

impl MemoryView {
    pub fn new(kind: ViewKind, identity: BufferIdentity) -> Self {
        Self { kind, identity }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn identity(&self) -> BufferIdentity {
        self.identity
    }

    /// Number of whole elements visible through this view.
    pub fn len(&self) -> usize {
        self.identity.len / self.kind.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Confirm the view still describes the current buffer.
    pub fn check(&self, current: BufferIdentity) -> Result<(), StaleView> {
        if self.identity == current {
            Ok(())
        } else {
            Err(StaleView {
                kind: self.kind,
                taken: self.identity,
                current,
            })
        }
    }

    /// Byte range covered by elements `[index, index + count)`.
    ///
    /// Returns `None` if the range does not fit inside the view.
    pub fn byte_range(&self, index: usize, count: usize) -> Option<Range<usize>> {
        let size = self.kind.element_size();
        let start = index.checked_mul(size)?;
        let end = start.checked_add(count.checked_mul(size)?)?;
        if end > self.identity.len {
            return None;
        }
        Some(start..end)
    }
}

/// One cached view per element type, re-validated on every acquisition.
#[derive(Debug, Clone, Default)]
pub struct ViewCache {
    views: [Option<MemoryView>; 3],
    refreshes: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a view of `kind` valid for `current`.
    ///
    /// The boolean is `true` when a cached view was found stale and replaced.
    pub fn acquire(&mut self, kind: ViewKind, current: BufferIdentity) -> (MemoryView, bool) {
        let mut refreshed = false;
        if let Some(view) = self.views[kind.slot()] {
            if view.check(current).is_ok() {
                return (view, false);
            }
            self.refreshes += 1;
            refreshed = true;
        }
        let view = MemoryView::new(kind, current);
        self.views[kind.slot()] = Some(view);
        (view, refreshed)
    }

    /// Cached view of `kind`, without validation.
    pub fn cached(&self, kind: ViewKind) -> Option<MemoryView> {
        self.views[kind.slot()]
    }

    /// Drop all cached views.
    pub fn invalidate(&mut self) {
        for kind in ViewKind::ALL {
            self.views[kind.slot()] = None;
        }
    }

    /// How many times a stale view has been replaced.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}
