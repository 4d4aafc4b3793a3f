// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared object handles and index identities.

use alloc::rc::Rc;
use core::fmt::Debug;
use core::hash::{Hash, Hasher};
use core::ops::Deref;
use core::sync::atomic::{AtomicU32, Ordering};

/// Shared handle to a user object, compared by identity.
///
/// Cloning an `Indexable` yields another handle to the same object. Two handles are equal
/// only when they point at the same allocation, so several indexes can track the same
/// object without the object knowing anything about indexing. Each index keeps its own
/// per-object bookkeeping in a side table keyed by this identity.
pub struct Indexable<O>(Rc<O>);

impl<O> Indexable<O> {
    /// Wrap a new object.
    pub fn new(object: O) -> Self {
        Self(Rc::new(object))
    }

    /// Wrap an object that is already shared.
    pub fn from_rc(object: Rc<O>) -> Self {
        Self(object)
    }

    /// The wrapped object.
    #[inline]
    pub fn object(&self) -> &O {
        &self.0
    }

    /// The shared pointer to the wrapped object.
    #[inline]
    pub fn rc(&self) -> &Rc<O> {
        &self.0
    }

    /// Unwrap into the shared pointer.
    pub fn into_rc(self) -> Rc<O> {
        self.0
    }

    /// Whether both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<O> Clone for Indexable<O> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<O> PartialEq for Indexable<O> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<O> Eq for Indexable<O> {}

impl<O> Hash for Indexable<O> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl<O> Deref for Indexable<O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.0
    }
}

impl<O> From<Rc<O>> for Indexable<O> {
    fn from(object: Rc<O>) -> Self {
        Self(object)
    }
}

impl<O: Debug> Debug for Indexable<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Indexable").field(&*self.0).finish()
    }
}

/// Stable identity of an index instance, issued at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(u32);

impl IndexId {
    /// Issue a fresh identity.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value, for diagnostics.
    pub const fn get(self) -> u32 {
        self.0
    }
}
