// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The operation set every object index exposes, so indexes can be layered.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::error::{IndexError, Violation};
use crate::extent::Extent;
use crate::indexable::{IndexId, Indexable};

/// One query restriction. Indexes apply the kinds they recognize and ignore the others.
pub enum Criterion<O> {
    /// Objects whose extent overlaps the region. An undefined region selects only the
    /// objects whose own extent is undefined.
    Region(Extent),
    /// Objects ordered above the reference object.
    Above(Indexable<O>),
    /// Objects ordered below the reference object.
    Below(Indexable<O>),
}

impl<O> Clone for Criterion<O> {
    fn clone(&self) -> Self {
        match self {
            Self::Region(extent) => Self::Region(*extent),
            Self::Above(item) => Self::Above(item.clone()),
            Self::Below(item) => Self::Below(item.clone()),
        }
    }
}

impl<O: Debug> Debug for Criterion<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Region(extent) => f.debug_tuple("Region").field(extent).finish(),
            Self::Above(item) => f.debug_tuple("Above").field(item).finish(),
            Self::Below(item) => f.debug_tuple("Below").field(item).finish(),
        }
    }
}

/// A conjunction of [`Criterion`]s. The empty set selects everything.
pub struct SearchCriteria<O> {
    criteria: SmallVec<[Criterion<O>; 2]>,
}

impl<O> SearchCriteria<O> {
    /// Criteria selecting every object.
    pub fn new() -> Self {
        Self {
            criteria: SmallVec::new(),
        }
    }

    /// Criteria selecting the objects overlapping `region`.
    pub fn region(region: Extent) -> Self {
        Self::new().with(Criterion::Region(region))
    }

    /// Add a restriction.
    #[must_use]
    pub fn with(mut self, criterion: Criterion<O>) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// All restrictions, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Criterion<O>> + '_ {
        self.criteria.iter()
    }

    /// The first region restriction, if any.
    pub fn region_criterion(&self) -> Option<&Extent> {
        self.criteria.iter().find_map(|c| match c {
            Criterion::Region(extent) => Some(extent),
            _ => None,
        })
    }

    /// Whether no restriction is present.
    pub fn is_unrestricted(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl<O> Default for SearchCriteria<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for SearchCriteria<O> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
        }
    }
}

impl<O: Debug> Debug for SearchCriteria<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.criteria.iter()).finish()
    }
}

/// Operations shared by every object index.
///
/// Indexes track shared [`Indexable`] handles and keep their own bookkeeping per object,
/// so one object can be tracked by several indexes at once. A combined index adds and
/// removes through each inner index and narrows query results by passing the candidates
/// of one index as the subset of the next.
pub trait ObjectIndex<O> {
    /// Identity of this index instance.
    fn index_id(&self) -> IndexId;

    /// Number of tracked objects.
    fn len(&self) -> usize;

    /// Whether no object is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tracked handle for `item`'s object, if this index tracks it.
    fn tracked(&self, item: &Indexable<O>) -> Option<Indexable<O>>;

    /// Whether `item`'s object is tracked.
    fn contains(&self, item: &Indexable<O>) -> bool {
        self.tracked(item).is_some()
    }

    /// Start tracking `item`.
    ///
    /// Fails with [`Violation::AlreadyIndexed`][crate::Violation::AlreadyIndexed] if it is
    /// tracked already.
    fn add_indexable(&mut self, item: Indexable<O>) -> Result<(), IndexError>;

    /// Stop tracking `item`.
    ///
    /// Fails with [`Violation::NotIndexed`][crate::Violation::NotIndexed] if it is not tracked.
    fn remove_indexable(&mut self, item: &Indexable<O>) -> Result<(), IndexError>;

    /// Tracked objects matching `criteria`.
    ///
    /// With `sort`, indexes that define an order return results in that order.
    fn query_indexables(&self, criteria: &SearchCriteria<O>, sort: bool) -> Vec<Indexable<O>>;

    /// The members of `subset` that are tracked and match `criteria`.
    ///
    /// Without `sort`, the order of `subset` is preserved.
    fn query_subset(
        &self,
        criteria: &SearchCriteria<O>,
        subset: &[Indexable<O>],
        sort: bool,
    ) -> Vec<Indexable<O>>;

    /// Whether [`Self::interacting_objects`] is answered from index structure.
    fn supports_interacting_retrieval(&self) -> bool {
        false
    }

    /// Tracked objects that may interact with any of `items`.
    ///
    /// The default is conservative and returns everything.
    fn interacting_objects(&self, items: &[Indexable<O>]) -> Vec<Indexable<O>> {
        let _ = items;
        self.query_indexables(&SearchCriteria::new(), false)
    }

    /// Resolve a handle that may not be the one this index tracks to the tracked
    /// one, or to itself if the object is new.
    fn filled_indexable_for(&self, item: &Indexable<O>) -> Indexable<O> {
        self.tracked(item).unwrap_or_else(|| item.clone())
    }

    /// Wrap and track a new object, returning its handle.
    fn add(&mut self, object: O) -> Result<Indexable<O>, IndexError> {
        let item = Indexable::new(object);
        self.add_indexable(item.clone())?;
        Ok(item)
    }

    /// Stop tracking `item`, returning the tracked object.
    fn remove(&mut self, item: &Indexable<O>) -> Result<Rc<O>, IndexError> {
        let tracked = self.tracked(item).ok_or(Violation::NotIndexed)?;
        self.remove_indexable(&tracked)?;
        Ok(tracked.into_rc())
    }

    /// Track several objects in order, stopping at the first failure.
    fn add_indexables<I>(&mut self, items: I) -> Result<(), IndexError>
    where
        Self: Sized,
        I: IntoIterator<Item = Indexable<O>>,
    {
        items
            .into_iter()
            .try_for_each(|item| self.add_indexable(item))
    }

    /// Objects matching `criteria`, unwrapped.
    fn query(&self, criteria: &SearchCriteria<O>) -> Vec<Rc<O>> {
        self.query_indexables(criteria, false)
            .into_iter()
            .map(Indexable::into_rc)
            .collect()
    }
}
