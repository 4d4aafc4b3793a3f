// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A stacking-order index: objects kept in one bottom-to-top sequence.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;

use crate::contract::{Criterion, ObjectIndex, SearchCriteria};
use crate::error::{IndexError, Violation};
use crate::indexable::{IndexId, Indexable};

/// Index keeping its objects in a total bottom-to-top order.
///
/// New objects go on top unless placed relative to a tracked one. Queries recognize
/// [`Criterion::Above`] and [`Criterion::Below`]; an untracked reference matches nothing.
/// Other criteria are ignored.
pub struct RelativeIndex<O> {
    id: IndexId,
    order: Vec<Indexable<O>>,
    positions: HashMap<Indexable<O>, usize>,
}

impl<O> Debug for RelativeIndex<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RelativeIndex")
            .field("id", &self.id)
            .field("len", &self.order.len())
            .finish_non_exhaustive()
    }
}

impl<O> Default for RelativeIndex<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> RelativeIndex<O> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            id: IndexId::next(),
            order: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Position of `item` counted from the bottom, if tracked.
    pub fn position_of(&self, item: &Indexable<O>) -> Option<usize> {
        self.positions.get(item).copied()
    }

    /// Tracked objects from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Indexable<O>> + '_ {
        self.order.iter()
    }

    /// The topmost object.
    pub fn top(&self) -> Option<&Indexable<O>> {
        self.order.last()
    }

    /// Place `item` directly above `reference`.
    pub fn add_above(
        &mut self,
        item: Indexable<O>,
        reference: &Indexable<O>,
    ) -> Result<(), IndexError> {
        let at = self.reference_position(reference)? + 1;
        self.insert_at(item, at)
    }

    /// Place `item` directly below `reference`.
    pub fn add_below(
        &mut self,
        item: Indexable<O>,
        reference: &Indexable<O>,
    ) -> Result<(), IndexError> {
        let at = self.reference_position(reference)?;
        self.insert_at(item, at)
    }

    /// Move `item` one position up. Does nothing if it is already on top.
    pub fn promote(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let pos = self.position_of(item).ok_or(Violation::NotIndexed)?;
        if pos + 1 < self.order.len() {
            self.swap(pos, pos + 1);
        }
        Ok(())
    }

    /// Move `item` one position down. Does nothing if it is already at the bottom.
    pub fn demote(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let pos = self.position_of(item).ok_or(Violation::NotIndexed)?;
        if pos > 0 {
            self.swap(pos - 1, pos);
        }
        Ok(())
    }

    /// Move `item` to the top.
    pub fn front(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let from = self.position_of(item).ok_or(Violation::NotIndexed)?;
        let moved = self.order.remove(from);
        self.order.push(moved);
        self.renumber(from);
        Ok(())
    }

    /// Move `item` to the bottom.
    pub fn back(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let from = self.position_of(item).ok_or(Violation::NotIndexed)?;
        let moved = self.order.remove(from);
        self.order.insert(0, moved);
        self.renumber(0);
        Ok(())
    }

    fn swap(&mut self, lower: usize, upper: usize) {
        self.order.swap(lower, upper);
        self.renumber(lower);
    }

    fn reference_position(&self, reference: &Indexable<O>) -> Result<usize, IndexError> {
        Ok(self
            .position_of(reference)
            .ok_or(Violation::UnknownReference)?)
    }

    fn insert_at(&mut self, item: Indexable<O>, at: usize) -> Result<(), IndexError> {
        if self.positions.contains_key(&item) {
            return Err(Violation::AlreadyIndexed.into());
        }
        self.order.try_reserve(1)?;
        self.positions.try_reserve(1)?;
        self.order.insert(at, item.clone());
        self.positions.insert(item, at);
        self.renumber(at);
        Ok(())
    }

    fn renumber(&mut self, from: usize) {
        for (pos, item) in self.order.iter().enumerate().skip(from) {
            if let Some(slot) = self.positions.get_mut(item) {
                *slot = pos;
            }
        }
    }

    fn matches(&self, criteria: &SearchCriteria<O>, pos: usize) -> bool {
        criteria.iter().all(|c| match c {
            Criterion::Above(reference) => self.position_of(reference).is_some_and(|r| pos > r),
            Criterion::Below(reference) => self.position_of(reference).is_some_and(|r| pos < r),
            Criterion::Region(_) => true,
        })
    }
}

impl<O> ObjectIndex<O> for RelativeIndex<O> {
    fn index_id(&self) -> IndexId {
        self.id
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn tracked(&self, item: &Indexable<O>) -> Option<Indexable<O>> {
        self.position_of(item).map(|pos| self.order[pos].clone())
    }

    fn add_indexable(&mut self, item: Indexable<O>) -> Result<(), IndexError> {
        let top = self.order.len();
        self.insert_at(item, top)
    }

    fn remove_indexable(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let pos = self.positions.remove(item).ok_or(Violation::NotIndexed)?;
        self.order.remove(pos);
        self.renumber(pos);
        Ok(())
    }

    /// Results always come out bottom to top.
    fn query_indexables(&self, criteria: &SearchCriteria<O>, _sort: bool) -> Vec<Indexable<O>> {
        self.order
            .iter()
            .enumerate()
            .filter(|&(pos, _)| self.matches(criteria, pos))
            .map(|(_, item)| item.clone())
            .collect()
    }

    fn query_subset(
        &self,
        criteria: &SearchCriteria<O>,
        subset: &[Indexable<O>],
        sort: bool,
    ) -> Vec<Indexable<O>> {
        let mut hits: Vec<(usize, Indexable<O>)> = subset
            .iter()
            .filter_map(|item| {
                let pos = self.position_of(item)?;
                self.matches(criteria, pos)
                    .then(|| (pos, self.order[pos].clone()))
            })
            .collect();
        if sort {
            hits.sort_by_key(|&(pos, _)| pos);
        }
        hits.into_iter().map(|(_, item)| item).collect()
    }
}
