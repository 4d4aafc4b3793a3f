// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-index side table holding the spatial attribute of every tracked object.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::Rect;

use crate::error::IndexError;
use crate::extent::Extent;
use crate::indexable::Indexable;

/// Identifier of a node in an [`HvvhTree`][crate::HvvhTree].
///
/// Identifiers are reused after a subtree is merged back into its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node arenas are indexed with 32-bit identifiers."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Bookkeeping a spatial tree keeps for each tracked object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpatialAttribute {
    pub(crate) node: Option<NodeId>,
    pub(crate) extent: Extent,
}

impl SpatialAttribute {
    /// The node currently claiming the object: the leaf holding it, or the internal
    /// node whose cut tree holds it. `None` for objects with an undefined extent.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// The object's extent, normalized to the tree's coordinate system.
    pub fn extent(&self) -> Extent {
        self.extent
    }
}

#[derive(Debug)]
struct Slot<O> {
    item: Indexable<O>,
    attr: SpatialAttribute,
}

/// Slot storage with identity lookup. Tree nodes refer to objects by slot number.
pub(crate) struct Slots<O> {
    entries: Vec<Option<Slot<O>>>,
    free_list: Vec<usize>,
    lookup: HashMap<Indexable<O>, usize>,
}

impl<O> Default for Slots<O> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<O> Slots<O> {
    pub(crate) fn len(&self) -> usize {
        self.lookup.len()
    }

    pub(crate) fn slot_of(&self, item: &Indexable<O>) -> Option<usize> {
        self.lookup.get(item).copied()
    }

    /// Register `item`. The caller has checked that it is not tracked yet.
    pub(crate) fn insert(
        &mut self,
        item: Indexable<O>,
        attr: SpatialAttribute,
    ) -> Result<usize, IndexError> {
        self.lookup.try_reserve(1)?;
        let slot = if let Some(slot) = self.free_list.pop() {
            self.entries[slot] = Some(Slot {
                item: item.clone(),
                attr,
            });
            slot
        } else {
            self.entries.try_reserve(1)?;
            self.entries.push(Some(Slot {
                item: item.clone(),
                attr,
            }));
            self.entries.len() - 1
        };
        self.lookup.insert(item, slot);
        Ok(slot)
    }

    pub(crate) fn remove(&mut self, slot: usize) -> Indexable<O> {
        let entry = self.entries[slot]
            .take()
            .expect("slot invariant violated: removing a vacant slot");
        self.lookup.remove(&entry.item);
        self.free_list.push(slot);
        entry.item
    }

    fn entry(&self, slot: usize) -> &Slot<O> {
        self.entries
            .get(slot)
            .and_then(Option::as_ref)
            .expect("slot invariant violated: node references a vacant slot")
    }

    pub(crate) fn item(&self, slot: usize) -> &Indexable<O> {
        &self.entry(slot).item
    }

    pub(crate) fn attr(&self, slot: usize) -> &SpatialAttribute {
        &self.entry(slot).attr
    }

    pub(crate) fn attr_of(&self, item: &Indexable<O>) -> Option<&SpatialAttribute> {
        self.slot_of(item).map(|slot| self.attr(slot))
    }

    /// The normalized rectangle of an indexed slot.
    pub(crate) fn rect(&self, slot: usize) -> Rect {
        self.attr(slot)
            .extent
            .rect()
            .expect("slot invariant violated: indexed slot without a defined extent")
    }

    pub(crate) fn set_node(&mut self, slot: usize, node: Option<NodeId>) {
        if let Some(Some(entry)) = self.entries.get_mut(slot) {
            entry.attr.node = node;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.free_list.clear();
        self.lookup.clear();
    }
}
