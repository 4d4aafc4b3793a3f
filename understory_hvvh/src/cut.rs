// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cut trees: secondary binary trees holding the objects that straddle a node's split line.
//!
//! A cut tree splits on the axis orthogonal to its owning node's split axis. Each cut node
//! owns a list of slots: for a leaf it is bounded by the cut-node capacity, for an internal
//! node it holds the objects straddling that node's own split position.
//!
//! Every cut node caches two bounds:
//! - `split_bounds`: the node's own objects projected on the cut axis;
//! - `other_bounds`: the node and its whole subtree projected on the orthogonal axis.
//!
//! Both are `None` while stale. Insertion widens cached bounds in place; removal marks the
//! whole descent path stale, and [`CutArena::validate`] rebuilds them before a query.
//! A stale node only ever has stale ancestors, so a valid `other_bounds` proves the whole
//! subtree below it is valid.

use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt::Debug;

use kurbo::Rect;
use smallvec::SmallVec;

use crate::error::IndexError;
use crate::extent::{Axis, Interval, Side, classify, rects_overlap, split_position, split_separates};
use crate::slots::Slots;

pub(crate) type SlotList = SmallVec<[usize; 4]>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CutIdx(u32);

impl CutIdx {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Cut arenas are indexed with 32-bit identifiers."
    )]
    const fn new(i: usize) -> Self {
        Self(i as u32)
    }

    const fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug)]
struct Fork {
    left: CutIdx,
    right: CutIdx,
    split: f64,
}

#[derive(Debug)]
struct CutNode {
    parent: Option<CutIdx>,
    items: SlotList,
    fork: Option<Fork>,
    split_bounds: Cell<Option<Interval>>,
    other_bounds: Cell<Option<Interval>>,
}

impl CutNode {
    fn new(parent: Option<CutIdx>) -> Self {
        Self {
            parent,
            items: SlotList::new(),
            fork: None,
            split_bounds: Cell::new(Some(Interval::EMPTY)),
            other_bounds: Cell::new(Some(Interval::EMPTY)),
        }
    }

    fn widen_split(&self, span: Interval) {
        if let Some(b) = self.split_bounds.get() {
            self.split_bounds.set(Some(b.widen(span)));
        }
    }

    fn widen_other(&self, span: Interval) {
        if let Some(b) = self.other_bounds.get() {
            self.other_bounds.set(Some(b.widen(span)));
        }
    }

    fn invalidate(&self) {
        self.split_bounds.set(None);
        self.other_bounds.set(None);
    }
}

/// Arena holding the cut nodes of every cut tree of one spatial tree.
#[derive(Default)]
pub(crate) struct CutArena {
    nodes: Vec<Option<CutNode>>,
    free_list: Vec<usize>,
}

impl Debug for CutArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CutArena")
            .field("live", &self.live())
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl CutArena {
    fn node(&self, c: CutIdx) -> &CutNode {
        self.nodes[c.get()]
            .as_ref()
            .expect("cut tree invariant violated: reference to a released cut node")
    }

    fn node_mut(&mut self, c: CutIdx) -> &mut CutNode {
        self.nodes[c.get()]
            .as_mut()
            .expect("cut tree invariant violated: reference to a released cut node")
    }

    /// Number of live cut nodes.
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Make room for `n` more cut nodes so that the next `n` allocations cannot fail.
    pub(crate) fn reserve(&mut self, n: usize) -> Result<(), IndexError> {
        let missing = n.saturating_sub(self.free_list.len());
        self.nodes.try_reserve(missing)?;
        Ok(())
    }

    fn alloc(&mut self, node: CutNode) -> CutIdx {
        if let Some(i) = self.free_list.pop() {
            self.nodes[i] = Some(node);
            CutIdx::new(i)
        } else {
            self.nodes.push(Some(node));
            CutIdx::new(self.nodes.len() - 1)
        }
    }

    fn release(&mut self, c: CutIdx) -> CutNode {
        let node = self.nodes[c.get()]
            .take()
            .expect("cut tree invariant violated: releasing a released cut node");
        self.free_list.push(c.get());
        node
    }

    /// Create the root of a new, empty cut tree.
    pub(crate) fn new_root(&mut self) -> CutIdx {
        self.alloc(CutNode::new(None))
    }

    /// Release an empty cut root. Returns `false` (and keeps it) if it still holds objects.
    pub(crate) fn release_if_empty(&mut self, root: CutIdx) -> bool {
        let node = self.node(root);
        if node.fork.is_some() || !node.items.is_empty() {
            return false;
        }
        self.release(root);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
    }

    /// Insert `slot` into the cut tree rooted at `root`, which splits on `axis`.
    ///
    /// The caller reserves two nodes beforehand; one insertion splits at most one leaf.
    pub(crate) fn insert<O>(
        &mut self,
        slots: &Slots<O>,
        root: CutIdx,
        axis: Axis,
        slot: usize,
        capacity: usize,
    ) {
        let rect = slots.rect(slot);
        let span = axis.span(&rect);
        let other_span = axis.other().span(&rect);
        let mut cur = root;
        self.node(cur).widen_other(other_span);
        loop {
            let node = self.node(cur);
            if let Some(fork) = node.fork {
                match classify(span, fork.split) {
                    Side::Left => cur = fork.left,
                    Side::Right => cur = fork.right,
                    Side::Center => {
                        self.node_mut(cur).items.push(slot);
                        self.node(cur).widen_split(span);
                        return;
                    }
                }
                self.node(cur).widen_other(other_span);
            } else if node.items.len() < capacity || !self.separates(slots, cur, axis, span) {
                if node.items.len() >= capacity {
                    log::warn!(
                        "cut leaf {} overflows: {} coincident members on {axis:?}",
                        cur.get(),
                        node.items.len() + 1
                    );
                }
                self.node_mut(cur).items.push(slot);
                self.node(cur).widen_split(span);
                return;
            } else {
                self.split(slots, cur, axis);
            }
        }
    }

    fn separates<O>(&self, slots: &Slots<O>, c: CutIdx, axis: Axis, incoming: Interval) -> bool {
        let members: SmallVec<[Interval; 8]> = self
            .node(c)
            .items
            .iter()
            .map(|&s| axis.span(&slots.rect(s)))
            .collect();
        split_separates(&members, incoming)
    }

    /// Turn the leaf `c` into an internal node, pushing its members down where possible.
    fn split<O>(&mut self, slots: &Slots<O>, c: CutIdx, axis: Axis) {
        let items = core::mem::take(&mut self.node_mut(c).items);
        let split = split_position(items.iter().map(|&s| axis.span(&slots.rect(s))));
        let mut left = CutNode::new(Some(c));
        let mut right = CutNode::new(Some(c));
        let mut own = SlotList::new();
        for slot in items {
            match classify(axis.span(&slots.rect(slot)), split) {
                Side::Left => left.items.push(slot),
                Side::Right => right.items.push(slot),
                Side::Center => own.push(slot),
            }
        }
        for child in [&left, &right] {
            child.split_bounds.set(Some(span_of(slots, &child.items, axis)));
            child.other_bounds.set(Some(span_of(slots, &child.items, axis.other())));
        }
        log::trace!(
            "cut node {} split on {axis:?} at {split}: {} left, {} right, {} straddling",
            c.get(),
            left.items.len(),
            right.items.len(),
            own.len()
        );
        let left = self.alloc(left);
        let right = self.alloc(right);
        let node = self.node_mut(c);
        node.split_bounds.set(Some(span_of(slots, &own, axis)));
        node.items = own;
        node.fork = Some(Fork { left, right, split });
    }

    /// Remove `slot` from the cut tree rooted at `root`, returning the cut node it lived in.
    ///
    /// Every node on the descent path has its bounds marked stale.
    pub(crate) fn remove<O>(
        &mut self,
        slots: &Slots<O>,
        root: CutIdx,
        axis: Axis,
        slot: usize,
    ) -> CutIdx {
        let span = axis.span(&slots.rect(slot));
        let mut cur = root;
        loop {
            let node = self.node_mut(cur);
            node.other_bounds.set(None);
            if let Some(pos) = node.items.iter().position(|&s| s == slot) {
                node.items.remove(pos);
                node.split_bounds.set(None);
                return cur;
            }
            let fork = node
                .fork
                .expect("cut tree invariant violated: member missing from its cut leaf");
            cur = match classify(span, fork.split) {
                Side::Left => fork.left,
                Side::Right => fork.right,
                Side::Center => {
                    panic!("cut tree invariant violated: straddling member missing from its node")
                }
            };
        }
    }

    /// Object count of the subtree at `c`, counting stops once it exceeds `limit`.
    pub(crate) fn load(&self, c: CutIdx, limit: usize) -> usize {
        let node = self.node(c);
        let mut total = node.items.len();
        if let Some(fork) = node.fork {
            for child in [fork.left, fork.right] {
                if total > limit {
                    break;
                }
                total += self.load(child, limit - total);
            }
        }
        total
    }

    /// Collapse the highest ancestor of `from` whose subtree fits in one cut leaf.
    pub(crate) fn try_merge(&mut self, from: CutIdx, capacity: usize) {
        let mut candidate = None;
        let mut cur = Some(from);
        while let Some(c) = cur {
            if self.load(c, capacity) > capacity {
                break;
            }
            candidate = Some(c);
            cur = self.node(c).parent;
        }
        let Some(c) = candidate else {
            return;
        };
        let Some(fork) = self.node_mut(c).fork.take() else {
            return;
        };
        let mut gathered = SlotList::new();
        self.drain(fork.left, &mut gathered);
        self.drain(fork.right, &mut gathered);
        let node = self.node_mut(c);
        gathered.extend(node.items.drain(..));
        log::trace!("cut node {} merged back into a leaf of {}", c.get(), gathered.len());
        node.items = gathered;
        node.invalidate();
    }

    /// Release the subtree at `c`, appending its objects (children first, then own list).
    pub(crate) fn drain(&mut self, c: CutIdx, out: &mut SlotList) {
        let node = self.release(c);
        if let Some(fork) = node.fork {
            self.drain(fork.left, out);
            self.drain(fork.right, out);
        }
        out.extend(node.items);
    }

    /// Append every object of the subtree at `c` in pre-order.
    pub(crate) fn collect(&self, c: CutIdx, out: &mut Vec<usize>) {
        let node = self.node(c);
        out.extend(node.items.iter().copied());
        if let Some(fork) = node.fork {
            self.collect(fork.left, out);
            self.collect(fork.right, out);
        }
    }

    /// Rebuild stale bounds below `c`, returning its `other_bounds`.
    pub(crate) fn validate<O>(&self, slots: &Slots<O>, c: CutIdx, axis: Axis) -> Interval {
        let node = self.node(c);
        if let Some(bounds) = node.other_bounds.get() {
            return bounds;
        }
        let mut other = span_of(slots, &node.items, axis.other());
        if let Some(fork) = node.fork {
            other = other
                .widen(self.validate(slots, fork.left, axis))
                .widen(self.validate(slots, fork.right, axis));
        }
        if node.split_bounds.get().is_none() {
            node.split_bounds.set(Some(span_of(slots, &node.items, axis)));
        }
        node.other_bounds.set(Some(other));
        other
    }

    /// Append the objects of the subtree at `c` overlapping `query`.
    ///
    /// Bounds must have been validated with [`Self::validate`]; stale bounds only
    /// disable pruning.
    pub(crate) fn find<O>(
        &self,
        slots: &Slots<O>,
        c: CutIdx,
        axis: Axis,
        query: &Rect,
        out: &mut Vec<usize>,
    ) {
        let node = self.node(c);
        let q_other = axis.other().span(query);
        if node
            .other_bounds
            .get()
            .is_some_and(|b| !b.overlaps(&q_other))
        {
            return;
        }
        let q_span = axis.span(query);
        if node
            .split_bounds
            .get()
            .is_none_or(|b| b.overlaps(&q_span))
        {
            for &slot in &node.items {
                if rects_overlap(&slots.rect(slot), query) {
                    out.push(slot);
                }
            }
        }
        if let Some(fork) = node.fork {
            match classify(q_span, fork.split) {
                Side::Left => self.find(slots, fork.left, axis, query, out),
                Side::Right => self.find(slots, fork.right, axis, query, out),
                Side::Center => {
                    self.find(slots, fork.left, axis, query, out);
                    self.find(slots, fork.right, axis, query, out);
                }
            }
        }
    }

    /// Check structure, membership and bound invariants of the subtree at `c`.
    ///
    /// Calls `visit(slot)` for each member and returns the subtree depth.
    #[cfg(test)]
    pub(crate) fn audit<O>(
        &self,
        slots: &Slots<O>,
        c: CutIdx,
        axis: Axis,
        capacity: usize,
        visit: &mut impl FnMut(usize),
    ) -> usize {
        let node = self.node(c);
        for &slot in &node.items {
            visit(slot);
        }
        let own = span_of(slots, &node.items, axis);
        if let Some(b) = node.split_bounds.get() {
            assert!(b.covers(&own), "split bounds must cover own members");
        }
        let other = span_of(slots, &node.items, axis.other());
        if let Some(b) = node.other_bounds.get() {
            assert!(b.covers(&other), "other bounds must cover own members");
        }
        match node.fork {
            None => {
                assert!(
                    node.items.len() <= capacity,
                    "cut leaf holds {} members, capacity {capacity}",
                    node.items.len()
                );
                1
            }
            Some(fork) => {
                assert!(
                    self.load(c, capacity) > capacity,
                    "internal cut node fits in a leaf and should have been merged"
                );
                for &slot in &node.items {
                    let s = axis.span(&slots.rect(slot));
                    assert_eq!(classify(s, fork.split), Side::Center, "own member must straddle");
                }
                for (child, side) in [(fork.left, Side::Left), (fork.right, Side::Right)] {
                    let child_node = self.node(child);
                    assert_eq!(child_node.parent, Some(c), "cut parent link");
                    if node.other_bounds.get().is_some() {
                        assert!(
                            child_node.other_bounds.get().is_some(),
                            "valid cut node with a stale child"
                        );
                    }
                    let mut members = Vec::new();
                    self.collect(child, &mut members);
                    for slot in members {
                        let s = axis.span(&slots.rect(slot));
                        assert_eq!(classify(s, fork.split), side, "member on the wrong side");
                        if let Some(b) = node.other_bounds.get() {
                            assert!(
                                b.covers(&axis.other().span(&slots.rect(slot))),
                                "other bounds must cover the subtree"
                            );
                        }
                    }
                }
                1 + self
                    .audit(slots, fork.left, axis, capacity, visit)
                    .max(self.audit(slots, fork.right, axis, capacity, visit))
            }
        }
    }
}

fn span_of<O>(slots: &Slots<O>, items: &[usize], axis: Axis) -> Interval {
    items
        .iter()
        .map(|&s| axis.span(&slots.rect(s)))
        .fold(Interval::EMPTY, Interval::widen)
}
