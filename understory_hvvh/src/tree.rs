// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The HV/VH spatial tree: structure, insertion, removal, merging, and queries.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::Rect;
use smallvec::SmallVec;

use crate::contract::{ObjectIndex, SearchCriteria};
use crate::cut::{CutArena, CutIdx, SlotList};
use crate::error::{IndexError, Violation};
use crate::extent::{
    Axis, CoordSys, Extent, Interval, Side, Spatial, classify, rects_overlap, split_position,
    split_separates,
};
use crate::indexable::{IndexId, Indexable};
use crate::slots::{NodeId, Slots, SpatialAttribute};

/// Construction parameters of an [`HvvhTree`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Coordinate system every extent is normalized to before indexing.
    pub coord_sys: CoordSys,
    /// Split axis of the root. `Axis::X` builds a VH tree, `Axis::Y` an HV tree.
    pub first_axis: Axis,
    /// Maximum number of objects held by a tree leaf. Clamped to at least 1.
    pub max_node_load: usize,
    /// Maximum number of objects held by a cut-tree leaf. Clamped to at least 1.
    pub max_cut_node_load: usize,
}

impl Parameters {
    /// Default leaf capacity of tree nodes.
    pub const DEFAULT_MAX_NODE_LOAD: usize = 2;
    /// Default leaf capacity of cut nodes.
    pub const DEFAULT_MAX_CUT_NODE_LOAD: usize = 2;

    /// Parameters for a tree over `coord_sys` with default capacities.
    pub fn new(coord_sys: CoordSys) -> Self {
        Self {
            coord_sys,
            first_axis: Axis::X,
            max_node_load: Self::DEFAULT_MAX_NODE_LOAD,
            max_cut_node_load: Self::DEFAULT_MAX_CUT_NODE_LOAD,
        }
    }

    /// Set the root split axis.
    pub fn with_first_axis(mut self, axis: Axis) -> Self {
        self.first_axis = axis;
        self
    }

    /// Set the tree leaf capacity.
    pub fn with_max_node_load(mut self, load: usize) -> Self {
        self.max_node_load = load;
        self
    }

    /// Set the cut leaf capacity.
    pub fn with_max_cut_node_load(mut self, load: usize) -> Self {
        self.max_cut_node_load = load;
        self
    }

    fn node_capacity(&self) -> usize {
        self.max_node_load.max(1)
    }

    fn cut_capacity(&self) -> usize {
        self.max_cut_node_load.max(1)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(CoordSys::WORLD)
    }
}

/// Structural counters of an [`HvvhTree`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Live tree nodes, leaves included.
    pub nodes: usize,
    /// Live tree leaves.
    pub leaves: usize,
    /// Live cut nodes across all cut trees.
    pub cut_nodes: usize,
    /// Number of tree levels (1 for a lone root leaf).
    pub depth: usize,
    /// Objects placed in the tree.
    pub indexed: usize,
    /// Objects with an undefined extent.
    pub unindexed: usize,
}

#[derive(Debug)]
struct TreeNode {
    parent: Option<NodeId>,
    axis: Axis,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Leaf(SlotList),
    Internal {
        left: NodeId,
        right: NodeId,
        split: f64,
        cut: Option<CutIdx>,
    },
}

impl TreeNode {
    fn leaf(parent: Option<NodeId>, axis: Axis) -> Self {
        Self {
            parent,
            axis,
            body: Body::Leaf(SlotList::new()),
        }
    }
}

enum RegionFilter {
    Everything,
    Unindexed,
    Rect(Rect),
}

/// Hybrid HV/VH binary spatial-partition tree.
///
/// Nodes alternate between splitting on X and on Y with depth. A leaf holds up to
/// [`Parameters::max_node_load`] objects; when it overflows it splits at the midpoint of
/// its members' bounding interval. Objects straddling a node's split line live in that
/// node's cut tree, which splits on the orthogonal axis. Removing objects merges any
/// subtree that fits back into a single leaf.
///
/// Objects are shared [`Indexable`] handles; the tree keeps a [`SpatialAttribute`] for each
/// in its own side table.
///
/// ```rust
/// use understory_hvvh::{Extent, HvvhTree, ObjectIndex, Parameters};
///
/// let mut tree = HvvhTree::new(Parameters::default());
/// let a = tree.add(Extent::world(0.0, 0.0, 10.0, 10.0)).unwrap();
/// let _b = tree.add(Extent::world(20.0, 20.0, 30.0, 30.0)).unwrap();
///
/// let hits = tree.query_region(&Extent::world(5.0, 5.0, 6.0, 6.0)).unwrap();
/// assert_eq!(hits, vec![a]);
/// ```
pub struct HvvhTree<O> {
    id: IndexId,
    params: Parameters,
    slots: Slots<O>,
    nodes: Vec<Option<TreeNode>>,
    free_nodes: Vec<usize>,
    root: NodeId,
    cuts: CutArena,
    unindexed: Vec<usize>,
}

impl<O> Debug for HvvhTree<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let stats = self.stats();
        f.debug_struct("HvvhTree")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("stats", &stats)
            .field("cuts", &self.cuts)
            .finish_non_exhaustive()
    }
}

impl<O> Default for HvvhTree<O> {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

impl<O> HvvhTree<O> {
    /// Create an empty tree.
    pub fn new(params: Parameters) -> Self {
        let mut nodes = Vec::new();
        nodes.push(Some(TreeNode::leaf(None, params.first_axis)));
        Self {
            id: IndexId::next(),
            params,
            slots: Slots::default(),
            nodes,
            free_nodes: Vec::new(),
            root: NodeId::new(0),
            cuts: CutArena::default(),
            unindexed: Vec::new(),
        }
    }

    /// The parameters the tree was built with.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Number of tracked objects, unindexed ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no object is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }

    /// The spatial attribute of `item`, if tracked.
    pub fn attribute(&self, item: &Indexable<O>) -> Option<&SpatialAttribute> {
        self.slots.attr_of(item)
    }

    /// Whether `node` is currently a leaf. Returns `false` for released nodes.
    pub fn is_leaf(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.idx()),
            Some(Some(TreeNode {
                body: Body::Leaf(_),
                ..
            }))
        )
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Drop every object and node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cuts.clear();
        self.unindexed.clear();
        self.free_nodes.clear();
        self.nodes.clear();
        self.nodes
            .push(Some(TreeNode::leaf(None, self.params.first_axis)));
        self.root = NodeId::new(0);
    }

    /// Structural counters.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            cut_nodes: self.cuts.live(),
            indexed: self.slots.len() - self.unindexed.len(),
            unindexed: self.unindexed.len(),
            ..TreeStats::default()
        };
        let mut stack = alloc::vec![(self.root, 1_usize)];
        while let Some((n, depth)) = stack.pop() {
            stats.nodes += 1;
            stats.depth = stats.depth.max(depth);
            match &self.node(n).body {
                Body::Leaf(_) => stats.leaves += 1,
                Body::Internal { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        stats
    }

    /// Every tracked object: the tree in pre-order, then the unindexed ones.
    pub fn query_all(&self) -> Vec<Indexable<O>> {
        let mut slots = Vec::with_capacity(self.slots.len());
        self.collect(self.root, &mut slots);
        slots.extend(self.unindexed.iter().copied());
        self.items_of(slots)
    }

    /// Tracked objects whose extent is undefined, in insertion order.
    pub fn unindexed(&self) -> Vec<Indexable<O>> {
        self.items_of(self.unindexed.iter().copied())
    }

    /// Tracked objects overlapping `region` (edges inclusive).
    ///
    /// `region` is normalized to the tree's coordinate system first. An undefined region
    /// is a contract violation; use [`SearchCriteria`] for the "unindexed only" query.
    pub fn query_region(&self, region: &Extent) -> Result<Vec<Indexable<O>>, IndexError> {
        let region = region.normalized_to(&self.params.coord_sys);
        let rect = region.rect().ok_or(Violation::UndefinedRegion)?;
        let mut slots = Vec::new();
        self.find(self.root, &rect, &mut slots);
        Ok(self.items_of(slots))
    }

    fn items_of(&self, slots: impl IntoIterator<Item = usize>) -> Vec<Indexable<O>> {
        slots
            .into_iter()
            .map(|slot| self.slots.item(slot).clone())
            .collect()
    }

    fn node(&self, n: NodeId) -> &TreeNode {
        self.nodes[n.idx()]
            .as_ref()
            .expect("tree invariant violated: reference to a released node")
    }

    fn node_mut(&mut self, n: NodeId) -> &mut TreeNode {
        self.nodes[n.idx()]
            .as_mut()
            .expect("tree invariant violated: reference to a released node")
    }

    fn leaf_items_mut(&mut self, n: NodeId) -> &mut SlotList {
        match &mut self.node_mut(n).body {
            Body::Leaf(items) => items,
            Body::Internal { .. } => panic!("tree invariant violated: expected a leaf"),
        }
    }

    fn reserve_nodes(&mut self, n: usize) -> Result<(), IndexError> {
        let missing = n.saturating_sub(self.free_nodes.len());
        self.nodes.try_reserve(missing)?;
        Ok(())
    }

    fn alloc_node(&mut self, node: TreeNode) -> NodeId {
        if let Some(i) = self.free_nodes.pop() {
            self.nodes[i] = Some(node);
            NodeId::new(i)
        } else {
            self.nodes.push(Some(node));
            NodeId::new(self.nodes.len() - 1)
        }
    }

    fn release_node(&mut self, n: NodeId) -> TreeNode {
        let node = self.nodes[n.idx()]
            .take()
            .expect("tree invariant violated: releasing a released node");
        self.free_nodes.push(n.idx());
        node
    }

    /// Place an indexed slot, splitting full leaves on the way down.
    fn place(&mut self, slot: usize) -> Result<(), IndexError> {
        let rect = self.slots.rect(slot);
        let capacity = self.params.node_capacity();
        let mut cur = self.root;
        loop {
            let node = self.node(cur);
            match &node.body {
                Body::Leaf(items) => {
                    let load = items.len();
                    if load < capacity || !self.split_progresses(cur, &rect) {
                        if load >= capacity {
                            log::warn!(
                                "leaf {} overflows: {} members coincide on both axes",
                                cur.0,
                                load + 1
                            );
                        }
                        self.leaf_items_mut(cur).push(slot);
                        self.slots.set_node(slot, Some(cur));
                        return Ok(());
                    }
                    self.split_leaf(cur)?;
                }
                Body::Internal {
                    left, right, split, ..
                } => match classify(node.axis.span(&rect), *split) {
                    Side::Left => cur = *left,
                    Side::Right => cur = *right,
                    Side::Center => {
                        self.insert_in_cut(cur, slot)?;
                        self.slots.set_node(slot, Some(cur));
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Whether splitting the full leaf `n` eventually separates `incoming` from its members,
    /// either on the leaf's own axis or on its children's.
    fn split_progresses(&self, n: NodeId, incoming: &Rect) -> bool {
        let node = self.node(n);
        let Body::Leaf(items) = &node.body else {
            return true;
        };
        [node.axis, node.axis.other()].into_iter().any(|axis| {
            let members: SmallVec<[Interval; 8]> = items
                .iter()
                .map(|&s| axis.span(&self.slots.rect(s)))
                .collect();
            split_separates(&members, axis.span(incoming))
        })
    }

    /// Turn the leaf `n` into an internal node and redistribute its members.
    ///
    /// Members moving to a child are re-pointed at it; straddling members go to the cut
    /// tree and keep pointing at `n`.
    fn split_leaf(&mut self, n: NodeId) -> Result<(), IndexError> {
        let members = match &self.node(n).body {
            Body::Leaf(items) => items.len(),
            Body::Internal { .. } => return Ok(()),
        };
        self.reserve_nodes(2)?;
        self.cuts.reserve(2 * members + 3)?;

        let axis = self.node(n).axis;
        let items = core::mem::take(self.leaf_items_mut(n));
        let split = split_position(items.iter().map(|&s| axis.span(&self.slots.rect(s))));
        let left = self.alloc_node(TreeNode::leaf(Some(n), axis.other()));
        let right = self.alloc_node(TreeNode::leaf(Some(n), axis.other()));
        self.node_mut(n).body = Body::Internal {
            left,
            right,
            split,
            cut: None,
        };
        log::trace!("node {} split on {axis:?} at {split}", n.0);

        for slot in items {
            match classify(axis.span(&self.slots.rect(slot)), split) {
                Side::Left => self.adopt(left, slot),
                Side::Right => self.adopt(right, slot),
                Side::Center => self.insert_in_cut(n, slot)?,
            }
        }
        Ok(())
    }

    fn adopt(&mut self, leaf: NodeId, slot: usize) {
        self.leaf_items_mut(leaf).push(slot);
        self.slots.set_node(slot, Some(leaf));
    }

    /// Insert `slot` into the cut tree of the internal node `n`, creating it if needed.
    fn insert_in_cut(&mut self, n: NodeId, slot: usize) -> Result<(), IndexError> {
        self.cuts.reserve(3)?;
        let node = self.node(n);
        let cut_axis = node.axis.other();
        let existing = match &node.body {
            Body::Internal { cut, .. } => *cut,
            Body::Leaf(_) => panic!("tree invariant violated: cut insertion into a leaf"),
        };
        let root = match existing {
            Some(root) => root,
            None => {
                let root = self.cuts.new_root();
                if let Body::Internal { cut, .. } = &mut self.node_mut(n).body {
                    *cut = Some(root);
                }
                log::debug!("node {} created its cut tree", n.0);
                root
            }
        };
        let capacity = self.params.cut_capacity();
        self.cuts
            .insert(&self.slots, root, cut_axis, slot, capacity);
        Ok(())
    }

    /// Detach an indexed slot from the node claiming it, then merge what fits.
    fn detach(&mut self, n: NodeId, slot: usize) {
        let node = self.node(n);
        let cut_axis = node.axis.other();
        match &node.body {
            Body::Leaf(_) => {
                let items = self.leaf_items_mut(n);
                let pos = items
                    .iter()
                    .position(|&s| s == slot)
                    .expect("tree invariant violated: member missing from its leaf");
                items.remove(pos);
            }
            Body::Internal { cut, .. } => {
                let root = cut.expect("tree invariant violated: member claimed without a cut tree");
                let at = self.cuts.remove(&self.slots, root, cut_axis, slot);
                self.cuts.try_merge(at, self.params.cut_capacity());
                if self.cuts.release_if_empty(root) {
                    if let Body::Internal { cut, .. } = &mut self.node_mut(n).body {
                        *cut = None;
                    }
                    log::debug!("node {} released its empty cut tree", n.0);
                }
            }
        }
        self.try_merge_nodes(n);
    }

    /// Object count below `n`; counting stops once it exceeds `limit`.
    fn load(&self, n: NodeId, limit: usize) -> usize {
        match &self.node(n).body {
            Body::Leaf(items) => items.len(),
            Body::Internal {
                left, right, cut, ..
            } => {
                let mut total = cut.map_or(0, |c| self.cuts.load(c, limit));
                for child in [*left, *right] {
                    if total > limit {
                        break;
                    }
                    total += self.load(child, limit - total);
                }
                total
            }
        }
    }

    /// Collapse the highest ancestor of `from` whose whole subtree fits in one leaf.
    fn try_merge_nodes(&mut self, from: NodeId) {
        let capacity = self.params.node_capacity();
        let mut candidate = None;
        let mut cur = Some(from);
        while let Some(n) = cur {
            if self.load(n, capacity) > capacity {
                break;
            }
            candidate = Some(n);
            cur = self.node(n).parent;
        }
        if let Some(n) = candidate {
            self.collapse(n);
        }
    }

    fn collapse(&mut self, n: NodeId) {
        let (left, right, cut) = match &self.node(n).body {
            Body::Internal {
                left, right, cut, ..
            } => (*left, *right, *cut),
            Body::Leaf(_) => return,
        };
        let mut gathered = SlotList::new();
        self.drain_node(left, &mut gathered);
        self.drain_node(right, &mut gathered);
        if let Some(c) = cut {
            self.cuts.drain(c, &mut gathered);
        }
        for &slot in &gathered {
            self.slots.set_node(slot, Some(n));
        }
        log::trace!("node {} merged back into a leaf of {}", n.0, gathered.len());
        self.node_mut(n).body = Body::Leaf(gathered);
    }

    /// Release the subtree at `n`, appending its objects: children, then cut tree.
    fn drain_node(&mut self, n: NodeId, out: &mut SlotList) {
        match self.release_node(n).body {
            Body::Leaf(items) => out.extend(items),
            Body::Internal {
                left, right, cut, ..
            } => {
                self.drain_node(left, out);
                self.drain_node(right, out);
                if let Some(c) = cut {
                    self.cuts.drain(c, out);
                }
            }
        }
    }

    fn collect(&self, n: NodeId, out: &mut Vec<usize>) {
        match &self.node(n).body {
            Body::Leaf(items) => out.extend(items.iter().copied()),
            Body::Internal {
                left, right, cut, ..
            } => {
                if let Some(c) = cut {
                    self.cuts.collect(*c, out);
                }
                self.collect(*left, out);
                self.collect(*right, out);
            }
        }
    }

    /// Append the slots below `n` overlapping `query`.
    fn find(&self, n: NodeId, query: &Rect, out: &mut Vec<usize>) {
        let node = self.node(n);
        match &node.body {
            Body::Leaf(items) => {
                for &slot in items {
                    if rects_overlap(&self.slots.rect(slot), query) {
                        out.push(slot);
                    }
                }
            }
            Body::Internal {
                left,
                right,
                split,
                cut,
            } => {
                if let Some(c) = *cut {
                    let cut_axis = node.axis.other();
                    self.cuts.validate(&self.slots, c, cut_axis);
                    self.cuts.find(&self.slots, c, cut_axis, query, out);
                }
                match classify(node.axis.span(query), *split) {
                    Side::Left => self.find(*left, query, out),
                    Side::Right => self.find(*right, query, out),
                    Side::Center => {
                        self.find(*left, query, out);
                        self.find(*right, query, out);
                    }
                }
            }
        }
    }

    fn region_filter(&self, criteria: &SearchCriteria<O>) -> RegionFilter {
        match criteria.region_criterion() {
            None => RegionFilter::Everything,
            Some(region) => match region.normalized_to(&self.params.coord_sys).rect() {
                Some(rect) => RegionFilter::Rect(rect),
                None => RegionFilter::Unindexed,
            },
        }
    }
}

impl<O: Spatial> HvvhTree<O> {
    /// Start tracking `item`, placing it by its normalized extent.
    pub fn add_indexable(&mut self, item: Indexable<O>) -> Result<(), IndexError> {
        if self.slots.slot_of(&item).is_some() {
            return Err(Violation::AlreadyIndexed.into());
        }
        let extent = item.extent().normalized_to(&self.params.coord_sys);
        let slot = self
            .slots
            .insert(item, SpatialAttribute { node: None, extent })?;
        let placed = if extent.is_defined() {
            self.place(slot)
        } else {
            self.unindexed
                .try_reserve(1)
                .map(|()| self.unindexed.push(slot))
                .map_err(IndexError::from)
        };
        if placed.is_err() {
            self.slots.remove(slot);
        }
        placed
    }

    /// Stop tracking `item`, merging any subtree that now fits in a leaf.
    pub fn remove_indexable(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        let slot = self.slots.slot_of(item).ok_or(Violation::NotIndexed)?;
        match self.slots.attr(slot).node {
            None => {
                let pos = self
                    .unindexed
                    .iter()
                    .position(|&s| s == slot)
                    .expect("tree invariant violated: unindexed member missing from its list");
                self.unindexed.remove(pos);
            }
            Some(n) => self.detach(n, slot),
        }
        self.slots.remove(slot);
        Ok(())
    }

    /// Objects that may interact with any of `items`.
    ///
    /// Runs one region query over the union of their extents. If any of them has an
    /// undefined extent, every unindexed object is included too.
    pub fn interacting_objects(&self, items: &[Indexable<O>]) -> Vec<Indexable<O>> {
        let mut union: Option<Rect> = None;
        let mut any_undefined = false;
        for item in items {
            let extent = match self.slots.attr_of(item) {
                Some(attr) => attr.extent,
                None => item.extent().normalized_to(&self.params.coord_sys),
            };
            match extent.rect() {
                Some(r) => union = Some(union.map_or(r, |u| u.union(r))),
                None => any_undefined = true,
            }
        }
        let mut slots = Vec::new();
        if let Some(rect) = union {
            self.find(self.root, &rect, &mut slots);
        }
        if any_undefined {
            slots.extend(self.unindexed.iter().copied());
        }
        self.items_of(slots)
    }
}

impl<O: Spatial> ObjectIndex<O> for HvvhTree<O> {
    fn index_id(&self) -> IndexId {
        self.id
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn tracked(&self, item: &Indexable<O>) -> Option<Indexable<O>> {
        self.slots
            .slot_of(item)
            .map(|slot| self.slots.item(slot).clone())
    }

    fn add_indexable(&mut self, item: Indexable<O>) -> Result<(), IndexError> {
        Self::add_indexable(self, item)
    }

    fn remove_indexable(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        Self::remove_indexable(self, item)
    }

    fn query_indexables(&self, criteria: &SearchCriteria<O>, _sort: bool) -> Vec<Indexable<O>> {
        match self.region_filter(criteria) {
            RegionFilter::Everything => self.query_all(),
            RegionFilter::Unindexed => self.unindexed(),
            RegionFilter::Rect(rect) => {
                let mut slots = Vec::new();
                self.find(self.root, &rect, &mut slots);
                self.items_of(slots)
            }
        }
    }

    fn query_subset(
        &self,
        criteria: &SearchCriteria<O>,
        subset: &[Indexable<O>],
        _sort: bool,
    ) -> Vec<Indexable<O>> {
        let filter = self.region_filter(criteria);
        subset
            .iter()
            .filter_map(|item| {
                let slot = self.slots.slot_of(item)?;
                let extent = self.slots.attr(slot).extent;
                let keep = match &filter {
                    RegionFilter::Everything => true,
                    RegionFilter::Unindexed => !extent.is_defined(),
                    RegionFilter::Rect(rect) => {
                        extent.rect().is_some_and(|r| rects_overlap(&r, rect))
                    }
                };
                keep.then(|| self.slots.item(slot).clone())
            })
            .collect()
    }

    fn supports_interacting_retrieval(&self) -> bool {
        true
    }

    fn interacting_objects(&self, items: &[Indexable<O>]) -> Vec<Indexable<O>> {
        Self::interacting_objects(self, items)
    }
}

#[cfg(test)]
impl<O> HvvhTree<O> {
    /// Check every structural invariant; panics on the first violation.
    pub(crate) fn audit(&self) {
        let mut seen = 0;
        self.audit_node(self.root, None, &mut seen);
        for &slot in &self.unindexed {
            assert_eq!(self.slots.attr(slot).node, None, "unindexed attribute");
            assert!(!self.slots.attr(slot).extent.is_defined());
            seen += 1;
        }
        assert_eq!(seen, self.slots.len(), "every tracked object is reachable once");
        let live = self.nodes.iter().filter(|n| n.is_some()).count();
        assert_eq!(live, self.stats().nodes, "no leaked tree nodes");
    }

    fn audit_node(&self, n: NodeId, parent: Option<NodeId>, seen: &mut usize) {
        let node = self.node(n);
        let capacity = self.params.node_capacity();
        assert_eq!(node.parent, parent, "parent link");
        match parent {
            Some(p) => assert_eq!(node.axis, self.node(p).axis.other(), "axes alternate"),
            None => assert_eq!(node.axis, self.params.first_axis, "root axis"),
        }
        match &node.body {
            Body::Leaf(items) => {
                assert!(
                    items.len() <= capacity,
                    "leaf holds {} members, capacity {capacity}",
                    items.len()
                );
                for &slot in items {
                    assert_eq!(self.slots.attr(slot).node, Some(n), "leaf attribute");
                    *seen += 1;
                }
            }
            Body::Internal {
                left,
                right,
                split,
                cut,
            } => {
                assert!(
                    self.load(n, capacity) > capacity,
                    "internal node fits in a leaf and should have been merged"
                );
                if let Some(c) = *cut {
                    assert!(self.cuts.load(c, 0) > 0, "empty cut tree kept alive");
                    let axis = node.axis;
                    let mut visit = |slot: usize| {
                        assert_eq!(self.slots.attr(slot).node, Some(n), "cut attribute");
                        let span = axis.span(&self.slots.rect(slot));
                        assert_eq!(classify(span, *split), Side::Center, "cut member straddles");
                        *seen += 1;
                    };
                    self.cuts.audit(
                        &self.slots,
                        c,
                        axis.other(),
                        self.params.cut_capacity(),
                        &mut visit,
                    );
                }
                for (child, side) in [(*left, Side::Left), (*right, Side::Right)] {
                    let mut members = Vec::new();
                    self.collect(child, &mut members);
                    for slot in members {
                        let span = node.axis.span(&self.slots.rect(slot));
                        assert_eq!(classify(span, *split), side, "member on the wrong side");
                    }
                    self.audit_node(child, Some(n), seen);
                }
            }
        }
    }
}
