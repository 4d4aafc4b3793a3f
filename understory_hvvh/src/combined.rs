// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layering two indexes over the same objects.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::marker::PhantomData;

use crate::contract::{ObjectIndex, SearchCriteria};
use crate::error::{IndexError, Violation};
use crate::indexable::{IndexId, Indexable};

/// Two indexes tracking the same objects, queried as one.
///
/// Every object is added to and removed from both. A query runs against `first`, and its
/// results are narrowed by `second`, so the order `first` produces is kept. Put an
/// ordering index such as [`RelativeIndex`][crate::RelativeIndex] first and a spatial one
/// such as [`HvvhTree`][crate::HvvhTree] second to get region queries in stacking order.
///
/// ```rust
/// use understory_hvvh::{
///     CombinedIndex, Extent, HvvhTree, ObjectIndex, Parameters, RelativeIndex, SearchCriteria,
/// };
///
/// let mut index = CombinedIndex::new(RelativeIndex::new(), HvvhTree::new(Parameters::default()));
/// let back = index.add(Extent::world(0.0, 0.0, 10.0, 10.0)).unwrap();
/// let front = index.add(Extent::world(5.0, 5.0, 15.0, 15.0)).unwrap();
///
/// let here = SearchCriteria::region(Extent::world(6.0, 6.0, 7.0, 7.0));
/// assert_eq!(index.query_indexables(&here, true), vec![back.clone(), front.clone()]);
///
/// index.first_mut().demote(&front).unwrap();
/// assert_eq!(index.query_indexables(&here, true), vec![front, back]);
/// ```
pub struct CombinedIndex<O, A, B> {
    id: IndexId,
    first: A,
    second: B,
    _objects: PhantomData<fn() -> O>,
}

impl<O, A: Debug, B: Debug> Debug for CombinedIndex<O, A, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CombinedIndex")
            .field("id", &self.id)
            .field("first", &self.first)
            .field("second", &self.second)
            .finish_non_exhaustive()
    }
}

impl<O, A, B> CombinedIndex<O, A, B>
where
    A: ObjectIndex<O>,
    B: ObjectIndex<O>,
{
    /// Layer two indexes. Both should be empty.
    pub fn new(first: A, second: B) -> Self {
        debug_assert!(
            first.is_empty() && second.is_empty(),
            "combined indexes must start out empty"
        );
        Self {
            id: IndexId::next(),
            first,
            second,
            _objects: PhantomData,
        }
    }

    /// The index whose result order is kept.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// The index narrowing the results of the first.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Mutable access to the first index, e.g. to reorder objects.
    ///
    /// Adding or removing objects through it desynchronizes the two indexes.
    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    /// Mutable access to the second index.
    ///
    /// Adding or removing objects through it desynchronizes the two indexes.
    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }

    /// Split back into the two inner indexes.
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<O, A, B> ObjectIndex<O> for CombinedIndex<O, A, B>
where
    A: ObjectIndex<O>,
    B: ObjectIndex<O>,
{
    fn index_id(&self) -> IndexId {
        self.id
    }

    /// Count of the first index; both indexes hold the same objects unless one was
    /// changed through [`Self::first_mut`] or [`Self::second_mut`].
    fn len(&self) -> usize {
        debug_assert_eq!(
            self.first.len(),
            self.second.len(),
            "combined indexes out of sync"
        );
        self.first.len()
    }

    fn tracked(&self, item: &Indexable<O>) -> Option<Indexable<O>> {
        self.first
            .tracked(item)
            .or_else(|| self.second.tracked(item))
    }

    /// Adds to both indexes. If the second one refuses, the first is rolled back.
    fn add_indexable(&mut self, item: Indexable<O>) -> Result<(), IndexError> {
        self.first.add_indexable(item.clone())?;
        if let Err(err) = self.second.add_indexable(item.clone()) {
            let rollback = self.first.remove_indexable(&item);
            debug_assert!(rollback.is_ok(), "undoing a fresh insertion cannot fail");
            return Err(err);
        }
        Ok(())
    }

    fn remove_indexable(&mut self, item: &Indexable<O>) -> Result<(), IndexError> {
        if !self.first.contains(item) || !self.second.contains(item) {
            return Err(Violation::NotIndexed.into());
        }
        self.first.remove_indexable(item)?;
        self.second.remove_indexable(item)
    }

    fn query_indexables(&self, criteria: &SearchCriteria<O>, sort: bool) -> Vec<Indexable<O>> {
        let candidates = self.first.query_indexables(criteria, sort);
        self.second.query_subset(criteria, &candidates, sort)
    }

    fn query_subset(
        &self,
        criteria: &SearchCriteria<O>,
        subset: &[Indexable<O>],
        sort: bool,
    ) -> Vec<Indexable<O>> {
        let candidates = self.first.query_subset(criteria, subset, sort);
        self.second.query_subset(criteria, &candidates, sort)
    }

    fn supports_interacting_retrieval(&self) -> bool {
        self.first.supports_interacting_retrieval() || self.second.supports_interacting_retrieval()
    }

    /// Answered by whichever inner index supports it, in the first index's order.
    fn interacting_objects(&self, items: &[Indexable<O>]) -> Vec<Indexable<O>> {
        let everything = SearchCriteria::new();
        if self.first.supports_interacting_retrieval() {
            let hits = self.first.interacting_objects(items);
            self.second.query_subset(&everything, &hits, false)
        } else if self.second.supports_interacting_retrieval() {
            let hits = self.second.interacting_objects(items);
            self.first.query_subset(&everything, &hits, true)
        } else {
            self.query_indexables(&everything, true)
        }
    }

    fn filled_indexable_for(&self, item: &Indexable<O>) -> Indexable<O> {
        self.first
            .tracked(item)
            .unwrap_or_else(|| self.second.filled_indexable_for(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::{CoordSys, Extent, Spatial};
    use crate::relative::RelativeIndex;
    use crate::tree::{HvvhTree, Parameters};
    use alloc::vec;

    #[derive(Debug)]
    struct Tile {
        name: &'static str,
        extent: Extent,
    }

    impl Spatial for Tile {
        fn extent(&self) -> Extent {
            self.extent
        }
    }

    type Mosaic = CombinedIndex<Tile, RelativeIndex<Tile>, HvvhTree<Tile>>;

    fn mosaic() -> Mosaic {
        CombinedIndex::new(RelativeIndex::new(), HvvhTree::new(Parameters::default()))
    }

    fn tile(name: &'static str, x0: f64, y0: f64, x1: f64, y1: f64) -> Tile {
        Tile {
            name,
            extent: Extent::world(x0, y0, x1, y1),
        }
    }

    fn names(items: &[Indexable<Tile>]) -> Vec<&'static str> {
        items.iter().map(|t| t.name).collect()
    }

    #[test]
    fn region_queries_come_back_in_stacking_order() {
        let mut m = mosaic();
        let a = m.add(tile("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        m.add(tile("b", 20.0, 0.0, 30.0, 10.0)).unwrap();
        let c = m.add(tile("c", 5.0, 0.0, 25.0, 10.0)).unwrap();
        m.add(tile("d", 100.0, 100.0, 110.0, 110.0)).unwrap();

        let row = SearchCriteria::region(Extent::world(0.0, 0.0, 30.0, 5.0));
        assert_eq!(names(&m.query_indexables(&row, true)), ["a", "b", "c"]);

        m.first_mut().back(&c).unwrap();
        m.first_mut().front(&a).unwrap();
        assert_eq!(names(&m.query_indexables(&row, true)), ["c", "b", "a"]);

        let above_c = row.with(crate::Criterion::Above(c));
        assert_eq!(names(&m.query_indexables(&above_c, true)), ["b", "a"]);
    }

    #[test]
    fn interacting_objects_follow_first_order() {
        let mut m = mosaic();
        let a = m.add(tile("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        m.add(tile("far", 50.0, 50.0, 60.0, 60.0)).unwrap();
        let b = m.add(tile("b", 8.0, 8.0, 20.0, 20.0)).unwrap();
        m.first_mut().back(&b).unwrap();

        assert!(m.supports_interacting_retrieval());
        assert_eq!(names(&m.interacting_objects(&[a])), ["b", "a"]);
    }

    #[test]
    fn failed_second_add_rolls_back_the_first() {
        let mut m = mosaic();
        let x = Indexable::new(tile("x", 0.0, 0.0, 1.0, 1.0));
        m.second_mut().add_indexable(x.clone()).unwrap();
        assert_eq!(
            m.add_indexable(x.clone()),
            Err(IndexError::ContractViolation(Violation::AlreadyIndexed))
        );
        assert!(!m.first().contains(&x));
        assert_eq!(
            m.remove_indexable(&x),
            Err(IndexError::ContractViolation(Violation::NotIndexed))
        );
        assert!(m.second().contains(&x));
    }

    #[test]
    fn promote_moves_one_step_in_query_order() {
        let mut m = mosaic();
        let a = m.add(tile("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        m.add(tile("b", 0.0, 0.0, 10.0, 10.0)).unwrap();
        m.add(tile("c", 0.0, 0.0, 10.0, 10.0)).unwrap();
        m.first_mut().promote(&a).unwrap();
        let here = SearchCriteria::region(Extent::world(1.0, 1.0, 2.0, 2.0));
        assert_eq!(names(&m.query_indexables(&here, true)), ["b", "a", "c"]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "combined indexes out of sync")]
    fn len_checks_that_both_indexes_agree() {
        let mut m = mosaic();
        m.add(tile("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        m.second_mut()
            .add_indexable(Indexable::new(tile("stray", 0.0, 0.0, 1.0, 1.0)))
            .unwrap();
        let _ = m.len();
    }

    #[test]
    fn filled_indexable_falls_through_to_second() {
        let mut m = mosaic();
        let only_spatial = Indexable::new(tile("s", 0.0, 0.0, 1.0, 1.0));
        m.second_mut().add_indexable(only_spatial.clone()).unwrap();
        assert!(m.filled_indexable_for(&only_spatial).ptr_eq(&only_spatial));
        assert_eq!(m.tracked(&only_spatial), Some(only_spatial.clone()));

        let fresh = Indexable::new(tile("f", 0.0, 0.0, 1.0, 1.0));
        assert!(m.filled_indexable_for(&fresh).ptr_eq(&fresh));
        assert_eq!(m.tracked(&fresh), None);
    }

    #[test]
    fn removal_goes_through_both() {
        let mut m = mosaic();
        let a = m.add(tile("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let u = m
            .add(Tile {
                name: "u",
                extent: Extent::undefined(CoordSys::WORLD),
            })
            .unwrap();
        let void = SearchCriteria::region(Extent::undefined(CoordSys::WORLD));
        assert_eq!(names(&m.query_indexables(&void, true)), ["u"]);

        m.remove(&a).unwrap();
        assert!(!m.first().contains(&a) && !m.second().contains(&a));
        assert_eq!(m.len(), 1);
        let (first, second) = m.into_parts();
        assert_eq!(first.query_indexables(&SearchCriteria::new(), true), vec![u.clone()]);
        assert_eq!(second.unindexed(), vec![u]);
    }
}
