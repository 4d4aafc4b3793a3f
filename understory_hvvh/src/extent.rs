// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Extents, coordinate systems, and the split-line classification shared by the trees.

use kurbo::{Affine, Rect};

/// A 2D coordinate system, expressed as the transform from its local space to world space.
///
/// Two coordinate systems are the same when their transforms are equal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoordSys {
    to_world: Affine,
}

impl CoordSys {
    /// The world coordinate system (identity transform).
    pub const WORLD: Self = Self {
        to_world: Affine::IDENTITY,
    };

    /// Create a coordinate system from its local-to-world transform.
    pub const fn new(to_world: Affine) -> Self {
        Self { to_world }
    }

    /// The local-to-world transform.
    pub const fn to_world(&self) -> Affine {
        self.to_world
    }

    /// Transform mapping coordinates expressed in `self` into `target`.
    ///
    /// Returns `None` if `target` has no inverse.
    fn transform_into(&self, target: &Self) -> Option<Affine> {
        if self == target {
            return Some(Affine::IDENTITY);
        }
        let det = target.to_world.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(target.to_world.inverse() * self.to_world)
    }
}

impl Default for CoordSys {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Axis-aligned rectangle with a defined/undefined state, tied to a coordinate system.
///
/// Undefined extents describe objects that cannot be placed spatially. Indexes keep
/// them aside and never report them for bounded region queries.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    rect: Option<Rect>,
    coord_sys: CoordSys,
}

impl Extent {
    /// Create a defined extent. Corners are reordered so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(rect: Rect, coord_sys: CoordSys) -> Self {
        let rect = Rect::new(
            rect.x0.min(rect.x1),
            rect.y0.min(rect.y1),
            rect.x0.max(rect.x1),
            rect.y0.max(rect.y1),
        );
        Self {
            rect: Some(rect),
            coord_sys,
        }
    }

    /// Create a defined extent in world coordinates from min/max corners.
    pub fn world(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Rect::new(min_x, min_y, max_x, max_y), CoordSys::WORLD)
    }

    /// Create an undefined extent.
    pub const fn undefined(coord_sys: CoordSys) -> Self {
        Self {
            rect: None,
            coord_sys,
        }
    }

    /// Whether this extent describes an actual rectangle.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.rect.is_some()
    }

    /// The rectangle, if defined.
    #[inline]
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// The coordinate system this extent is expressed in.
    #[inline]
    pub fn coord_sys(&self) -> CoordSys {
        self.coord_sys
    }

    /// Express this extent in another coordinate system.
    ///
    /// The result is the axis-aligned bounding box of the transformed rectangle. Infinite
    /// coordinates are kept. A target without an inverse, or a transform producing NaN
    /// coordinates, yields an undefined extent.
    pub fn normalized_to(&self, target: &CoordSys) -> Self {
        let rect = self.rect.and_then(|rect| {
            let affine = self.coord_sys.transform_into(target)?;
            let out = if affine == Affine::IDENTITY {
                rect
            } else {
                transform_rect_bbox(affine, rect)
            };
            (!rect_is_nan(&out)).then_some(out)
        });
        Self {
            rect,
            coord_sys: *target,
        }
    }

    /// Whether two extents overlap. Touching edges count as overlapping.
    ///
    /// `other` is normalized into this extent's coordinate system first. Undefined
    /// extents never overlap anything.
    pub fn overlaps(&self, other: &Self) -> bool {
        let other = other.normalized_to(&self.coord_sys);
        match (self.rect, other.rect) {
            (Some(a), Some(b)) => rects_overlap(&a, &b),
            _ => false,
        }
    }

    /// The smallest extent enclosing both, in this extent's coordinate system.
    ///
    /// An undefined operand is ignored; the union of two undefined extents is undefined.
    pub fn union(&self, other: &Self) -> Self {
        let other = other.normalized_to(&self.coord_sys);
        let rect = match (self.rect, other.rect) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        Self {
            rect,
            coord_sys: self.coord_sys,
        }
    }
}

/// Objects that can be placed in a spatial index.
pub trait Spatial {
    /// The object's extent, in any coordinate system.
    fn extent(&self) -> Extent;
}

impl Spatial for Extent {
    fn extent(&self) -> Extent {
        *self
    }
}

/// One of the two axes of the plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    /// Horizontal coordinate; splitting on it produces a vertical split line.
    #[default]
    X,
    /// Vertical coordinate; splitting on it produces a horizontal split line.
    Y,
}

impl Axis {
    /// The orthogonal axis.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }

    /// Projection of `rect` onto this axis.
    #[inline]
    pub fn span(self, rect: &Rect) -> Interval {
        match self {
            Self::X => Interval::new(rect.x0, rect.x1),
            Self::Y => Interval::new(rect.y0, rect.y1),
        }
    }
}

/// Closed interval on one axis.
///
/// [`Interval::EMPTY`] is the identity for [`Interval::widen`] and overlaps nothing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interval {
    /// Lower end.
    pub min: f64,
    /// Upper end.
    pub max: f64,
}

impl Interval {
    /// The empty interval.
    pub const EMPTY: Self = Self {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    /// Create an interval from its ends.
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether the interval contains no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// The smallest interval covering both.
    #[inline]
    #[must_use]
    pub fn widen(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether the intervals share at least one value (ends inclusive).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Whether `other` lies entirely within this interval.
    #[inline]
    pub fn covers(&self, other: &Self) -> bool {
        other.is_empty() || (self.min <= other.min && other.max <= self.max)
    }
}

/// Where an extent lies relative to a split line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    /// Entirely at or below the split position.
    Left,
    /// Entirely above the split position.
    Right,
    /// Straddling the split position.
    Center,
}

/// Classify a projected extent against a split position.
///
/// Touching the split line from below counts as [`Side::Left`]; the comparison is exact.
#[inline]
pub(crate) fn classify(span: Interval, split: f64) -> Side {
    if span.max <= split {
        Side::Left
    } else if span.min > split {
        Side::Right
    } else {
        Side::Center
    }
}

/// Midpoint of the bounding interval of `spans`.
///
/// Infinite ends are clamped to the largest finite values, so the result is always finite.
pub(crate) fn split_position(spans: impl IntoIterator<Item = Interval>) -> f64 {
    let bounds = spans.into_iter().fold(Interval::EMPTY, Interval::widen);
    debug_assert!(!bounds.is_empty(), "split position requires at least one member");
    let mid = (bounds.max - bounds.min) / 2.0 + bounds.min;
    if mid.is_finite() {
        return mid;
    }
    let min = bounds.min.clamp(f64::MIN, f64::MAX);
    let max = bounds.max.clamp(f64::MIN, f64::MAX);
    min / 2.0 + max / 2.0
}

/// Whether splitting `members` at their split position would separate anything from `incoming`.
///
/// A split makes no progress when every member, and the incoming extent, would land on
/// the left side. That only happens when all members are zero-width at the same position.
pub(crate) fn split_separates(members: &[Interval], incoming: Interval) -> bool {
    let split = split_position(members.iter().copied());
    classify(incoming, split) != Side::Left
        || members.iter().any(|m| classify(*m, split) != Side::Left)
}

/// Inclusive rectangle overlap test.
#[inline]
pub(crate) fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Transform an axis-aligned `Rect` by an `Affine` and return a conservative
/// axis-aligned bounding box in the target space.
///
/// Zero coefficients contribute nothing, so infinite edges survive axis-aligned scales.
fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let (ax0, ax1) = scaled_span(a, rect.x0, rect.x1);
    let (cy0, cy1) = scaled_span(c, rect.y0, rect.y1);
    let (bx0, bx1) = scaled_span(b, rect.x0, rect.x1);
    let (dy0, dy1) = scaled_span(d, rect.y0, rect.y1);
    Rect::new(ax0 + cy0 + e, bx0 + dy0 + f, ax1 + cy1 + e, bx1 + dy1 + f)
}

fn scaled_span(k: f64, lo: f64, hi: f64) -> (f64, f64) {
    if k == 0.0 {
        (0.0, 0.0)
    } else {
        ((k * lo).min(k * hi), (k * lo).max(k * hi))
    }
}

fn rect_is_nan(r: &Rect) -> bool {
    r.x0.is_nan() || r.y0.is_nan() || r.x1.is_nan() || r.y1.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundary_touch_is_left() {
        assert_eq!(classify(Interval::new(0.0, 5.0), 5.0), Side::Left);
        assert_eq!(classify(Interval::new(5.0, 6.0), 5.0), Side::Center);
        assert_eq!(classify(Interval::new(5.5, 6.0), 5.0), Side::Right);
        assert_eq!(classify(Interval::new(4.0, 6.0), 5.0), Side::Center);
    }

    #[test]
    fn split_position_is_bbox_midpoint() {
        let spans = [Interval::new(0.0, 10.0), Interval::new(5.0, 15.0)];
        assert_eq!(split_position(spans), 7.5);
        let spans = [Interval::new(-4.0, -2.0), Interval::new(6.0, 8.0)];
        assert_eq!(split_position(spans), 2.0);
    }

    #[test]
    fn coincident_points_do_not_separate() {
        let members = [Interval::new(3.0, 3.0), Interval::new(3.0, 3.0)];
        assert!(!split_separates(&members, Interval::new(3.0, 3.0)));
        assert!(!split_separates(&members, Interval::new(1.0, 2.0)));
        assert!(split_separates(&members, Interval::new(3.0, 4.0)));
        let members = [Interval::new(0.0, 1.0), Interval::new(0.0, 1.0)];
        assert!(split_separates(&members, Interval::new(0.0, 1.0)));
    }

    #[test]
    fn overlap_includes_touching_edges() {
        let a = Extent::world(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Extent::world(10.0, 0.0, 20.0, 10.0)));
        assert!(a.overlaps(&Extent::world(10.0, 10.0, 20.0, 20.0)));
        assert!(!a.overlaps(&Extent::world(10.5, 0.0, 20.0, 10.0)));
        assert!(!a.overlaps(&Extent::undefined(CoordSys::WORLD)));
    }

    #[test]
    fn union_ignores_undefined() {
        let a = Extent::world(0.0, 0.0, 1.0, 1.0);
        let u = Extent::undefined(CoordSys::WORLD);
        assert_eq!(a.union(&u), a);
        assert_eq!(u.union(&a).rect(), a.rect());
        assert!(!u.union(&u).is_defined());
        let b = Extent::world(4.0, -1.0, 5.0, 0.5);
        assert_eq!(a.union(&b).rect(), Some(Rect::new(0.0, -1.0, 5.0, 1.0)));
    }

    #[test]
    fn normalization_maps_between_systems() {
        let pixels = CoordSys::new(Affine::translate((100.0, 50.0)) * Affine::scale(2.0));
        let e = Extent::new(Rect::new(0.0, 0.0, 10.0, 5.0), pixels);
        let world = e.normalized_to(&CoordSys::WORLD);
        assert_eq!(world.rect(), Some(Rect::new(100.0, 50.0, 120.0, 60.0)));
        let back = world.normalized_to(&pixels);
        assert_eq!(back.rect(), Some(Rect::new(0.0, 0.0, 10.0, 5.0)));

        // A flipped system still yields an ordered rectangle.
        let flipped = CoordSys::new(Affine::scale_non_uniform(1.0, -1.0));
        let r = Extent::world(0.0, 2.0, 1.0, 4.0).normalized_to(&flipped);
        assert_eq!(r.rect(), Some(Rect::new(0.0, -4.0, 1.0, -2.0)));
    }

    #[test]
    fn infinite_extents_stay_defined() {
        let plane = Extent::world(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY);
        assert_eq!(plane.normalized_to(&CoordSys::WORLD), plane);
        assert!(plane.overlaps(&Extent::world(1.0, 1.0, 2.0, 2.0)));

        let strip = Extent::world(0.0, 0.0, f64::INFINITY, 5.0);
        let scaled = CoordSys::new(Affine::scale(2.0));
        let r = strip.normalized_to(&scaled).rect();
        assert_eq!(r, Some(Rect::new(0.0, 0.0, f64::INFINITY, 2.5)));
    }

    #[test]
    fn split_position_of_unbounded_spans_is_finite() {
        let half = [Interval::new(0.0, 10.0), Interval::new(0.0, f64::INFINITY)];
        let split = split_position(half);
        assert!(split.is_finite() && split > 10.0);
        assert_eq!(classify(half[0], split), Side::Left);
        assert_eq!(classify(half[1], split), Side::Center);
        let whole = [Interval::new(f64::NEG_INFINITY, f64::INFINITY)];
        assert_eq!(split_position(whole), 0.0);
    }

    #[test]
    fn singular_target_yields_undefined() {
        let singular = CoordSys::new(Affine::scale(0.0));
        let e = Extent::world(0.0, 0.0, 1.0, 1.0).normalized_to(&singular);
        assert!(!e.is_defined());
        assert_eq!(e.coord_sys(), singular);
    }

    #[test]
    fn interval_widen_and_overlap() {
        let e = Interval::EMPTY;
        assert!(e.is_empty());
        assert!(!e.overlaps(&Interval::new(-1e300, 1e300)));
        let w = e.widen(Interval::new(1.0, 2.0)).widen(Interval::new(-3.0, 0.0));
        assert_eq!(w, Interval::new(-3.0, 2.0));
        assert!(w.covers(&Interval::new(-1.0, 1.0)));
        assert!(w.covers(&Interval::EMPTY));
        assert!(!w.covers(&Interval::new(-1.0, 3.0)));
    }
}
