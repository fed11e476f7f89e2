// tangent/geometry/src/rect.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! 2D axis-aligned integer rectangles in GL's origin-plus-size form.
//!
//! Sizes may be negative: a blit source or destination with a negative width or height
//! describes a mirrored copy. Use `normalize` before treating such a rectangle as an area.

use crate::vector::Vector2I;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RectI {
    origin: Vector2I,
    size: Vector2I,
}

impl RectI {
    #[inline]
    pub fn new(origin: Vector2I, size: Vector2I) -> RectI {
        RectI { origin, size }
    }

    #[inline]
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> RectI {
        RectI::new(Vector2I::new(x, y), Vector2I::new(width, height))
    }

    #[inline]
    pub fn from_points(origin: Vector2I, lower_right: Vector2I) -> RectI {
        RectI::new(origin, lower_right - origin)
    }

    #[inline]
    pub fn origin(&self) -> Vector2I {
        self.origin
    }

    #[inline]
    pub fn size(&self) -> Vector2I {
        self.size
    }

    #[inline]
    pub fn lower_right(&self) -> Vector2I {
        self.origin + self.size
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.origin.x()
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.origin.y()
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.size.x()
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.size.y()
    }

    #[inline]
    pub fn min_x(&self) -> i32 {
        self.x().min(self.x() + self.width())
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.y().min(self.y() + self.height())
    }

    #[inline]
    pub fn max_x(&self) -> i32 {
        self.x().max(self.x() + self.width())
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.y().max(self.y() + self.height())
    }

    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.width() < 0 || self.height() < 0
    }

    /// Returns the same area with non-negative width and height.
    #[inline]
    pub fn normalize(&self) -> RectI {
        RectI::from_points(Vector2I::new(self.min_x(), self.min_y()),
                           Vector2I::new(self.max_x(), self.max_y()))
    }

    #[inline]
    pub fn contains_point(&self, point: Vector2I) -> bool {
        point.x() >= self.min_x() && point.x() < self.max_x() &&
            point.y() >= self.min_y() && point.y() < self.max_y()
    }

    #[inline]
    pub fn contains_rect(&self, other: RectI) -> bool {
        other.min_x() >= self.min_x() && other.max_x() <= self.max_x() &&
            other.min_y() >= self.min_y() && other.max_y() <= self.max_y()
    }

    /// Intersects the normalized forms of both rectangles. Returns `None` when the
    /// intersection is empty.
    #[inline]
    pub fn intersection(&self, other: RectI) -> Option<RectI> {
        let min_x = self.min_x().max(other.min_x());
        let min_y = self.min_y().max(other.min_y());
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if min_x >= max_x || min_y >= max_y {
            None
        } else {
            Some(RectI::from_points(Vector2I::new(min_x, min_y), Vector2I::new(max_x, max_y)))
        }
    }

    /// Clamps this rectangle into `[0, extent)`. The result may be empty.
    pub fn clamp_to_extent(&self, extent: Vector2I) -> RectI {
        let x = crate::clamp(self.x(), 0, extent.x());
        let y = crate::clamp(self.y(), 0, extent.y());
        let width = crate::clamp(self.width() + self.x().min(0), 0, extent.x() - x);
        let height = crate::clamp(self.height() + self.y().min(0), 0, extent.y() - y);
        RectI::from_xywh(x, y, width, height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

#[cfg(test)]
mod test {
    use super::RectI;
    use crate::vector::Vector2I;
    use quickcheck;

    #[test]
    fn test_normalize_flipped() {
        let rect = RectI::from_xywh(10, 20, -5, -10);
        assert!(rect.is_flipped());
        assert_eq!(rect.normalize(), RectI::from_xywh(5, 10, 5, 10));
    }

    #[test]
    fn test_intersection() {
        let a = RectI::from_xywh(0, 0, 10, 10);
        assert_eq!(a.intersection(RectI::from_xywh(5, 5, 10, 10)),
                   Some(RectI::from_xywh(5, 5, 5, 5)));
        assert_eq!(a.intersection(RectI::from_xywh(10, 0, 4, 4)), None);
    }

    #[test]
    fn test_clamp_to_extent() {
        let extent = Vector2I::new(4, 4);
        assert_eq!(RectI::from_xywh(-2, -2, 4, 4).clamp_to_extent(extent),
                   RectI::from_xywh(0, 0, 2, 2));
        assert_eq!(RectI::from_xywh(3, 3, 4, 4).clamp_to_extent(extent),
                   RectI::from_xywh(3, 3, 1, 1));
        assert!(RectI::from_xywh(8, 0, 4, 4).clamp_to_extent(extent).is_empty());
    }

    #[test]
    fn test_clamped_rect_stays_inside() {
        quickcheck::quickcheck(prop_clamped_rect_stays_inside as
                               fn(i16, i16, u16, u16, u8, u8) -> bool);

        fn prop_clamped_rect_stays_inside(x: i16,
                                          y: i16,
                                          width: u16,
                                          height: u16,
                                          extent_x: u8,
                                          extent_y: u8)
                                          -> bool {
            let extent = Vector2I::new(extent_x as i32, extent_y as i32);
            let rect = RectI::from_xywh(x as i32, y as i32, width as i32, height as i32);
            let clamped = rect.clamp_to_extent(extent);
            clamped.x() >= 0 && clamped.y() >= 0 && clamped.width() >= 0 &&
                clamped.height() >= 0 && clamped.max_x() <= extent.x() &&
                clamped.max_y() <= extent.y()
        }
    }
}
