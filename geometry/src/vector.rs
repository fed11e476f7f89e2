// tangent/geometry/src/vector.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A two-component integer vector.

use std::ops::{Add, AddAssign, Sub};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Vector2I {
    x: i32,
    y: i32,
}

impl Vector2I {
    #[inline]
    pub fn new(x: i32, y: i32) -> Vector2I {
        Vector2I { x, y }
    }

    #[inline]
    pub fn splat(value: i32) -> Vector2I {
        Vector2I { x: value, y: value }
    }

    #[inline]
    pub fn zero() -> Vector2I {
        Vector2I::default()
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.y
    }

    #[inline]
    pub fn set_x(&mut self, x: i32) {
        self.x = x
    }

    #[inline]
    pub fn set_y(&mut self, y: i32) {
        self.y = y
    }

    #[inline]
    pub fn min(self, other: Vector2I) -> Vector2I {
        Vector2I::new(self.x.min(other.x), self.y.min(other.y))
    }

    #[inline]
    pub fn max(self, other: Vector2I) -> Vector2I {
        Vector2I::new(self.x.max(other.x), self.y.max(other.y))
    }

    #[inline]
    pub fn scale(self, factor: i32) -> Vector2I {
        Vector2I::new(self.x * factor, self.y * factor)
    }

    /// The number of elements an extent of this size covers; zero if either side is negative.
    #[inline]
    pub fn area(self) -> u64 {
        if self.x <= 0 || self.y <= 0 {
            0
        } else {
            self.x as u64 * self.y as u64
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x == 0 || self.y == 0
    }
}

impl Add<Vector2I> for Vector2I {
    type Output = Vector2I;
    #[inline]
    fn add(self, other: Vector2I) -> Vector2I {
        Vector2I::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign<Vector2I> for Vector2I {
    #[inline]
    fn add_assign(&mut self, other: Vector2I) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub<Vector2I> for Vector2I {
    type Output = Vector2I;
    #[inline]
    fn sub(self, other: Vector2I) -> Vector2I {
        Vector2I::new(self.x - other.x, self.y - other.y)
    }
}
