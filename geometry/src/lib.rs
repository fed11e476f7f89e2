// tangent/geometry/src/lib.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integer geometry: the window-space rectangles that viewports, scissors, blits, and pixel
//! readback operate on.

pub mod rect;
pub mod vector;

/// Clamps `value` into `[min, max]`. Unlike `Ord::clamp`, an inverted range yields `min`
/// instead of panicking, which matches how window-space bounds degrade to empty.
#[inline]
pub fn clamp(value: i32, min: i32, max: i32) -> i32 {
    if value < min {
        min
    } else if value > max {
        max.max(min)
    } else {
        value
    }
}

/// Clamps a float into `[0, 1]`.
#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.max(0.0).min(1.0)
}

/// Rounds `value` up to the next multiple of `alignment`.
#[inline]
pub fn round_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment > 0);
    (value + alignment - 1) / alignment * alignment
}
