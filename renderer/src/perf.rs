// tangent/renderer/src/perf.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Performance monitoring infrastructure.

use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Counters the renderer accumulates while translating GL calls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// The number of native draw calls issued, including emulation passes.
    pub drawcall_count: u32,
    /// The number of native state-binding calls issued.
    pub state_change_count: u32,
    /// The number of state-binding calls skipped because the shadow already matched.
    pub redundant_state_count: u32,
    /// Pipeline state cache lookups that had to create a native object.
    pub state_cache_misses: u32,
    /// Time spent waiting in `finish`.
    pub finish_time: Duration,
}

impl Add<RenderStats> for RenderStats {
    type Output = RenderStats;
    fn add(self, other: RenderStats) -> RenderStats {
        RenderStats {
            drawcall_count: self.drawcall_count + other.drawcall_count,
            state_change_count: self.state_change_count + other.state_change_count,
            redundant_state_count: self.redundant_state_count + other.redundant_state_count,
            state_cache_misses: self.state_cache_misses + other.state_cache_misses,
            finish_time: self.finish_time + other.finish_time,
        }
    }
}

impl AddAssign<RenderStats> for RenderStats {
    #[inline]
    fn add_assign(&mut self, other: RenderStats) {
        *self = *self + other
    }
}

#[cfg(test)]
mod test {
    use super::RenderStats;
    use std::time::Duration;

    #[test]
    fn test_stats_sum() {
        let a = RenderStats { drawcall_count: 2, state_change_count: 5, ..RenderStats::default() };
        let b = RenderStats {
            drawcall_count: 1,
            finish_time: Duration::from_millis(3),
            ..RenderStats::default()
        };
        let mut total = a + b;
        assert_eq!(total.drawcall_count, 3);
        assert_eq!(total.state_change_count, 5);
        total += b;
        assert_eq!(total.finish_time, Duration::from_millis(6));
    }
}
