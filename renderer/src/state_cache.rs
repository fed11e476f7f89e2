// tangent/renderer/src/state_cache.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Memoizes native pipeline state objects keyed by the portable state that produced them.

use crate::error::Result;
use crate::gl::{DepthStencilState, RasterizerState, SamplerState};
use crate::translate::{self, BlendKey};
use fxhash::FxHashMap;
use std::hash::Hash;
use tangent_gpu::{Device, DeviceError};

/// Each kind of state object is capped at this many entries; the least recently used one is
/// released to make room.
pub const MAX_STATES: usize = 4096;

pub struct StateCache<D> where D: Device {
    rasterizer_states: FxHashMap<(RasterizerState, bool), CacheEntry<D::RasterizerState>>,
    blend_states: FxHashMap<BlendKey, CacheEntry<D::BlendState>>,
    depth_stencil_states: FxHashMap<DepthStencilState, CacheEntry<D::DepthStencilState>>,
    sampler_states: FxHashMap<SamplerState, CacheEntry<D::SamplerState>>,
    zero_max_lod_workaround: bool,
    timestamp: u64,
    misses: u32,
}

struct CacheEntry<T> {
    object: T,
    last_used: u64,
}

impl<D> StateCache<D> where D: Device {
    pub fn new(zero_max_lod_workaround: bool) -> StateCache<D> {
        StateCache {
            rasterizer_states: FxHashMap::default(),
            blend_states: FxHashMap::default(),
            depth_stencil_states: FxHashMap::default(),
            sampler_states: FxHashMap::default(),
            zero_max_lod_workaround,
            timestamp: 0,
            misses: 0,
        }
    }

    pub fn rasterizer_state(&mut self,
                            device: &D,
                            state: &RasterizerState,
                            scissor_enabled: bool)
                            -> Result<D::RasterizerState> {
        let desc = translate::rasterizer_desc(state, scissor_enabled);
        lookup(&mut self.rasterizer_states,
               &mut self.timestamp,
               &mut self.misses,
               (*state, scissor_enabled),
               || device.create_rasterizer_state(&desc))
    }

    pub fn blend_state(&mut self, device: &D, key: &BlendKey) -> Result<D::BlendState> {
        lookup(&mut self.blend_states,
               &mut self.timestamp,
               &mut self.misses,
               *key,
               || device.create_blend_state(&translate::blend_desc(key)))
    }

    pub fn depth_stencil_state(&mut self, device: &D, state: &DepthStencilState)
                               -> Result<D::DepthStencilState> {
        lookup(&mut self.depth_stencil_states,
               &mut self.timestamp,
               &mut self.misses,
               *state,
               || device.create_depth_stencil_state(&translate::depth_stencil_desc(state)))
    }

    pub fn sampler_state(&mut self, device: &D, state: &SamplerState) -> Result<D::SamplerState> {
        let desc = translate::sampler_desc(state, self.zero_max_lod_workaround);
        lookup(&mut self.sampler_states,
               &mut self.timestamp,
               &mut self.misses,
               *state,
               || device.create_sampler_state(&desc))
    }

    /// Releases every cached object.
    pub fn clear(&mut self) {
        self.rasterizer_states.clear();
        self.blend_states.clear();
        self.depth_stencil_states.clear();
        self.sampler_states.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rasterizer_states.len() + self.blend_states.len() + self.depth_stencil_states.len() +
            self.sampler_states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of lookups that had to create a native object.
    #[inline]
    pub fn misses(&self) -> u32 {
        self.misses
    }
}

fn lookup<K, T, F>(map: &mut FxHashMap<K, CacheEntry<T>>,
                   timestamp: &mut u64,
                   misses: &mut u32,
                   key: K,
                   create: F)
                   -> Result<T>
                   where K: Eq + Hash + Copy,
                         T: Clone,
                         F: FnOnce() -> std::result::Result<T, DeviceError> {
    *timestamp += 1;
    if let Some(entry) = map.get_mut(&key) {
        entry.last_used = *timestamp;
        return Ok(entry.object.clone());
    }

    let object = create()?;
    *misses += 1;

    if map.len() >= MAX_STATES {
        let oldest = map.iter().min_by_key(|(_, entry)| entry.last_used).map(|(key, _)| *key);
        if let Some(oldest) = oldest {
            debug!("evicting least recently used state object");
            map.remove(&oldest);
        }
    }

    map.insert(key, CacheEntry { object: object.clone(), last_used: *timestamp });
    Ok(object)
}

#[cfg(test)]
mod test {
    use super::{StateCache, MAX_STATES};
    use crate::gl::{BlendState, DepthStencilState, RasterizerState, SamplerState};
    use crate::translate::BlendKey;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, NativeObject, Platform};
    use tangent_soft::{Call, SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    fn blend_key(state: BlendState) -> BlendKey {
        BlendKey { state, target_channels: [[true; 4]; 8], multiple_targets: false }
    }

    #[test]
    fn test_same_state_creates_once() {
        let device = device();
        let mut cache = StateCache::new(false);
        let key = blend_key(BlendState::default());
        let first = cache.blend_state(&device, &key).unwrap();
        let second = cache.blend_state(&device, &key).unwrap();
        assert_eq!(first.object_id(), second.object_id());
        assert_eq!(device.count_calls(|call| match call {
            Call::CreateBlendState(_) => true,
            _ => false,
        }), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_scissor_is_part_of_rasterizer_key() {
        let device = device();
        let mut cache = StateCache::new(false);
        let state = RasterizerState::default();
        let plain = cache.rasterizer_state(&device, &state, false).unwrap();
        let scissored = cache.rasterizer_state(&device, &state, true).unwrap();
        assert_ne!(plain.object_id(), scissored.object_id());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_creation_is_not_cached() {
        let device = device();
        let mut cache = StateCache::new(false);
        device.fail_allocations_after(0);
        let state = DepthStencilState::default();
        assert!(cache.depth_stencil_state(&device, &state).is_err());
        assert!(cache.is_empty());
        device.stop_failing_allocations();
        assert!(cache.depth_stencil_state(&device, &state).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let device = device();
        let mut cache = StateCache::new(true);
        cache.sampler_state(&device, &SamplerState::default()).unwrap();
        cache.depth_stencil_state(&device, &DepthStencilState::default()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_keeps_recent_entries() {
        let device = device();
        let mut cache = StateCache::new(false);
        let sampler = |max_level| SamplerState { max_level, ..SamplerState::default() };
        for level in 0..(MAX_STATES as u32) {
            cache.sampler_state(&device, &sampler(level)).unwrap();
        }
        // Touch the oldest so that the second oldest goes instead.
        cache.sampler_state(&device, &sampler(0)).unwrap();
        cache.sampler_state(&device, &sampler(MAX_STATES as u32)).unwrap();
        assert_eq!(cache.len(), MAX_STATES);
        let misses = cache.misses();
        cache.sampler_state(&device, &sampler(0)).unwrap();
        assert_eq!(cache.misses(), misses);
        cache.sampler_state(&device, &sampler(1)).unwrap();
        assert_eq!(cache.misses(), misses + 1);
    }
}
