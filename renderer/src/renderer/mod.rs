// tangent/renderer/src/renderer/mod.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The device-owning orchestrator.
//!
//! `Renderer` handles the device lifecycle. Once initialized, all GL-facing work goes through
//! its `RendererCore`, which diffs incoming state against what it last bound and only issues
//! the native calls that change something.

use crate::error::{Error, InitErrorKind, Result};
use crate::formats::InternalFormat;
use crate::index_data::IndexDataManager;
use crate::options::{Caps, RendererOptions, Workarounds, RESERVED_UNIFORM_BUFFERS};
use crate::options::RESERVED_UNIFORM_VECTORS;
use crate::perf::RenderStats;
use crate::render_target::RenderTarget;
use crate::state_cache::StateCache;
use crate::streaming_buffer::StreamingBuffer;
use crate::vertex_data::VertexDataManager;
use self::shaders::{PixelConstants, VertexConstants};
use self::shadow::ShadowState;
use instant::Instant;
use smallvec::SmallVec;
use std::thread;
use tangent_gpu::desc::{AdapterDesc, MAX_RENDER_TARGETS};
use tangent_gpu::{BindFlags, CreateDeviceFlags, Device, DeviceError, DriverType, FeatureLevel};
use tangent_gpu::Platform;

mod draw;
mod pixels;
mod shaders;
mod shadow;
mod state;
mod targets;

pub use self::draw::Indices;
pub use self::shaders::constant_buffer_range;

/// Owns the platform and, once initialized, the device-bound `RendererCore`.
pub struct Renderer<P> where P: Platform {
    platform: P,
    options: RendererOptions,
    libraries_loaded: bool,
    core: Option<RendererCore<P::Device>>,
}

impl<P> Renderer<P> where P: Platform {
    pub fn new(platform: P, options: RendererOptions) -> Renderer<P> {
        Renderer { platform, options, libraries_loaded: false, core: None }
    }

    /// Loads the native libraries and creates the device at the best available feature level.
    /// Calling this on an initialized renderer does nothing.
    pub fn initialize(&mut self) -> Result<()> {
        if self.core.is_some() {
            return Ok(());
        }

        if !self.libraries_loaded {
            self.platform.load_libraries()?;
            self.libraries_loaded = true;
        }

        match self.create_core() {
            Ok(core) => {
                info!("initialized renderer: {}", core.renderer_description());
                self.core = Some(core);
                Ok(())
            }
            Err(error) => {
                self.platform.unload_libraries();
                self.libraries_loaded = false;
                Err(error)
            }
        }
    }

    fn create_core(&mut self) -> Result<RendererCore<P::Device>> {
        let feature_levels = self.options.available_feature_levels();
        if feature_levels.is_empty() {
            return Err(Error::init(InitErrorKind::Other,
                                   "no feature level satisfies the requested version"));
        }

        let driver_type = self.options.device_type.driver_type();
        let mut creation_flags = CreateDeviceFlags::empty();
        let mut device = None;
        if self.options.debug_layer {
            match self.platform.create_device(driver_type,
                                              CreateDeviceFlags::DEBUG,
                                              &feature_levels) {
                Ok(debug_device) => {
                    creation_flags = CreateDeviceFlags::DEBUG;
                    device = Some(debug_device);
                }
                Err(error) => {
                    warn!("debug layer unavailable, creating a release device: {}", error);
                }
            }
        }
        let device = match device {
            Some(device) => device,
            None => self.platform.create_device(driver_type, creation_flags, &feature_levels)?,
        };

        self.platform.check_presentation_support(&device)?;
        let adapter = device.adapter_desc().map_err(|error| {
            Error::init(InitErrorKind::Other, format!("could not query the adapter: {}", error))
        })?;

        let mut core = RendererCore::new(device, adapter, DeviceCreation {
            driver_type,
            flags: creation_flags,
            feature_levels,
        });
        core.mark_all_state_dirty();
        Ok(core)
    }

    /// Drops the device and everything created on it. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut core) = self.core.take() {
            core.release_device_resources();
            core.device.clear_state();
            core.device.flush();
        }
        if self.libraries_loaded {
            self.platform.unload_libraries();
            self.libraries_loaded = false;
        }
    }

    /// Releases and re-creates the device. Resources created on the old device must be
    /// re-created by the caller.
    pub fn reset_device(&mut self) -> bool {
        self.release();
        match self.initialize() {
            Ok(()) => true,
            Err(error) => {
                error!("could not reset the device: {}", error);
                false
            }
        }
    }

    /// Whether a device could be created again with the current settings.
    pub fn test_device_resettable(&mut self) -> bool {
        let creation = match self.core {
            Some(ref core) => core.creation.clone(),
            None => return false,
        };
        self.platform
            .create_device(creation.driver_type, creation.flags, &creation.feature_levels)
            .is_ok()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.core.is_some()
    }

    pub fn core(&self) -> Result<&RendererCore<P::Device>> {
        self.core.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn core_mut(&mut self) -> Result<&mut RendererCore<P::Device>> {
        self.core.as_mut().ok_or(Error::NotInitialized)
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    #[inline]
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }
}

impl<P> Drop for Renderer<P> where P: Platform {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone, Debug)]
struct DeviceCreation {
    driver_type: DriverType,
    flags: CreateDeviceFlags,
    feature_levels: SmallVec<[FeatureLevel; 4]>,
}

/// The renderer state tied to one native device.
pub struct RendererCore<D> where D: Device {
    // Device
    device: D,
    creation: DeviceCreation,
    feature_level: FeatureLevel,
    adapter: AdapterDesc,
    caps: Caps,
    workarounds: Workarounds,
    device_lost: bool,

    // Caches and streaming storage
    state_cache: StateCache<D>,
    index_data: IndexDataManager<D>,
    vertex_data: VertexDataManager<D>,
    line_loop_indices: StreamingBuffer<D>,
    triangle_fan_indices: StreamingBuffer<D>,
    point_sprite_quad: Option<(D::Buffer, D::Buffer)>,

    // Driver constants
    vertex_driver_constants: Option<D::Buffer>,
    pixel_driver_constants: Option<D::Buffer>,
    vertex_constants: VertexConstants,
    pixel_constants: PixelConstants,

    // Applied state
    shadow: ShadowState,
    blend_target_channels: [[bool; 4]; MAX_RENDER_TARGETS],
    blend_multiple_targets: bool,

    // Sync
    sync_query: Option<D::Query>,
    stats: RenderStats,
}

impl<D> RendererCore<D> where D: Device {
    fn new(device: D, adapter: AdapterDesc, creation: DeviceCreation) -> RendererCore<D> {
        let feature_level = device.feature_level();
        let workarounds = Workarounds::for_feature_level(feature_level);
        RendererCore {
            device,
            creation,
            feature_level,
            adapter,
            caps: Caps::for_feature_level(feature_level),
            workarounds,
            device_lost: false,

            state_cache: StateCache::new(workarounds.zero_max_lod_workaround),
            index_data: IndexDataManager::new(),
            vertex_data: VertexDataManager::new(),
            line_loop_indices: StreamingBuffer::new(BindFlags::INDEX_BUFFER),
            triangle_fan_indices: StreamingBuffer::new(BindFlags::INDEX_BUFFER),
            point_sprite_quad: None,

            vertex_driver_constants: None,
            pixel_driver_constants: None,
            vertex_constants: VertexConstants::default(),
            pixel_constants: PixelConstants::default(),

            shadow: ShadowState::default(),
            blend_target_channels: [[true; 4]; MAX_RENDER_TARGETS],
            blend_multiple_targets: true,

            sync_query: None,
            stats: RenderStats::default(),
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    #[inline]
    pub fn caps(&self) -> &Caps {
        &self.caps
    }

    #[inline]
    pub fn workarounds(&self) -> &Workarounds {
        &self.workarounds
    }

    #[inline]
    pub fn reserved_uniform_vectors(&self) -> u32 {
        RESERVED_UNIFORM_VECTORS
    }

    #[inline]
    pub fn reserved_uniform_buffers(&self) -> u32 {
        RESERVED_UNIFORM_BUFFERS
    }

    /// Forgets everything that was bound, so the next apply of each piece of state binds it.
    pub fn mark_all_state_dirty(&mut self) {
        let render_target_size = self.shadow.render_target_size;
        self.shadow = ShadowState { render_target_size, ..ShadowState::default() };
    }

    /// Drops the caches and every renderer-owned native object.
    pub(crate) fn release_device_resources(&mut self) {
        self.state_cache.clear();
        self.index_data = IndexDataManager::new();
        self.vertex_data = VertexDataManager::new();
        self.line_loop_indices = StreamingBuffer::new(BindFlags::INDEX_BUFFER);
        self.triangle_fan_indices = StreamingBuffer::new(BindFlags::INDEX_BUFFER);
        self.point_sprite_quad = None;
        self.vertex_driver_constants = None;
        self.pixel_driver_constants = None;
        self.sync_query = None;
        self.mark_all_state_dirty();
    }

    // Synchronization

    #[inline]
    pub fn flush(&self) {
        self.device.flush();
    }

    /// Blocks until the device has executed everything submitted so far.
    pub fn finish(&mut self) -> Result<()> {
        let start = Instant::now();
        let query = match self.sync_query.take() {
            Some(query) => query,
            None => self.device.create_event_query()?,
        };
        self.device.end_query(&query);
        self.device.flush();

        let result = self.wait_for_query(&query);
        self.sync_query = Some(query);
        self.stats.finish_time += start.elapsed();
        result
    }

    fn wait_for_query(&mut self, query: &D::Query) -> Result<()> {
        loop {
            match self.device.query_event_complete(query) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(DeviceError::DeviceRemoved(_)) => {
                    self.test_device_lost();
                    return Err(Error::DeviceLost);
                }
                Err(error) => return Err(error.into()),
            }

            thread::yield_now();
            if self.test_device_lost() {
                return Err(Error::DeviceLost);
            }
        }
    }

    /// Checks whether the device was removed, logging the reason the first time.
    pub fn test_device_lost(&mut self) -> bool {
        match self.device.device_removed_reason() {
            None => false,
            Some(reason) => {
                if !self.device_lost {
                    error!("the device was removed: {:?}", reason);
                }
                self.device_lost = true;
                true
            }
        }
    }

    #[inline]
    pub fn is_device_lost(&self) -> bool {
        self.device_lost
    }

    // Diagnostics

    pub fn renderer_description(&self) -> String {
        let (major, minor, suffix) = match self.feature_level {
            FeatureLevel::Level11_0 => (5, 0, ""),
            FeatureLevel::Level10_1 => (4, 1, ""),
            FeatureLevel::Level10_0 => (4, 0, ""),
            FeatureLevel::Level9_3 => (4, 0, "_level_9_3"),
        };
        format!("{} Direct3D11 vs_{}_{}{} ps_{}_{}{}",
                self.adapter.description,
                major,
                minor,
                suffix,
                major,
                minor,
                suffix)
    }

    #[inline]
    pub fn vendor_id(&self) -> u32 {
        self.adapter.vendor_id
    }

    /// Identifies the adapter well enough to tell whether cached program binaries still apply.
    pub fn adapter_identifier(&self) -> [u32; 4] {
        let adapter = &self.adapter;
        [adapter.vendor_id, adapter.device_id, adapter.sub_sys_id, adapter.revision]
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats { state_cache_misses: self.state_cache.misses(), ..self.stats }
    }

    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    // Render targets

    /// Binds `view` alone, for internal passes that draw outside any framebuffer. The next
    /// framebuffer apply rebinds unconditionally.
    pub fn set_one_time_render_target(&mut self, view: Option<&D::RenderTargetView>) {
        let mut views: SmallVec<[Option<&D::RenderTargetView>; MAX_RENDER_TARGETS]> =
            SmallVec::new();
        views.push(view);
        while views.len() < self.caps.max_draw_buffers as usize {
            views.push(None);
        }
        self.device.set_render_targets(&views, None);
        self.shadow.render_target_serials = None;
        self.shadow.depth_stencil_serial = None;
        self.stats.state_change_count += 1;
    }

    /// Creates an offscreen render target. `samples` is clamped to what the device supports.
    pub fn create_render_target(&self,
                                width: u32,
                                height: u32,
                                format: InternalFormat,
                                samples: u32)
                                -> Result<RenderTarget<D>> {
        let samples = samples.min(self.caps.max_samples);
        RenderTarget::new(&self.device, width, height, format, samples)
    }
}

#[cfg(test)]
mod test {
    use super::RendererCore;
    use super::DeviceCreation;
    use smallvec::SmallVec;
    use tangent_gpu::desc::AdapterDesc;
    use tangent_gpu::{CreateDeviceFlags, Device, DriverType, FeatureLevel, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    pub(super) fn soft_core(feature_level: FeatureLevel) -> RendererCore<SoftDevice> {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        let device = platform.create_device(DriverType::Hardware,
                                            CreateDeviceFlags::empty(),
                                            &[feature_level]).unwrap();
        let adapter = device.adapter_desc().unwrap();
        let creation = DeviceCreation {
            driver_type: DriverType::Hardware,
            flags: CreateDeviceFlags::empty(),
            feature_levels: SmallVec::from_slice(&[feature_level]),
        };
        RendererCore::new(device, adapter, creation)
    }

    #[test]
    fn test_description_names_shader_models() {
        let core = soft_core(FeatureLevel::Level9_3);
        let description = core.renderer_description();
        assert!(description.ends_with("Direct3D11 vs_4_0_level_9_3 ps_4_0_level_9_3"));
        let core = soft_core(FeatureLevel::Level11_0);
        assert!(core.renderer_description().ends_with("vs_5_0 ps_5_0"));
    }

    #[test]
    fn test_adapter_identifier_uses_pci_ids() {
        let core = soft_core(FeatureLevel::Level10_0);
        let adapter: AdapterDesc = core.device().adapter_desc().unwrap();
        assert_eq!(core.adapter_identifier()[0], adapter.vendor_id);
        assert_eq!(core.vendor_id(), adapter.vendor_id);
    }

    #[test]
    fn test_render_target_samples_are_clamped() {
        let core = soft_core(FeatureLevel::Level10_0);
        let max_samples = core.caps().max_samples;
        let target =
            core.create_render_target(4, 4, crate::formats::InternalFormat::Rgba8, 64).unwrap();
        assert_eq!(target.samples(), max_samples);
    }
}
