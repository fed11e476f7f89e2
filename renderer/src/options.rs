// tangent/renderer/src/options.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Options that control how the renderer creates its device, and the limits and workarounds
//! derived from the device it got.

use smallvec::SmallVec;
use tangent_gpu::{DriverType, FeatureLevel};

/// Renderer options that can't be changed after the renderer is created.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererOptions {
    /// The highest feature level to request, as a major version and an optional minor
    /// version. `None` accepts whatever the adapter offers.
    pub max_version: Option<(u32, Option<u32>)>,
    /// Which kind of device to create.
    pub device_type: DeviceType,
    /// Whether to try the debug layer first. Creation falls back to a release device if the
    /// layer is not installed.
    pub debug_layer: bool,
}

/// The kind of device the renderer asks the platform for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    Hardware,
    Warp,
    Reference,
    Null,
}

impl Default for RendererOptions {
    #[inline]
    fn default() -> RendererOptions {
        RendererOptions {
            max_version: None,
            device_type: DeviceType::Hardware,
            debug_layer: cfg!(debug_assertions),
        }
    }
}

impl RendererOptions {
    /// The feature levels to try, most capable first.
    pub fn available_feature_levels(&self) -> SmallVec<[FeatureLevel; 4]> {
        let (major, minor) = match self.max_version {
            None => (None, None),
            Some((major, minor)) => (Some(major), minor),
        };
        let major_at_least = |version| major.map_or(true, |major| major >= version);
        let minor_at_least = |version| minor.map_or(true, |minor| minor >= version);

        let mut levels = SmallVec::new();
        if major_at_least(11) && minor_at_least(0) {
            levels.push(FeatureLevel::Level11_0);
        }
        if major_at_least(10) {
            if minor_at_least(1) {
                levels.push(FeatureLevel::Level10_1);
            }
            if minor_at_least(0) {
                levels.push(FeatureLevel::Level10_0);
            }
        }
        // The lowest level is strictly opt-in.
        if major == Some(9) && minor == Some(3) {
            levels.push(FeatureLevel::Level9_3);
        }
        levels
    }
}

impl DeviceType {
    #[inline]
    pub fn driver_type(self) -> DriverType {
        match self {
            DeviceType::Hardware => DriverType::Hardware,
            DeviceType::Warp => DriverType::Warp,
            DeviceType::Reference => DriverType::Reference,
            DeviceType::Null => DriverType::Null,
        }
    }
}

/// Implementation limits, derived from the feature level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caps {
    pub max_draw_buffers: u32,
    pub max_texture_image_units: u32,
    pub max_vertex_texture_image_units: u32,
    pub max_viewport_width: u32,
    pub max_viewport_height: u32,
    pub max_vertex_attributes: u32,
    pub max_uniform_blocks: u32,
    pub max_uniform_block_size: usize,
    pub max_transform_feedback_buffers: u32,
    pub max_2d_texture_size: u32,
    pub max_3d_texture_size: u32,
    pub max_cube_map_texture_size: u32,
    pub max_array_texture_layers: u32,
    pub max_samples: u32,
}

/// Number of constant buffer slots the renderer keeps for itself in each stage: the default
/// uniform block and the driver constants.
pub const RESERVED_UNIFORM_BUFFERS: u32 = 2;

/// Number of uniform vectors the renderer keeps for itself. Driver constants live in their own
/// buffer, so none are taken from the default block.
pub const RESERVED_UNIFORM_VECTORS: u32 = 0;

const CONSTANT_BUFFER_SLOTS: u32 = 14;

impl Caps {
    pub fn for_feature_level(feature_level: FeatureLevel) -> Caps {
        match feature_level {
            FeatureLevel::Level11_0 => Caps {
                max_draw_buffers: 8,
                max_texture_image_units: 16,
                max_vertex_texture_image_units: 16,
                max_viewport_width: 32767,
                max_viewport_height: 32767,
                max_vertex_attributes: 16,
                max_uniform_blocks: CONSTANT_BUFFER_SLOTS - RESERVED_UNIFORM_BUFFERS,
                max_uniform_block_size: 4096 * 16,
                max_transform_feedback_buffers: 4,
                max_2d_texture_size: 16384,
                max_3d_texture_size: 2048,
                max_cube_map_texture_size: 16384,
                max_array_texture_layers: 2048,
                max_samples: 4,
            },
            FeatureLevel::Level10_1 | FeatureLevel::Level10_0 => Caps {
                max_draw_buffers: 8,
                max_texture_image_units: 16,
                max_vertex_texture_image_units: 16,
                max_viewport_width: 16383,
                max_viewport_height: 16383,
                max_vertex_attributes: 16,
                max_uniform_blocks: CONSTANT_BUFFER_SLOTS - RESERVED_UNIFORM_BUFFERS,
                max_uniform_block_size: 4096 * 16,
                max_transform_feedback_buffers: 4,
                max_2d_texture_size: 8192,
                max_3d_texture_size: 2048,
                max_cube_map_texture_size: 8192,
                max_array_texture_layers: 512,
                max_samples: 4,
            },
            FeatureLevel::Level9_3 => Caps {
                max_draw_buffers: 4,
                max_texture_image_units: 16,
                max_vertex_texture_image_units: 0,
                max_viewport_width: 8192,
                max_viewport_height: 8192,
                max_vertex_attributes: 16,
                max_uniform_blocks: 0,
                max_uniform_block_size: 0,
                max_transform_feedback_buffers: 0,
                max_2d_texture_size: 4096,
                max_3d_texture_size: 256,
                max_cube_map_texture_size: 4096,
                max_array_texture_layers: 0,
                max_samples: 1,
            },
        }
    }
}

/// Driver and hardware workarounds the renderer applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Workarounds {
    /// Compact the color attachment list to the enabled draw buffers before binding.
    pub mrt_perf_workaround: bool,
    /// Render point sprites as instanced quads instead of through a geometry shader.
    pub use_instanced_point_sprite_emulation: bool,
    /// The device cannot clamp the maximum LOD of a mipmapped resource to zero, so textures
    /// sampled without mipmapping read from a separate single-level copy.
    pub zero_max_lod_workaround: bool,
    /// Buffer data uploads beat texture image uploads for pixel unpacking.
    pub set_data_faster_than_image_upload: bool,
}

impl Workarounds {
    pub fn for_feature_level(feature_level: FeatureLevel) -> Workarounds {
        let level_9 = feature_level <= FeatureLevel::Level9_3;
        Workarounds {
            mrt_perf_workaround: true,
            use_instanced_point_sprite_emulation: level_9,
            zero_max_lod_workaround: level_9,
            set_data_faster_than_image_upload: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Caps, RendererOptions, Workarounds};
    use tangent_gpu::FeatureLevel;

    fn levels(max_version: Option<(u32, Option<u32>)>) -> Vec<FeatureLevel> {
        let options = RendererOptions { max_version, ..RendererOptions::default() };
        options.available_feature_levels().into_iter().collect()
    }

    #[test]
    fn test_default_levels_exclude_9_3() {
        assert_eq!(levels(None),
                   vec![FeatureLevel::Level11_0, FeatureLevel::Level10_1, FeatureLevel::Level10_0]);
    }

    #[test]
    fn test_requested_maximums() {
        assert_eq!(levels(Some((10, None))),
                   vec![FeatureLevel::Level10_1, FeatureLevel::Level10_0]);
        assert_eq!(levels(Some((10, Some(0)))), vec![FeatureLevel::Level10_0]);
        assert_eq!(levels(Some((9, Some(3)))), vec![FeatureLevel::Level9_3]);
        assert_eq!(levels(Some((9, None))), vec![]);
    }

    #[test]
    fn test_level_9_limits() {
        let caps = Caps::for_feature_level(FeatureLevel::Level9_3);
        assert_eq!(caps.max_draw_buffers, 4);
        assert_eq!(caps.max_transform_feedback_buffers, 0);
        let workarounds = Workarounds::for_feature_level(FeatureLevel::Level9_3);
        assert!(workarounds.zero_max_lod_workaround);
        assert!(!Workarounds::for_feature_level(FeatureLevel::Level10_0).zero_max_lod_workaround);
    }
}
