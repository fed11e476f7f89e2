// tangent/renderer/src/renderer/shadow.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! What was last bound to the native context.
//!
//! A `None` field is unknown: the next apply of that piece of state binds unconditionally.
//! `ShadowState::default()` is therefore the "everything dirty" state.

use crate::gl::{DepthStencilState, RasterizerState, SamplerState};
use crate::translate::BlendKey;
use fxhash::FxHashMap;
use smallvec::SmallVec;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::{InputElementDesc, PrimitiveTopology, SrvDesc, SrvDimension};
use tangent_gpu::desc::{ALL_MIPS, MAX_RENDER_TARGETS};
use tangent_gpu::format::NativeFormat;
use tangent_gpu::{IndexFormat, ObjectId, ShaderStage};

pub(crate) type SlotKey = (ShaderStage, u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AppliedBlend {
    pub(crate) key: BlendKey,
    pub(crate) blend_color: [u32; 4],
    pub(crate) sample_mask: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct AppliedViewport {
    pub(crate) rect: RectI,
    pub(crate) near: u32,
    pub(crate) far: u32,
}

/// A bound shader resource view and the subresources it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SrvBinding {
    pub(crate) view: ObjectId,
    pub(crate) resource: ObjectId,
    pub(crate) first_mip: u32,
    pub(crate) mip_count: u32,
    pub(crate) first_slice: u32,
    pub(crate) slice_count: u32,
}

impl SrvBinding {
    pub(crate) fn new(view: ObjectId, resource: ObjectId, desc: &SrvDesc) -> SrvBinding {
        let mip_count = match desc.mip_levels {
            ALL_MIPS => u32::max_value(),
            mip_levels => mip_levels,
        };
        let (first_slice, slice_count) = match desc.dimension {
            SrvDimension::Texture2DArray => (desc.first_array_slice, desc.array_size),
            SrvDimension::TextureCube => (desc.first_array_slice, 6),
            SrvDimension::Texture3D => (0, u32::max_value()),
            SrvDimension::Texture2D | SrvDimension::Texture2DMs => (0, 1),
        };
        SrvBinding {
            view,
            resource,
            first_mip: desc.most_detailed_mip,
            mip_count,
            first_slice,
            slice_count,
        }
    }

    /// Whether this view reads subresource (`mip`, `slice`) of `resource`.
    pub(crate) fn reads(&self, resource: ObjectId, mip: u32, slice: u32) -> bool {
        self.resource == resource &&
            mip >= self.first_mip && mip - self.first_mip < self.mip_count &&
            slice >= self.first_slice && slice - self.first_slice < self.slice_count
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ConstantBufferBinding {
    pub(crate) buffer: ObjectId,
    pub(crate) offset: usize,
    pub(crate) size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IndexBufferBinding {
    pub(crate) buffer: ObjectId,
    pub(crate) format: IndexFormat,
    pub(crate) offset: u32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ShadowState {
    // Output merger
    pub(crate) render_target_serials: Option<SmallVec<[Option<u64>; MAX_RENDER_TARGETS]>>,
    pub(crate) depth_stencil_serial: Option<Option<u64>>,
    pub(crate) render_target_size: Vector2I,
    pub(crate) render_target_format: Option<NativeFormat>,
    pub(crate) blend: Option<AppliedBlend>,
    pub(crate) depth_stencil: Option<(DepthStencilState, i32, i32)>,

    // Rasterizer
    pub(crate) rasterizer: Option<(RasterizerState, bool)>,
    pub(crate) scissor: Option<RectI>,
    pub(crate) scissor_enabled: Option<bool>,
    pub(crate) viewport: Option<AppliedViewport>,

    // Shader stages
    pub(crate) samplers: FxHashMap<SlotKey, SamplerState>,
    pub(crate) shader_resources: FxHashMap<SlotKey, Option<SrvBinding>>,
    pub(crate) constant_buffers: FxHashMap<SlotKey, ConstantBufferBinding>,
    pub(crate) vertex_shader: Option<Option<ObjectId>>,
    pub(crate) geometry_shader: Option<Option<ObjectId>>,
    pub(crate) pixel_shader: Option<Option<ObjectId>>,
    pub(crate) vertex_constants: Option<Vec<u8>>,
    pub(crate) pixel_constants: Option<Vec<u8>>,

    // Input assembler and stream output
    pub(crate) topology: Option<PrimitiveTopology>,
    pub(crate) input_layout: Option<Vec<InputElementDesc>>,
    pub(crate) vertex_buffers: FxHashMap<u32, (ObjectId, u32, u32)>,
    pub(crate) index_buffer: Option<IndexBufferBinding>,
    pub(crate) stream_output: Option<Vec<(Option<ObjectId>, usize)>>,
}
