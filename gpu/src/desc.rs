// tangent/gpu/src/desc.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Descriptors for native resources, views, and pipeline state objects.

use crate::format::NativeFormat;
use crate::{BindFlags, ColorWriteMask, CpuAccessFlags, ResourceMiscFlags};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Usage {
    Default,
    Immutable,
    Dynamic,
    Staging,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    Texture2D,
    Texture3D,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub dimension: TextureDimension,
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, array size otherwise.
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub format: NativeFormat,
    pub sample_count: u32,
    pub usage: Usage,
    pub bind_flags: BindFlags,
    pub cpu_access: CpuAccessFlags,
    pub misc_flags: ResourceMiscFlags,
}

impl TextureDesc {
    pub fn new_2d(width: u32, height: u32, format: NativeFormat) -> TextureDesc {
        TextureDesc {
            dimension: TextureDimension::Texture2D,
            width,
            height,
            depth_or_array_size: 1,
            mip_levels: 1,
            format,
            sample_count: 1,
            usage: Usage::Default,
            bind_flags: BindFlags::empty(),
            cpu_access: CpuAccessFlags::empty(),
            misc_flags: ResourceMiscFlags::empty(),
        }
    }

    #[inline]
    pub fn array_size(&self) -> u32 {
        match self.dimension {
            TextureDimension::Texture2D => self.depth_or_array_size,
            TextureDimension::Texture3D => 1,
        }
    }

    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub byte_width: usize,
    pub usage: Usage,
    pub bind_flags: BindFlags,
    pub cpu_access: CpuAccessFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SrvDimension {
    Texture2D,
    Texture2DMs,
    Texture2DArray,
    TextureCube,
    Texture3D,
}

/// Describes a shader-resource view. A `mip_levels` of `ALL_MIPS` covers every level from
/// `most_detailed_mip` down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SrvDesc {
    pub format: NativeFormat,
    pub dimension: SrvDimension,
    pub most_detailed_mip: u32,
    pub mip_levels: u32,
    pub first_array_slice: u32,
    pub array_size: u32,
}

pub const ALL_MIPS: u32 = !0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RtvDimension {
    Texture2D { mip_slice: u32 },
    Texture2DMs,
    Texture2DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture3D { mip_slice: u32, first_w_slice: u32, w_size: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtvDesc {
    pub format: NativeFormat,
    pub dimension: RtvDimension,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DsvDimension {
    Texture2D { mip_slice: u32 },
    Texture2DMs,
    Texture2DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DsvDesc {
    pub format: NativeFormat,
    pub dimension: DsvDimension,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillMode {
    Wireframe,
    Solid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizerDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip_enable: bool,
    pub scissor_enable: bool,
    pub multisample_enable: bool,
    pub antialiased_line_enable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetBlendDesc {
    pub blend_enable: bool,
    pub src_blend: BlendFactor,
    pub dest_blend: BlendFactor,
    pub blend_op: BlendOp,
    pub src_blend_alpha: BlendFactor,
    pub dest_blend_alpha: BlendFactor,
    pub blend_op_alpha: BlendOp,
    pub write_mask: ColorWriteMask,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> RenderTargetBlendDesc {
        RenderTargetBlendDesc {
            blend_enable: false,
            src_blend: BlendFactor::One,
            dest_blend: BlendFactor::Zero,
            blend_op: BlendOp::Add,
            src_blend_alpha: BlendFactor::One,
            dest_blend_alpha: BlendFactor::Zero,
            blend_op_alpha: BlendOp::Add,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

pub const MAX_RENDER_TARGETS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendDesc {
    pub alpha_to_coverage_enable: bool,
    pub independent_blend_enable: bool,
    pub render_targets: [RenderTargetBlendDesc; MAX_RENDER_TARGETS],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilFaceDesc {
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub func: ComparisonFunc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write_enable: bool,
    pub depth_func: ComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilFaceDesc,
    pub back_face: StencilFaceDesc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Point,
    Linear,
    Anisotropic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: Option<ComparisonFunc>,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputElementDesc {
    pub semantic_index: u32,
    pub format: NativeFormat,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub instance_data_step_rate: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamOutputDecl {
    pub semantic_index: u32,
    pub start_component: u8,
    pub component_count: u8,
    pub output_slot: u8,
}

/// A region of a subresource, as half-open ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeBox {
    pub left: u32,
    pub top: u32,
    pub front: u32,
    pub right: u32,
    pub bottom: u32,
    pub back: u32,
}

impl NativeBox {
    #[inline]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.back - self.front
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AdapterDesc {
    pub description: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub sub_sys_id: u32,
    pub revision: u32,
}
