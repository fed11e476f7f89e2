// tangent/renderer/src/gl.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The portable GL state the renderer reads. The GL layer owns and validates all of it.

use std::hash::{Hash, Hasher};
use tangent_geometry::rect::RectI;
use tangent_gpu::SwizzleChannel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderbufferId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    /// The fewest vertices that produce a primitive.
    #[inline]
    pub fn min_vertex_count(self) -> u32 {
        match self {
            PrimitiveMode::Points => 1,
            PrimitiveMode::Lines | PrimitiveMode::LineLoop | PrimitiveMode::LineStrip => 2,
            PrimitiveMode::Triangles |
            PrimitiveMode::TriangleStrip |
            PrimitiveMode::TriangleFan => 3,
        }
    }

    #[inline]
    pub fn is_triangles(self) -> bool {
        match self {
            PrimitiveMode::Triangles |
            PrimitiveMode::TriangleStrip |
            PrimitiveMode::TriangleFan => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl IndexType {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            IndexType::UnsignedByte => 1,
            IndexType::UnsignedShort => 2,
            IndexType::UnsignedInt => 4,
        }
    }

    /// Reads index `index` from tightly packed index data.
    #[inline]
    pub fn read(self, data: &[u8], index: usize) -> u32 {
        match self {
            IndexType::UnsignedByte => data[index] as u32,
            IndexType::UnsignedShort => {
                u16::from_le_bytes([data[index * 2], data[index * 2 + 1]]) as u32
            }
            IndexType::UnsignedInt => {
                let offset = index * 4;
                u32::from_le_bytes([data[offset],
                                    data[offset + 1],
                                    data[offset + 2],
                                    data[offset + 3]])
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub blend: bool,
    pub source_rgb: BlendFactor,
    pub dest_rgb: BlendFactor,
    pub equation_rgb: BlendEquation,
    pub source_alpha: BlendFactor,
    pub dest_alpha: BlendFactor,
    pub equation_alpha: BlendEquation,
    /// Red, green, blue, alpha.
    pub color_mask: [bool; 4],
    pub sample_alpha_to_coverage: bool,
    pub dither: bool,
}

impl Default for BlendState {
    fn default() -> BlendState {
        BlendState {
            blend: false,
            source_rgb: BlendFactor::One,
            dest_rgb: BlendFactor::Zero,
            equation_rgb: BlendEquation::Add,
            source_alpha: BlendFactor::One,
            dest_alpha: BlendFactor::Zero,
            equation_alpha: BlendEquation::Add,
            color_mask: [true; 4],
            sample_alpha_to_coverage: false,
            dither: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
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
    Incr,
    Decr,
    Invert,
    IncrWrap,
    DecrWrap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_func: CompareFunc,
    pub depth_mask: bool,

    pub stencil_test: bool,
    pub stencil_func: CompareFunc,
    pub stencil_mask: u32,
    pub stencil_fail: StencilOp,
    pub stencil_pass_depth_fail: StencilOp,
    pub stencil_pass_depth_pass: StencilOp,
    pub stencil_writemask: u32,
    pub stencil_back_func: CompareFunc,
    pub stencil_back_mask: u32,
    pub stencil_back_fail: StencilOp,
    pub stencil_back_pass_depth_fail: StencilOp,
    pub stencil_back_pass_depth_pass: StencilOp,
    pub stencil_back_writemask: u32,
}

impl Default for DepthStencilState {
    fn default() -> DepthStencilState {
        DepthStencilState {
            depth_test: false,
            depth_func: CompareFunc::Less,
            depth_mask: true,
            stencil_test: false,
            stencil_func: CompareFunc::Always,
            stencil_mask: !0,
            stencil_fail: StencilOp::Keep,
            stencil_pass_depth_fail: StencilOp::Keep,
            stencil_pass_depth_pass: StencilOp::Keep,
            stencil_writemask: !0,
            stencil_back_func: CompareFunc::Always,
            stencil_back_mask: !0,
            stencil_back_fail: StencilOp::Keep,
            stencil_back_pass_depth_fail: StencilOp::Keep,
            stencil_back_pass_depth_pass: StencilOp::Keep,
            stencil_back_writemask: !0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug)]
pub struct RasterizerState {
    pub cull_face: bool,
    pub cull_mode: CullFace,
    pub front_face: FrontFace,
    pub polygon_offset_fill: bool,
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,
    /// Set by the GL layer while drawing points with a program that writes the point size.
    pub point_draw_mode: bool,
    pub multi_sample: bool,
    pub rasterizer_discard: bool,
}

impl Default for RasterizerState {
    fn default() -> RasterizerState {
        RasterizerState {
            cull_face: false,
            cull_mode: CullFace::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_offset_fill: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            point_draw_mode: false,
            multi_sample: false,
            rasterizer_discard: false,
        }
    }
}

impl PartialEq for RasterizerState {
    fn eq(&self, other: &RasterizerState) -> bool {
        self.cull_face == other.cull_face &&
            self.cull_mode == other.cull_mode &&
            self.front_face == other.front_face &&
            self.polygon_offset_fill == other.polygon_offset_fill &&
            self.polygon_offset_factor.to_bits() == other.polygon_offset_factor.to_bits() &&
            self.polygon_offset_units.to_bits() == other.polygon_offset_units.to_bits() &&
            self.point_draw_mode == other.point_draw_mode &&
            self.multi_sample == other.multi_sample &&
            self.rasterizer_discard == other.rasterizer_discard
    }
}

impl Eq for RasterizerState {}

impl Hash for RasterizerState {
    fn hash<H>(&self, state: &mut H) where H: Hasher {
        self.cull_face.hash(state);
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.polygon_offset_fill.hash(state);
        self.polygon_offset_factor.to_bits().hash(state);
        self.polygon_offset_units.to_bits().hash(state);
        self.point_draw_mode.hash(state);
        self.multi_sample.hash(state);
        self.rasterizer_discard.hash(state);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    #[inline]
    pub fn is_mipmapped(self) -> bool {
        match self {
            FilterMode::Nearest | FilterMode::Linear => false,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwizzleState {
    pub red: SwizzleChannel,
    pub green: SwizzleChannel,
    pub blue: SwizzleChannel,
    pub alpha: SwizzleChannel,
}

impl SwizzleState {
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == SwizzleState::default()
    }

    #[inline]
    pub fn channels(&self) -> [SwizzleChannel; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl Default for SwizzleState {
    fn default() -> SwizzleState {
        SwizzleState {
            red: SwizzleChannel::Red,
            green: SwizzleChannel::Green,
            blue: SwizzleChannel::Blue,
            alpha: SwizzleChannel::Alpha,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SamplerState {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub max_anisotropy: f32,
    pub base_level: u32,
    pub max_level: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub compare_mode: bool,
    pub compare_func: CompareFunc,
    pub swizzle: SwizzleState,
}

impl SamplerState {
    #[inline]
    pub fn is_mipmapped(&self) -> bool {
        self.min_filter.is_mipmapped()
    }

    /// The number of levels sampling may touch, starting at the base level.
    #[inline]
    pub fn level_count(&self) -> u32 {
        if self.is_mipmapped() {
            self.max_level.saturating_sub(self.base_level) + 1
        } else {
            1
        }
    }
}

impl Default for SamplerState {
    fn default() -> SamplerState {
        SamplerState {
            min_filter: FilterMode::NearestMipmapLinear,
            mag_filter: FilterMode::Linear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            wrap_r: WrapMode::Repeat,
            max_anisotropy: 1.0,
            base_level: 0,
            max_level: 1000,
            min_lod: -1000.0,
            max_lod: 1000.0,
            compare_mode: false,
            compare_func: CompareFunc::LessEqual,
            swizzle: SwizzleState::default(),
        }
    }
}

impl PartialEq for SamplerState {
    fn eq(&self, other: &SamplerState) -> bool {
        self.min_filter == other.min_filter &&
            self.mag_filter == other.mag_filter &&
            self.wrap_s == other.wrap_s &&
            self.wrap_t == other.wrap_t &&
            self.wrap_r == other.wrap_r &&
            self.max_anisotropy.to_bits() == other.max_anisotropy.to_bits() &&
            self.base_level == other.base_level &&
            self.max_level == other.max_level &&
            self.min_lod.to_bits() == other.min_lod.to_bits() &&
            self.max_lod.to_bits() == other.max_lod.to_bits() &&
            self.compare_mode == other.compare_mode &&
            self.compare_func == other.compare_func &&
            self.swizzle == other.swizzle
    }
}

impl Eq for SamplerState {}

impl Hash for SamplerState {
    fn hash<H>(&self, state: &mut H) where H: Hasher {
        self.min_filter.hash(state);
        self.mag_filter.hash(state);
        self.wrap_s.hash(state);
        self.wrap_t.hash(state);
        self.wrap_r.hash(state);
        self.max_anisotropy.to_bits().hash(state);
        self.base_level.hash(state);
        self.max_level.hash(state);
        self.min_lod.to_bits().hash(state);
        self.max_lod.to_bits().hash(state);
        self.compare_mode.hash(state);
        self.compare_func.hash(state);
        self.swizzle.hash(state);
    }
}

bitflags! {
    pub struct ClearMask: u32 {
        const COLOR   = 0x01;
        const DEPTH   = 0x02;
        const STENCIL = 0x04;
    }
}

/// The buffer argument of the `clearBuffer*` family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClearBuffer {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelPackState {
    pub alignment: u32,
    pub row_length: u32,
    pub skip_rows: u32,
    pub skip_pixels: u32,
    pub reverse_row_order: bool,
}

impl Default for PixelPackState {
    fn default() -> PixelPackState {
        PixelPackState {
            alignment: 4,
            row_length: 0,
            skip_rows: 0,
            skip_pixels: 0,
            reverse_row_order: false,
        }
    }
}

/// An indexed buffer binding. A `size` of zero binds from `offset` to the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    pub buffer: BufferId,
    pub offset: usize,
    pub size: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformFeedbackState {
    pub active: bool,
    pub paused: bool,
    pub bindings: Vec<Option<BufferBinding>>,
}

impl TransformFeedbackState {
    #[inline]
    pub fn is_active_unpaused(&self) -> bool {
        self.active && !self.paused
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    HalfFloat,
    Fixed,
}

impl AttributeType {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            AttributeType::Byte | AttributeType::UnsignedByte => 1,
            AttributeType::Short | AttributeType::UnsignedShort | AttributeType::HalfFloat => 2,
            AttributeType::Int |
            AttributeType::UnsignedInt |
            AttributeType::Float |
            AttributeType::Fixed => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeData {
    Buffer(BufferId),
    Client(Vec<u8>),
}

/// One vertex attribute array. `offset` is relative to the start of the buffer or client data.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttribute {
    pub enabled: bool,
    pub size: u32,
    pub attribute_type: AttributeType,
    pub normalized: bool,
    pub pure_integer: bool,
    /// Zero means tightly packed.
    pub stride: u32,
    pub offset: usize,
    pub divisor: u32,
    pub data: AttributeData,
}

impl VertexAttribute {
    #[inline]
    pub fn element_size(&self) -> usize {
        self.size as usize * self.attribute_type.bytes()
    }

    #[inline]
    pub fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.element_size()
        } else {
            self.stride as usize
        }
    }
}

/// The snapshot of GL state a draw reads.
#[derive(Clone, Debug)]
pub struct State {
    pub blend: BlendState,
    pub blend_color: [f32; 4],
    pub sample_mask: u32,
    pub depth_stencil: DepthStencilState,
    pub stencil_ref: i32,
    pub stencil_back_ref: i32,
    pub rasterizer: RasterizerState,
    pub viewport: RectI,
    pub near: f32,
    pub far: f32,
    pub scissor_test: bool,
    pub scissor: RectI,
    pub color_clear_value: [f32; 4],
    pub depth_clear_value: f32,
    pub stencil_clear_value: i32,
    pub pack: PixelPackState,
    /// Texture bound to each sampler unit.
    pub texture_units: Vec<Option<TextureId>>,
    /// Indexed uniform buffer bindings.
    pub uniform_buffers: Vec<Option<BufferBinding>>,
    pub transform_feedback: TransformFeedbackState,
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Values of disabled attributes.
    pub current_values: Vec<[f32; 4]>,
    pub element_array_buffer: Option<BufferId>,
}

impl Default for State {
    fn default() -> State {
        State {
            blend: BlendState::default(),
            blend_color: [0.0; 4],
            sample_mask: !0,
            depth_stencil: DepthStencilState::default(),
            stencil_ref: 0,
            stencil_back_ref: 0,
            rasterizer: RasterizerState::default(),
            viewport: RectI::default(),
            near: 0.0,
            far: 1.0,
            scissor_test: false,
            scissor: RectI::default(),
            color_clear_value: [0.0; 4],
            depth_clear_value: 1.0,
            stencil_clear_value: 0,
            pack: PixelPackState::default(),
            texture_units: vec![],
            uniform_buffers: vec![],
            transform_feedback: TransformFeedbackState::default(),
            vertex_attributes: vec![],
            current_values: vec![],
            element_array_buffer: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{FilterMode, IndexType, PrimitiveMode, RasterizerState, SamplerState};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of<T>(value: &T) -> u64 where T: Hash {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_float_fields_compare_by_bits() {
        let a = RasterizerState { polygon_offset_units: 0.0, ..RasterizerState::default() };
        let b = RasterizerState { polygon_offset_units: -0.0, ..RasterizerState::default() };
        assert_ne!(a, b);
        let c = RasterizerState { polygon_offset_units: 0.0, ..RasterizerState::default() };
        assert_eq!(a, c);
        assert_eq!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn test_sampler_level_count() {
        let mut sampler = SamplerState { base_level: 2, max_level: 5, ..SamplerState::default() };
        assert_eq!(sampler.level_count(), 4);
        sampler.min_filter = FilterMode::Linear;
        assert_eq!(sampler.level_count(), 1);
    }

    #[test]
    fn test_index_reads() {
        let data = [1, 0, 2, 0, 0xff, 0xff];
        assert_eq!(IndexType::UnsignedShort.read(&data, 1), 2);
        assert_eq!(IndexType::UnsignedShort.read(&data, 2), 0xffff);
        assert_eq!(IndexType::UnsignedByte.read(&data, 4), 0xff);
        assert_eq!(IndexType::UnsignedInt.read(&[7, 0, 0, 1], 0), 0x0100_0007);
    }

    #[test]
    fn test_minimum_vertex_counts() {
        assert_eq!(PrimitiveMode::Points.min_vertex_count(), 1);
        assert_eq!(PrimitiveMode::LineLoop.min_vertex_count(), 2);
        assert_eq!(PrimitiveMode::TriangleFan.min_vertex_count(), 3);
    }
}
