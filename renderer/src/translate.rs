// tangent/renderer/src/translate.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Conversions from portable GL state structs to native state descriptors.

use crate::gl::{BlendEquation, BlendFactor, BlendState, CompareFunc, CullFace};
use crate::gl::{DepthStencilState, FilterMode, FrontFace, RasterizerState, SamplerState};
use crate::gl::{StencilOp, WrapMode};
use tangent_gpu::desc::{self, AddressMode, BlendDesc, BlendOp, ComparisonFunc, CullMode};
use tangent_gpu::desc::{DepthStencilDesc, FillMode, Filter, RasterizerDesc};
use tangent_gpu::desc::{RenderTargetBlendDesc, SamplerDesc, StencilFaceDesc};
use tangent_gpu::desc::MAX_RENDER_TARGETS;
use tangent_gpu::ColorWriteMask;

/// A blend state together with which channels each bound color target stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendKey {
    pub state: BlendState,
    pub target_channels: [[bool; 4]; MAX_RENDER_TARGETS],
    /// Whether any target beyond the first is bound.
    pub multiple_targets: bool,
}

pub fn blend_desc(key: &BlendKey) -> BlendDesc {
    let state = &key.state;
    let mut render_targets = [RenderTargetBlendDesc::default(); MAX_RENDER_TARGETS];
    for (target, channels) in render_targets.iter_mut().zip(key.target_channels.iter()) {
        target.blend_enable = state.blend;
        if state.blend {
            target.src_blend = blend_factor(state.source_rgb, false);
            target.dest_blend = blend_factor(state.dest_rgb, false);
            target.blend_op = blend_op(state.equation_rgb);
            target.src_blend_alpha = blend_factor(state.source_alpha, true);
            target.dest_blend_alpha = blend_factor(state.dest_alpha, true);
            target.blend_op_alpha = blend_op(state.equation_alpha);
        }
        target.write_mask = color_write_mask(channels[0] && state.color_mask[0],
                                             channels[1] && state.color_mask[1],
                                             channels[2] && state.color_mask[2],
                                             channels[3] && state.color_mask[3]);
    }
    BlendDesc {
        alpha_to_coverage_enable: state.sample_alpha_to_coverage,
        independent_blend_enable: key.multiple_targets,
        render_targets,
    }
}

fn blend_factor(factor: BlendFactor, alpha: bool) -> desc::BlendFactor {
    match factor {
        BlendFactor::Zero => desc::BlendFactor::Zero,
        BlendFactor::One => desc::BlendFactor::One,
        BlendFactor::SrcColor if alpha => desc::BlendFactor::SrcAlpha,
        BlendFactor::SrcColor => desc::BlendFactor::SrcColor,
        BlendFactor::OneMinusSrcColor if alpha => desc::BlendFactor::InvSrcAlpha,
        BlendFactor::OneMinusSrcColor => desc::BlendFactor::InvSrcColor,
        BlendFactor::DstColor if alpha => desc::BlendFactor::DestAlpha,
        BlendFactor::DstColor => desc::BlendFactor::DestColor,
        BlendFactor::OneMinusDstColor if alpha => desc::BlendFactor::InvDestAlpha,
        BlendFactor::OneMinusDstColor => desc::BlendFactor::InvDestColor,
        BlendFactor::SrcAlpha => desc::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => desc::BlendFactor::InvSrcAlpha,
        BlendFactor::DstAlpha => desc::BlendFactor::DestAlpha,
        BlendFactor::OneMinusDstAlpha => desc::BlendFactor::InvDestAlpha,
        // The native API has one constant; the renderer broadcasts alpha into it when needed.
        BlendFactor::ConstantColor | BlendFactor::ConstantAlpha => desc::BlendFactor::BlendFactor,
        BlendFactor::OneMinusConstantColor | BlendFactor::OneMinusConstantAlpha => {
            desc::BlendFactor::InvBlendFactor
        }
        BlendFactor::SrcAlphaSaturate => desc::BlendFactor::SrcAlphaSat,
    }
}

fn blend_op(equation: BlendEquation) -> BlendOp {
    match equation {
        BlendEquation::Add => BlendOp::Add,
        BlendEquation::Subtract => BlendOp::Subtract,
        BlendEquation::ReverseSubtract => BlendOp::RevSubtract,
        BlendEquation::Min => BlendOp::Min,
        BlendEquation::Max => BlendOp::Max,
    }
}

pub fn color_write_mask(red: bool, green: bool, blue: bool, alpha: bool) -> ColorWriteMask {
    let mut mask = ColorWriteMask::empty();
    mask.set(ColorWriteMask::RED, red);
    mask.set(ColorWriteMask::GREEN, green);
    mask.set(ColorWriteMask::BLUE, blue);
    mask.set(ColorWriteMask::ALPHA, alpha);
    mask
}

pub fn rasterizer_desc(state: &RasterizerState, scissor_enabled: bool) -> RasterizerDesc {
    let cull_mode = if !state.cull_face {
        CullMode::None
    } else {
        match state.cull_mode {
            CullFace::Front => CullMode::Front,
            CullFace::Back => CullMode::Back,
            // Draws are skipped instead; see `RendererCore::skip_draw`.
            CullFace::FrontAndBack => CullMode::None,
        }
    };
    let (depth_bias, slope_scaled_depth_bias) = if state.polygon_offset_fill {
        (state.polygon_offset_units as i32, state.polygon_offset_factor)
    } else {
        (0, 0.0)
    };
    RasterizerDesc {
        fill_mode: FillMode::Solid,
        cull_mode,
        front_counter_clockwise: state.front_face == FrontFace::CounterClockwise,
        depth_bias,
        depth_bias_clamp: 0.0,
        slope_scaled_depth_bias,
        depth_clip_enable: true,
        scissor_enable: scissor_enabled,
        multisample_enable: state.multi_sample,
        antialiased_line_enable: false,
    }
}

pub fn comparison_func(func: CompareFunc) -> ComparisonFunc {
    match func {
        CompareFunc::Never => ComparisonFunc::Never,
        CompareFunc::Less => ComparisonFunc::Less,
        CompareFunc::Equal => ComparisonFunc::Equal,
        CompareFunc::LessEqual => ComparisonFunc::LessEqual,
        CompareFunc::Greater => ComparisonFunc::Greater,
        CompareFunc::NotEqual => ComparisonFunc::NotEqual,
        CompareFunc::GreaterEqual => ComparisonFunc::GreaterEqual,
        CompareFunc::Always => ComparisonFunc::Always,
    }
}

fn stencil_op(op: StencilOp) -> desc::StencilOp {
    match op {
        StencilOp::Keep => desc::StencilOp::Keep,
        StencilOp::Zero => desc::StencilOp::Zero,
        StencilOp::Replace => desc::StencilOp::Replace,
        StencilOp::Incr => desc::StencilOp::IncrSat,
        StencilOp::Decr => desc::StencilOp::DecrSat,
        StencilOp::Invert => desc::StencilOp::Invert,
        StencilOp::IncrWrap => desc::StencilOp::Incr,
        StencilOp::DecrWrap => desc::StencilOp::Decr,
    }
}

pub fn depth_stencil_desc(state: &DepthStencilState) -> DepthStencilDesc {
    DepthStencilDesc {
        depth_enable: state.depth_test,
        depth_write_enable: state.depth_mask,
        depth_func: comparison_func(state.depth_func),
        stencil_enable: state.stencil_test,
        stencil_read_mask: state.stencil_mask as u8,
        stencil_write_mask: state.stencil_writemask as u8,
        front_face: StencilFaceDesc {
            fail_op: stencil_op(state.stencil_fail),
            depth_fail_op: stencil_op(state.stencil_pass_depth_fail),
            pass_op: stencil_op(state.stencil_pass_depth_pass),
            func: comparison_func(state.stencil_func),
        },
        back_face: StencilFaceDesc {
            fail_op: stencil_op(state.stencil_back_fail),
            depth_fail_op: stencil_op(state.stencil_back_pass_depth_fail),
            pass_op: stencil_op(state.stencil_back_pass_depth_pass),
            func: comparison_func(state.stencil_back_func),
        },
    }
}

fn address_mode(wrap: WrapMode) -> AddressMode {
    match wrap {
        WrapMode::Repeat => AddressMode::Wrap,
        WrapMode::ClampToEdge => AddressMode::Clamp,
        WrapMode::MirroredRepeat => AddressMode::Mirror,
    }
}

fn base_filter(filter: FilterMode) -> Filter {
    match filter {
        FilterMode::Nearest |
        FilterMode::NearestMipmapNearest |
        FilterMode::NearestMipmapLinear => Filter::Point,
        FilterMode::Linear | FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear => {
            Filter::Linear
        }
    }
}

const MAX_ANISOTROPY: u32 = 16;

/// Builds a sampler descriptor. When `zero_max_lod_workaround` is set the device cannot clamp
/// the LOD range, so the maximum is left open and non-mipmapped sampling is handled by
/// reading from a single-level copy of the texture instead.
pub fn sampler_desc(state: &SamplerState, zero_max_lod_workaround: bool) -> SamplerDesc {
    let anisotropic = state.max_anisotropy > 1.0;
    let (min_filter, mag_filter, mip_filter) = if anisotropic {
        (Filter::Anisotropic, Filter::Anisotropic, Filter::Anisotropic)
    } else {
        let mip_filter = match state.min_filter {
            FilterMode::NearestMipmapLinear | FilterMode::LinearMipmapLinear => Filter::Linear,
            _ => Filter::Point,
        };
        (base_filter(state.min_filter), base_filter(state.mag_filter), mip_filter)
    };
    let max_lod = if zero_max_lod_workaround {
        std::f32::MAX
    } else if state.is_mipmapped() {
        state.max_lod
    } else {
        0.0
    };
    SamplerDesc {
        min_filter,
        mag_filter,
        mip_filter,
        address_u: address_mode(state.wrap_s),
        address_v: address_mode(state.wrap_t),
        address_w: address_mode(state.wrap_r),
        mip_lod_bias: 0.0,
        max_anisotropy: if anisotropic {
            (state.max_anisotropy.ceil() as u32).min(MAX_ANISOTROPY)
        } else {
            1
        },
        comparison_func: if state.compare_mode {
            Some(comparison_func(state.compare_func))
        } else {
            None
        },
        border_color: [0.0; 4],
        min_lod: state.min_lod,
        max_lod,
    }
}

#[cfg(test)]
mod test {
    use super::{blend_desc, depth_stencil_desc, rasterizer_desc, sampler_desc, BlendKey};
    use crate::gl::{BlendFactor, BlendState, CullFace, DepthStencilState, FilterMode};
    use crate::gl::{RasterizerState, SamplerState, StencilOp};
    use tangent_gpu::desc::{self, CullMode, Filter};
    use tangent_gpu::ColorWriteMask;

    #[test]
    fn test_alpha_factors_use_alpha_variants() {
        let state = BlendState {
            blend: true,
            source_alpha: BlendFactor::SrcColor,
            dest_alpha: BlendFactor::OneMinusDstColor,
            ..BlendState::default()
        };
        let key = BlendKey {
            state,
            target_channels: [[true; 4]; 8],
            multiple_targets: false,
        };
        let desc = blend_desc(&key);
        assert_eq!(desc.render_targets[0].src_blend_alpha, desc::BlendFactor::SrcAlpha);
        assert_eq!(desc.render_targets[0].dest_blend_alpha, desc::BlendFactor::InvDestAlpha);
        assert!(!desc.independent_blend_enable);
    }

    #[test]
    fn test_write_mask_drops_missing_channels() {
        let mut target_channels = [[true; 4]; 8];
        target_channels[0] = [true, true, true, false];
        let state = BlendState { color_mask: [true, false, true, true], ..BlendState::default() };
        let desc = blend_desc(&BlendKey { state, target_channels, multiple_targets: true });
        assert_eq!(desc.render_targets[0].write_mask, ColorWriteMask::RED | ColorWriteMask::BLUE);
        assert_eq!(desc.render_targets[1].write_mask,
                   ColorWriteMask::RED | ColorWriteMask::BLUE | ColorWriteMask::ALPHA);
        assert!(desc.independent_blend_enable);
    }

    #[test]
    fn test_cull_modes() {
        let state = RasterizerState {
            cull_face: true,
            cull_mode: CullFace::Front,
            ..RasterizerState::default()
        };
        assert_eq!(rasterizer_desc(&state, false).cull_mode, CullMode::Front);
        let state = RasterizerState { cull_face: false, ..state };
        assert_eq!(rasterizer_desc(&state, true).cull_mode, CullMode::None);
        assert!(rasterizer_desc(&state, true).scissor_enable);
    }

    #[test]
    fn test_wrapping_stencil_ops() {
        let state = DepthStencilState {
            stencil_fail: StencilOp::IncrWrap,
            stencil_pass_depth_pass: StencilOp::Incr,
            stencil_mask: 0x1ff,
            ..DepthStencilState::default()
        };
        let desc = depth_stencil_desc(&state);
        assert_eq!(desc.front_face.fail_op, desc::StencilOp::Incr);
        assert_eq!(desc.front_face.pass_op, desc::StencilOp::IncrSat);
        assert_eq!(desc.stencil_read_mask, 0xff);
    }

    #[test]
    fn test_max_lod() {
        let state = SamplerState { min_filter: FilterMode::Linear, ..SamplerState::default() };
        assert_eq!(sampler_desc(&state, false).max_lod, 0.0);
        assert_eq!(sampler_desc(&state, true).max_lod, std::f32::MAX);
        let state = SamplerState { max_lod: 4.0, ..SamplerState::default() };
        let desc = sampler_desc(&state, false);
        assert_eq!(desc.max_lod, 4.0);
        assert_eq!(desc.mip_filter, Filter::Linear);
        assert_eq!(desc.min_filter, Filter::Point);
    }
}
