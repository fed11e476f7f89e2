// tangent/renderer/src/renderer/state.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fixed-function and sampler state setters.
//!
//! Every setter compares against the shadow first. Identical calls after the first are free.

use crate::error::Result;
use crate::gl::{BlendFactor, BlendState, DepthStencilState, PrimitiveMode, RasterizerState};
use crate::gl::{SamplerState, State};
use crate::program::Program;
use crate::resources::ResourceManager;
use crate::texture::Texture;
use crate::translate::BlendKey;
use super::shadow::{AppliedBlend, AppliedViewport, SlotKey, SrvBinding};
use super::RendererCore;
use smallvec::SmallVec;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_geometry::{clamp, clamp01};
use tangent_gpu::desc::{ScissorRect, Viewport};
use tangent_gpu::{Device, FeatureLevel, NativeObject, ShaderStage};

const STAGES: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Pixel];

impl<D> RendererCore<D> where D: Device {
    pub fn set_blend_state(&mut self, state: &BlendState, blend_color: [f32; 4], sample_mask: u32)
                           -> Result<()> {
        let applied = AppliedBlend {
            key: BlendKey {
                state: *state,
                target_channels: self.blend_target_channels,
                multiple_targets: self.blend_multiple_targets,
            },
            blend_color: [
                blend_color[0].to_bits(),
                blend_color[1].to_bits(),
                blend_color[2].to_bits(),
                blend_color[3].to_bits(),
            ],
            sample_mask,
        };
        if self.shadow.blend == Some(applied) {
            self.stats.redundant_state_count += 1;
            return Ok(());
        }

        let native = self.state_cache.blend_state(&self.device, &applied.key)?;
        // The native blend factor has no alpha-only form, so constant alpha is broadcast.
        let blend_factor = if uses_constant_alpha(state) {
            [blend_color[3]; 4]
        } else {
            blend_color
        };
        self.device.set_blend_state(&native, blend_factor, sample_mask);
        self.shadow.blend = Some(applied);
        self.stats.state_change_count += 1;
        Ok(())
    }

    /// Front and back faces must share write mask, reference, and compare mask.
    pub fn set_depth_stencil_state(&mut self,
                                   state: &DepthStencilState,
                                   stencil_ref: i32,
                                   stencil_back_ref: i32)
                                   -> Result<()> {
        let applied = (*state, stencil_ref, stencil_back_ref);
        if self.shadow.depth_stencil == Some(applied) {
            self.stats.redundant_state_count += 1;
            return Ok(());
        }

        debug_assert_eq!(state.stencil_writemask, state.stencil_back_writemask);
        debug_assert_eq!(stencil_ref, stencil_back_ref);
        debug_assert_eq!(state.stencil_mask, state.stencil_back_mask);

        let native = self.state_cache.depth_stencil_state(&self.device, state)?;
        let stencil_ref = clamp(stencil_ref, 0, 0xff) as u32;
        self.device.set_depth_stencil_state(&native, stencil_ref);
        self.shadow.depth_stencil = Some(applied);
        self.stats.state_change_count += 1;
        Ok(())
    }

    pub fn set_rasterizer_state(&mut self, state: &RasterizerState) -> Result<()> {
        let scissor_enabled = self.shadow.scissor_enabled.unwrap_or(false);
        let applied = (*state, scissor_enabled);
        if self.shadow.rasterizer == Some(applied) {
            self.stats.redundant_state_count += 1;
            return Ok(());
        }

        let native = self.state_cache.rasterizer_state(&self.device, state, scissor_enabled)?;
        self.device.set_rasterizer_state(&native);
        self.shadow.rasterizer = Some(applied);
        self.stats.state_change_count += 1;
        Ok(())
    }

    /// Sets the scissor rectangle. Toggling `enabled` also dirties the rasterizer state, which
    /// carries the native scissor enable.
    pub fn set_scissor_rectangle(&mut self, scissor: RectI, enabled: bool) {
        if self.shadow.scissor == Some(scissor) && self.shadow.scissor_enabled == Some(enabled) {
            self.stats.redundant_state_count += 1;
            return;
        }

        if enabled {
            self.device.set_scissor_rect(&scissor_rect(scissor));
            self.stats.state_change_count += 1;
        }
        if self.shadow.scissor_enabled != Some(enabled) {
            self.shadow.rasterizer = None;
        }
        self.shadow.scissor = Some(scissor);
        self.shadow.scissor_enabled = Some(enabled);
    }

    /// Sets the viewport and the depth range, and derives the driver constants that depend on
    /// them. With `ignore_viewport` the whole render target is covered at depth `0..1`.
    pub fn set_viewport(&mut self, viewport: RectI, near: f32, far: f32, ignore_viewport: bool) {
        let (rect, near, far) = if ignore_viewport {
            (RectI::new(Vector2I::zero(), self.shadow.render_target_size), 0.0, 1.0)
        } else {
            (viewport, clamp01(near), clamp01(far))
        };
        let applied = AppliedViewport { rect, near: near.to_bits(), far: far.to_bits() };
        if self.shadow.viewport == Some(applied) {
            self.stats.redundant_state_count += 1;
            return;
        }

        // Level 9 devices can't place the viewport outside the render target.
        let level_9 = self.feature_level <= FeatureLevel::Level9_3;
        let (min, max) = if level_9 {
            (Vector2I::zero(), self.shadow.render_target_size)
        } else {
            let max = Vector2I::new(self.caps.max_viewport_width as i32,
                                    self.caps.max_viewport_height as i32);
            (max.scale(-1), max)
        };
        let left = clamp(rect.min_x(), min.x(), max.x());
        let top = clamp(rect.min_y(), min.y(), max.y());
        let width = clamp(rect.width(), 0, max.x() - left);
        let height = clamp(rect.height(), 0, max.y() - top);

        self.device.set_viewport(&Viewport {
            top_left_x: left as f32,
            top_left_y: top as f32,
            width: width as f32,
            height: height as f32,
            min_depth: near,
            max_depth: far,
        });
        self.stats.state_change_count += 1;

        if level_9 {
            // The vertex shader undoes the clamp above.
            self.vertex_constants.view_adjust = [
                ratio((rect.width() - width + 2 * (rect.min_x() - left)) as f32, width as f32),
                ratio((rect.height() - height + 2 * (rect.min_y() - top)) as f32, height as f32),
                ratio(rect.width() as f32, width as f32),
                ratio(rect.height() as f32, height as f32),
            ];
        }

        let half_width = rect.width() as f32 * 0.5;
        let half_height = rect.height() as f32 * 0.5;
        let view_coords = [
            half_width,
            half_height,
            rect.min_x() as f32 + half_width,
            rect.min_y() as f32 + half_height,
        ];
        let depth_range = [near, far, far - near, 0.0];
        self.vertex_constants.view_coords = view_coords;
        self.vertex_constants.depth_range = depth_range;
        self.pixel_constants.view_coords = view_coords;
        self.pixel_constants.depth_range = depth_range;
        self.pixel_constants.depth_front = [(far - near) * 0.5, (near + far) * 0.5, 0.0, 0.0];

        self.shadow.viewport = Some(applied);
    }

    /// Binds a sampler for `texture` at `slot`, offsetting the base level by the storage's top
    /// level. Dirty textures always rebind.
    pub fn set_sampler_state(&mut self,
                             stage: ShaderStage,
                             slot: u32,
                             texture: &Texture<D>,
                             sampler: &SamplerState)
                             -> Result<()> {
        let mut sampler = *sampler;
        if let Some(storage) = texture.storage() {
            sampler.base_level += storage.top_level();
        }

        let key = (stage, slot);
        if !texture.is_dirty() && self.shadow.samplers.get(&key) == Some(&sampler) {
            self.stats.redundant_state_count += 1;
            return Ok(());
        }

        let native = self.state_cache.sampler_state(&self.device, &sampler)?;
        self.device.set_sampler(stage, slot, &native);
        self.shadow.samplers.insert(key, sampler);
        self.stats.state_change_count += 1;
        Ok(())
    }

    /// Binds the view `texture` should be sampled through, or unbinds the slot.
    pub fn set_texture(&mut self, stage: ShaderStage, slot: u32, texture: Option<&mut Texture<D>>)
                       -> Result<()> {
        let view = match texture {
            None => None,
            Some(texture) => {
                let sampler = *texture.sampler_state();
                let view = texture.get_srv(&self.device, &sampler)?;
                texture.clear_dirty();
                Some(view)
            }
        };
        self.set_shader_resource(stage, slot, view.as_ref());
        Ok(())
    }

    pub(crate) fn set_shader_resource(&mut self,
                                      stage: ShaderStage,
                                      slot: u32,
                                      view: Option<&D::ShaderResourceView>) {
        let binding = view.map(|view| {
            let resource = self.device.shader_resource_view_resource(view);
            let desc = self.device.shader_resource_view_desc(view);
            SrvBinding::new(view.object_id(), resource, &desc)
        });
        let key = (stage, slot);
        if self.shadow.shader_resources.get(&key) == Some(&binding) {
            self.stats.redundant_state_count += 1;
            return;
        }

        self.device.set_shader_resource(stage, slot, view);
        self.shadow.shader_resources.insert(key, binding);
        self.stats.state_change_count += 1;
    }

    /// Binds a sampler and a view for every sampler the program uses, and unbinds views left
    /// over in higher slots.
    pub fn apply_textures(&mut self,
                          resources: &mut ResourceManager<D>,
                          program: &Program<D>,
                          state: &State)
                          -> Result<()> {
        for &stage in &STAGES {
            let samplers = program.samplers(stage);
            for (slot, unit) in samplers.iter().enumerate() {
                let slot = slot as u32;
                let texture_id = unit.and_then(|unit| {
                    state.texture_units.get(unit as usize).cloned().and_then(|id| id)
                });
                let texture = texture_id.and_then(|id| resources.texture_mut(id));
                match texture {
                    Some(texture) if texture.storage().is_some() => {
                        let sampler = *texture.sampler_state();
                        self.set_sampler_state(stage, slot, texture, &sampler)?;
                        self.set_texture(stage, slot, Some(texture))?;
                    }
                    _ => self.set_texture(stage, slot, None)?,
                }
            }

            let stale: SmallVec<[SlotKey; 8]> = self.shadow
                                                    .shader_resources
                                                    .iter()
                                                    .filter(|&(&(bound_stage, slot), binding)| {
                                                        bound_stage == stage &&
                                                            slot as usize >= samplers.len() &&
                                                            binding.is_some()
                                                    })
                                                    .map(|(&key, _)| key)
                                                    .collect();
            for (stage, slot) in stale {
                self.set_shader_resource(stage, slot, None);
            }
        }
        Ok(())
    }

    /// Applies the fixed-function state a draw of `mode` needs.
    pub fn apply_state(&mut self, state: &State, mode: PrimitiveMode) -> Result<()> {
        // The rasterizer state bakes in the scissor enable, so the scissor goes first.
        self.set_scissor_rectangle(state.scissor, state.scissor_test);
        self.set_viewport(state.viewport, state.near, state.far, false);
        let mut rasterizer = state.rasterizer;
        rasterizer.point_draw_mode = mode == PrimitiveMode::Points;
        self.set_rasterizer_state(&rasterizer)?;
        self.set_blend_state(&state.blend, state.blend_color, state.sample_mask)?;
        self.set_depth_stencil_state(&state.depth_stencil,
                                     state.stencil_ref,
                                     state.stencil_back_ref)?;
        Ok(())
    }

    /// Whether a draw can be dropped without changing the result.
    pub fn skip_draw(&self, state: &State, program: &Program<D>, mode: PrimitiveMode) -> bool {
        if mode == PrimitiveMode::Points {
            // Point size is undefined when the program doesn't write it.
            if !program.uses_point_size() && !state.transform_feedback.is_active_unpaused() {
                warn!("skipping a point draw with a program that doesn't write the point size");
                return true;
            }
            return false;
        }
        mode.is_triangles() && state.rasterizer.cull_face &&
            state.rasterizer.cull_mode == crate::gl::CullFace::FrontAndBack
    }
}

fn uses_constant_alpha(state: &BlendState) -> bool {
    let constant_alpha = |factor| {
        factor == BlendFactor::ConstantAlpha || factor == BlendFactor::OneMinusConstantAlpha
    };
    constant_alpha(state.source_rgb) || constant_alpha(state.dest_rgb)
}

pub(crate) fn scissor_rect(rect: RectI) -> ScissorRect {
    ScissorRect {
        left: rect.min_x().max(0),
        top: rect.min_y().max(0),
        right: rect.min_x() + rect.width().max(0),
        bottom: rect.min_y() + rect.height().max(0),
    }
}

#[inline]
fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

#[cfg(test)]
mod test {
    use crate::gl::{BlendFactor, BlendState, DepthStencilState, PrimitiveMode, RasterizerState};
    use crate::gl::{SamplerState, State};
    use crate::renderer::test::soft_core;
    use crate::renderer::RendererCore;
    use tangent_geometry::rect::RectI;
    use tangent_gpu::{FeatureLevel, NativeObject};
    use tangent_soft::{Call, SoftDevice};

    #[test]
    fn test_constant_alpha_is_broadcast() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let state = BlendState {
            blend: true,
            source_rgb: BlendFactor::ConstantAlpha,
            ..BlendState::default()
        };
        core.set_blend_state(&state, [0.1, 0.2, 0.3, 0.5], !0).unwrap();
        let factor = core.device().calls().iter().filter_map(|call| {
            match *call {
                Call::SetBlendState { blend_factor, .. } => Some(blend_factor),
                _ => None,
            }
        }).last();
        assert_eq!(factor, Some([0.5; 4]));
    }

    #[test]
    fn test_scissor_toggle_dirties_rasterizer() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let rasterizer = RasterizerState::default();
        core.set_scissor_rectangle(RectI::from_xywh(0, 0, 4, 4), false);
        core.set_rasterizer_state(&rasterizer).unwrap();
        core.set_scissor_rectangle(RectI::from_xywh(0, 0, 4, 4), true);
        core.set_rasterizer_state(&rasterizer).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetRasterizerState(_) => true,
            _ => false,
        }), 2);
    }

    #[test]
    fn test_stencil_ref_is_clamped() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        core.set_depth_stencil_state(&DepthStencilState::default(), 300, 300).unwrap();
        let stencil_ref = |core: &RendererCore<SoftDevice>| {
            core.device().bound_state().depth_stencil_state.map(|(_, stencil_ref)| stencil_ref)
        };
        assert_eq!(stencil_ref(&core), Some(0xff));
        core.set_depth_stencil_state(&DepthStencilState::default(), -4, -4).unwrap();
        assert_eq!(stencil_ref(&core), Some(0));
    }

    #[test]
    fn test_first_scissored_draw_binds_scissored_rasterizer() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let state = State {
            scissor_test: true,
            scissor: RectI::from_xywh(1, 1, 2, 2),
            ..State::default()
        };
        core.apply_state(&state, PrimitiveMode::Triangles).unwrap();
        let scissored = core.state_cache
                            .rasterizer_state(&core.device, &state.rasterizer, true)
                            .unwrap()
                            .object_id();
        assert_eq!(core.device().bound_state().rasterizer_state, Some(scissored));

        let unscissored = State { scissor_test: false, ..state.clone() };
        core.apply_state(&unscissored, PrimitiveMode::Triangles).unwrap();
        let plain = core.state_cache
                        .rasterizer_state(&core.device, &state.rasterizer, false)
                        .unwrap()
                        .object_id();
        assert_ne!(plain, scissored);
        assert_eq!(core.device().bound_state().rasterizer_state, Some(plain));
    }

    #[test]
    fn test_level_9_viewport_is_clamped_to_target() {
        let mut core = soft_core(FeatureLevel::Level9_3);
        core.shadow.render_target_size = tangent_geometry::vector::Vector2I::new(100, 50);
        core.set_viewport(RectI::from_xywh(-50, 0, 200, 50), 0.0, 1.0, false);
        let viewport = core.device().bound_state().viewport.unwrap();
        assert_eq!(viewport.top_left_x, 0.0);
        assert_eq!(viewport.width, 100.0);
        assert_eq!(core.vertex_constants.view_adjust[2], 2.0);
        assert_eq!(core.pixel_constants.depth_front, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_sampler_base_level_changes_rebind() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut texture = crate::texture::Texture::new(crate::gl::TextureId(1),
                                                       crate::texture_storage::TextureShape::TwoD,
                                                       false);
        let sampler = SamplerState::default();
        core.set_sampler_state(tangent_gpu::ShaderStage::Pixel, 0, &texture, &sampler).unwrap();
        core.set_sampler_state(tangent_gpu::ShaderStage::Pixel, 0, &texture, &sampler).unwrap();
        texture.set_sampler_state(SamplerState { base_level: 1, ..sampler });
        let moved = *texture.sampler_state();
        core.set_sampler_state(tangent_gpu::ShaderStage::Pixel, 0, &texture, &moved).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetSampler { .. } => true,
            _ => false,
        }), 2);
    }
}
