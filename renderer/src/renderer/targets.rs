// tangent/renderer/src/renderer/targets.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Result;
use crate::framebuffer::{self, Framebuffer, FramebufferAttachment};
use crate::render_target::RenderTarget;
use crate::resources::ResourceManager;
use crate::texture_storage::ImageIndex;
use super::shadow::SlotKey;
use super::RendererCore;
use smallvec::SmallVec;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::MAX_RENDER_TARGETS;
use tangent_gpu::{Device, ObjectId, ShaderStage};

type Targets<T> = SmallVec<[T; MAX_RENDER_TARGETS]>;

impl<D> RendererCore<D> where D: Device {
    /// Binds the framebuffer's attachments as the output merger targets.
    ///
    /// Shader resource views reading any attached image are unbound first. If any color
    /// attachment is empty, nothing is bound and the draw should be dropped by the caller.
    pub fn apply_render_target(&mut self,
                               resources: &mut ResourceManager<D>,
                               framebuffer: &mut Framebuffer)
                               -> Result<()> {
        let attachments: Targets<Option<FramebufferAttachment>> =
            framebuffer.color_attachments_for_render(&self.workarounds).iter().cloned().collect();

        let mut color_targets: Targets<Option<RenderTarget<D>>> = SmallVec::new();
        let mut target_channels = [[false; 4]; MAX_RENDER_TARGETS];
        let mut size = None;
        let mut format = None;
        for (index, attachment) in attachments.iter().enumerate() {
            let attachment = match *attachment {
                Some(attachment) => attachment,
                None => {
                    color_targets.push(None);
                    continue;
                }
            };
            let target = framebuffer::attachment_render_target(&self.device,
                                                               resources,
                                                               &attachment)?;
            if target.width() == 0 || target.height() == 0 {
                return Ok(());
            }
            if size.is_none() {
                size = Some(target.size());
                format = Some(target.native_format());
            }
            target_channels[index] = target.internal_format().color_channels();

            if let FramebufferAttachment::Texture { index: image, .. } = attachment {
                if let Some(view) = target.render_target_view() {
                    let resource = self.device.render_target_view_resource(view);
                    self.unset_conflicting_srvs(resource, image);
                }
            }
            color_targets.push(Some(target));
        }

        let depth_stencil = match framebuffer.depth_or_stencil_attachment().cloned() {
            None => None,
            Some(attachment) => {
                let target = framebuffer::attachment_render_target(&self.device,
                                                                   resources,
                                                                   &attachment)?;
                if size.is_none() {
                    size = Some(target.size());
                    format = Some(target.native_format());
                }
                if let FramebufferAttachment::Texture { index: image, .. } = attachment {
                    if let Some(view) = target.depth_stencil_view() {
                        let resource = self.device.depth_stencil_view_resource(view);
                        self.unset_conflicting_srvs(resource, image);
                    }
                }
                Some(target)
            }
        };

        let serials: Targets<Option<u64>> =
            color_targets.iter().map(|target| target.as_ref().map(|target| target.serial()))
                                .collect();
        let depth_stencil_serial = depth_stencil.as_ref().map(|target| target.serial());
        let changed = self.shadow.render_target_serials.as_ref() != Some(&serials) ||
            self.shadow.depth_stencil_serial != Some(depth_stencil_serial);

        if changed {
            let mut views: Targets<Option<&D::RenderTargetView>> =
                color_targets.iter()
                             .map(|target| target.as_ref().and_then(|t| t.render_target_view()))
                             .collect();
            while views.len() < self.caps.max_draw_buffers as usize {
                views.push(None);
            }
            let depth_stencil_view = depth_stencil.as_ref()
                                                  .and_then(|target| target.depth_stencil_view());
            self.device.set_render_targets(&views, depth_stencil_view);
            self.stats.state_change_count += 1;

            // Viewport clamping, scissor, and blend all depend on the targets.
            self.shadow.render_target_size = size.unwrap_or_else(Vector2I::zero);
            self.shadow.render_target_format = format;
            self.shadow.viewport = None;
            self.shadow.scissor = None;
            self.shadow.blend = None;
            self.shadow.render_target_serials = Some(serials);
            self.shadow.depth_stencil_serial = Some(depth_stencil_serial);
        } else {
            self.stats.redundant_state_count += 1;
        }

        let bound_colors = color_targets.iter().filter(|target| target.is_some()).count();
        self.blend_target_channels = target_channels;
        self.blend_multiple_targets = bound_colors > 1;

        // Swizzled copies of rendered images are stale from now on.
        let rendered = attachments.iter()
                                  .filter_map(|attachment| *attachment)
                                  .chain(framebuffer.depth_or_stencil_attachment().cloned());
        for attachment in rendered {
            if let FramebufferAttachment::Texture { texture, index } = attachment {
                if let Some(texture) = resources.texture_mut(texture) {
                    texture.mark_rendered(index);
                }
            }
        }
        Ok(())
    }

    /// Unbinds every view that reads the image about to be rendered to.
    fn unset_conflicting_srvs(&mut self, resource: ObjectId, image: ImageIndex) {
        let conflicts: SmallVec<[SlotKey; 4]> = self.shadow
                                                    .shader_resources
                                                    .iter()
                                                    .filter(|&(_, binding)| match *binding {
                                                        Some(ref binding) => {
                                                            binding.reads(resource,
                                                                          image.level,
                                                                          image.layer)
                                                        }
                                                        None => false,
                                                    })
                                                    .map(|(&key, _)| key)
                                                    .collect();
        for (stage, slot) in conflicts {
            debug_assert!(stage == ShaderStage::Vertex || stage == ShaderStage::Pixel);
            self.set_shader_resource(stage, slot, None);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::formats::InternalFormat;
    use crate::framebuffer::{Framebuffer, FramebufferAttachment};
    use crate::gl::{RasterizerState, TextureId};
    use crate::renderer::test::soft_core;
    use crate::resources::ResourceManager;
    use crate::texture_storage::{ImageIndex, TextureShape};
    use tangent_gpu::{FeatureLevel, ShaderStage};
    use tangent_soft::{Call, SoftDevice};

    fn texture(core: &crate::renderer::RendererCore<SoftDevice>,
               resources: &mut ResourceManager<SoftDevice>)
               -> TextureId {
        let id = resources.create_texture(TextureShape::TwoD, false);
        let texture = resources.texture_mut(id).unwrap();
        texture.set_storage(core.device(), InternalFormat::Rgba8, 1, (4, 4, 1)).unwrap();
        id
    }

    #[test]
    fn test_render_target_rebinds_only_on_change() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let id = texture(&core, &mut resources);
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
            texture: id,
            index: ImageIndex::level(0),
        }));
        core.apply_render_target(&mut resources, &mut framebuffer).unwrap();
        core.apply_render_target(&mut resources, &mut framebuffer).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetRenderTargets { .. } => true,
            _ => false,
        }), 1);
    }

    #[test]
    fn test_rendering_to_a_sampled_texture_unbinds_it() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let id = texture(&core, &mut resources);
        core.set_texture(ShaderStage::Pixel, 0, resources.texture_mut(id)).unwrap();
        let bound = |core: &crate::renderer::RendererCore<SoftDevice>| {
            core.device().bound_state().shader_resources.contains_key(&(ShaderStage::Pixel, 0))
        };
        assert!(bound(&core));

        let mut framebuffer = Framebuffer::new();
        framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
            texture: id,
            index: ImageIndex::level(0),
        }));
        core.apply_render_target(&mut resources, &mut framebuffer).unwrap();
        assert!(!bound(&core));
    }

    #[test]
    fn test_target_change_keeps_rasterizer_binding() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let first = texture(&core, &mut resources);
        let second = texture(&core, &mut resources);
        core.set_rasterizer_state(&RasterizerState::default()).unwrap();

        for &id in &[first, second] {
            let mut framebuffer = Framebuffer::new();
            framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
                texture: id,
                index: ImageIndex::level(0),
            }));
            core.apply_render_target(&mut resources, &mut framebuffer).unwrap();
            core.set_rasterizer_state(&RasterizerState::default()).unwrap();
        }
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetRenderTargets { .. } => true,
            _ => false,
        }), 2);
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetRasterizerState(_) => true,
            _ => false,
        }), 1);
    }
}
