// tangent/renderer/src/renderer/pixels.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Clears, read-back, and framebuffer blits.

use crate::error::{Error, Result};
use crate::formats::{self, PackPixelsParams, PixelFormat, PixelType};
use crate::framebuffer::{self, ClearParameters, DrawBuffer, Framebuffer, FramebufferAttachment};
use crate::gl::{ClearMask, PixelPackState};
use crate::render_target::RenderTarget;
use crate::resources::ResourceManager;
use crate::translate::color_write_mask;
use super::state::scissor_rect;
use super::RendererCore;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_geometry::clamp01;
use tangent_gpu::desc::{NativeBox, SrvDesc, SrvDimension, TextureDesc, Usage};
use tangent_gpu::{BindFlags, BlitFilter, BlitKind, BlitParams, ClearFlags, CpuAccessFlags};
use tangent_gpu::{mip_extent, Device};

impl<D> RendererCore<D> where D: Device {
    /// Clears the planes `params` selects. Masked or scissored clears go through the device's
    /// region clear; everything else uses the fast full-view clear.
    pub fn clear(&mut self,
                 resources: &mut ResourceManager<D>,
                 framebuffer: &Framebuffer,
                 params: &ClearParameters)
                 -> Result<()> {
        for (index, attachment) in framebuffer.color_attachments().iter().enumerate() {
            let attachment = match *attachment {
                Some(attachment) if params.clear_color[index] &&
                    framebuffer.draw_buffers()[index] != DrawBuffer::None => attachment,
                _ => continue,
            };
            let target = framebuffer::attachment_render_target(&self.device,
                                                               resources,
                                                               &attachment)?;
            let view = match target.render_target_view() {
                Some(view) => view,
                None => continue,
            };

            let channels = target.internal_format().color_channels();
            let masked = (0..4).any(|channel| channels[channel] && !params.color_mask[channel]);
            let scissor = covering_scissor(params.scissor, &target);
            match scissor {
                None if !masked => self.device.clear_render_target_view(view, &params.color_value),
                _ => {
                    let mask = color_write_mask(params.color_mask[0],
                                                params.color_mask[1],
                                                params.color_mask[2],
                                                params.color_mask[3]);
                    let rect = scissor.map(scissor_rect);
                    self.device.clear_render_target_region(view,
                                                           &params.color_value,
                                                           rect.as_ref(),
                                                           mask)?;
                }
            }
            mark_rendered(resources, &attachment);
        }

        if !params.clear_depth && !params.clear_stencil {
            return Ok(());
        }
        let attachment = match framebuffer.depth_or_stencil_attachment() {
            Some(attachment) => *attachment,
            None => return Ok(()),
        };
        let target = framebuffer::attachment_render_target(&self.device, resources, &attachment)?;
        let view = match target.depth_stencil_view() {
            Some(view) => view,
            None => return Ok(()),
        };

        // A plane the attachment's format lacks is left alone.
        let format = target.internal_format();
        let stencil_bits = format.stencil_bits();
        let clear_depth = params.clear_depth && format.depth_bits() > 0;
        let clear_stencil = params.clear_stencil && stencil_bits > 0;
        if !clear_depth && !clear_stencil {
            return Ok(());
        }

        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::DEPTH, clear_depth);
        flags.set(ClearFlags::STENCIL, clear_stencil);
        let depth = clamp01(params.depth_value);
        let full_stencil_mask = ((1u32 << stencil_bits.min(8)) - 1) as u8;
        let partial_stencil = clear_stencil &&
            (params.stencil_write_mask & full_stencil_mask) != full_stencil_mask;
        let scissor = covering_scissor(params.scissor, &target);

        if scissor.is_none() && !partial_stencil {
            self.device.clear_depth_stencil_view(view, flags, depth, params.stencil_value);
        } else {
            let rect = scissor.map(scissor_rect);
            self.device.clear_depth_stencil_region(view,
                                                   flags,
                                                   depth,
                                                   params.stencil_value,
                                                   params.stencil_write_mask,
                                                   rect.as_ref())?;
        }
        mark_rendered(resources, &attachment);
        Ok(())
    }

    /// Reads `area` of the framebuffer's read attachment into `out`, converted to `format` and
    /// `pixel_type`. Pixels outside the attachment are left untouched.
    pub fn read_pixels(&mut self,
                       resources: &mut ResourceManager<D>,
                       framebuffer: &Framebuffer,
                       area: RectI,
                       format: PixelFormat,
                       pixel_type: PixelType,
                       pack: &PixelPackState,
                       out: &mut [u8])
                       -> Result<()> {
        let attachment = framebuffer.read_attachment().cloned().ok_or_else(|| {
            Error::Unsupported("the framebuffer has no read attachment".to_owned())
        })?;
        let params = framebuffer::pack_parameters(pack, area, format, pixel_type)?;
        let target = framebuffer::attachment_render_target(&self.device, resources, &attachment)?;
        let texture = match target.texture() {
            Some(texture) => texture.clone(),
            None => return Ok(()),
        };
        self.read_texture_data(&texture, target.subresource_index(), area, &params, out)
    }

    /// Copies `area` of one subresource through a staging texture and packs it into `out`.
    pub fn read_texture_data(&mut self,
                             texture: &D::Texture,
                             subresource: u32,
                             area: RectI,
                             params: &PackPixelsParams,
                             out: &mut [u8])
                             -> Result<()> {
        let desc = self.device.texture_desc(texture);
        let level = subresource % desc.mip_levels.max(1);
        let extent = Vector2I::new(mip_extent(desc.width, level) as i32,
                                   mip_extent(desc.height, level) as i32);
        let safe_area = area.clamp_to_extent(extent);
        if safe_area.is_empty() {
            return Ok(());
        }

        let params = PackPixelsParams {
            width: safe_area.width() as u32,
            height: safe_area.height() as u32,
            ..*params
        };
        let row_bytes = params.width as usize * formats::pixel_bytes(params.format,
                                                                     params.pixel_type);
        let required = (params.height as usize - 1) * params.output_pitch + row_bytes;
        if out.len() < required {
            return Err(Error::Unsupported(format!("read-back needs {} bytes but {} were given",
                                                  required,
                                                  out.len())));
        }

        let staging = self.device.create_texture(&TextureDesc {
            usage: Usage::Staging,
            cpu_access: CpuAccessFlags::READ,
            ..TextureDesc::new_2d(params.width, params.height, desc.format)
        })?;
        let (source, source_subresource) = if desc.sample_count > 1 {
            (self.resolve_multisampled(texture, subresource, BindFlags::empty())?, 0)
        } else {
            (texture.clone(), subresource)
        };
        let region = NativeBox {
            left: safe_area.min_x() as u32,
            top: safe_area.min_y() as u32,
            front: 0,
            right: safe_area.max_x() as u32,
            bottom: safe_area.max_y() as u32,
            back: 1,
        };
        self.device.copy_subresource_region(&staging,
                                            0,
                                            0,
                                            0,
                                            0,
                                            &source,
                                            source_subresource,
                                            Some(&region));

        let mapped = self.device.read_texture(&staging, 0)?;
        formats::pack_pixels(&params, desc.format, &mapped.data, mapped.row_pitch, out);
        Ok(())
    }

    fn resolve_multisampled(&mut self,
                            texture: &D::Texture,
                            subresource: u32,
                            bind_flags: BindFlags)
                            -> Result<D::Texture> {
        let desc = self.device.texture_desc(texture);
        let resolved = self.device.create_texture(&TextureDesc {
            bind_flags,
            ..TextureDesc::new_2d(desc.width, desc.height, desc.format)
        })?;
        self.device.resolve_subresource(&resolved, 0, texture, subresource, desc.format);
        Ok(resolved)
    }

    /// The format and type `read_pixels` converts to most cheaply for the read attachment.
    pub fn implementation_color_read_format(&mut self,
                                            resources: &mut ResourceManager<D>,
                                            framebuffer: &Framebuffer)
                                            -> Result<(PixelFormat, PixelType)> {
        let attachment = framebuffer.read_attachment().cloned().ok_or_else(|| {
            Error::Unsupported("the framebuffer has no read attachment".to_owned())
        })?;
        let target = framebuffer::attachment_render_target(&self.device, resources, &attachment)?;
        Ok(formats::implementation_read_format(target.native_format()))
    }

    /// Copies the planes in `mask` from `read` to every drawn attachment of `draw`.
    pub fn blit_framebuffer(&mut self,
                            resources: &mut ResourceManager<D>,
                            read: &Framebuffer,
                            draw: &Framebuffer,
                            read_rect: RectI,
                            draw_rect: RectI,
                            mask: ClearMask,
                            filter: BlitFilter,
                            scissor: Option<RectI>)
                            -> Result<()> {
        let planes = framebuffer::blit_planes(read, draw, mask);

        if planes.color {
            let source = match read.read_attachment() {
                Some(attachment) => {
                    framebuffer::attachment_render_target(&self.device, resources, attachment)?
                }
                None => return Err(Error::Unsupported("no read attachment".to_owned())),
            };
            for (index, attachment) in draw.color_attachments().iter().enumerate() {
                let attachment = match *attachment {
                    Some(attachment) if draw.draw_buffers()[index] != DrawBuffer::None => {
                        attachment
                    }
                    _ => continue,
                };
                let dest =
                    framebuffer::attachment_render_target(&self.device, resources, &attachment)?;
                self.blit_renderbuffer_rect(read_rect,
                                            draw_rect,
                                            &source,
                                            &dest,
                                            filter,
                                            scissor,
                                            true,
                                            false,
                                            false)?;
                mark_rendered(resources, &attachment);
            }
        }

        if planes.depth || planes.stencil {
            let (source, dest) = match (read.depth_or_stencil_attachment(),
                                        draw.depth_or_stencil_attachment()) {
                (Some(source), Some(dest)) => (*source, *dest),
                _ => return Err(Error::Unsupported("missing depth stencil attachment".to_owned())),
            };
            let source = framebuffer::attachment_render_target(&self.device, resources, &source)?;
            let dest_target =
                framebuffer::attachment_render_target(&self.device, resources, &dest)?;
            self.blit_renderbuffer_rect(read_rect,
                                        draw_rect,
                                        &source,
                                        &dest_target,
                                        filter,
                                        scissor,
                                        false,
                                        planes.depth,
                                        planes.stencil)?;
            mark_rendered(resources, &dest);
        }
        Ok(())
    }

    /// Copies `read_rect` of one render target to `draw_rect` of another. Same-format,
    /// unscaled, unflipped, in-bounds copies go through a subresource copy; everything else is
    /// drawn by the device's blit helper. Negative rectangle sizes flip.
    pub fn blit_renderbuffer_rect(&mut self,
                                  read_rect: RectI,
                                  draw_rect: RectI,
                                  read_target: &RenderTarget<D>,
                                  draw_target: &RenderTarget<D>,
                                  filter: BlitFilter,
                                  scissor: Option<RectI>,
                                  color: bool,
                                  depth: bool,
                                  stencil: bool)
                                  -> Result<()> {
        debug_assert!(color != (depth || stencil));

        let draw_texture = match draw_target.texture() {
            Some(texture) => texture.clone(),
            None => return Ok(()),
        };
        let draw_subresource = draw_target.subresource_index();
        let read_source = match read_target.texture() {
            Some(texture) => texture.clone(),
            None => return Ok(()),
        };

        let (read_texture, read_subresource, read_srv) = if read_target.samples() > 1 {
            let desc = self.device.texture_desc(&read_source);
            let resolved = self.resolve_multisampled(&read_source,
                                                     read_target.subresource_index(),
                                                     desc.bind_flags)?;
            let srv = if desc.bind_flags.contains(BindFlags::SHADER_RESOURCE) {
                let format = formats::texture_format(read_target.internal_format(),
                                                     self.feature_level).srv_format;
                Some(self.device.create_shader_resource_view(&resolved, &SrvDesc {
                    format,
                    dimension: SrvDimension::Texture2D,
                    most_detailed_mip: 0,
                    mip_levels: 1,
                    first_array_slice: 0,
                    array_size: 1,
                })?)
            } else {
                None
            };
            (resolved, 0, srv)
        } else {
            (read_source,
             read_target.subresource_index(),
             read_target.shader_resource_view().cloned())
        };

        let read_size = read_target.size();
        let draw_size = draw_target.size();
        let draw_bounds = draw_rect.normalize();
        let scissor = match scissor {
            Some(scissor) if !scissor.contains_rect(draw_bounds) => {
                match scissor.intersection(draw_bounds) {
                    Some(_) => Some(scissor),
                    None => return Ok(()),
                }
            }
            _ => None,
        };

        let whole_buffer_copy = scissor.is_none() &&
            read_rect == RectI::new(Vector2I::zero(), read_size) &&
            draw_rect == RectI::new(Vector2I::zero(), draw_size);
        let stretch = read_rect.size() != draw_rect.size();
        let flip = read_rect.is_flipped() || draw_rect.is_flipped();
        let out_of_bounds = !RectI::new(Vector2I::zero(), read_size).contains_rect(read_rect) ||
            !RectI::new(Vector2I::zero(), draw_size).contains_rect(draw_rect);
        let draw_format = draw_target.internal_format();
        let partial_depth_stencil = (draw_format.depth_bits() > 0 && depth) !=
            (draw_format.stencil_bits() > 0 && stencil);

        if read_target.native_format() == draw_target.native_format() && !stretch &&
                !out_of_bounds && !flip && !partial_depth_stencil &&
                (color || whole_buffer_copy) {
            let mut dest = draw_rect.origin();
            let mut region = read_rect;
            if let Some(scissor) = scissor {
                let clipped = scissor.intersection(draw_rect).unwrap_or(draw_rect);
                let shift = clipped.origin() - draw_rect.origin();
                region = RectI::new(read_rect.origin() + shift, clipped.size());
                dest = clipped.origin();
            }
            let region = NativeBox {
                left: region.min_x() as u32,
                top: region.min_y() as u32,
                front: 0,
                right: region.max_x() as u32,
                bottom: region.max_y() as u32,
                back: 1,
            };
            let source_box = if whole_buffer_copy { None } else { Some(&region) };
            self.device.copy_subresource_region(&draw_texture,
                                                draw_subresource,
                                                dest.x() as u32,
                                                dest.y() as u32,
                                                0,
                                                &read_texture,
                                                read_subresource,
                                                source_box);
            return Ok(());
        }

        let missing_view = || Error::Unsupported("the blit source cannot be sampled".to_owned());
        let kind = if depth && stencil {
            BlitKind::DepthStencil {
                source: &read_texture,
                source_subresource: read_subresource,
                dest: &draw_texture,
                dest_subresource: draw_subresource,
            }
        } else if depth {
            BlitKind::Depth {
                source: read_srv.as_ref().ok_or_else(missing_view)?,
                dest: draw_target.depth_stencil_view().ok_or_else(missing_view)?,
            }
        } else if stencil {
            BlitKind::Stencil {
                source: &read_texture,
                source_subresource: read_subresource,
                dest: &draw_texture,
                dest_subresource: draw_subresource,
            }
        } else {
            BlitKind::Color {
                source: read_srv.as_ref().ok_or_else(missing_view)?,
                dest: draw_target.render_target_view().ok_or_else(missing_view)?,
                filter,
            }
        };
        self.device.blit(&BlitParams {
            kind,
            source_area: read_rect,
            source_size: read_size,
            dest_area: draw_rect,
            dest_size: draw_size,
            scissor,
        })?;
        Ok(())
    }
}

/// `scissor` unless it covers the whole target.
fn covering_scissor<D>(scissor: Option<RectI>, target: &RenderTarget<D>) -> Option<RectI>
                       where D: Device {
    scissor.filter(|scissor| !scissor.contains_rect(RectI::new(Vector2I::zero(), target.size())))
}

fn mark_rendered<D>(resources: &mut ResourceManager<D>, attachment: &FramebufferAttachment)
                    where D: Device {
    if let FramebufferAttachment::Texture { texture, index } = *attachment {
        if let Some(texture) = resources.texture_mut(texture) {
            texture.mark_rendered(index);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::formats::{InternalFormat, PackPixelsParams, PixelFormat, PixelType};
    use crate::framebuffer::{ClearParameters, Framebuffer, FramebufferAttachment};
    use crate::gl::{ClearBuffer, ClearMask, State};
    use crate::renderer::test::soft_core;
    use crate::renderer::RendererCore;
    use crate::resources::ResourceManager;
    use crate::texture_storage::{ImageIndex, TextureShape};
    use tangent_geometry::rect::RectI;
    use tangent_geometry::vector::Vector2I;
    use tangent_gpu::format::ColorValue;
    use tangent_gpu::{BlitFilter, ClearFlags, FeatureLevel};
    use tangent_soft::{Call, SoftDevice};

    fn framebuffer_with_renderbuffer(core: &RendererCore<SoftDevice>,
                                     resources: &mut ResourceManager<SoftDevice>)
                                     -> Framebuffer {
        let id = resources.create_renderbuffer();
        resources.renderbuffer_mut(id)
                 .unwrap()
                 .set_storage(core.device(), InternalFormat::Rgba8, 4, 4, 0, 4)
                 .unwrap();
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Renderbuffer(id)));
        framebuffer
    }

    fn read_rgba(core: &mut RendererCore<SoftDevice>,
                 resources: &mut ResourceManager<SoftDevice>,
                 framebuffer: &Framebuffer,
                 area: RectI)
                 -> Vec<u8> {
        let mut out = vec![0; (area.width() * area.height() * 4) as usize];
        core.read_pixels(resources,
                         framebuffer,
                         area,
                         PixelFormat::Rgba,
                         PixelType::UnsignedByte,
                         &Default::default(),
                         &mut out).unwrap();
        out
    }

    #[test]
    fn test_masked_clear_uses_region_clear() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let framebuffer = framebuffer_with_renderbuffer(&core, &mut resources);
        let mut state = State::default();
        state.blend.color_mask = [true, false, true, true];
        state.color_clear_value = [1.0, 1.0, 1.0, 1.0];
        let params = framebuffer.clear_parameters(&state, ClearMask::COLOR);
        core.clear(&mut resources, &framebuffer, &params).unwrap();
        let area = RectI::from_xywh(0, 0, 1, 1);
        let pixels = read_rgba(&mut core, &mut resources, &framebuffer, area);
        assert_eq!(pixels, vec![255, 0, 255, 255]);
    }

    #[test]
    fn test_read_outside_target_is_clamped() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let framebuffer = framebuffer_with_renderbuffer(&core, &mut resources);
        let params = ClearParameters {
            color_value: ColorValue::Float([0.0, 0.0, 1.0, 1.0]),
            ..framebuffer.clear_parameters(&State::default(), ClearMask::COLOR)
        };
        core.clear(&mut resources, &framebuffer, &params).unwrap();
        let area = RectI::from_xywh(3, 3, 2, 2);
        let pixels = read_rgba(&mut core, &mut resources, &framebuffer, area);
        assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_short_output_is_rejected() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let framebuffer = framebuffer_with_renderbuffer(&core, &mut resources);
        let mut out = vec![0; 4];
        let params = PackPixelsParams {
            width: 2,
            height: 2,
            format: PixelFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            output_pitch: 8,
            reverse_row_order: false,
        };
        let target = crate::framebuffer::attachment_render_target(
            core.device(),
            &mut resources,
            framebuffer.first_color_attachment().unwrap()).unwrap();
        let texture = target.texture().unwrap().clone();
        let area = RectI::from_xywh(0, 0, 2, 2);
        assert!(core.read_texture_data(&texture, 0, area, &params, &mut out).is_err());
    }

    #[test]
    fn test_stencil_clear_skips_depth_only_attachments() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let id = resources.create_renderbuffer();
        resources.renderbuffer_mut(id)
                 .unwrap()
                 .set_storage(core.device(), InternalFormat::DepthComponent16, 4, 4, 0, 4)
                 .unwrap();
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_depth_stencil_attachment(Some(FramebufferAttachment::Renderbuffer(id)));

        let params = framebuffer.clear_parameters(&State::default(), ClearMask::STENCIL);
        assert!(params.clear_stencil);
        core.clear(&mut resources, &framebuffer, &params).unwrap();
        let depth_stencil_clears = |core: &RendererCore<SoftDevice>| {
            core.device().count_calls(|call| match *call {
                Call::ClearDepthStencilView { .. } => true,
                _ => false,
            })
        };
        assert_eq!(depth_stencil_clears(&core), 0);

        let mask = ClearMask::DEPTH | ClearMask::STENCIL;
        let params = framebuffer.clear_parameters(&State::default(), mask);
        core.clear(&mut resources, &framebuffer, &params).unwrap();
        assert_eq!(depth_stencil_clears(&core), 1);
        assert!(core.device().calls().iter().any(|call| match *call {
            Call::ClearDepthStencilView { flags, .. } => flags == ClearFlags::DEPTH,
            _ => false,
        }));
    }

    #[test]
    fn test_read_from_smaller_level_is_clamped_to_its_size() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let id = resources.create_texture(TextureShape::TwoD, false);
        resources.texture_mut(id)
                 .unwrap()
                 .set_storage(core.device(), InternalFormat::Rgba8, 3, (4, 4, 1))
                 .unwrap();
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
            texture: id,
            index: ImageIndex::level(1),
        }));
        let params = framebuffer.clear_buffer_fv(&State::default(),
                                                 ClearBuffer::Color,
                                                 0,
                                                 &[0.0, 1.0, 0.0, 1.0]);
        core.clear(&mut resources, &framebuffer, &params).unwrap();

        // Level 1 is 2x2, so only the first two texels of the first two rows are written.
        let area = RectI::from_xywh(0, 0, 4, 4);
        let pixels = read_rgba(&mut core, &mut resources, &framebuffer, area);
        for (row, texels) in pixels.chunks(16).enumerate() {
            for (column, texel) in texels.chunks(4).enumerate() {
                let expected = if row < 2 && column < 2 { [0, 255, 0, 255] } else { [0; 4] };
                assert_eq!(texel, &expected);
            }
        }
    }

    #[test]
    fn test_unscaled_blit_copies_subresources() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let read = framebuffer_with_renderbuffer(&core, &mut resources);
        let draw = framebuffer_with_renderbuffer(&core, &mut resources);
        let whole = RectI::from_xywh(0, 0, 4, 4);
        core.blit_framebuffer(&mut resources,
                              &read,
                              &draw,
                              whole,
                              whole,
                              ClearMask::COLOR,
                              BlitFilter::Nearest,
                              None).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::CopySubresourceRegion { .. } => true,
            _ => false,
        }), 1);

        let flipped = RectI::from_points(Vector2I::new(0, 4), Vector2I::new(4, 0));
        core.blit_framebuffer(&mut resources,
                              &read,
                              &draw,
                              whole,
                              flipped,
                              ClearMask::COLOR,
                              BlitFilter::Nearest,
                              None).unwrap();
        assert_eq!(core.device().count_calls(|call| *call == Call::Blit), 1);
    }
}
