// tangent/renderer/src/framebuffer.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Framebuffer attachments and their resolution to render targets.
//!
//! A framebuffer only names what it draws into. The images themselves belong to textures,
//! renderbuffers, or the swap chain, and are looked up in the `ResourceManager` every time the
//! renderer needs a view.

use crate::error::{Error, Result};
use crate::formats::{self, PackPixelsParams, PixelFormat, PixelType};
use crate::gl::{ClearBuffer, ClearMask, PixelPackState, RenderbufferId, State, TextureId};
use crate::options::Workarounds;
use crate::render_target::RenderTarget;
use crate::resources::ResourceManager;
use crate::texture_storage::ImageIndex;
use smallvec::SmallVec;
use tangent_geometry::rect::RectI;
use tangent_gpu::desc::MAX_RENDER_TARGETS;
use tangent_gpu::format::ColorValue;
use tangent_gpu::Device;

/// The default framebuffer's images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefaultBinding {
    Back,
    Depth,
    Stencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Texture,
    Renderbuffer,
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferAttachment {
    Texture { texture: TextureId, index: ImageIndex },
    Renderbuffer(RenderbufferId),
    Default(DefaultBinding),
}

impl FramebufferAttachment {
    /// The name of the attached object. The default framebuffer's images are all named zero.
    #[inline]
    pub fn id(&self) -> u32 {
        match *self {
            FramebufferAttachment::Texture { texture, .. } => texture.0,
            FramebufferAttachment::Renderbuffer(renderbuffer) => renderbuffer.0,
            FramebufferAttachment::Default(_) => 0,
        }
    }

    #[inline]
    pub fn kind(&self) -> AttachmentKind {
        match *self {
            FramebufferAttachment::Texture { .. } => AttachmentKind::Texture,
            FramebufferAttachment::Renderbuffer(_) => AttachmentKind::Renderbuffer,
            FramebufferAttachment::Default(_) => AttachmentKind::Default,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    None,
    Back,
    ColorAttachment(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Unsupported,
}

pub type ColorAttachments = SmallVec<[Option<FramebufferAttachment>; MAX_RENDER_TARGETS]>;

pub struct Framebuffer {
    color_attachments: ColorAttachments,
    depth_attachment: Option<FramebufferAttachment>,
    stencil_attachment: Option<FramebufferAttachment>,
    draw_buffers: SmallVec<[DrawBuffer; MAX_RENDER_TARGETS]>,
    read_buffer: DrawBuffer,
    color_attachments_for_render: ColorAttachments,
    invalidate_color_attachment_cache: bool,
}

impl Framebuffer {
    /// A framebuffer object with nothing attached, drawing to color attachment 0.
    pub fn new() -> Framebuffer {
        let mut draw_buffers = SmallVec::new();
        draw_buffers.push(DrawBuffer::ColorAttachment(0));
        for _ in 1..MAX_RENDER_TARGETS {
            draw_buffers.push(DrawBuffer::None);
        }
        Framebuffer {
            color_attachments: (0..MAX_RENDER_TARGETS).map(|_| None).collect(),
            depth_attachment: None,
            stencil_attachment: None,
            draw_buffers,
            read_buffer: DrawBuffer::ColorAttachment(0),
            color_attachments_for_render: SmallVec::new(),
            invalidate_color_attachment_cache: true,
        }
    }

    /// The window system framebuffer, backed by the swap chain.
    pub fn default_framebuffer(depth_stencil: bool) -> Framebuffer {
        let mut framebuffer = Framebuffer::new();
        framebuffer.color_attachments[0] =
            Some(FramebufferAttachment::Default(DefaultBinding::Back));
        if depth_stencil {
            framebuffer.depth_attachment =
                Some(FramebufferAttachment::Default(DefaultBinding::Depth));
            framebuffer.stencil_attachment =
                Some(FramebufferAttachment::Default(DefaultBinding::Stencil));
        }
        framebuffer.draw_buffers[0] = DrawBuffer::Back;
        framebuffer.read_buffer = DrawBuffer::Back;
        framebuffer
    }

    pub fn set_color_attachment(&mut self,
                                index: usize,
                                attachment: Option<FramebufferAttachment>) {
        self.color_attachments[index] = attachment;
        self.invalidate_color_attachment_cache = true;
    }

    #[inline]
    pub fn set_depth_attachment(&mut self, attachment: Option<FramebufferAttachment>) {
        self.depth_attachment = attachment;
    }

    #[inline]
    pub fn set_stencil_attachment(&mut self, attachment: Option<FramebufferAttachment>) {
        self.stencil_attachment = attachment;
    }

    pub fn set_depth_stencil_attachment(&mut self, attachment: Option<FramebufferAttachment>) {
        self.depth_attachment = attachment;
        self.stencil_attachment = attachment;
    }

    /// Sets the draw buffer of each color slot. Slots past `draw_buffers` draw nothing.
    pub fn set_draw_buffers(&mut self, draw_buffers: &[DrawBuffer]) {
        for (slot, draw_buffer) in self.draw_buffers.iter_mut().enumerate() {
            *draw_buffer = draw_buffers.get(slot).cloned().unwrap_or(DrawBuffer::None);
        }
        self.invalidate_color_attachment_cache = true;
    }

    #[inline]
    pub fn set_read_buffer(&mut self, read_buffer: DrawBuffer) {
        self.read_buffer = read_buffer;
    }

    #[inline]
    pub fn color_attachments(&self) -> &[Option<FramebufferAttachment>] {
        &self.color_attachments
    }

    #[inline]
    pub fn color_attachment(&self, index: usize) -> Option<&FramebufferAttachment> {
        self.color_attachments.get(index).and_then(|attachment| attachment.as_ref())
    }

    #[inline]
    pub fn depth_attachment(&self) -> Option<&FramebufferAttachment> {
        self.depth_attachment.as_ref()
    }

    #[inline]
    pub fn stencil_attachment(&self) -> Option<&FramebufferAttachment> {
        self.stencil_attachment.as_ref()
    }

    /// The attachment bound as the depth-stencil view: depth if present, otherwise stencil.
    #[inline]
    pub fn depth_or_stencil_attachment(&self) -> Option<&FramebufferAttachment> {
        self.depth_attachment.as_ref().or(self.stencil_attachment.as_ref())
    }

    #[inline]
    pub fn draw_buffers(&self) -> &[DrawBuffer] {
        &self.draw_buffers
    }

    pub fn read_attachment(&self) -> Option<&FramebufferAttachment> {
        match self.read_buffer {
            DrawBuffer::None => None,
            DrawBuffer::Back => self.color_attachment(0),
            DrawBuffer::ColorAttachment(index) => self.color_attachment(index as usize),
        }
    }

    pub fn first_color_attachment(&self) -> Option<&FramebufferAttachment> {
        self.color_attachments.iter().filter_map(|attachment| attachment.as_ref()).next()
    }

    /// Native render target arrays can't bind one image twice.
    pub fn check_status(&self) -> FramebufferStatus {
        for (index, attachment) in self.color_attachments.iter().enumerate() {
            let attachment = match *attachment {
                Some(ref attachment) => attachment,
                None => continue,
            };
            for previous in self.color_attachments[0..index].iter().filter_map(|a| a.as_ref()) {
                if previous.id() == attachment.id() && previous.kind() == attachment.kind() {
                    return FramebufferStatus::Unsupported;
                }
            }
        }
        FramebufferStatus::Complete
    }

    /// The color attachments to bind as render targets. With the MRT workaround, slots that
    /// are empty or draw to nothing are squeezed out. The compacted list is rebuilt on the
    /// first read after the attachments or draw buffers change.
    pub fn color_attachments_for_render(&mut self, workarounds: &Workarounds)
                                        -> &[Option<FramebufferAttachment>] {
        if !workarounds.mrt_perf_workaround {
            return &self.color_attachments;
        }
        if self.invalidate_color_attachment_cache {
            self.color_attachments_for_render.clear();
            for (index, attachment) in self.color_attachments.iter().enumerate() {
                if attachment.is_some() && self.draw_buffers[index] != DrawBuffer::None {
                    debug_assert!(self.draw_buffers[index] == DrawBuffer::Back ||
                                  self.draw_buffers[index] ==
                                  DrawBuffer::ColorAttachment(index as u32));
                    self.color_attachments_for_render.push(*attachment);
                }
            }
            self.invalidate_color_attachment_cache = false;
        }
        &self.color_attachments_for_render
    }

    /// Parameters for `glClear`. Depth is only cleared while depth writes are enabled. Planes
    /// the attachment's format lacks are skipped when the clear is applied.
    pub fn clear_parameters(&self, state: &State, mask: ClearMask) -> ClearParameters {
        let mut params = ClearParameters::new(state);
        if mask.contains(ClearMask::COLOR) {
            params.clear_color = [true; MAX_RENDER_TARGETS];
            params.color_value = ColorValue::Float(state.color_clear_value);
        }
        if mask.contains(ClearMask::DEPTH) && state.depth_stencil.depth_mask &&
                self.depth_attachment.is_some() {
            params.clear_depth = true;
            params.depth_value = state.depth_clear_value;
        }
        if mask.contains(ClearMask::STENCIL) && self.stencil_attachment.is_some() {
            params.clear_stencil = true;
            params.stencil_value = state.stencil_clear_value as u8;
        }
        params
    }

    /// Parameters for `glClearBufferfv`.
    pub fn clear_buffer_fv(&self,
                           state: &State,
                           buffer: ClearBuffer,
                           draw_buffer: usize,
                           values: &[f32; 4])
                           -> ClearParameters {
        let mut params = ClearParameters::new(state);
        match buffer {
            ClearBuffer::Color => {
                params.clear_color_buffer(draw_buffer);
                params.color_value = ColorValue::Float(*values);
            }
            ClearBuffer::Depth => {
                params.clear_depth = true;
                params.depth_value = values[0];
            }
            ClearBuffer::Stencil | ClearBuffer::DepthStencil => {}
        }
        params
    }

    /// Parameters for `glClearBufferiv`.
    pub fn clear_buffer_iv(&self,
                           state: &State,
                           buffer: ClearBuffer,
                           draw_buffer: usize,
                           values: &[i32; 4])
                           -> ClearParameters {
        let mut params = ClearParameters::new(state);
        match buffer {
            ClearBuffer::Color => {
                params.clear_color_buffer(draw_buffer);
                params.color_value = ColorValue::Int(*values);
            }
            ClearBuffer::Stencil => {
                params.clear_stencil = true;
                params.stencil_value = values[0] as u8;
            }
            ClearBuffer::Depth | ClearBuffer::DepthStencil => {}
        }
        params
    }

    /// Parameters for `glClearBufferuiv`. Only color buffers take unsigned values.
    pub fn clear_buffer_uiv(&self,
                            state: &State,
                            buffer: ClearBuffer,
                            draw_buffer: usize,
                            values: &[u32; 4])
                            -> ClearParameters {
        let mut params = ClearParameters::new(state);
        if buffer == ClearBuffer::Color {
            params.clear_color_buffer(draw_buffer);
            params.color_value = ColorValue::Uint(*values);
        }
        params
    }

    /// Parameters for `glClearBufferfi`, which only clears depth and stencil together.
    pub fn clear_buffer_fi(&self, state: &State, buffer: ClearBuffer, depth: f32, stencil: i32)
                           -> ClearParameters {
        let mut params = ClearParameters::new(state);
        if buffer == ClearBuffer::DepthStencil {
            params.clear_depth = true;
            params.depth_value = depth;
            params.clear_stencil = true;
            params.stencil_value = stencil as u8;
        }
        params
    }
}

impl Default for Framebuffer {
    #[inline]
    fn default() -> Framebuffer {
        Framebuffer::new()
    }
}

/// Everything a clear writes. Color clears apply to each color attachment whose slot is set
/// in `clear_color` and whose draw buffer isn't `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearParameters {
    pub clear_color: [bool; MAX_RENDER_TARGETS],
    pub color_value: ColorValue,
    /// Red, green, blue, alpha.
    pub color_mask: [bool; 4],
    pub clear_depth: bool,
    pub depth_value: f32,
    pub clear_stencil: bool,
    pub stencil_value: u8,
    pub stencil_write_mask: u8,
    pub scissor: Option<RectI>,
}

impl ClearParameters {
    fn new(state: &State) -> ClearParameters {
        ClearParameters {
            clear_color: [false; MAX_RENDER_TARGETS],
            color_value: ColorValue::Float([0.0; 4]),
            color_mask: state.blend.color_mask,
            clear_depth: false,
            depth_value: 1.0,
            clear_stencil: false,
            stencil_value: 0,
            stencil_write_mask: state.depth_stencil.stencil_writemask as u8,
            scissor: if state.scissor_test { Some(state.scissor) } else { None },
        }
    }

    fn clear_color_buffer(&mut self, draw_buffer: usize) {
        if draw_buffer < MAX_RENDER_TARGETS {
            self.clear_color[draw_buffer] = true;
        }
    }

    #[inline]
    pub fn clears_anything(&self) -> bool {
        self.clear_color.iter().any(|&clear| clear) || self.clear_depth || self.clear_stencil
    }
}

/// The planes a framebuffer blit copies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlitPlanes {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

/// Decides, plane by plane, whether a blit with `mask` copies anything. A plane participates
/// when it's requested and attached on both sides.
pub fn blit_planes(read: &Framebuffer, draw: &Framebuffer, mask: ClearMask) -> BlitPlanes {
    let draws_color = draw.color_attachments
                          .iter()
                          .zip(draw.draw_buffers.iter())
                          .any(|(attachment, &draw_buffer)| {
        attachment.is_some() && draw_buffer != DrawBuffer::None
    });
    BlitPlanes {
        color: mask.contains(ClearMask::COLOR) && read.read_attachment().is_some() && draws_color,
        depth: mask.contains(ClearMask::DEPTH) && read.depth_attachment.is_some() &&
            draw.depth_attachment.is_some(),
        stencil: mask.contains(ClearMask::STENCIL) && read.stencil_attachment.is_some() &&
            draw.stencil_attachment.is_some(),
    }
}

/// Lays out `area` in client memory per the pack state. Row lengths and skips aren't
/// implemented.
pub fn pack_parameters(pack: &PixelPackState,
                       area: RectI,
                       format: PixelFormat,
                       pixel_type: PixelType)
                       -> Result<PackPixelsParams> {
    if pack.row_length != 0 || pack.skip_rows != 0 || pack.skip_pixels != 0 {
        return Err(Error::Unsupported("pack row length and skip parameters".to_owned()));
    }
    let width = area.width().max(0) as u32;
    Ok(PackPixelsParams {
        width,
        height: area.height().max(0) as u32,
        format,
        pixel_type,
        output_pitch: formats::row_pitch(format, pixel_type, width, pack.alignment),
        reverse_row_order: pack.reverse_row_order,
    })
}

/// Resolves an attachment to the render target holding its image.
pub fn attachment_render_target<D>(device: &D,
                                   resources: &mut ResourceManager<D>,
                                   attachment: &FramebufferAttachment)
                                   -> Result<RenderTarget<D>>
                                   where D: Device {
    let render_target = match *attachment {
        FramebufferAttachment::Texture { texture, index } => {
            match resources.texture_mut(texture) {
                Some(texture) => Some(texture.get_render_target(device, index)?),
                None => None,
            }
        }
        FramebufferAttachment::Renderbuffer(renderbuffer) => {
            resources.renderbuffer(renderbuffer)
                     .and_then(|renderbuffer| renderbuffer.render_target())
                     .cloned()
        }
        FramebufferAttachment::Default(DefaultBinding::Back) => {
            resources.swap_chain().map(|swap_chain| swap_chain.color_render_target().clone())
        }
        FramebufferAttachment::Default(DefaultBinding::Depth) |
        FramebufferAttachment::Default(DefaultBinding::Stencil) => {
            resources.swap_chain()
                     .and_then(|swap_chain| swap_chain.depth_stencil_render_target())
                     .cloned()
        }
    };
    render_target.ok_or_else(|| {
        Error::Unsupported(format!("attachment {:?} has no storage", attachment))
    })
}

#[cfg(test)]
mod test {
    use super::{attachment_render_target, blit_planes, pack_parameters, DefaultBinding};
    use super::{DrawBuffer, Framebuffer, FramebufferAttachment, FramebufferStatus};
    use crate::formats::{InternalFormat, PixelFormat, PixelType};
    use crate::gl::{ClearBuffer, ClearMask, PixelPackState, RenderbufferId, State, TextureId};
    use crate::options::Workarounds;
    use crate::resources::ResourceManager;
    use crate::swap_chain::SwapChain;
    use crate::texture_storage::{ImageIndex, TextureShape};
    use quickcheck;
    use tangent_geometry::rect::RectI;
    use tangent_geometry::vector::Vector2I;
    use tangent_gpu::format::ColorValue;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    // Kind 0 is a texture image, 1 a renderbuffer, anything else the default back buffer.
    fn attachment(kind: u8, id: u8, level: u8) -> FramebufferAttachment {
        match kind % 3 {
            0 => {
                FramebufferAttachment::Texture {
                    texture: TextureId(id as u32 % 4),
                    index: ImageIndex::level(level as u32 % 3),
                }
            }
            1 => FramebufferAttachment::Renderbuffer(RenderbufferId(id as u32 % 4)),
            _ => FramebufferAttachment::Default(DefaultBinding::Back),
        }
    }

    fn framebuffer(slots: &[Option<(u8, u8, u8)>]) -> Framebuffer {
        let mut framebuffer = Framebuffer::new();
        for (index, slot) in slots.iter().take(8).enumerate() {
            framebuffer.set_color_attachment(index,
                                             slot.map(|(kind, id, level)| {
                                                 attachment(kind, id, level)
                                             }));
        }
        framebuffer
    }

    #[test]
    fn test_color_attachments_unchanged_without_workaround() {
        fn prop_unchanged(slots: Vec<Option<(u8, u8, u8)>>) -> bool {
            let mut framebuffer = framebuffer(&slots);
            let expected = framebuffer.color_attachments().to_vec();
            let workarounds = Workarounds { mrt_perf_workaround: false, ..Workarounds::default() };
            framebuffer.color_attachments_for_render(&workarounds) == &expected[..]
        }
        quickcheck::quickcheck(prop_unchanged as fn(Vec<Option<(u8, u8, u8)>>) -> bool);
    }

    #[test]
    fn test_check_status_detects_aliasing() {
        fn prop_aliasing(slots: Vec<Option<(u8, u8, u8)>>) -> bool {
            let framebuffer = framebuffer(&slots);
            let attached: Vec<FramebufferAttachment> =
                framebuffer.color_attachments().iter().filter_map(|a| *a).collect();
            let mut aliased = false;
            for (index, first) in attached.iter().enumerate() {
                for second in &attached[(index + 1)..] {
                    aliased |= first.id() == second.id() && first.kind() == second.kind();
                }
            }
            let expected = if aliased {
                FramebufferStatus::Unsupported
            } else {
                FramebufferStatus::Complete
            };
            framebuffer.check_status() == expected
        }
        quickcheck::quickcheck(prop_aliasing as fn(Vec<Option<(u8, u8, u8)>>) -> bool);
    }

    #[test]
    fn test_empty_framebuffer_is_complete() {
        assert_eq!(Framebuffer::new().check_status(), FramebufferStatus::Complete);
    }

    #[test]
    fn test_mrt_workaround_compacts_lazily() {
        let mut framebuffer = framebuffer(&[Some((0, 1, 0)), None, Some((0, 2, 0))]);
        framebuffer.set_draw_buffers(&[DrawBuffer::ColorAttachment(0),
                                       DrawBuffer::None,
                                       DrawBuffer::ColorAttachment(2)]);
        let workarounds = Workarounds { mrt_perf_workaround: true, ..Workarounds::default() };
        let compacted = framebuffer.color_attachments_for_render(&workarounds).to_vec();
        assert_eq!(compacted, vec![Some(attachment(0, 1, 0)), Some(attachment(0, 2, 0))]);

        framebuffer.set_draw_buffers(&[DrawBuffer::ColorAttachment(0)]);
        assert_eq!(framebuffer.color_attachments_for_render(&workarounds),
                   &[Some(attachment(0, 1, 0))][..]);
    }

    #[test]
    fn test_clear_buffer_parameters() {
        let framebuffer = Framebuffer::new();
        let mut state = State::default();
        state.blend.color_mask = [true, false, true, true];
        let params = framebuffer.clear_buffer_fv(&state,
                                                 ClearBuffer::Color,
                                                 2,
                                                 &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(params.clear_color, [false, false, true, false, false, false, false, false]);
        assert_eq!(params.color_value, ColorValue::Float([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(params.color_mask, [true, false, true, true]);
        assert!(!params.clear_depth && !params.clear_stencil);

        let params = framebuffer.clear_buffer_iv(&state, ClearBuffer::Stencil, 0, &[7, 9, 0, 0]);
        assert!(params.clear_stencil);
        assert_eq!(params.stencil_value, 7);
        assert!(!params.clear_color.iter().any(|&clear| clear));

        let params = framebuffer.clear_buffer_uiv(&state, ClearBuffer::Color, 0, &[1, 2, 3, 4]);
        assert_eq!(params.color_value, ColorValue::Uint([1, 2, 3, 4]));

        let params = framebuffer.clear_buffer_fi(&state, ClearBuffer::DepthStencil, 0.25, 3);
        assert!(params.clear_depth && params.clear_stencil);
        assert_eq!((params.depth_value, params.stencil_value), (0.25, 3));
    }

    #[test]
    fn test_clear_honors_scissor_and_attachments() {
        let framebuffer = Framebuffer::new();
        let mut state = State::default();
        state.scissor_test = true;
        state.scissor = RectI::from_xywh(1, 1, 2, 2);
        let params = framebuffer.clear_parameters(&state, ClearMask::all());
        assert_eq!(params.scissor, Some(RectI::from_xywh(1, 1, 2, 2)));
        assert!(params.clear_color[0]);
        assert!(!params.clear_depth);
    }

    #[test]
    fn test_clear_skips_depth_without_depth_writes() {
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_depth_attachment(Some(FramebufferAttachment::Renderbuffer(
            RenderbufferId(1))));
        let mut state = State::default();
        state.depth_clear_value = 0.5;
        let params = framebuffer.clear_parameters(&state, ClearMask::DEPTH);
        assert!(params.clear_depth);
        assert_eq!(params.depth_value, 0.5);

        state.depth_stencil.depth_mask = false;
        let params = framebuffer.clear_parameters(&state, ClearMask::DEPTH);
        assert!(!params.clear_depth);
        assert!(!params.clears_anything());
    }

    #[test]
    fn test_blit_planes_need_both_sides() {
        let mut read = Framebuffer::default_framebuffer(true);
        let draw = framebuffer(&[Some((1, 1, 0))]);
        let planes = blit_planes(&read, &draw, ClearMask::all());
        assert!(planes.color);
        assert!(!planes.depth && !planes.stencil);
        read.set_read_buffer(DrawBuffer::None);
        assert!(!blit_planes(&read, &draw, ClearMask::COLOR).color);
    }

    #[test]
    fn test_pack_parameters() {
        let pack = PixelPackState { alignment: 8, ..PixelPackState::default() };
        let area = RectI::from_xywh(0, 0, 3, 2);
        let params =
            pack_parameters(&pack, area, PixelFormat::Rgb, PixelType::UnsignedByte).unwrap();
        assert_eq!(params.output_pitch, 16);
        let pack = PixelPackState { skip_rows: 1, ..PixelPackState::default() };
        assert!(pack_parameters(&pack, area, PixelFormat::Rgba, PixelType::UnsignedByte)
                    .is_err());
    }

    #[test]
    fn test_attachment_resolution() {
        let device = device();
        let mut resources = ResourceManager::new();
        resources.set_swap_chain(Some(SwapChain::new(&device,
                                                     Vector2I::new(4, 4),
                                                     InternalFormat::Rgba8,
                                                     Some(InternalFormat::Depth24Stencil8))
                                          .unwrap()));
        let back = attachment_render_target(&device,
                                            &mut resources,
                                            &FramebufferAttachment::Default(DefaultBinding::Back))
            .unwrap();
        assert!(back.render_target_view().is_some());
        let depth = FramebufferAttachment::Default(DefaultBinding::Stencil);
        let depth = attachment_render_target(&device, &mut resources, &depth).unwrap();
        assert!(depth.depth_stencil_view().is_some());

        let texture = resources.create_texture(TextureShape::TwoD, false);
        let image = FramebufferAttachment::Texture { texture, index: ImageIndex::level(0) };
        assert!(attachment_render_target(&device, &mut resources, &image).is_err());
        resources.texture_mut(texture)
                 .unwrap()
                 .set_storage(&device, InternalFormat::Rgba8, 1, (2, 2, 1))
                 .unwrap();
        let first = attachment_render_target(&device, &mut resources, &image).unwrap();
        let second = attachment_render_target(&device, &mut resources, &image).unwrap();
        assert_eq!(first.serial(), second.serial());

        let renderbuffer = resources.create_renderbuffer();
        resources.renderbuffer_mut(renderbuffer)
                 .unwrap()
                 .set_storage(&device, InternalFormat::Rgba8, 2, 2, 0, 4)
                 .unwrap();
        let attachment = FramebufferAttachment::Renderbuffer(renderbuffer);
        assert!(attachment_render_target(&device, &mut resources, &attachment).is_ok());
    }
}
