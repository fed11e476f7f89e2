// tangent/renderer/src/render_target.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A single renderable image: one render-target or depth-stencil view plus the
//! shader-resource view blits read it through.

use crate::error::Result;
use crate::formats::{self, InternalFormat};
use std::sync::atomic::{AtomicU64, Ordering};
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::{DsvDesc, DsvDimension, RtvDesc, RtvDimension, SrvDesc, SrvDimension};
use tangent_gpu::desc::{TextureDesc, Usage};
use tangent_gpu::format::{ColorValue, NativeFormat};
use tangent_gpu::{BindFlags, Device, FeatureLevel};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Issues a serial no render target has had before.
pub(crate) fn next_render_target_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

pub struct RenderTarget<D> where D: Device {
    texture: Option<D::Texture>,
    subresource: u32,
    render_target_view: Option<D::RenderTargetView>,
    depth_stencil_view: Option<D::DepthStencilView>,
    shader_resource_view: Option<D::ShaderResourceView>,
    width: u32,
    height: u32,
    depth: u32,
    internal_format: InternalFormat,
    native_format: NativeFormat,
    samples: u32,
    serial: u64,
}

/// The views wrapped by a render target over part of a larger texture.
pub struct RenderTargetViews<D> where D: Device {
    pub render_target_view: Option<D::RenderTargetView>,
    pub depth_stencil_view: Option<D::DepthStencilView>,
    pub shader_resource_view: Option<D::ShaderResourceView>,
}

impl<D> RenderTarget<D> where D: Device {
    /// Wraps views onto subresource `subresource` of `texture`.
    pub fn from_views(texture: D::Texture,
                      subresource: u32,
                      views: RenderTargetViews<D>,
                      size: (u32, u32, u32),
                      internal_format: InternalFormat,
                      native_format: NativeFormat,
                      samples: u32)
                      -> RenderTarget<D> {
        RenderTarget {
            texture: Some(texture),
            subresource,
            render_target_view: views.render_target_view,
            depth_stencil_view: views.depth_stencil_view,
            shader_resource_view: views.shader_resource_view,
            width: size.0,
            height: size.1,
            depth: size.2,
            internal_format,
            native_format,
            samples,
            serial: next_render_target_serial(),
        }
    }

    /// Creates a standalone 2D render target with its own texture. A zero width or height
    /// yields a target with no views, which binds as nothing.
    pub fn new(device: &D,
               width: u32,
               height: u32,
               internal_format: InternalFormat,
               samples: u32)
               -> Result<RenderTarget<D>> {
        let feature_level = device.feature_level();
        let format = formats::texture_format(internal_format, feature_level);
        let depth_stencil = internal_format.is_depth_or_stencil();
        let native_format = if depth_stencil { format.dsv_format } else { format.rtv_format };

        let mut target = RenderTarget {
            texture: None,
            subresource: 0,
            render_target_view: None,
            depth_stencil_view: None,
            shader_resource_view: None,
            width,
            height,
            depth: 1,
            internal_format,
            native_format,
            samples,
            serial: next_render_target_serial(),
        };
        if width == 0 || height == 0 {
            return Ok(target);
        }

        // Multisampled depth can't be sampled below feature level 10_1.
        let sampleable = !(depth_stencil && samples > 1 &&
                           feature_level < FeatureLevel::Level10_1) &&
            format.srv_format != NativeFormat::Unknown;
        let mut bind_flags = if depth_stencil {
            BindFlags::DEPTH_STENCIL
        } else {
            BindFlags::RENDER_TARGET
        };
        if sampleable {
            bind_flags |= BindFlags::SHADER_RESOURCE;
        }
        let desc = TextureDesc {
            sample_count: samples.max(1),
            usage: Usage::Default,
            bind_flags,
            ..TextureDesc::new_2d(width, height, format.texture_format)
        };
        let texture = device.create_texture(&desc)?;
        let multisampled = samples > 1;

        if sampleable {
            let srv_desc = SrvDesc {
                format: format.srv_format,
                dimension: if multisampled {
                    SrvDimension::Texture2DMs
                } else {
                    SrvDimension::Texture2D
                },
                most_detailed_mip: 0,
                mip_levels: 1,
                first_array_slice: 0,
                array_size: 1,
            };
            target.shader_resource_view =
                Some(device.create_shader_resource_view(&texture, &srv_desc)?);
        }

        if depth_stencil {
            let dsv_desc = DsvDesc {
                format: format.dsv_format,
                dimension: if multisampled {
                    DsvDimension::Texture2DMs
                } else {
                    DsvDimension::Texture2D { mip_slice: 0 }
                },
            };
            target.depth_stencil_view =
                Some(device.create_depth_stencil_view(&texture, &dsv_desc)?);
        } else {
            let rtv_desc = RtvDesc {
                format: format.rtv_format,
                dimension: if multisampled {
                    RtvDimension::Texture2DMs
                } else {
                    RtvDimension::Texture2D { mip_slice: 0 }
                },
            };
            let view = device.create_render_target_view(&texture, &rtv_desc)?;
            if format.requires_initialization {
                device.clear_render_target_view(&view, &ColorValue::Float([0.0, 0.0, 0.0, 1.0]));
            }
            target.render_target_view = Some(view);
        }

        debug!("created {}x{} render target {:?} ({} samples)",
               width,
               height,
               internal_format,
               samples);
        target.texture = Some(texture);
        Ok(target)
    }

    #[inline]
    pub fn texture(&self) -> Option<&D::Texture> {
        self.texture.as_ref()
    }

    #[inline]
    pub fn subresource_index(&self) -> u32 {
        self.subresource
    }

    #[inline]
    pub fn render_target_view(&self) -> Option<&D::RenderTargetView> {
        self.render_target_view.as_ref()
    }

    #[inline]
    pub fn depth_stencil_view(&self) -> Option<&D::DepthStencilView> {
        self.depth_stencil_view.as_ref()
    }

    #[inline]
    pub fn shader_resource_view(&self) -> Option<&D::ShaderResourceView> {
        self.shader_resource_view.as_ref()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn size(&self) -> Vector2I {
        Vector2I::new(self.width as i32, self.height as i32)
    }

    #[inline]
    pub fn internal_format(&self) -> InternalFormat {
        self.internal_format
    }

    #[inline]
    pub fn native_format(&self) -> NativeFormat {
        self.native_format
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Identifies this render target's current contents binding. Changes whenever the views
    /// are recreated.
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Marks the target as a different binding, forcing it to be rebound.
    pub fn invalidate(&mut self) {
        self.serial = next_render_target_serial();
    }
}

impl<D> Clone for RenderTarget<D> where D: Device {
    fn clone(&self) -> RenderTarget<D> {
        RenderTarget {
            texture: self.texture.clone(),
            subresource: self.subresource,
            render_target_view: self.render_target_view.clone(),
            depth_stencil_view: self.depth_stencil_view.clone(),
            shader_resource_view: self.shader_resource_view.clone(),
            width: self.width,
            height: self.height,
            depth: self.depth,
            internal_format: self.internal_format,
            native_format: self.native_format,
            samples: self.samples,
            serial: self.serial,
        }
    }
}

#[cfg(test)]
mod test {
    use super::RenderTarget;
    use crate::formats::InternalFormat;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, NativeObject, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device(feature_level: FeatureLevel) -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware, CreateDeviceFlags::empty(), &[feature_level])
                .unwrap()
    }

    #[test]
    fn test_color_target_has_render_target_and_resource_views() {
        let device = device(FeatureLevel::Level11_0);
        let target = RenderTarget::new(&device, 4, 2, InternalFormat::Rgba8, 0).unwrap();
        assert!(target.render_target_view().is_some());
        assert!(target.depth_stencil_view().is_none());
        assert!(target.shader_resource_view().is_some());
        assert_eq!((target.width(), target.height()), (4, 2));
    }

    #[test]
    fn test_zero_sized_target_has_no_views() {
        let device = device(FeatureLevel::Level11_0);
        let target = RenderTarget::new(&device, 0, 16, InternalFormat::Rgba8, 0).unwrap();
        assert!(target.texture().is_none());
        assert!(target.render_target_view().is_none());
    }

    #[test]
    fn test_multisampled_depth_is_not_sampleable_on_10_0() {
        let device = device(FeatureLevel::Level10_0);
        let target =
            RenderTarget::new(&device, 8, 8, InternalFormat::Depth24Stencil8, 4).unwrap();
        assert!(target.depth_stencil_view().is_some());
        assert!(target.shader_resource_view().is_none());
    }

    #[test]
    fn test_formats_without_alpha_start_opaque() {
        let device = device(FeatureLevel::Level11_0);
        let target = RenderTarget::new(&device, 2, 2, InternalFormat::Rgb8, 0).unwrap();
        let texture = target.texture().unwrap();
        assert_eq!(texture.subresource_contents(0), [0u8, 0, 0, 255].repeat(4));
    }

    #[test]
    fn test_serials_are_unique() {
        let device = device(FeatureLevel::Level11_0);
        let mut first = RenderTarget::new(&device, 1, 1, InternalFormat::Rgba8, 0).unwrap();
        let second = RenderTarget::new(&device, 1, 1, InternalFormat::Rgba8, 0).unwrap();
        assert_ne!(first.serial(), second.serial());
        assert_ne!(first.texture().unwrap().object_id(), second.texture().unwrap().object_id());
        let serial = first.serial();
        first.invalidate();
        assert_ne!(first.serial(), serial);
    }
}
