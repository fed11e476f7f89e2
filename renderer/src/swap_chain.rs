// tangent/renderer/src/swap_chain.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The render targets behind the default framebuffer.

use crate::error::Result;
use crate::formats::InternalFormat;
use crate::render_target::RenderTarget;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::Device;

pub struct SwapChain<D> where D: Device {
    back_buffer_format: InternalFormat,
    depth_buffer_format: Option<InternalFormat>,
    color: RenderTarget<D>,
    depth_stencil: Option<RenderTarget<D>>,
}

impl<D> SwapChain<D> where D: Device {
    pub fn new(device: &D,
               size: Vector2I,
               back_buffer_format: InternalFormat,
               depth_buffer_format: Option<InternalFormat>)
               -> Result<SwapChain<D>> {
        let (color, depth_stencil) =
            SwapChain::create_targets(device, size, back_buffer_format, depth_buffer_format)?;
        Ok(SwapChain { back_buffer_format, depth_buffer_format, color, depth_stencil })
    }

    fn create_targets(device: &D,
                      size: Vector2I,
                      back_buffer_format: InternalFormat,
                      depth_buffer_format: Option<InternalFormat>)
                      -> Result<(RenderTarget<D>, Option<RenderTarget<D>>)> {
        let (width, height) = (size.x().max(0) as u32, size.y().max(0) as u32);
        let color = RenderTarget::new(device, width, height, back_buffer_format, 0)?;
        let depth_stencil = match depth_buffer_format {
            Some(format) => Some(RenderTarget::new(device, width, height, format, 0)?),
            None => None,
        };
        Ok((color, depth_stencil))
    }

    /// Reallocates both targets at `size`. The old targets survive a failure.
    pub fn resize(&mut self, device: &D, size: Vector2I) -> Result<()> {
        let (color, depth_stencil) = SwapChain::create_targets(device,
                                                               size,
                                                               self.back_buffer_format,
                                                               self.depth_buffer_format)?;
        debug!("resized swap chain to {:?}", size);
        self.color = color;
        self.depth_stencil = depth_stencil;
        Ok(())
    }

    #[inline]
    pub fn size(&self) -> Vector2I {
        self.color.size()
    }

    #[inline]
    pub fn color_render_target(&self) -> &RenderTarget<D> {
        &self.color
    }

    #[inline]
    pub fn depth_stencil_render_target(&self) -> Option<&RenderTarget<D>> {
        self.depth_stencil.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::SwapChain;
    use crate::formats::InternalFormat;
    use tangent_geometry::vector::Vector2I;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    #[test]
    fn test_resize_recreates_targets() {
        let device = device();
        let mut swap_chain = SwapChain::new(&device,
                                            Vector2I::new(4, 4),
                                            InternalFormat::Rgba8,
                                            Some(InternalFormat::Depth24Stencil8)).unwrap();
        let serial = swap_chain.color_render_target().serial();
        swap_chain.resize(&device, Vector2I::new(8, 2)).unwrap();
        assert_eq!(swap_chain.size(), Vector2I::new(8, 2));
        assert_ne!(swap_chain.color_render_target().serial(), serial);
        assert!(swap_chain.depth_stencil_render_target().unwrap().depth_stencil_view().is_some());
    }

    #[test]
    fn test_minimized_window_has_no_views() {
        let device = device();
        let swap_chain =
            SwapChain::new(&device, Vector2I::zero(), InternalFormat::Rgba8, None).unwrap();
        assert!(swap_chain.color_render_target().render_target_view().is_none());
        assert!(swap_chain.depth_stencil_render_target().is_none());
    }
}
