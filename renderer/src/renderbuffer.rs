// tangent/renderer/src/renderbuffer.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GL renderbuffer objects, each backed by one standalone render target.

use crate::error::Result;
use crate::formats::InternalFormat;
use crate::gl::RenderbufferId;
use crate::render_target::RenderTarget;
use tangent_gpu::Device;

pub struct Renderbuffer<D> where D: Device {
    id: RenderbufferId,
    render_target: Option<RenderTarget<D>>,
}

impl<D> Renderbuffer<D> where D: Device {
    pub fn new(id: RenderbufferId) -> Renderbuffer<D> {
        Renderbuffer { id, render_target: None }
    }

    #[inline]
    pub fn id(&self) -> RenderbufferId {
        self.id
    }

    /// Replaces the storage. `samples` is rounded up to the smallest supported count, capped
    /// at `max_samples`.
    pub fn set_storage(&mut self,
                       device: &D,
                       internal_format: InternalFormat,
                       width: u32,
                       height: u32,
                       samples: u32,
                       max_samples: u32)
                       -> Result<()> {
        let samples = if samples <= 1 { 0 } else { samples.next_power_of_two().min(max_samples) };
        let render_target = RenderTarget::new(device, width, height, internal_format, samples)?;
        debug!("renderbuffer {:?} storage {}x{} {:?}", self.id, width, height, internal_format);
        self.render_target = Some(render_target);
        Ok(())
    }

    #[inline]
    pub fn render_target(&self) -> Option<&RenderTarget<D>> {
        self.render_target.as_ref()
    }

    #[inline]
    pub fn internal_format(&self) -> Option<InternalFormat> {
        self.render_target.as_ref().map(|target| target.internal_format())
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.render_target.as_ref().map_or(0, |target| target.samples())
    }
}

#[cfg(test)]
mod test {
    use super::Renderbuffer;
    use crate::formats::InternalFormat;
    use crate::gl::RenderbufferId;
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
    fn test_storage_replaces_render_target() {
        let device = device();
        let mut renderbuffer = Renderbuffer::new(RenderbufferId(3));
        assert!(renderbuffer.render_target().is_none());
        renderbuffer.set_storage(&device, InternalFormat::Rgba8, 4, 4, 0, 4).unwrap();
        let first = renderbuffer.render_target().unwrap().serial();
        renderbuffer.set_storage(&device, InternalFormat::Depth24Stencil8, 4, 4, 0, 4).unwrap();
        let target = renderbuffer.render_target().unwrap();
        assert_ne!(target.serial(), first);
        assert!(target.depth_stencil_view().is_some());
    }

    #[test]
    fn test_sample_counts_round_up() {
        let device = device();
        let mut renderbuffer = Renderbuffer::new(RenderbufferId(1));
        renderbuffer.set_storage(&device, InternalFormat::Rgba8, 4, 4, 3, 4).unwrap();
        assert_eq!(renderbuffer.samples(), 4);
        renderbuffer.set_storage(&device, InternalFormat::Rgba8, 4, 4, 16, 4).unwrap();
        assert_eq!(renderbuffer.samples(), 4);
        renderbuffer.set_storage(&device, InternalFormat::Rgba8, 4, 4, 1, 4).unwrap();
        assert_eq!(renderbuffer.samples(), 0);
    }
}
