// tangent/renderer/tests/renderer.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::{CreateDeviceFlags, DeviceRemovedReason, FeatureLevel, ShaderStage};
use tangent_renderer::formats::{InternalFormat, PixelFormat, PixelType};
use tangent_renderer::framebuffer::{Framebuffer, FramebufferAttachment};
use tangent_renderer::gl::{BlendState, ClearBuffer, DepthStencilState, FilterMode};
use tangent_renderer::gl::{RasterizerState, SamplerState, State};
use tangent_renderer::options::RendererOptions;
use tangent_renderer::swap_chain::SwapChain;
use tangent_renderer::texture_storage::{ImageIndex, TextureShape};
use tangent_renderer::{Error, InitErrorKind, Renderer, ResourceManager};
use tangent_soft::{Call, PlatformConfig, SoftDevice, SoftPlatform};

fn renderer_with(config: PlatformConfig, options: RendererOptions) -> Renderer<SoftPlatform> {
    drop(env_logger::try_init());
    Renderer::new(SoftPlatform::new(config), options)
}

fn initialized() -> Renderer<SoftPlatform> {
    let mut renderer = renderer_with(PlatformConfig::default(), RendererOptions::default());
    renderer.initialize().unwrap();
    renderer.core().unwrap().device().clear_calls();
    renderer
}

fn count(device: &SoftDevice, predicate: fn(&Call) -> bool) -> usize {
    device.count_calls(|call| predicate(call))
}

#[test]
fn test_missing_library_is_a_missing_dependency() {
    let config = PlatformConfig { libraries_present: false, ..PlatformConfig::default() };
    let mut renderer = renderer_with(config, RendererOptions::default());
    match renderer.initialize() {
        Err(Error::Initialization { kind, .. }) => {
            assert_eq!(kind, InitErrorKind::MissingDependency)
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert!(!renderer.is_initialized());
    assert_eq!(renderer.core().err(), Some(Error::NotInitialized));
}

#[test]
fn test_no_feature_levels_fails_and_unloads() {
    let options = RendererOptions { max_version: Some((8, None)), ..RendererOptions::default() };
    let mut renderer = renderer_with(PlatformConfig::default(), options);
    match renderer.initialize() {
        Err(Error::Initialization { kind, .. }) => assert_eq!(kind, InitErrorKind::Other),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
    assert!(!renderer.platform().libraries_loaded());
}

#[test]
fn test_missing_debug_layer_falls_back_to_release_device() {
    let config = PlatformConfig { debug_layer_available: false, ..PlatformConfig::default() };
    let options = RendererOptions { debug_layer: true, ..RendererOptions::default() };
    let mut renderer = renderer_with(config, options);
    renderer.initialize().unwrap();

    let creations = renderer.platform().creations();
    assert_eq!(creations.len(), 2);
    assert!(creations[0].flags.contains(CreateDeviceFlags::DEBUG));
    assert!(!creations[1].flags.contains(CreateDeviceFlags::DEBUG));
    assert_eq!(renderer.core().unwrap().feature_level(), FeatureLevel::Level11_0);
}

#[test]
fn test_release_unloads_and_reset_recreates() {
    let mut renderer = initialized();
    assert!(renderer.test_device_resettable());
    assert!(renderer.reset_device());
    assert!(renderer.is_initialized());

    renderer.release();
    assert!(!renderer.is_initialized());
    assert!(!renderer.platform().libraries_loaded());
    renderer.release();
}

#[test]
fn test_identical_state_is_applied_once() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();

    for _ in 0..2 {
        core.set_scissor_rectangle(RectI::from_xywh(2, 2, 8, 8), true);
        core.set_viewport(RectI::from_xywh(0, 0, 16, 16), 0.0, 1.0, false);
        core.set_rasterizer_state(&RasterizerState::default()).unwrap();
        core.set_blend_state(&BlendState::default(), [0.0; 4], !0).unwrap();
        core.set_depth_stencil_state(&DepthStencilState::default(), 0, 0).unwrap();
    }

    let device = core.device();
    assert_eq!(count(device, |call| match *call {
        Call::SetBlendState { .. } => true,
        _ => false,
    }), 1);
    assert_eq!(count(device, |call| match *call {
        Call::SetDepthStencilState { .. } => true,
        _ => false,
    }), 1);
    assert_eq!(count(device, |call| match *call {
        Call::SetViewport(_) => true,
        _ => false,
    }), 1);
    assert_eq!(count(device, |call| match *call {
        Call::SetScissorRect(_) => true,
        _ => false,
    }), 1);
    assert_eq!(count(device, |call| match *call {
        Call::SetRasterizerState(_) => true,
        _ => false,
    }), 1);
    assert_eq!(count(device, |call| match *call {
        Call::CreateBlendState(_) => true,
        _ => false,
    }), 1);
}

#[test]
fn test_finish_waits_for_the_query() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    core.device().set_query_latency(3);
    core.finish().unwrap();
    core.finish().unwrap();
    assert_eq!(count(core.device(), |call| match *call {
        Call::CreateQuery(_) => true,
        _ => false,
    }), 1);
}

#[test]
fn test_removal_while_finishing_is_device_lost() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    core.device().set_query_latency(10);
    core.device().remove_after_polls(2);
    assert_eq!(core.finish(), Err(Error::DeviceLost));
    assert!(core.is_device_lost());

    assert!(renderer.reset_device());
    assert!(!renderer.core().unwrap().is_device_lost());
}

#[test]
fn test_lost_device_is_reported_once_tested() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    assert!(!core.test_device_lost());
    core.device().remove(DeviceRemovedReason::Hung);
    assert!(core.test_device_lost());
    assert!(core.is_device_lost());
}

#[test]
fn test_clear_buffer_then_read_back() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    let mut resources = ResourceManager::new();
    let swap_chain = SwapChain::new(core.device(),
                                    Vector2I::new(8, 8),
                                    InternalFormat::Rgba8,
                                    None).unwrap();
    resources.set_swap_chain(Some(swap_chain));

    let framebuffer = Framebuffer::default_framebuffer(false);
    let state = State::default();
    let red = [1.0, 0.0, 0.0, 1.0];
    let params = framebuffer.clear_buffer_fv(&state, ClearBuffer::Color, 0, &red);
    core.clear(&mut resources, &framebuffer, &params).unwrap();

    let mut pixel = [0; 4];
    core.read_pixels(&mut resources,
                     &framebuffer,
                     RectI::from_xywh(3, 5, 1, 1),
                     PixelFormat::Rgba,
                     PixelType::UnsignedByte,
                     &state.pack,
                     &mut pixel).unwrap();
    assert_eq!(pixel, [255, 0, 0, 255]);
}

#[test]
fn test_clear_texture_attachment_then_read_back() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    let mut resources = ResourceManager::new();
    let id = resources.create_texture(TextureShape::TwoD, false);
    resources.texture_mut(id)
             .unwrap()
             .set_storage(core.device(), InternalFormat::Rgba8, 1, (4, 4, 1))
             .unwrap();

    let mut framebuffer = Framebuffer::new();
    framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
        texture: id,
        index: ImageIndex::level(0),
    }));
    core.apply_render_target(&mut resources, &mut framebuffer).unwrap();
    let params = framebuffer.clear_buffer_fv(&State::default(),
                                             ClearBuffer::Color,
                                             0,
                                             &[1.0, 0.0, 0.0, 1.0]);
    core.clear(&mut resources, &framebuffer, &params).unwrap();

    core.set_texture(ShaderStage::Pixel, 0, resources.texture_mut(id)).unwrap();
    assert!(core.device().bound_state().shader_resources.contains_key(&(ShaderStage::Pixel, 0)));

    let mut pixels = [0; 4 * 4 * 4];
    core.read_pixels(&mut resources,
                     &framebuffer,
                     RectI::from_xywh(0, 0, 4, 4),
                     PixelFormat::Rgba,
                     PixelType::UnsignedByte,
                     &Default::default(),
                     &mut pixels).unwrap();
    for texel in pixels.chunks(4) {
        assert_eq!(texel, &[255, 0, 0, 255]);
    }
}

#[test]
fn test_level_zero_sampling_switches_views() {
    let mut renderer = initialized();
    let core = renderer.core_mut().unwrap();
    let mut resources = ResourceManager::new();
    let id = resources.create_texture(TextureShape::TwoD, true);
    resources.texture_mut(id)
             .unwrap()
             .set_storage(core.device(), InternalFormat::Rgba8, 3, (4, 4, 1))
             .unwrap();

    let bound = |core: &tangent_renderer::RendererCore<SoftDevice>| {
        core.device().bound_state().shader_resources.get(&(ShaderStage::Pixel, 0)).cloned()
    };

    core.set_texture(ShaderStage::Pixel, 0, resources.texture_mut(id)).unwrap();
    let mipmapped = bound(core);

    resources.texture_mut(id).unwrap().set_sampler_state(SamplerState {
        min_filter: FilterMode::Linear,
        ..SamplerState::default()
    });
    core.set_texture(ShaderStage::Pixel, 0, resources.texture_mut(id)).unwrap();
    let level_zero = bound(core);

    assert!(mipmapped.is_some() && level_zero.is_some());
    assert_ne!(mipmapped, level_zero);
}
