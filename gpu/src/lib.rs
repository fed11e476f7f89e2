// tangent/gpu/src/lib.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Minimal abstractions over the native device capabilities that the translation core needs.
//!
//! The model is that of a Direct3D 11 class device: resources and views, immutable pipeline
//! state objects, an immediate context with explicit binding slots, and a device-removed
//! status. Every native handle is reference-counted by the backend, so cloning a handle keeps
//! the object alive and dropping the last clone releases it.

#[macro_use]
extern crate bitflags;

pub mod desc;
pub mod format;

use crate::desc::{AdapterDesc, BlendDesc, BufferDesc, DepthStencilDesc, DsvDesc, InputElementDesc};
use crate::desc::{NativeBox, PrimitiveTopology, RasterizerDesc, RtvDesc, SamplerDesc, ScissorRect};
use crate::desc::{SrvDesc, StreamOutputDecl, TextureDesc, Viewport};
use crate::format::{ColorValue, NativeFormat};
use std::fmt::Debug;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use thiserror::Error;

/// Identity of a native object. Two handles with the same ID refer to the same object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// A native handle that can be compared by identity.
pub trait NativeObject: Clone + Debug {
    fn object_id(&self) -> ObjectId;
}

pub trait Device {
    type Buffer: NativeObject;
    type Texture: NativeObject;
    type ShaderResourceView: NativeObject;
    type RenderTargetView: NativeObject;
    type DepthStencilView: NativeObject;
    type RasterizerState: NativeObject;
    type BlendState: NativeObject;
    type DepthStencilState: NativeObject;
    type SamplerState: NativeObject;
    type VertexShader: NativeObject;
    type GeometryShader: NativeObject;
    type PixelShader: NativeObject;
    type Query;

    // Device queries.
    fn feature_level(&self) -> FeatureLevel;
    fn adapter_desc(&self) -> Result<AdapterDesc, DeviceError>;
    fn supports_constant_buffer_offsets(&self) -> bool;
    fn device_removed_reason(&self) -> Option<DeviceRemovedReason>;

    // Resource creation.
    fn create_buffer(&self, desc: &BufferDesc, initial_data: Option<&[u8]>)
                     -> Result<Self::Buffer, DeviceError>;
    fn create_texture(&self, desc: &TextureDesc) -> Result<Self::Texture, DeviceError>;
    fn texture_desc(&self, texture: &Self::Texture) -> TextureDesc;
    fn create_shader_resource_view(&self, resource: &Self::Texture, desc: &SrvDesc)
                                   -> Result<Self::ShaderResourceView, DeviceError>;
    fn create_render_target_view(&self, resource: &Self::Texture, desc: &RtvDesc)
                                 -> Result<Self::RenderTargetView, DeviceError>;
    fn create_depth_stencil_view(&self, resource: &Self::Texture, desc: &DsvDesc)
                                 -> Result<Self::DepthStencilView, DeviceError>;
    fn shader_resource_view_desc(&self, view: &Self::ShaderResourceView) -> SrvDesc;
    fn shader_resource_view_resource(&self, view: &Self::ShaderResourceView) -> ObjectId;
    fn render_target_view_resource(&self, view: &Self::RenderTargetView) -> ObjectId;
    fn depth_stencil_view_resource(&self, view: &Self::DepthStencilView) -> ObjectId;

    // Pipeline state objects.
    fn create_rasterizer_state(&self, desc: &RasterizerDesc)
                               -> Result<Self::RasterizerState, DeviceError>;
    fn create_blend_state(&self, desc: &BlendDesc) -> Result<Self::BlendState, DeviceError>;
    fn create_depth_stencil_state(&self, desc: &DepthStencilDesc)
                                  -> Result<Self::DepthStencilState, DeviceError>;
    fn create_sampler_state(&self, desc: &SamplerDesc)
                            -> Result<Self::SamplerState, DeviceError>;

    // Shaders.
    fn create_vertex_shader(&self, bytecode: &[u8]) -> Result<Self::VertexShader, DeviceError>;
    fn create_geometry_shader(&self, bytecode: &[u8])
                              -> Result<Self::GeometryShader, DeviceError>;
    fn create_geometry_shader_with_stream_output(&self,
                                                 bytecode: &[u8],
                                                 declarations: &[StreamOutputDecl])
                                                 -> Result<Self::GeometryShader, DeviceError>;
    fn create_pixel_shader(&self, bytecode: &[u8]) -> Result<Self::PixelShader, DeviceError>;

    // Synchronization.
    fn create_event_query(&self) -> Result<Self::Query, DeviceError>;
    fn end_query(&self, query: &Self::Query);
    /// Returns `Ok(true)` once every command issued before `end_query` has completed.
    fn query_event_complete(&self, query: &Self::Query) -> Result<bool, DeviceError>;
    fn flush(&self);
    fn clear_state(&self);

    // Output merger and rasterizer bindings.
    fn set_render_targets(&self,
                          render_targets: &[Option<&Self::RenderTargetView>],
                          depth_stencil: Option<&Self::DepthStencilView>);
    fn set_viewport(&self, viewport: &Viewport);
    fn set_scissor_rect(&self, rect: &ScissorRect);
    fn set_rasterizer_state(&self, state: &Self::RasterizerState);
    fn set_blend_state(&self, state: &Self::BlendState, blend_factor: [f32; 4], sample_mask: u32);
    fn set_depth_stencil_state(&self, state: &Self::DepthStencilState, stencil_ref: u32);

    // Shader stage bindings.
    fn set_shader_resource(&self,
                           stage: ShaderStage,
                           slot: u32,
                           view: Option<&Self::ShaderResourceView>);
    fn set_sampler(&self, stage: ShaderStage, slot: u32, sampler: &Self::SamplerState);
    fn set_constant_buffer(&self, stage: ShaderStage, slot: u32, buffer: Option<&Self::Buffer>);
    /// Binds a window of `num_constants` 16-byte constants starting at `first_constant`. Only
    /// valid when `supports_constant_buffer_offsets()` is true.
    fn set_constant_buffer_range(&self,
                                 stage: ShaderStage,
                                 slot: u32,
                                 buffer: &Self::Buffer,
                                 first_constant: u32,
                                 num_constants: u32);
    fn set_vertex_shader(&self, shader: Option<&Self::VertexShader>);
    fn set_geometry_shader(&self, shader: Option<&Self::GeometryShader>);
    fn set_pixel_shader(&self, shader: Option<&Self::PixelShader>);

    // Input assembler and stream output.
    fn set_primitive_topology(&self, topology: PrimitiveTopology);
    fn set_input_layout(&self, elements: &[InputElementDesc]);
    fn set_vertex_buffers(&self, start_slot: u32, bindings: &[VertexBufferBinding<Self>]);
    fn set_index_buffer(&self, buffer: Option<&Self::Buffer>, format: IndexFormat, offset: u32);
    /// An offset of `APPEND_STREAM_OUTPUT_OFFSET` resumes writing where the previous binding
    /// of the same buffer left off.
    fn set_stream_output_targets(&self, targets: &[Option<&Self::Buffer>], offsets: &[u32]);

    // Draws.
    fn draw(&self, vertex_count: u32, start_vertex: u32);
    fn draw_instanced(&self,
                      vertex_count: u32,
                      instance_count: u32,
                      start_vertex: u32,
                      start_instance: u32);
    fn draw_indexed(&self, index_count: u32, start_index: u32, base_vertex: i32);
    fn draw_indexed_instanced(&self,
                              index_count: u32,
                              instance_count: u32,
                              start_index: u32,
                              base_vertex: i32,
                              start_instance: u32);

    // Clears.
    fn clear_render_target_view(&self, view: &Self::RenderTargetView, color: &ColorValue);
    fn clear_depth_stencil_view(&self,
                                view: &Self::DepthStencilView,
                                flags: ClearFlags,
                                depth: f32,
                                stencil: u8);
    /// Clears part of a render target with a channel mask, the way a shader-driven clear
    /// would.
    fn clear_render_target_region(&self,
                                  view: &Self::RenderTargetView,
                                  color: &ColorValue,
                                  rect: Option<&ScissorRect>,
                                  write_mask: ColorWriteMask)
                                  -> Result<(), DeviceError>;
    fn clear_depth_stencil_region(&self,
                                  view: &Self::DepthStencilView,
                                  flags: ClearFlags,
                                  depth: f32,
                                  stencil: u8,
                                  stencil_write_mask: u8,
                                  rect: Option<&ScissorRect>)
                                  -> Result<(), DeviceError>;

    // Data transfer.
    fn update_buffer(&self, buffer: &Self::Buffer, offset: usize, data: &[u8]);
    /// Reads back a CPU-readable buffer.
    fn read_buffer(&self, buffer: &Self::Buffer, offset: usize, length: usize)
                   -> Result<Vec<u8>, DeviceError>;
    fn copy_buffer_region(&self,
                          dest: &Self::Buffer,
                          dest_offset: usize,
                          source: &Self::Buffer,
                          source_offset: usize,
                          size: usize);
    /// Writes tightly packed texel rows into a region of one subresource.
    fn update_texture(&self,
                      texture: &Self::Texture,
                      subresource: u32,
                      region: Option<&NativeBox>,
                      data: &[u8],
                      row_pitch: usize,
                      depth_pitch: usize);
    /// Maps a CPU-readable texture subresource for reading.
    fn read_texture(&self, texture: &Self::Texture, subresource: u32)
                    -> Result<MappedSubresource, DeviceError>;
    fn copy_subresource_region(&self,
                               dest: &Self::Texture,
                               dest_subresource: u32,
                               dest_x: u32,
                               dest_y: u32,
                               dest_z: u32,
                               source: &Self::Texture,
                               source_subresource: u32,
                               source_box: Option<&NativeBox>);
    fn resolve_subresource(&self,
                           dest: &Self::Texture,
                           dest_subresource: u32,
                           source: &Self::Texture,
                           source_subresource: u32,
                           format: NativeFormat);

    // Shader-driven helpers.
    /// Copies between render targets with scaling, flipping, and format conversion.
    fn blit(&self, params: &BlitParams<Self>) -> Result<(), DeviceError>;
    /// Renders `source` into `dest` with its channels permuted.
    fn swizzle(&self,
               source: &Self::ShaderResourceView,
               dest: &Self::RenderTargetView,
               size: Vector2I,
               swizzle: [SwizzleChannel; 4])
               -> Result<(), DeviceError>;
}

/// Loads the native runtime and creates devices.
pub trait Platform {
    type Device: Device;

    /// Probes for the libraries and entry points device creation needs.
    fn load_libraries(&mut self) -> Result<(), PlatformError>;
    fn unload_libraries(&mut self);
    /// Creates a device at the first feature level in `feature_levels` the adapter supports.
    fn create_device(&mut self,
                     driver_type: DriverType,
                     flags: CreateDeviceFlags,
                     feature_levels: &[FeatureLevel])
                     -> Result<Self::Device, PlatformError>;
    /// Checks that presentation works from this process with the given device.
    fn check_presentation_support(&self, device: &Self::Device) -> Result<(), PlatformError>;
}

/// The vertex buffer bound to one input slot.
pub struct VertexBufferBinding<'a, D> where D: Device + ?Sized {
    pub buffer: Option<&'a D::Buffer>,
    pub stride: u32,
    pub offset: u32,
}

pub struct BlitParams<'a, D> where D: Device + ?Sized {
    pub kind: BlitKind<'a, D>,
    pub source_area: RectI,
    pub source_size: Vector2I,
    pub dest_area: RectI,
    pub dest_size: Vector2I,
    pub scissor: Option<RectI>,
}

pub enum BlitKind<'a, D> where D: Device + ?Sized {
    Color {
        source: &'a D::ShaderResourceView,
        dest: &'a D::RenderTargetView,
        filter: BlitFilter,
    },
    Depth {
        source: &'a D::ShaderResourceView,
        dest: &'a D::DepthStencilView,
    },
    Stencil {
        source: &'a D::Texture,
        source_subresource: u32,
        dest: &'a D::Texture,
        dest_subresource: u32,
    },
    DepthStencil {
        source: &'a D::Texture,
        source_subresource: u32,
        dest: &'a D::Texture,
        dest_subresource: u32,
    },
}

#[derive(Clone, Debug)]
pub struct MappedSubresource {
    pub data: Vec<u8>,
    pub row_pitch: usize,
    pub depth_pitch: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureLevel {
    Level9_3,
    Level10_0,
    Level10_1,
    Level11_0,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverType {
    Hardware,
    Warp,
    Reference,
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Pixel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwizzleChannel {
    Red,
    Green,
    Blue,
    Alpha,
    Zero,
    One,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlitFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceRemovedReason {
    Hung,
    Removed,
    Reset,
    DriverInternalError,
}

/// Resumes stream output at the current write position of the bound buffer.
pub const APPEND_STREAM_OUTPUT_OFFSET: u32 = !0;

bitflags! {
    pub struct CreateDeviceFlags: u32 {
        const DEBUG = 0x01;
    }
}

bitflags! {
    pub struct ClearFlags: u32 {
        const DEPTH   = 0x01;
        const STENCIL = 0x02;
    }
}

bitflags! {
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER   = 0x01;
        const INDEX_BUFFER    = 0x02;
        const CONSTANT_BUFFER = 0x04;
        const SHADER_RESOURCE = 0x08;
        const STREAM_OUTPUT   = 0x10;
        const RENDER_TARGET   = 0x20;
        const DEPTH_STENCIL   = 0x40;
    }
}

bitflags! {
    pub struct CpuAccessFlags: u32 {
        const WRITE = 0x01;
        const READ  = 0x02;
    }
}

bitflags! {
    pub struct ResourceMiscFlags: u32 {
        const GENERATE_MIPS = 0x01;
        const TEXTURE_CUBE  = 0x04;
    }
}

bitflags! {
    pub struct ColorWriteMask: u8 {
        const RED   = 0x01;
        const GREEN = 0x02;
        const BLUE  = 0x04;
        const ALPHA = 0x08;
        const ALL   = Self::RED.bits | Self::GREEN.bits | Self::BLUE.bits | Self::ALPHA.bits;
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DeviceError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("device removed: {0:?}")]
    DeviceRemoved(DeviceRemovedReason),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum PlatformError {
    #[error("could not load library {0}")]
    MissingLibrary(String),
    #[error("could not retrieve entry point {0}")]
    MissingEntryPoint(&'static str),
    #[error("invalid argument to device creation")]
    InvalidArgument,
    #[error("device creation failed: {0}")]
    CreateDeviceFailed(String),
    #[error("incompatible platform: {0}")]
    IncompatiblePlatform(String),
}

/// Computes the flat subresource index of a mip level within an array slice.
#[inline]
pub fn calc_subresource(mip_slice: u32, array_slice: u32, mip_levels: u32) -> u32 {
    mip_slice + array_slice * mip_levels
}

/// The extent of mip `level` of a dimension of `size` texels.
#[inline]
pub fn mip_extent(size: u32, level: u32) -> u32 {
    size.checked_shr(level).unwrap_or(0).max(1)
}
