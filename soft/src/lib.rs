// tangent/soft/src/lib.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An in-memory implementation of the device abstraction.
//!
//! Resources are plain byte arrays. Clears, copies, resolves, blits, and swizzles operate on
//! those bytes; draws are recorded but not rasterized. Every call is appended to a log that
//! tests inspect, and failures (allocation, device removal, slow queries) can be injected.

#[macro_use]
extern crate log;

mod platform;
mod texels;

pub use crate::platform::{DeviceCreation, PlatformConfig, SoftPlatform};

use crate::texels::TexelAddress;
use fxhash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::{AdapterDesc, BlendDesc, BufferDesc, DepthStencilDesc, DsvDesc};
use tangent_gpu::desc::{InputElementDesc, NativeBox, PrimitiveTopology, RasterizerDesc, RtvDesc};
use tangent_gpu::desc::{SamplerDesc, ScissorRect, SrvDesc, StreamOutputDecl, TextureDesc};
use tangent_gpu::desc::{TextureDimension, Usage, Viewport};
use tangent_gpu::format::{ColorValue, NativeFormat};
use tangent_gpu::{mip_extent, BindFlags, BlitParams, ClearFlags, ColorWriteMask, CpuAccessFlags};
use tangent_gpu::{Device, DeviceError, DeviceRemovedReason, DriverType, FeatureLevel};
use tangent_gpu::{IndexFormat, MappedSubresource, NativeObject, ObjectId, ShaderStage};
use tangent_gpu::{SwizzleChannel, VertexBufferBinding};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

fn next_object_id() -> ObjectId {
    ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
}

pub struct SoftDevice {
    feature_level: FeatureLevel,
    driver_type: DriverType,
    debug: bool,
    adapter: Option<AdapterDesc>,
    constant_buffer_offsets: bool,
    calls: RefCell<Vec<Call>>,
    bound: RefCell<BoundState>,
    removed: Cell<Option<DeviceRemovedReason>>,
    allocations_until_failure: Cell<Option<u32>>,
    query_latency: Cell<u32>,
    polls_until_removal: Cell<Option<u32>>,
}

#[derive(Clone)]
pub struct SoftBuffer {
    id: ObjectId,
    desc: BufferDesc,
    data: Rc<RefCell<Vec<u8>>>,
}

#[derive(Clone)]
pub struct SoftTexture {
    id: ObjectId,
    desc: TextureDesc,
    subresources: Rc<RefCell<Vec<Vec<u8>>>>,
}

#[derive(Clone, Debug)]
pub struct SoftShaderResourceView {
    id: ObjectId,
    texture: SoftTexture,
    desc: SrvDesc,
}

#[derive(Clone, Debug)]
pub struct SoftRenderTargetView {
    id: ObjectId,
    texture: SoftTexture,
    desc: RtvDesc,
}

#[derive(Clone, Debug)]
pub struct SoftDepthStencilView {
    id: ObjectId,
    texture: SoftTexture,
    desc: DsvDesc,
}

/// An immutable pipeline state object.
#[derive(Clone, Debug)]
pub struct SoftStateObject<T> where T: Clone + Debug {
    id: ObjectId,
    desc: T,
}

#[derive(Clone, Debug)]
pub struct SoftShader {
    id: ObjectId,
    bytecode: Rc<Vec<u8>>,
    stream_output: Rc<Vec<StreamOutputDecl>>,
}

pub struct SoftQuery {
    id: ObjectId,
    polls_remaining: Cell<u32>,
}

/// One recorded device call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateBuffer { buffer: ObjectId, byte_width: usize, bind_flags: BindFlags },
    CreateTexture { texture: ObjectId, desc: TextureDesc },
    CreateShaderResourceView { view: ObjectId, resource: ObjectId, desc: SrvDesc },
    CreateRenderTargetView { view: ObjectId, resource: ObjectId },
    CreateDepthStencilView { view: ObjectId, resource: ObjectId },
    CreateRasterizerState(ObjectId),
    CreateBlendState(ObjectId),
    CreateDepthStencilState(ObjectId),
    CreateSamplerState(ObjectId),
    CreateShader(ObjectId),
    CreateQuery(ObjectId),
    ClearState,
    Flush,
    EndQuery,
    SetRenderTargets { render_targets: Vec<Option<ObjectId>>, depth_stencil: Option<ObjectId> },
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    SetRasterizerState(ObjectId),
    SetBlendState { state: ObjectId, blend_factor: [f32; 4], sample_mask: u32 },
    SetDepthStencilState { state: ObjectId, stencil_ref: u32 },
    SetShaderResource { stage: ShaderStage, slot: u32, view: Option<ObjectId> },
    SetSampler { stage: ShaderStage, slot: u32, sampler: ObjectId },
    SetConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: Option<ObjectId>,
        range: Option<(u32, u32)>,
    },
    SetVertexShader(Option<ObjectId>),
    SetGeometryShader(Option<ObjectId>),
    SetPixelShader(Option<ObjectId>),
    SetPrimitiveTopology(PrimitiveTopology),
    SetInputLayout(Vec<InputElementDesc>),
    SetVertexBuffers { start_slot: u32, buffers: Vec<(Option<ObjectId>, u32, u32)> },
    SetIndexBuffer { buffer: Option<ObjectId>, format: IndexFormat, offset: u32 },
    SetStreamOutputTargets { targets: Vec<Option<ObjectId>>, offsets: Vec<u32> },
    Draw { vertex_count: u32, start_vertex: u32 },
    DrawInstanced { vertex_count: u32, instance_count: u32 },
    DrawIndexed { index_count: u32, start_index: u32, base_vertex: i32 },
    DrawIndexedInstanced { index_count: u32, instance_count: u32, base_vertex: i32 },
    ClearRenderTargetView { view: ObjectId, color: ColorValue },
    ClearDepthStencilView { view: ObjectId, flags: ClearFlags, depth: f32, stencil: u8 },
    UpdateBuffer { buffer: ObjectId, offset: usize, size: usize },
    CopyBufferRegion { dest: ObjectId, source: ObjectId, size: usize },
    UpdateTexture { texture: ObjectId, subresource: u32 },
    ReadTexture { texture: ObjectId, subresource: u32 },
    CopySubresourceRegion { dest: ObjectId, source: ObjectId },
    ResolveSubresource { dest: ObjectId, source: ObjectId },
    Blit,
    Swizzle { source: ObjectId, dest: ObjectId },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantBufferBinding {
    pub buffer: ObjectId,
    pub range: Option<(u32, u32)>,
}

/// A snapshot of everything bound to the context.
#[derive(Clone, Debug, Default)]
pub struct BoundState {
    pub render_targets: Vec<Option<ObjectId>>,
    pub depth_stencil: Option<ObjectId>,
    pub viewport: Option<Viewport>,
    pub scissor_rect: Option<ScissorRect>,
    pub rasterizer_state: Option<ObjectId>,
    pub blend_state: Option<(ObjectId, [f32; 4], u32)>,
    pub depth_stencil_state: Option<(ObjectId, u32)>,
    pub shader_resources: FxHashMap<(ShaderStage, u32), ObjectId>,
    pub samplers: FxHashMap<(ShaderStage, u32), ObjectId>,
    pub constant_buffers: FxHashMap<(ShaderStage, u32), ConstantBufferBinding>,
    pub vertex_shader: Option<ObjectId>,
    pub geometry_shader: Option<ObjectId>,
    pub pixel_shader: Option<ObjectId>,
    pub topology: Option<PrimitiveTopology>,
    pub input_layout: Vec<InputElementDesc>,
    pub vertex_buffers: FxHashMap<u32, (ObjectId, u32, u32)>,
    pub index_buffer: Option<(SoftBuffer, IndexFormat, u32)>,
    pub stream_output_targets: Vec<(Option<ObjectId>, u32)>,
}

impl SoftDevice {
    pub(crate) fn new(feature_level: FeatureLevel,
                      driver_type: DriverType,
                      debug: bool,
                      adapter: Option<AdapterDesc>,
                      constant_buffer_offsets: bool)
                      -> SoftDevice {
        SoftDevice {
            feature_level,
            driver_type,
            debug,
            adapter,
            constant_buffer_offsets,
            calls: RefCell::new(vec![]),
            bound: RefCell::new(BoundState::default()),
            removed: Cell::new(None),
            allocations_until_failure: Cell::new(None),
            query_latency: Cell::new(0),
            polls_until_removal: Cell::new(None),
        }
    }

    #[inline]
    pub fn driver_type(&self) -> DriverType {
        self.driver_type
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count_calls<F>(&self, predicate: F) -> usize where F: Fn(&Call) -> bool {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn bound_state(&self) -> BoundState {
        self.bound.borrow().clone()
    }

    /// Marks the device as removed. Subsequent creation calls fail.
    pub fn remove(&self, reason: DeviceRemovedReason) {
        self.removed.set(Some(reason));
    }

    /// Lets `count` more allocations succeed, then fails every allocation after that.
    pub fn fail_allocations_after(&self, count: u32) {
        self.allocations_until_failure.set(Some(count));
    }

    pub fn stop_failing_allocations(&self) {
        self.allocations_until_failure.set(None);
    }

    /// Sets how many completion polls an event query needs before it signals.
    pub fn set_query_latency(&self, polls: u32) {
        self.query_latency.set(polls);
    }

    /// Removes the device after `polls` completion polls.
    pub fn remove_after_polls(&self, polls: u32) {
        self.polls_until_removal.set(Some(polls));
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> Result<ObjectId, DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        match self.allocations_until_failure.get() {
            Some(0) => return Err(DeviceError::OutOfMemory),
            Some(count) => self.allocations_until_failure.set(Some(count - 1)),
            None => {}
        }
        Ok(next_object_id())
    }

    fn create_state<T>(&self, desc: &T, call: fn(ObjectId) -> Call)
                       -> Result<SoftStateObject<T>, DeviceError>
                       where T: Clone + Debug {
        let id = self.allocate()?;
        self.record(call(id));
        Ok(SoftStateObject { id, desc: desc.clone() })
    }

    fn create_shader(&self, bytecode: &[u8], stream_output: &[StreamOutputDecl])
                     -> Result<SoftShader, DeviceError> {
        if bytecode.is_empty() {
            return Err(DeviceError::InvalidArgument("empty shader bytecode"));
        }
        let id = self.allocate()?;
        self.record(Call::CreateShader(id));
        Ok(SoftShader {
            id,
            bytecode: Rc::new(bytecode.to_vec()),
            stream_output: Rc::new(stream_output.to_vec()),
        })
    }
}

impl Device for SoftDevice {
    type Buffer = SoftBuffer;
    type Texture = SoftTexture;
    type ShaderResourceView = SoftShaderResourceView;
    type RenderTargetView = SoftRenderTargetView;
    type DepthStencilView = SoftDepthStencilView;
    type RasterizerState = SoftStateObject<RasterizerDesc>;
    type BlendState = SoftStateObject<BlendDesc>;
    type DepthStencilState = SoftStateObject<DepthStencilDesc>;
    type SamplerState = SoftStateObject<SamplerDesc>;
    type VertexShader = SoftShader;
    type GeometryShader = SoftShader;
    type PixelShader = SoftShader;
    type Query = SoftQuery;

    #[inline]
    fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    fn adapter_desc(&self) -> Result<AdapterDesc, DeviceError> {
        self.adapter.clone().ok_or(DeviceError::Unsupported("adapter description"))
    }

    #[inline]
    fn supports_constant_buffer_offsets(&self) -> bool {
        self.constant_buffer_offsets
    }

    #[inline]
    fn device_removed_reason(&self) -> Option<DeviceRemovedReason> {
        self.removed.get()
    }

    fn create_buffer(&self, desc: &BufferDesc, initial_data: Option<&[u8]>)
                     -> Result<SoftBuffer, DeviceError> {
        if desc.byte_width == 0 {
            return Err(DeviceError::InvalidArgument("zero-sized buffer"));
        }
        if desc.usage == Usage::Staging && !desc.bind_flags.is_empty() {
            return Err(DeviceError::InvalidArgument("staging buffers cannot be bound"));
        }
        let id = self.allocate()?;
        let mut data = vec![0; desc.byte_width];
        if let Some(initial_data) = initial_data {
            let length = initial_data.len().min(data.len());
            data[0..length].copy_from_slice(&initial_data[0..length]);
        }
        debug!("creating buffer {:?}: {} bytes, {:?}", id, desc.byte_width, desc.bind_flags);
        self.record(Call::CreateBuffer {
            buffer: id,
            byte_width: desc.byte_width,
            bind_flags: desc.bind_flags,
        });
        Ok(SoftBuffer { id, desc: *desc, data: Rc::new(RefCell::new(data)) })
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<SoftTexture, DeviceError> {
        if desc.width == 0 || desc.height == 0 || desc.depth_or_array_size == 0 {
            return Err(DeviceError::InvalidArgument("zero-sized texture"));
        }
        if desc.format == NativeFormat::Unknown {
            return Err(DeviceError::InvalidArgument("unknown texture format"));
        }
        if desc.sample_count > 1 && desc.mip_levels > 1 {
            return Err(DeviceError::InvalidArgument("multisampled textures have one level"));
        }
        let mut desc = *desc;
        if desc.mip_levels == 0 {
            let largest = desc.width.max(desc.height);
            desc.mip_levels = 32 - largest.leading_zeros();
        }

        let id = self.allocate()?;
        let pixel_bytes = desc.format.pixel_bytes();
        let mut subresources = Vec::with_capacity(desc.subresource_count() as usize);
        for _ in 0..desc.array_size() {
            for level in 0..desc.mip_levels {
                let depth = match desc.dimension {
                    TextureDimension::Texture2D => 1,
                    TextureDimension::Texture3D => mip_extent(desc.depth_or_array_size, level),
                };
                let texels = mip_extent(desc.width, level) as usize *
                    mip_extent(desc.height, level) as usize * depth as usize;
                subresources.push(vec![0; texels * pixel_bytes]);
            }
        }
        debug!("creating texture {:?}: {}x{}x{} {:?}",
               id,
               desc.width,
               desc.height,
               desc.depth_or_array_size,
               desc.format);
        self.record(Call::CreateTexture { texture: id, desc });
        Ok(SoftTexture { id, desc, subresources: Rc::new(RefCell::new(subresources)) })
    }

    #[inline]
    fn texture_desc(&self, texture: &SoftTexture) -> TextureDesc {
        texture.desc
    }

    fn create_shader_resource_view(&self, resource: &SoftTexture, desc: &SrvDesc)
                                   -> Result<SoftShaderResourceView, DeviceError> {
        if !resource.desc.bind_flags.contains(BindFlags::SHADER_RESOURCE) {
            return Err(DeviceError::InvalidArgument("resource is not bindable for sampling"));
        }
        if desc.most_detailed_mip >= resource.desc.mip_levels {
            return Err(DeviceError::InvalidArgument("mip range out of bounds"));
        }
        let id = self.allocate()?;
        self.record(Call::CreateShaderResourceView {
            view: id,
            resource: resource.id,
            desc: *desc,
        });
        Ok(SoftShaderResourceView { id, texture: resource.clone(), desc: *desc })
    }

    fn create_render_target_view(&self, resource: &SoftTexture, desc: &RtvDesc)
                                 -> Result<SoftRenderTargetView, DeviceError> {
        if !resource.desc.bind_flags.contains(BindFlags::RENDER_TARGET) {
            return Err(DeviceError::InvalidArgument("resource is not bindable as a target"));
        }
        let id = self.allocate()?;
        self.record(Call::CreateRenderTargetView { view: id, resource: resource.id });
        Ok(SoftRenderTargetView { id, texture: resource.clone(), desc: *desc })
    }

    fn create_depth_stencil_view(&self, resource: &SoftTexture, desc: &DsvDesc)
                                 -> Result<SoftDepthStencilView, DeviceError> {
        if !resource.desc.bind_flags.contains(BindFlags::DEPTH_STENCIL) {
            return Err(DeviceError::InvalidArgument("resource is not bindable as depth"));
        }
        let id = self.allocate()?;
        self.record(Call::CreateDepthStencilView { view: id, resource: resource.id });
        Ok(SoftDepthStencilView { id, texture: resource.clone(), desc: *desc })
    }

    #[inline]
    fn shader_resource_view_desc(&self, view: &SoftShaderResourceView) -> SrvDesc {
        view.desc
    }

    #[inline]
    fn shader_resource_view_resource(&self, view: &SoftShaderResourceView) -> ObjectId {
        view.texture.id
    }

    #[inline]
    fn render_target_view_resource(&self, view: &SoftRenderTargetView) -> ObjectId {
        view.texture.id
    }

    #[inline]
    fn depth_stencil_view_resource(&self, view: &SoftDepthStencilView) -> ObjectId {
        view.texture.id
    }

    fn create_rasterizer_state(&self, desc: &RasterizerDesc)
                               -> Result<Self::RasterizerState, DeviceError> {
        self.create_state(desc, Call::CreateRasterizerState)
    }

    fn create_blend_state(&self, desc: &BlendDesc) -> Result<Self::BlendState, DeviceError> {
        self.create_state(desc, Call::CreateBlendState)
    }

    fn create_depth_stencil_state(&self, desc: &DepthStencilDesc)
                                  -> Result<Self::DepthStencilState, DeviceError> {
        self.create_state(desc, Call::CreateDepthStencilState)
    }

    fn create_sampler_state(&self, desc: &SamplerDesc)
                            -> Result<Self::SamplerState, DeviceError> {
        self.create_state(desc, Call::CreateSamplerState)
    }

    fn create_vertex_shader(&self, bytecode: &[u8]) -> Result<SoftShader, DeviceError> {
        self.create_shader(bytecode, &[])
    }

    fn create_geometry_shader(&self, bytecode: &[u8]) -> Result<SoftShader, DeviceError> {
        self.create_shader(bytecode, &[])
    }

    fn create_geometry_shader_with_stream_output(&self,
                                                 bytecode: &[u8],
                                                 declarations: &[StreamOutputDecl])
                                                 -> Result<SoftShader, DeviceError> {
        self.create_shader(bytecode, declarations)
    }

    fn create_pixel_shader(&self, bytecode: &[u8]) -> Result<SoftShader, DeviceError> {
        self.create_shader(bytecode, &[])
    }

    fn create_event_query(&self) -> Result<SoftQuery, DeviceError> {
        let id = self.allocate()?;
        self.record(Call::CreateQuery(id));
        Ok(SoftQuery { id, polls_remaining: Cell::new(0) })
    }

    fn end_query(&self, query: &SoftQuery) {
        query.polls_remaining.set(self.query_latency.get());
        self.record(Call::EndQuery);
    }

    fn query_event_complete(&self, query: &SoftQuery) -> Result<bool, DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        if let Some(polls) = self.polls_until_removal.get() {
            if polls == 0 {
                self.polls_until_removal.set(None);
                self.removed.set(Some(DeviceRemovedReason::Hung));
                return Ok(false);
            }
            self.polls_until_removal.set(Some(polls - 1));
        }
        match query.polls_remaining.get() {
            0 => Ok(true),
            polls => {
                query.polls_remaining.set(polls - 1);
                Ok(false)
            }
        }
    }

    fn flush(&self) {
        self.record(Call::Flush);
    }

    fn clear_state(&self) {
        *self.bound.borrow_mut() = BoundState::default();
        self.record(Call::ClearState);
    }

    fn set_render_targets(&self,
                          render_targets: &[Option<&SoftRenderTargetView>],
                          depth_stencil: Option<&SoftDepthStencilView>) {
        let render_targets: Vec<_> =
            render_targets.iter().map(|view| view.map(|view| view.id)).collect();
        let depth_stencil = depth_stencil.map(|view| view.id);
        {
            let mut bound = self.bound.borrow_mut();
            bound.render_targets = render_targets.clone();
            bound.depth_stencil = depth_stencil;
        }
        self.record(Call::SetRenderTargets { render_targets, depth_stencil });
    }

    fn set_viewport(&self, viewport: &Viewport) {
        self.bound.borrow_mut().viewport = Some(*viewport);
        self.record(Call::SetViewport(*viewport));
    }

    fn set_scissor_rect(&self, rect: &ScissorRect) {
        self.bound.borrow_mut().scissor_rect = Some(*rect);
        self.record(Call::SetScissorRect(*rect));
    }

    fn set_rasterizer_state(&self, state: &Self::RasterizerState) {
        self.bound.borrow_mut().rasterizer_state = Some(state.id);
        self.record(Call::SetRasterizerState(state.id));
    }

    fn set_blend_state(&self, state: &Self::BlendState, blend_factor: [f32; 4], sample_mask: u32) {
        self.bound.borrow_mut().blend_state = Some((state.id, blend_factor, sample_mask));
        self.record(Call::SetBlendState { state: state.id, blend_factor, sample_mask });
    }

    fn set_depth_stencil_state(&self, state: &Self::DepthStencilState, stencil_ref: u32) {
        self.bound.borrow_mut().depth_stencil_state = Some((state.id, stencil_ref));
        self.record(Call::SetDepthStencilState { state: state.id, stencil_ref });
    }

    fn set_shader_resource(&self,
                           stage: ShaderStage,
                           slot: u32,
                           view: Option<&SoftShaderResourceView>) {
        let view = view.map(|view| view.id);
        {
            let mut bound = self.bound.borrow_mut();
            match view {
                Some(view) => bound.shader_resources.insert((stage, slot), view),
                None => bound.shader_resources.remove(&(stage, slot)),
            };
        }
        self.record(Call::SetShaderResource { stage, slot, view });
    }

    fn set_sampler(&self, stage: ShaderStage, slot: u32, sampler: &Self::SamplerState) {
        self.bound.borrow_mut().samplers.insert((stage, slot), sampler.id);
        self.record(Call::SetSampler { stage, slot, sampler: sampler.id });
    }

    fn set_constant_buffer(&self, stage: ShaderStage, slot: u32, buffer: Option<&SoftBuffer>) {
        let buffer = buffer.map(|buffer| buffer.id);
        {
            let mut bound = self.bound.borrow_mut();
            match buffer {
                Some(buffer) => {
                    let binding = ConstantBufferBinding { buffer, range: None };
                    bound.constant_buffers.insert((stage, slot), binding);
                }
                None => {
                    bound.constant_buffers.remove(&(stage, slot));
                }
            }
        }
        self.record(Call::SetConstantBuffer { stage, slot, buffer, range: None });
    }

    fn set_constant_buffer_range(&self,
                                 stage: ShaderStage,
                                 slot: u32,
                                 buffer: &SoftBuffer,
                                 first_constant: u32,
                                 num_constants: u32) {
        debug_assert!(self.constant_buffer_offsets);
        let range = Some((first_constant, num_constants));
        let binding = ConstantBufferBinding { buffer: buffer.id, range };
        self.bound.borrow_mut().constant_buffers.insert((stage, slot), binding);
        self.record(Call::SetConstantBuffer { stage, slot, buffer: Some(buffer.id), range });
    }

    fn set_vertex_shader(&self, shader: Option<&SoftShader>) {
        let shader = shader.map(|shader| shader.id);
        self.bound.borrow_mut().vertex_shader = shader;
        self.record(Call::SetVertexShader(shader));
    }

    fn set_geometry_shader(&self, shader: Option<&SoftShader>) {
        let shader = shader.map(|shader| shader.id);
        self.bound.borrow_mut().geometry_shader = shader;
        self.record(Call::SetGeometryShader(shader));
    }

    fn set_pixel_shader(&self, shader: Option<&SoftShader>) {
        let shader = shader.map(|shader| shader.id);
        self.bound.borrow_mut().pixel_shader = shader;
        self.record(Call::SetPixelShader(shader));
    }

    fn set_primitive_topology(&self, topology: PrimitiveTopology) {
        self.bound.borrow_mut().topology = Some(topology);
        self.record(Call::SetPrimitiveTopology(topology));
    }

    fn set_input_layout(&self, elements: &[InputElementDesc]) {
        self.bound.borrow_mut().input_layout = elements.to_vec();
        self.record(Call::SetInputLayout(elements.to_vec()));
    }

    fn set_vertex_buffers(&self, start_slot: u32, bindings: &[VertexBufferBinding<Self>]) {
        let buffers: Vec<_> = bindings.iter().map(|binding| {
            (binding.buffer.map(|buffer| buffer.id), binding.stride, binding.offset)
        }).collect();
        {
            let mut bound = self.bound.borrow_mut();
            for (index, &(buffer, stride, offset)) in buffers.iter().enumerate() {
                let slot = start_slot + index as u32;
                match buffer {
                    Some(buffer) => bound.vertex_buffers.insert(slot, (buffer, stride, offset)),
                    None => bound.vertex_buffers.remove(&slot),
                };
            }
        }
        self.record(Call::SetVertexBuffers { start_slot, buffers });
    }

    fn set_index_buffer(&self, buffer: Option<&SoftBuffer>, format: IndexFormat, offset: u32) {
        self.bound.borrow_mut().index_buffer =
            buffer.map(|buffer| (buffer.clone(), format, offset));
        self.record(Call::SetIndexBuffer {
            buffer: buffer.map(|buffer| buffer.id),
            format,
            offset,
        });
    }

    fn set_stream_output_targets(&self, targets: &[Option<&SoftBuffer>], offsets: &[u32]) {
        let targets: Vec<_> = targets.iter().map(|buffer| buffer.map(|buffer| buffer.id)).collect();
        self.bound.borrow_mut().stream_output_targets =
            targets.iter().cloned().zip(offsets.iter().cloned()).collect();
        self.record(Call::SetStreamOutputTargets { targets, offsets: offsets.to_vec() });
    }

    fn draw(&self, vertex_count: u32, start_vertex: u32) {
        self.record(Call::Draw { vertex_count, start_vertex });
    }

    fn draw_instanced(&self,
                      vertex_count: u32,
                      instance_count: u32,
                      _: u32,
                      _: u32) {
        self.record(Call::DrawInstanced { vertex_count, instance_count });
    }

    fn draw_indexed(&self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.record(Call::DrawIndexed { index_count, start_index, base_vertex });
    }

    fn draw_indexed_instanced(&self,
                              index_count: u32,
                              instance_count: u32,
                              _: u32,
                              base_vertex: i32,
                              _: u32) {
        self.record(Call::DrawIndexedInstanced { index_count, instance_count, base_vertex });
    }

    fn clear_render_target_view(&self, view: &SoftRenderTargetView, color: &ColorValue) {
        texels::clear_color(&view.texture, &view.desc, color, None, ColorWriteMask::ALL);
        self.record(Call::ClearRenderTargetView { view: view.id, color: *color });
    }

    fn clear_depth_stencil_view(&self,
                                view: &SoftDepthStencilView,
                                flags: ClearFlags,
                                depth: f32,
                                stencil: u8) {
        texels::clear_depth_stencil(&view.texture, &view.desc, flags, depth, stencil, !0, None);
        self.record(Call::ClearDepthStencilView { view: view.id, flags, depth, stencil });
    }

    fn clear_render_target_region(&self,
                                  view: &SoftRenderTargetView,
                                  color: &ColorValue,
                                  rect: Option<&ScissorRect>,
                                  write_mask: ColorWriteMask)
                                  -> Result<(), DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        texels::clear_color(&view.texture, &view.desc, color, rect, write_mask);
        self.record(Call::ClearRenderTargetView { view: view.id, color: *color });
        Ok(())
    }

    fn clear_depth_stencil_region(&self,
                                  view: &SoftDepthStencilView,
                                  flags: ClearFlags,
                                  depth: f32,
                                  stencil: u8,
                                  stencil_write_mask: u8,
                                  rect: Option<&ScissorRect>)
                                  -> Result<(), DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        texels::clear_depth_stencil(&view.texture,
                                    &view.desc,
                                    flags,
                                    depth,
                                    stencil,
                                    stencil_write_mask,
                                    rect);
        self.record(Call::ClearDepthStencilView { view: view.id, flags, depth, stencil });
        Ok(())
    }

    fn update_buffer(&self, buffer: &SoftBuffer, offset: usize, data: &[u8]) {
        {
            let mut contents = buffer.data.borrow_mut();
            let end = (offset + data.len()).min(contents.len());
            if offset < end {
                contents[offset..end].copy_from_slice(&data[0..(end - offset)]);
            }
        }
        self.record(Call::UpdateBuffer { buffer: buffer.id, offset, size: data.len() });
    }

    fn read_buffer(&self, buffer: &SoftBuffer, offset: usize, length: usize)
                   -> Result<Vec<u8>, DeviceError> {
        if !buffer.desc.cpu_access.contains(CpuAccessFlags::READ) {
            return Err(DeviceError::InvalidArgument("buffer is not CPU-readable"));
        }
        let contents = buffer.data.borrow();
        if offset + length > contents.len() {
            return Err(DeviceError::InvalidArgument("read out of bounds"));
        }
        Ok(contents[offset..(offset + length)].to_vec())
    }

    fn copy_buffer_region(&self,
                          dest: &SoftBuffer,
                          dest_offset: usize,
                          source: &SoftBuffer,
                          source_offset: usize,
                          size: usize) {
        let data: Vec<u8> = {
            let source_data = source.data.borrow();
            let end = (source_offset + size).min(source_data.len());
            source_data[source_offset.min(end)..end].to_vec()
        };
        {
            let mut dest_data = dest.data.borrow_mut();
            let end = (dest_offset + data.len()).min(dest_data.len());
            if dest_offset < end {
                dest_data[dest_offset..end].copy_from_slice(&data[0..(end - dest_offset)]);
            }
        }
        self.record(Call::CopyBufferRegion { dest: dest.id, source: source.id, size });
    }

    fn update_texture(&self,
                      texture: &SoftTexture,
                      subresource: u32,
                      region: Option<&NativeBox>,
                      data: &[u8],
                      row_pitch: usize,
                      depth_pitch: usize) {
        texels::write_region(texture, subresource, region, data, row_pitch, depth_pitch);
        self.record(Call::UpdateTexture { texture: texture.id, subresource });
    }

    fn read_texture(&self, texture: &SoftTexture, subresource: u32)
                    -> Result<MappedSubresource, DeviceError> {
        if texture.desc.usage != Usage::Staging ||
                !texture.desc.cpu_access.contains(CpuAccessFlags::READ) {
            return Err(DeviceError::InvalidArgument("texture is not CPU-readable"));
        }
        if subresource >= texture.desc.subresource_count() {
            return Err(DeviceError::InvalidArgument("subresource out of range"));
        }
        let address = TexelAddress::new(&texture.desc, subresource);
        let data = texture.subresources.borrow()[subresource as usize].clone();
        self.record(Call::ReadTexture { texture: texture.id, subresource });
        Ok(MappedSubresource {
            data,
            row_pitch: address.row_pitch(),
            depth_pitch: address.depth_pitch(),
        })
    }

    fn copy_subresource_region(&self,
                               dest: &SoftTexture,
                               dest_subresource: u32,
                               dest_x: u32,
                               dest_y: u32,
                               dest_z: u32,
                               source: &SoftTexture,
                               source_subresource: u32,
                               source_box: Option<&NativeBox>) {
        texels::copy_region(dest,
                            dest_subresource,
                            [dest_x, dest_y, dest_z],
                            source,
                            source_subresource,
                            source_box);
        self.record(Call::CopySubresourceRegion { dest: dest.id, source: source.id });
    }

    fn resolve_subresource(&self,
                           dest: &SoftTexture,
                           dest_subresource: u32,
                           source: &SoftTexture,
                           source_subresource: u32,
                           _: NativeFormat) {
        // Samples are stored collapsed, so resolving is a copy.
        texels::copy_region(dest, dest_subresource, [0, 0, 0], source, source_subresource, None);
        self.record(Call::ResolveSubresource { dest: dest.id, source: source.id });
    }

    fn blit(&self, params: &BlitParams<Self>) -> Result<(), DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        texels::blit(params)?;
        self.record(Call::Blit);
        Ok(())
    }

    fn swizzle(&self,
               source: &SoftShaderResourceView,
               dest: &SoftRenderTargetView,
               size: Vector2I,
               swizzle: [SwizzleChannel; 4])
               -> Result<(), DeviceError> {
        if let Some(reason) = self.removed.get() {
            return Err(DeviceError::DeviceRemoved(reason));
        }
        texels::swizzle(&source.texture, &source.desc, &dest.texture, &dest.desc, size, swizzle);
        self.record(Call::Swizzle { source: source.id, dest: dest.id });
        Ok(())
    }
}

impl SoftBuffer {
    #[inline]
    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl SoftTexture {
    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn subresource_contents(&self, subresource: u32) -> Vec<u8> {
        self.subresources.borrow()[subresource as usize].clone()
    }
}

impl SoftShaderResourceView {
    #[inline]
    pub fn texture(&self) -> &SoftTexture {
        &self.texture
    }
}

impl SoftRenderTargetView {
    #[inline]
    pub fn texture(&self) -> &SoftTexture {
        &self.texture
    }
}

impl<T> SoftStateObject<T> where T: Clone + Debug {
    #[inline]
    pub fn desc(&self) -> &T {
        &self.desc
    }
}

impl SoftShader {
    #[inline]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    #[inline]
    pub fn stream_output(&self) -> &[StreamOutputDecl] {
        &self.stream_output
    }
}

impl Debug for SoftBuffer {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "SoftBuffer({:?}, {} bytes)", self.id, self.desc.byte_width)
    }
}

impl Debug for SoftTexture {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "SoftTexture({:?}, {:?})", self.id, self.desc.format)
    }
}

impl Debug for SoftQuery {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "SoftQuery({:?})", self.id)
    }
}

macro_rules! impl_native_object {
    ($($ty:ty),*) => {
        $(
            impl NativeObject for $ty {
                #[inline]
                fn object_id(&self) -> ObjectId {
                    self.id
                }
            }
        )*
    }
}

impl_native_object!(SoftBuffer,
                    SoftTexture,
                    SoftShaderResourceView,
                    SoftRenderTargetView,
                    SoftDepthStencilView,
                    SoftShader);

impl<T> NativeObject for SoftStateObject<T> where T: Clone + Debug {
    #[inline]
    fn object_id(&self) -> ObjectId {
        self.id
    }
}
