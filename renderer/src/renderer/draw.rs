// tangent/renderer/src/renderer/draw.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Input assembly, stream output, and draw submission.
//!
//! Line loops and triangle fans have no native topology. They are drawn from generated 32-bit
//! indices streamed into a dedicated index buffer per mode.

use crate::buffer::BufferUsage;
use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::gl::{IndexType, PrimitiveMode, State};
use crate::index_data::{self, ElementSource, IndexSource, TranslatedIndexData};
use crate::program::Program;
use crate::resources::ResourceManager;
use crate::streaming_buffer::INITIAL_INDEX_BUFFER_SIZE;
use super::shadow::IndexBufferBinding;
use super::RendererCore;
use smallvec::SmallVec;
use tangent_gpu::desc::{BufferDesc, InputElementDesc, PrimitiveTopology, Usage};
use tangent_gpu::format::NativeFormat;
use tangent_gpu::{BindFlags, CpuAccessFlags, Device, IndexFormat, NativeObject, ObjectId};
use tangent_gpu::{VertexBufferBinding, APPEND_STREAM_OUTPUT_OFFSET};

/// Where the indices of an indexed draw come from.
#[derive(Clone, Copy, Debug)]
pub enum Indices<'a> {
    /// A byte offset into the bound element array buffer.
    Offset(usize),
    /// Client memory, used when no element array buffer is bound.
    Client(&'a [u8]),
}

// A unit quad as (position, texture coordinate) pairs, instanced once per point.
const POINT_SPRITE_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 1.0,
    -1.0,  1.0, 0.0, 0.0,
     1.0,  1.0, 1.0, 0.0,
     1.0, -1.0, 1.0, 1.0,
];
const POINT_SPRITE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
const POINT_SPRITE_STRIDE: u32 = 16;

impl<D> RendererCore<D> where D: Device {
    /// Sets the topology for `mode` and returns whether `count` vertices draw anything.
    pub fn apply_primitive_type(&mut self, mode: PrimitiveMode, count: u32, uses_point_size: bool)
                                -> bool {
        let topology = match mode {
            PrimitiveMode::Points if uses_point_size &&
                self.workarounds.use_instanced_point_sprite_emulation => {
                PrimitiveTopology::TriangleList
            }
            PrimitiveMode::Points => PrimitiveTopology::PointList,
            PrimitiveMode::Lines => PrimitiveTopology::LineList,
            PrimitiveMode::LineLoop | PrimitiveMode::LineStrip => PrimitiveTopology::LineStrip,
            PrimitiveMode::Triangles | PrimitiveMode::TriangleFan => {
                PrimitiveTopology::TriangleList
            }
            PrimitiveMode::TriangleStrip => PrimitiveTopology::TriangleStrip,
        };

        if self.shadow.topology != Some(topology) {
            self.device.set_primitive_topology(topology);
            self.shadow.topology = Some(topology);
            self.stats.state_change_count += 1;
        } else {
            self.stats.redundant_state_count += 1;
        }

        count >= mode.min_vertex_count()
    }

    pub(super) fn point_sprite_emulation(&self, mode: PrimitiveMode, uses_point_size: bool)
                                         -> bool {
        mode == PrimitiveMode::Points && uses_point_size &&
            self.workarounds.use_instanced_point_sprite_emulation
    }

    /// Translates the enabled attributes for vertices `first..first + count` and binds them
    /// with a matching input layout.
    pub fn apply_vertex_buffer(&mut self,
                               resources: &mut ResourceManager<D>,
                               state: &State,
                               mode: PrimitiveMode,
                               first: u32,
                               count: u32,
                               instances: u32,
                               uses_point_size: bool)
                               -> Result<()> {
        let attributes = self.vertex_data.prepare_vertex_data(&self.device,
                                                              resources,
                                                              &state.vertex_attributes,
                                                              &state.current_values,
                                                              first,
                                                              count,
                                                              instances)?;
        let sprites = self.point_sprite_emulation(mode, uses_point_size);

        let mut layout: Vec<InputElementDesc> = attributes.iter().enumerate().map(|(slot, attr)| {
            let mut element = attr.input_element(slot as u32);
            // Every quad corner of one point reads that point's attributes.
            if sprites && element.instance_data_step_rate == 0 {
                element.instance_data_step_rate = 1;
            }
            element
        }).collect();
        let mut bindings: Vec<(D::Buffer, u32, u32)> =
            attributes.iter().map(|attr| (attr.buffer.clone(), attr.stride, attr.offset)).collect();

        if sprites {
            let (vertices, indices) = self.point_sprite_quad()?;
            let slot = attributes.len() as u32;
            for &(semantic_index, offset) in &[(slot, 0), (slot + 1, 8)] {
                layout.push(InputElementDesc {
                    semantic_index,
                    format: NativeFormat::R32G32Float,
                    input_slot: slot,
                    aligned_byte_offset: offset,
                    instance_data_step_rate: 0,
                });
            }
            bindings.push((vertices, POINT_SPRITE_STRIDE, 0));
            self.bind_index_buffer(&indices, IndexFormat::Uint16, 0);
        }

        if self.shadow.input_layout.as_ref() != Some(&layout) {
            self.device.set_input_layout(&layout);
            self.shadow.input_layout = Some(layout);
            self.stats.state_change_count += 1;
        }

        for (slot, &(ref buffer, stride, offset)) in bindings.iter().enumerate() {
            let slot = slot as u32;
            let applied = (buffer.object_id(), stride, offset);
            if self.shadow.vertex_buffers.get(&slot) == Some(&applied) {
                self.stats.redundant_state_count += 1;
                continue;
            }
            self.device.set_vertex_buffers(slot, &[VertexBufferBinding {
                buffer: Some(buffer),
                stride,
                offset,
            }]);
            self.shadow.vertex_buffers.insert(slot, applied);
            self.stats.state_change_count += 1;
        }
        Ok(())
    }

    fn point_sprite_quad(&mut self) -> Result<(D::Buffer, D::Buffer)> {
        if let Some((ref vertices, ref indices)) = self.point_sprite_quad {
            return Ok((vertices.clone(), indices.clone()));
        }

        let vertex_bytes: Vec<u8> =
            POINT_SPRITE_VERTICES.iter().flat_map(|value| value.to_le_bytes().to_vec()).collect();
        let index_bytes: Vec<u8> =
            POINT_SPRITE_INDICES.iter().flat_map(|index| index.to_le_bytes().to_vec()).collect();
        let vertices = self.device.create_buffer(&BufferDesc {
            byte_width: vertex_bytes.len(),
            usage: Usage::Immutable,
            bind_flags: BindFlags::VERTEX_BUFFER,
            cpu_access: CpuAccessFlags::empty(),
        }, Some(&vertex_bytes))?;
        let indices = self.device.create_buffer(&BufferDesc {
            byte_width: index_bytes.len(),
            usage: Usage::Immutable,
            bind_flags: BindFlags::INDEX_BUFFER,
            cpu_access: CpuAccessFlags::empty(),
        }, Some(&index_bytes))?;
        self.point_sprite_quad = Some((vertices.clone(), indices.clone()));
        Ok((vertices, indices))
    }

    fn bind_index_buffer(&mut self, buffer: &D::Buffer, format: IndexFormat, offset: u32) {
        let applied = IndexBufferBinding { buffer: buffer.object_id(), format, offset };
        if self.shadow.index_buffer == Some(applied) {
            self.stats.redundant_state_count += 1;
            return;
        }
        self.device.set_index_buffer(Some(buffer), format, offset);
        self.shadow.index_buffer = Some(applied);
        self.stats.state_change_count += 1;
    }

    /// Prepares and binds the indices of an indexed draw.
    pub fn apply_index_buffer(&mut self,
                              resources: &mut ResourceManager<D>,
                              state: &State,
                              index_type: IndexType,
                              count: u32,
                              indices: Indices)
                              -> Result<TranslatedIndexData<D>> {
        let source = match (state.element_array_buffer, indices) {
            (_, Indices::Client(data)) => ElementSource::Client(data),
            (Some(id), Indices::Offset(offset)) => {
                let buffer = resources.buffer_mut(id).ok_or_else(|| {
                    Error::Unsupported(format!("element array {:?} does not exist", id))
                })?;
                ElementSource::Buffer { buffer, offset }
            }
            (None, Indices::Offset(_)) => {
                return Err(Error::Unsupported("no element array buffer is bound".to_owned()));
            }
        };
        let translated =
            self.index_data.prepare_index_data(&self.device, index_type, count as usize, source)?;
        self.bind_index_buffer(&translated.buffer,
                               translated.index_format,
                               translated.start_offset);
        Ok(translated)
    }

    /// Binds the stream output targets. A target whose buffer and offset are unchanged keeps
    /// appending where the previous draw stopped.
    pub fn apply_transform_feedback_buffers(&mut self,
                                            resources: &mut ResourceManager<D>,
                                            state: &State)
                                            -> Result<()> {
        let mut targets: SmallVec<[(Option<D::Buffer>, usize); 4]> = SmallVec::new();
        if state.transform_feedback.is_active_unpaused() {
            for binding in &state.transform_feedback.bindings {
                let binding = match *binding {
                    Some(binding) => binding,
                    None => {
                        targets.push((None, 0));
                        continue;
                    }
                };
                let buffer = resources.buffer_mut(binding.buffer).ok_or_else(|| {
                    Error::Unsupported(format!("feedback target {:?} does not exist",
                                               binding.buffer))
                })?;
                buffer.mark_transform_feedback_usage();
                let native =
                    buffer.get_buffer(&self.device, BufferUsage::VertexOrTransformFeedback)?;
                targets.push((Some(native), binding.offset));
            }
        }

        let applied: Vec<(Option<ObjectId>, usize)> =
            targets.iter()
                   .map(|&(ref buffer, offset)| (buffer.as_ref().map(|b| b.object_id()), offset))
                   .collect();
        if self.shadow.stream_output.as_ref() == Some(&applied) {
            self.stats.redundant_state_count += 1;
            return Ok(());
        }

        let previous = self.shadow.stream_output.take().unwrap_or_default();
        let offsets: SmallVec<[u32; 4]> = applied.iter().enumerate().map(|(index, target)| {
            match *target {
                (None, _) => 0,
                _ if previous.get(index) == Some(target) => APPEND_STREAM_OUTPUT_OFFSET,
                (Some(_), offset) => offset as u32,
            }
        }).collect();
        let buffers: SmallVec<[Option<&D::Buffer>; 4]> =
            targets.iter().map(|&(ref buffer, _)| buffer.as_ref()).collect();
        self.device.set_stream_output_targets(&buffers, &offsets);
        self.shadow.stream_output = Some(applied);
        self.stats.state_change_count += 1;
        Ok(())
    }

    /// Issues a non-indexed draw of `count` vertices with everything already applied.
    pub fn draw_arrays(&mut self,
                       state: &State,
                       program: &mut Program<D>,
                       mode: PrimitiveMode,
                       count: u32,
                       instances: u32)
                       -> Result<()> {
        let uses_point_size = program.uses_point_size();
        if mode == PrimitiveMode::Points && state.transform_feedback.is_active_unpaused() {
            // Capture without rasterizing first, then draw the sprites if anything is visible.
            self.device.set_pixel_shader(None);
            self.shadow.pixel_shader = Some(None);
            self.draw_vertices(count, instances);

            if !state.rasterizer.rasterizer_discard && uses_point_size {
                let pixel_shader = program.pixel_executable(&self.device)?;
                self.device.set_pixel_shader(Some(&pixel_shader));
                self.shadow.pixel_shader = Some(Some(pixel_shader.object_id()));

                let geometry_shader = program.point_sprite_executable(&self.device)?;
                self.device.set_geometry_shader(geometry_shader.as_ref());
                self.shadow.geometry_shader =
                    Some(geometry_shader.as_ref().map(|shader| shader.object_id()));
                self.draw_vertices(count, instances);
            }
            return Ok(());
        }

        match mode {
            PrimitiveMode::LineLoop => {
                let indices = index_data::line_loop_indices(IndexSource::Unindexed, count)?;
                self.draw_generated_indices(mode, &indices, 0, 0)
            }
            PrimitiveMode::TriangleFan => {
                let indices = index_data::triangle_fan_indices(IndexSource::Unindexed, count)?;
                self.draw_generated_indices(mode, &indices, 0, instances)
            }
            PrimitiveMode::Points if self.point_sprite_emulation(mode, uses_point_size) => {
                let instance_count = count * instances.max(1);
                self.device.draw_indexed_instanced(POINT_SPRITE_INDICES.len() as u32,
                                                   instance_count,
                                                   0,
                                                   0,
                                                   0);
                self.stats.drawcall_count += 1;
                Ok(())
            }
            _ => {
                self.draw_vertices(count, instances);
                Ok(())
            }
        }
    }

    fn draw_vertices(&mut self, count: u32, instances: u32) {
        if instances > 0 {
            self.device.draw_instanced(count, instances, 0, 0);
        } else {
            self.device.draw(count, 0);
        }
        self.stats.drawcall_count += 1;
    }

    /// Issues an indexed draw of `count` indices with everything already applied. Vertex data
    /// was translated starting at the smallest index, so indices are rebased by it.
    pub fn draw_elements(&mut self,
                         resources: &mut ResourceManager<D>,
                         state: &State,
                         mode: PrimitiveMode,
                         count: u32,
                         index_type: IndexType,
                         indices: Indices,
                         translated: &TranslatedIndexData<D>,
                         instances: u32)
                         -> Result<()> {
        let min_index = translated.index_range.start;
        match mode {
            PrimitiveMode::LineLoop | PrimitiveMode::TriangleFan => {
                let generated = {
                    let data = match (state.element_array_buffer, indices) {
                        (_, Indices::Client(data)) => data,
                        (Some(id), Indices::Offset(offset)) => {
                            let buffer = resources.buffer_mut(id).ok_or_else(|| {
                                Error::Unsupported(format!("element array {:?} does not exist",
                                                           id))
                            })?;
                            let data = buffer.get_data(&self.device)?;
                            data.get(offset..).unwrap_or(&[])
                        }
                        (None, Indices::Offset(_)) => {
                            return Err(Error::Unsupported("no element array buffer is bound"
                                                              .to_owned()));
                        }
                    };
                    let data = index_data::element_slice(data,
                                                         0,
                                                         count as usize * index_type.bytes())?;
                    let source = IndexSource::Indexed { data, index_type };
                    if mode == PrimitiveMode::LineLoop {
                        index_data::line_loop_indices(source, count)?
                    } else {
                        index_data::triangle_fan_indices(source, count)?
                    }
                };
                let instances = if mode == PrimitiveMode::LineLoop { 0 } else { instances };
                self.draw_generated_indices(mode, &generated, min_index, instances)
            }
            _ => {
                let base_vertex = -(min_index as i32);
                if instances > 0 {
                    self.device.draw_indexed_instanced(count, instances, 0, base_vertex, 0);
                } else {
                    self.device.draw_indexed(count, 0, base_vertex);
                }
                self.stats.drawcall_count += 1;
                Ok(())
            }
        }
    }

    fn draw_generated_indices(&mut self,
                              mode: PrimitiveMode,
                              indices: &[u32],
                              min_index: u32,
                              instances: u32)
                              -> Result<()> {
        let bytes = index_data::index_bytes(indices);
        let stream = if mode == PrimitiveMode::LineLoop {
            &mut self.line_loop_indices
        } else {
            &mut self.triangle_fan_indices
        };
        if stream.buffer().is_none() {
            stream.reserve(&self.device, INITIAL_INDEX_BUFFER_SIZE.max(bytes.len()))?;
        }
        let (buffer, offset) = stream.write(&self.device, &bytes)?;
        self.bind_index_buffer(&buffer, IndexFormat::Uint32, offset as u32);

        let base_vertex = -(min_index as i32);
        if instances > 0 {
            self.device.draw_indexed_instanced(indices.len() as u32, instances, 0, base_vertex, 0);
        } else {
            self.device.draw_indexed(indices.len() as u32, 0, base_vertex);
        }
        self.stats.drawcall_count += 1;
        Ok(())
    }

    /// Applies all state for a non-indexed draw of vertices `first..first + count` and draws.
    pub fn render_arrays(&mut self,
                         resources: &mut ResourceManager<D>,
                         framebuffer: &mut Framebuffer,
                         state: &State,
                         program: &mut Program<D>,
                         mode: PrimitiveMode,
                         first: u32,
                         count: u32,
                         instances: u32)
                         -> Result<()> {
        if self.skip_draw(state, program, mode) {
            return Ok(());
        }
        let uses_point_size = program.uses_point_size();
        self.apply_render_target(resources, framebuffer)?;
        self.apply_state(state, mode)?;
        if !self.apply_primitive_type(mode, count, uses_point_size) {
            return Ok(());
        }
        self.apply_vertex_buffer(resources, state, mode, first, count, instances, uses_point_size)?;
        self.apply_transform_feedback_buffers(resources, state)?;
        self.apply_shaders(program, state, mode)?;
        self.apply_textures(resources, program, state)?;
        self.apply_uniforms(program)?;
        self.set_uniform_buffers(resources, program, state)?;
        self.draw_arrays(state, program, mode, count, instances)
    }

    /// Applies all state for an indexed draw and draws.
    pub fn render_elements(&mut self,
                           resources: &mut ResourceManager<D>,
                           framebuffer: &mut Framebuffer,
                           state: &State,
                           program: &mut Program<D>,
                           mode: PrimitiveMode,
                           count: u32,
                           index_type: IndexType,
                           indices: Indices,
                           instances: u32)
                           -> Result<()> {
        if self.skip_draw(state, program, mode) {
            return Ok(());
        }
        let uses_point_size = program.uses_point_size();
        self.apply_render_target(resources, framebuffer)?;
        self.apply_state(state, mode)?;
        if !self.apply_primitive_type(mode, count, uses_point_size) {
            return Ok(());
        }
        let translated = self.apply_index_buffer(resources, state, index_type, count, indices)?;
        let range = translated.index_range;
        self.apply_vertex_buffer(resources,
                                 state,
                                 mode,
                                 range.start,
                                 range.vertex_count(),
                                 instances,
                                 uses_point_size)?;
        self.apply_transform_feedback_buffers(resources, state)?;
        self.apply_shaders(program, state, mode)?;
        self.apply_textures(resources, program, state)?;
        self.apply_uniforms(program)?;
        self.set_uniform_buffers(resources, program, state)?;
        self.draw_elements(resources,
                           state,
                           mode,
                           count,
                           index_type,
                           indices,
                           &translated,
                           instances)
    }
}

#[cfg(test)]
mod test {
    use super::Indices;
    use crate::buffer::DataUsage;
    use crate::formats::InternalFormat;
    use crate::framebuffer::{Framebuffer, FramebufferAttachment};
    use crate::gl::{AttributeData, AttributeType, BufferBinding, BufferId, IndexType};
    use crate::gl::{PrimitiveMode, State, VertexAttribute};
    use crate::index_data::IndexRange;
    use crate::program::{Program, ProgramBinary};
    use crate::renderer::test::soft_core;
    use crate::renderer::RendererCore;
    use crate::resources::ResourceManager;
    use crate::texture_storage::{ImageIndex, TextureShape};
    use tangent_gpu::desc::{PrimitiveTopology, StreamOutputDecl};
    use tangent_gpu::{FeatureLevel, NativeObject, APPEND_STREAM_OUTPUT_OFFSET};
    use tangent_soft::{Call, SoftDevice};

    #[test]
    fn test_minimum_counts_ignore_point_sprite_emulation() {
        for &level in &[FeatureLevel::Level9_3, FeatureLevel::Level11_0] {
            let mut core = soft_core(level);
            assert!(!core.apply_primitive_type(PrimitiveMode::Triangles, 2, true));
            assert!(core.apply_primitive_type(PrimitiveMode::Points, 1, true));
            assert!(!core.apply_primitive_type(PrimitiveMode::Points, 0, true));
            assert!(!core.apply_primitive_type(PrimitiveMode::LineLoop, 1, false));
        }
    }

    #[test]
    fn test_emulated_points_draw_as_triangles() {
        let mut core = soft_core(FeatureLevel::Level9_3);
        core.apply_primitive_type(PrimitiveMode::Points, 4, true);
        assert_eq!(core.device().bound_state().topology, Some(PrimitiveTopology::TriangleList));
        let mut core = soft_core(FeatureLevel::Level11_0);
        core.apply_primitive_type(PrimitiveMode::Points, 4, true);
        assert_eq!(core.device().bound_state().topology, Some(PrimitiveTopology::PointList));
    }

    fn drawn_index_counts(core: &RendererCore<SoftDevice>) -> Vec<(u32, i32)> {
        core.device().calls().iter().filter_map(|call| match *call {
            Call::DrawIndexed { index_count, base_vertex, .. } => Some((index_count, base_vertex)),
            _ => None,
        }).collect()
    }

    #[test]
    fn test_line_loop_closes_the_strip() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut program = Program::new(Default::default());
        core.draw_arrays(&State::default(), &mut program, PrimitiveMode::LineLoop, 5, 0).unwrap();
        assert_eq!(drawn_index_counts(&core), vec![(6, 0)]);
    }

    #[test]
    fn test_indexed_fan_rebases_on_min_index() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let state = State::default();
        let indices: Vec<u8> = [3u16, 4, 5, 6].iter().flat_map(|i| i.to_le_bytes().to_vec())
                                                   .collect();
        let translated = core.apply_index_buffer(&mut resources,
                                                 &state,
                                                 IndexType::UnsignedShort,
                                                 4,
                                                 Indices::Client(&indices)).unwrap();
        assert_eq!(translated.index_range, IndexRange { start: 3, end: 6 });
        core.device().clear_calls();
        core.draw_elements(&mut resources,
                           &state,
                           PrimitiveMode::TriangleFan,
                           4,
                           IndexType::UnsignedShort,
                           Indices::Client(&indices),
                           &translated,
                           0).unwrap();
        assert_eq!(drawn_index_counts(&core), vec![(6, -3)]);
    }

    #[test]
    fn test_short_client_indices_are_rejected() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let state = State::default();
        let indices = [0u8, 0, 1, 0];
        let translated = core.apply_index_buffer(&mut resources,
                                                 &state,
                                                 IndexType::UnsignedShort,
                                                 2,
                                                 Indices::Client(&indices)).unwrap();
        assert!(core.draw_elements(&mut resources,
                                   &state,
                                   PrimitiveMode::LineLoop,
                                   3,
                                   IndexType::UnsignedShort,
                                   Indices::Client(&indices),
                                   &translated,
                                   0).is_err());
    }

    fn capturing_point_program() -> Program<SoftDevice> {
        Program::new(ProgramBinary {
            vertex_shader: vec![1],
            pixel_shader: vec![2],
            point_sprite_shader: Some(vec![3]),
            stream_output_shader: Some(vec![4]),
            stream_output: vec![StreamOutputDecl {
                semantic_index: 0,
                start_component: 0,
                component_count: 4,
                output_slot: 0,
            }],
            uses_point_size: true,
            ..ProgramBinary::default()
        })
    }

    fn capturing_state() -> State {
        let mut state = State::default();
        state.transform_feedback.active = true;
        state
    }

    fn shader_and_draw_calls(core: &RendererCore<SoftDevice>) -> Vec<Call> {
        core.device().calls().into_iter().filter(|call| match *call {
            Call::SetPixelShader(_) | Call::SetGeometryShader(_) | Call::Draw { .. } => true,
            _ => false,
        }).collect()
    }

    #[test]
    fn test_captured_points_are_drawn_again_as_sprites() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut program = capturing_point_program();
        let state = capturing_state();
        core.device().clear_calls();
        core.draw_arrays(&state, &mut program, PrimitiveMode::Points, 4, 0).unwrap();

        let pixel_shader = program.pixel_executable(core.device()).unwrap().object_id();
        let point_sprite =
            program.point_sprite_executable(core.device()).unwrap().unwrap().object_id();
        assert_eq!(shader_and_draw_calls(&core), vec![
            Call::SetPixelShader(None),
            Call::Draw { vertex_count: 4, start_vertex: 0 },
            Call::SetPixelShader(Some(pixel_shader)),
            Call::SetGeometryShader(Some(point_sprite)),
            Call::Draw { vertex_count: 4, start_vertex: 0 },
        ]);
        assert_eq!(core.shadow.pixel_shader, Some(Some(pixel_shader)));
        assert_eq!(core.shadow.geometry_shader, Some(Some(point_sprite)));
    }

    #[test]
    fn test_discarded_captured_points_draw_once() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut program = capturing_point_program();
        let mut state = capturing_state();
        state.rasterizer.rasterizer_discard = true;
        core.device().clear_calls();
        core.draw_arrays(&state, &mut program, PrimitiveMode::Points, 4, 0).unwrap();
        assert_eq!(shader_and_draw_calls(&core), vec![
            Call::SetPixelShader(None),
            Call::Draw { vertex_count: 4, start_vertex: 0 },
        ]);
        assert_eq!(core.shadow.pixel_shader, Some(None));
    }

    fn feedback_buffer(core: &RendererCore<SoftDevice>,
                       resources: &mut ResourceManager<SoftDevice>)
                       -> BufferId {
        let id = resources.create_buffer(1024, true);
        resources.buffer_mut(id)
                 .unwrap()
                 .set_data(core.device(), Some(&[0; 64]), 64, DataUsage::Dynamic)
                 .unwrap();
        id
    }

    fn stream_output_offsets(core: &RendererCore<SoftDevice>) -> Vec<Vec<u32>> {
        core.device().calls().into_iter().filter_map(|call| match call {
            Call::SetStreamOutputTargets { offsets, .. } => Some(offsets),
            _ => None,
        }).collect()
    }

    #[test]
    fn test_unchanged_feedback_targets_keep_appending() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let first = feedback_buffer(&core, &mut resources);
        let second = feedback_buffer(&core, &mut resources);
        let mut state = capturing_state();
        state.transform_feedback.bindings = vec![
            Some(BufferBinding { buffer: first, offset: 16, size: 32 }),
            Some(BufferBinding { buffer: second, offset: 32, size: 32 }),
        ];

        core.apply_transform_feedback_buffers(&mut resources, &state).unwrap();
        assert_eq!(stream_output_offsets(&core), vec![vec![16, 32]]);

        // Nothing changed, so nothing is rebound.
        core.apply_transform_feedback_buffers(&mut resources, &state).unwrap();
        assert_eq!(stream_output_offsets(&core).len(), 1);

        // Only the moved binding restarts at its offset.
        state.transform_feedback.bindings[1] =
            Some(BufferBinding { buffer: second, offset: 0, size: 32 });
        core.apply_transform_feedback_buffers(&mut resources, &state).unwrap();
        assert_eq!(stream_output_offsets(&core),
                   vec![vec![16, 32], vec![APPEND_STREAM_OUTPUT_OFFSET, 0]]);
        let bound = core.device().bound_state().stream_output_targets;
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[1].1, 0);
    }

    fn target_framebuffer(core: &RendererCore<SoftDevice>,
                          resources: &mut ResourceManager<SoftDevice>)
                          -> Framebuffer {
        let texture = resources.create_texture(TextureShape::TwoD, false);
        resources.texture_mut(texture)
                 .unwrap()
                 .set_storage(core.device(), InternalFormat::Rgba8, 1, (4, 4, 1))
                 .unwrap();
        let mut framebuffer = Framebuffer::new();
        framebuffer.set_color_attachment(0, Some(FramebufferAttachment::Texture {
            texture,
            index: ImageIndex::level(0),
        }));
        framebuffer
    }

    fn triangle_state() -> State {
        let corners = [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0];
        let positions: Vec<u8> =
            corners.iter().flat_map(|value| value.to_le_bytes().to_vec()).collect();
        let mut state = State::default();
        state.viewport = tangent_geometry::rect::RectI::from_xywh(0, 0, 4, 4);
        state.vertex_attributes = vec![VertexAttribute {
            enabled: true,
            size: 2,
            attribute_type: AttributeType::Float,
            normalized: false,
            pure_integer: false,
            stride: 0,
            offset: 0,
            divisor: 0,
            data: AttributeData::Client(positions),
        }];
        state
    }

    fn triangle_program() -> Program<SoftDevice> {
        Program::new(ProgramBinary {
            vertex_shader: vec![1],
            pixel_shader: vec![2],
            ..ProgramBinary::default()
        })
    }

    #[test]
    fn test_render_arrays_applies_everything_then_draws() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let mut framebuffer = target_framebuffer(&core, &mut resources);
        let state = triangle_state();
        let mut program = triangle_program();
        core.render_arrays(&mut resources,
                           &mut framebuffer,
                           &state,
                           &mut program,
                           PrimitiveMode::Triangles,
                           0,
                           3,
                           0).unwrap();

        let bound = core.device().bound_state();
        assert!(bound.render_targets.first().map_or(false, |target| target.is_some()));
        assert!(bound.rasterizer_state.is_some());
        assert!(bound.blend_state.is_some());
        assert!(bound.depth_stencil_state.is_some());
        assert_eq!(bound.topology, Some(PrimitiveTopology::TriangleList));
        assert_eq!(bound.input_layout.len(), 1);
        assert!(bound.vertex_buffers.contains_key(&0));
        assert!(bound.vertex_shader.is_some());
        assert!(bound.pixel_shader.is_some());
        assert_eq!(bound.geometry_shader, None);
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::Draw { vertex_count: 3, start_vertex: 0 } => true,
            _ => false,
        }), 1);

        // A repeated draw only re-streams the client vertices.
        core.device().clear_calls();
        core.render_arrays(&mut resources,
                           &mut framebuffer,
                           &state,
                           &mut program,
                           PrimitiveMode::Triangles,
                           0,
                           3,
                           0).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::SetRenderTargets { .. } |
            Call::SetRasterizerState(_) |
            Call::SetBlendState { .. } |
            Call::SetDepthStencilState { .. } |
            Call::SetPrimitiveTopology(_) |
            Call::SetVertexShader(_) |
            Call::SetPixelShader(_) => true,
            _ => false,
        }), 0);
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::Draw { .. } => true,
            _ => false,
        }), 1);
    }

    #[test]
    fn test_render_arrays_skips_sizeless_points() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let mut framebuffer = target_framebuffer(&core, &mut resources);
        let mut program = triangle_program();
        core.device().clear_calls();
        core.render_arrays(&mut resources,
                           &mut framebuffer,
                           &triangle_state(),
                           &mut program,
                           PrimitiveMode::Points,
                           0,
                           3,
                           0).unwrap();
        assert!(core.device().calls().is_empty());
    }

    #[test]
    fn test_render_elements_draws_client_indices() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut resources = ResourceManager::new();
        let mut framebuffer = target_framebuffer(&core, &mut resources);
        let state = triangle_state();
        let mut program = triangle_program();
        let indices: Vec<u8> = [2u16, 1, 0].iter()
                                           .flat_map(|index| index.to_le_bytes().to_vec())
                                           .collect();
        core.device().clear_calls();
        core.render_elements(&mut resources,
                             &mut framebuffer,
                             &state,
                             &mut program,
                             PrimitiveMode::Triangles,
                             3,
                             IndexType::UnsignedShort,
                             Indices::Client(&indices),
                             0).unwrap();
        assert_eq!(drawn_index_counts(&core), vec![(3, 0)]);
        assert!(core.device().bound_state().index_buffer.is_some());
        assert!(core.device().bound_state().pixel_shader.is_some());
    }
}
