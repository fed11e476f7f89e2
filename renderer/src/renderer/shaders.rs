// tangent/renderer/src/renderer/shaders.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shader executables, uniform storage, uniform buffers, and driver constants.

use crate::buffer::BufferUsage;
use crate::error::{Error, Result};
use crate::gl::{PrimitiveMode, State};
use crate::options::RESERVED_UNIFORM_BUFFERS;
use crate::program::Program;
use crate::resources::ResourceManager;
use super::shadow::ConstantBufferBinding;
use super::RendererCore;
use tangent_geometry::round_up;
use tangent_gpu::desc::{BufferDesc, Usage};
use tangent_gpu::{BindFlags, CpuAccessFlags, Device, NativeObject, ShaderStage};

/// Slot of the default uniform block in each stage.
const UNIFORM_STORAGE_SLOT: u32 = 0;
/// Slot of the driver constants in each stage.
const DRIVER_CONSTANTS_SLOT: u32 = 1;

const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;
const CONSTANT_SIZE: usize = 16;

/// Driver constants the vertex shaders read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct VertexConstants {
    /// Near, far, and far minus near.
    pub(crate) depth_range: [f32; 4],
    /// Undoes viewport clamping on level 9 devices.
    pub(crate) view_adjust: [f32; 4],
    pub(crate) view_coords: [f32; 4],
}

/// Driver constants the pixel shaders read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PixelConstants {
    pub(crate) depth_range: [f32; 4],
    pub(crate) view_coords: [f32; 4],
    pub(crate) depth_front: [f32; 4],
}

impl VertexConstants {
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        float_bytes(&[self.depth_range, self.view_adjust, self.view_coords])
    }
}

impl PixelConstants {
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        float_bytes(&[self.depth_range, self.view_coords, self.depth_front])
    }
}

fn float_bytes(vectors: &[[f32; 4]]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vectors.len() * CONSTANT_SIZE);
    for value in vectors.iter().flat_map(|vector| vector.iter()) {
        bytes.extend_from_slice(&value.to_bits().to_le_bytes());
    }
    bytes
}

/// Converts a uniform buffer binding range to the first constant and constant count of a
/// ranged constant buffer binding. Both are in 16-byte constants, and the count is rounded up
/// to a multiple of 16 constants.
pub fn constant_buffer_range(offset: usize, size: usize) -> (u32, u32) {
    debug_assert_eq!(offset as u64 % CONSTANT_BUFFER_ALIGNMENT, 0);
    let first = offset / CONSTANT_SIZE;
    let count = round_up(size as u64, CONSTANT_BUFFER_ALIGNMENT) as usize / CONSTANT_SIZE;
    (first as u32, count as u32)
}

impl<D> RendererCore<D> where D: Device {
    /// Binds the program's executables for the current state and a draw in `mode`. Any change
    /// dirties all of the program's uniforms, since the new shaders have not seen them.
    pub fn apply_shaders(&mut self,
                         program: &mut Program<D>,
                         state: &State,
                         mode: PrimitiveMode)
                         -> Result<()> {
        let vertex_shader = program.vertex_executable(&self.device)?;
        let pixel_shader = if state.rasterizer.rasterizer_discard {
            None
        } else {
            Some(program.pixel_executable(&self.device)?)
        };
        // Instanced emulation expands points in the vertex shader instead.
        let uses_point_size = program.uses_point_size();
        let point_sprites = mode == PrimitiveMode::Points && uses_point_size &&
            !self.point_sprite_emulation(mode, uses_point_size);
        let geometry_shader = if state.transform_feedback.is_active_unpaused() {
            program.stream_output_executable(&self.device)?
        } else if point_sprites {
            program.point_sprite_executable(&self.device)?
        } else {
            None
        };

        let mut changed = false;
        let vertex_id = Some(vertex_shader.object_id());
        if self.shadow.vertex_shader != Some(vertex_id) {
            self.device.set_vertex_shader(Some(&vertex_shader));
            self.shadow.vertex_shader = Some(vertex_id);
            changed = true;
        }
        let geometry_id = geometry_shader.as_ref().map(|shader| shader.object_id());
        if self.shadow.geometry_shader != Some(geometry_id) {
            self.device.set_geometry_shader(geometry_shader.as_ref());
            self.shadow.geometry_shader = Some(geometry_id);
            changed = true;
        }
        let pixel_id = pixel_shader.as_ref().map(|shader| shader.object_id());
        if self.shadow.pixel_shader != Some(pixel_id) {
            self.device.set_pixel_shader(pixel_shader.as_ref());
            self.shadow.pixel_shader = Some(pixel_id);
            changed = true;
        }

        if changed {
            self.stats.state_change_count += 1;
            program.dirty_all_uniforms();
        } else {
            self.stats.redundant_state_count += 1;
        }
        Ok(())
    }

    /// Uploads dirty default-block uniforms and the driver constants, and binds both.
    pub fn apply_uniforms(&mut self, program: &mut Program<D>) -> Result<()> {
        for &stage in &[ShaderStage::Vertex, ShaderStage::Pixel] {
            let storage = program.uniform_storage(&self.device, stage)?;
            if program.register_count(stage) > 0 && program.stage_uniforms_dirty(stage) {
                let data = program.pack_uniforms(stage);
                self.device.update_buffer(&storage, 0, &data);
            }
            self.bind_constant_buffer(stage, UNIFORM_STORAGE_SLOT, &storage, 0, 0);
        }
        program.clear_dirty_uniforms();

        let vertex_buffer = self.driver_constant_buffer(ShaderStage::Vertex)?;
        let pixel_buffer = self.driver_constant_buffer(ShaderStage::Pixel)?;
        self.bind_constant_buffer(ShaderStage::Vertex, DRIVER_CONSTANTS_SLOT, &vertex_buffer, 0, 0);
        self.bind_constant_buffer(ShaderStage::Pixel, DRIVER_CONSTANTS_SLOT, &pixel_buffer, 0, 0);

        let vertex_bytes = self.vertex_constants.to_bytes();
        if self.shadow.vertex_constants.as_ref() != Some(&vertex_bytes) {
            self.device.update_buffer(&vertex_buffer, 0, &vertex_bytes);
            self.shadow.vertex_constants = Some(vertex_bytes);
        }
        let pixel_bytes = self.pixel_constants.to_bytes();
        if self.shadow.pixel_constants.as_ref() != Some(&pixel_bytes) {
            self.device.update_buffer(&pixel_buffer, 0, &pixel_bytes);
            self.shadow.pixel_constants = Some(pixel_bytes);
        }

        // The point sprite geometry shader expands points using the pixel driver constants.
        if let Some(Some(_)) = self.shadow.geometry_shader {
            self.bind_constant_buffer(ShaderStage::Geometry, 0, &pixel_buffer, 0, 0);
        }
        Ok(())
    }

    fn driver_constant_buffer(&mut self, stage: ShaderStage) -> Result<D::Buffer> {
        let (slot, size) = match stage {
            ShaderStage::Vertex => {
                (&mut self.vertex_driver_constants, VertexConstants::default().to_bytes().len())
            }
            _ => (&mut self.pixel_driver_constants, PixelConstants::default().to_bytes().len()),
        };
        if let Some(ref buffer) = *slot {
            return Ok(buffer.clone());
        }

        let desc = BufferDesc {
            byte_width: size,
            usage: Usage::Default,
            bind_flags: BindFlags::CONSTANT_BUFFER,
            cpu_access: CpuAccessFlags::empty(),
        };
        let buffer = self.device.create_buffer(&desc, None)?;
        *slot = Some(buffer.clone());
        Ok(buffer)
    }

    /// Binds the buffers behind the program's uniform blocks. Block slots start after the
    /// reserved default-block and driver-constant slots.
    pub fn set_uniform_buffers(&mut self,
                               resources: &mut ResourceManager<D>,
                               program: &Program<D>,
                               state: &State)
                               -> Result<()> {
        for block in program.uniform_blocks() {
            let binding = match state.uniform_buffers.get(block.binding as usize) {
                Some(&Some(binding)) => binding,
                _ => continue,
            };
            let buffer = resources.buffer_mut(binding.buffer).ok_or_else(|| {
                Error::Unsupported(format!("uniform block bound to missing {:?}", binding.buffer))
            })?;
            let native = buffer.get_buffer(&self.device, BufferUsage::Uniform)?;

            let registers = [(ShaderStage::Vertex, block.vs_register),
                             (ShaderStage::Pixel, block.ps_register)];
            for &(stage, register) in &registers {
                if let Some(register) = register {
                    self.bind_constant_buffer(stage,
                                              RESERVED_UNIFORM_BUFFERS + register,
                                              &native,
                                              binding.offset,
                                              binding.size);
                }
            }
        }
        Ok(())
    }

    fn bind_constant_buffer(&mut self,
                            stage: ShaderStage,
                            slot: u32,
                            buffer: &D::Buffer,
                            offset: usize,
                            size: usize) {
        let applied = ConstantBufferBinding { buffer: buffer.object_id(), offset, size };
        if self.shadow.constant_buffers.get(&(stage, slot)) == Some(&applied) {
            self.stats.redundant_state_count += 1;
            return;
        }

        if size != 0 && self.device.supports_constant_buffer_offsets() {
            let (first, count) = constant_buffer_range(offset, size);
            self.device.set_constant_buffer_range(stage, slot, buffer, first, count);
        } else {
            debug_assert_eq!(offset, 0);
            self.device.set_constant_buffer(stage, slot, Some(buffer));
        }
        self.shadow.constant_buffers.insert((stage, slot), applied);
        self.stats.state_change_count += 1;
    }
}

#[cfg(test)]
mod test {
    use super::{constant_buffer_range, PixelConstants};
    use crate::gl::{PrimitiveMode, State};
    use crate::program::{Program, ProgramBinary, UniformInfo};
    use crate::renderer::test::soft_core;
    use crate::renderer::RendererCore;
    use tangent_gpu::{FeatureLevel, NativeObject, ShaderStage};
    use tangent_soft::{Call, SoftDevice};

    #[test]
    fn test_constant_buffer_range() {
        assert_eq!(constant_buffer_range(256, 10), (16, 16));
        assert_eq!(constant_buffer_range(0, 300), (0, 32));
        assert_eq!(constant_buffer_range(512, 256), (32, 16));
    }

    #[test]
    fn test_constants_serialize_as_little_endian_floats() {
        let constants = PixelConstants { depth_front: [0.5, 0.0, 0.0, 0.0], ..Default::default() };
        let bytes = constants.to_bytes();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[32..36], &0.5f32.to_le_bytes());
    }

    fn binary() -> ProgramBinary {
        ProgramBinary {
            vertex_shader: vec![1, 2, 3],
            pixel_shader: vec![4, 5, 6],
            uniforms: vec![UniformInfo {
                name: "offset".to_owned(),
                components: 4,
                register_count: 1,
                vs_register: Some(0),
                ps_register: None,
            }],
            ..ProgramBinary::default()
        }
    }

    #[test]
    fn test_driver_constants_upload_only_on_change() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut program = Program::new(binary());
        core.apply_uniforms(&mut program).unwrap();
        core.device().clear_calls();
        core.apply_uniforms(&mut program).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::UpdateBuffer { .. } | Call::SetConstantBuffer { .. } => true,
            _ => false,
        }), 0);

        core.set_viewport(tangent_geometry::rect::RectI::from_xywh(0, 0, 8, 8), 0.0, 1.0, false);
        core.apply_uniforms(&mut program).unwrap();
        assert_eq!(core.device().count_calls(|call| match *call {
            Call::UpdateBuffer { .. } => true,
            _ => false,
        }), 2);
    }

    #[test]
    fn test_shader_change_dirties_uniforms() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        let mut program = Program::new(binary());
        let state = State::default();
        core.apply_shaders(&mut program, &state, PrimitiveMode::Triangles).unwrap();
        program.clear_dirty_uniforms();
        core.apply_shaders(&mut program, &state, PrimitiveMode::Triangles).unwrap();
        assert!(!program.stage_uniforms_dirty(ShaderStage::Vertex));
        core.mark_all_state_dirty();
        core.apply_shaders(&mut program, &state, PrimitiveMode::Triangles).unwrap();
        assert!(program.stage_uniforms_dirty(ShaderStage::Vertex));
    }

    #[test]
    fn test_point_draws_bind_the_point_sprite_shader() {
        let mut core = soft_core(FeatureLevel::Level11_0);
        core.workarounds.use_instanced_point_sprite_emulation = false;
        let mut program = Program::new(ProgramBinary {
            point_sprite_shader: Some(vec![7, 8, 9]),
            uses_point_size: true,
            ..binary()
        });
        let state = State::default();
        let geometry_shader = |core: &RendererCore<SoftDevice>| {
            core.device().bound_state().geometry_shader
        };

        // Nothing has been rasterized yet, so the draw mode alone picks the shader.
        core.mark_all_state_dirty();
        core.apply_shaders(&mut program, &state, PrimitiveMode::Points).unwrap();
        let point_sprite = program.point_sprite_executable(core.device()).unwrap().unwrap();
        assert_eq!(geometry_shader(&core), Some(point_sprite.object_id()));

        core.apply_shaders(&mut program, &state, PrimitiveMode::Triangles).unwrap();
        assert_eq!(geometry_shader(&core), None);

        core.workarounds.use_instanced_point_sprite_emulation = true;
        core.apply_shaders(&mut program, &state, PrimitiveMode::Points).unwrap();
        assert_eq!(geometry_shader(&core), None);
    }
}
