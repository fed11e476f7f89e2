// tangent/renderer/src/program.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linked programs: native shader executables, uniform storage, and the register layout the
//! shader translator assigned.

use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use tangent_gpu::desc::{BufferDesc, StreamOutputDecl, Usage};
use tangent_gpu::{BindFlags, CpuAccessFlags, Device, ShaderStage};

/// Bytes in one constant register.
pub const REGISTER_SIZE: usize = 16;

static NEXT_PROGRAM_SERIAL: AtomicU64 = AtomicU64::new(1);

/// One default-block uniform. Each array element or matrix row occupies its own register,
/// of which the first `components` are used.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformInfo {
    pub name: String,
    pub components: u32,
    pub register_count: u32,
    pub vs_register: Option<u32>,
    pub ps_register: Option<u32>,
}

/// A uniform block and the constant buffer registers each stage reads it from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformBlockInfo {
    /// Index into the indexed uniform buffer bindings.
    pub binding: u32,
    pub vs_register: Option<u32>,
    pub ps_register: Option<u32>,
}

/// The output of shader translation and linking.
#[derive(Clone, Debug, Default)]
pub struct ProgramBinary {
    pub vertex_shader: Vec<u8>,
    pub pixel_shader: Vec<u8>,
    /// Expands each point into a screen-aligned quad.
    pub point_sprite_shader: Option<Vec<u8>>,
    /// Passes vertices through to the stream output stage.
    pub stream_output_shader: Option<Vec<u8>>,
    pub stream_output: Vec<StreamOutputDecl>,
    pub uniforms: Vec<UniformInfo>,
    pub uniform_blocks: Vec<UniformBlockInfo>,
    /// Texture unit read by each vertex shader sampler slot.
    pub vertex_samplers: Vec<Option<u32>>,
    /// Texture unit read by each pixel shader sampler slot.
    pub pixel_samplers: Vec<Option<u32>>,
    pub uses_point_size: bool,
}

struct UniformStorage {
    data: Vec<u8>,
    dirty: bool,
}

pub struct Program<D> where D: Device {
    binary: ProgramBinary,
    serial: u64,
    uniforms: Vec<UniformStorage>,
    vertex_executable: Option<D::VertexShader>,
    pixel_executable: Option<D::PixelShader>,
    point_sprite_executable: Option<D::GeometryShader>,
    stream_output_executable: Option<D::GeometryShader>,
    vertex_constants: Option<D::Buffer>,
    pixel_constants: Option<D::Buffer>,
}

impl<D> Program<D> where D: Device {
    pub fn new(binary: ProgramBinary) -> Program<D> {
        let uniforms = binary.uniforms.iter().map(|uniform| {
            UniformStorage {
                data: vec![0; uniform.register_count as usize * REGISTER_SIZE],
                dirty: true,
            }
        }).collect();
        Program {
            binary,
            serial: NEXT_PROGRAM_SERIAL.fetch_add(1, Ordering::Relaxed),
            uniforms,
            vertex_executable: None,
            pixel_executable: None,
            point_sprite_executable: None,
            stream_output_executable: None,
            vertex_constants: None,
            pixel_constants: None,
        }
    }

    #[inline]
    pub fn binary(&self) -> &ProgramBinary {
        &self.binary
    }

    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[inline]
    pub fn uses_point_size(&self) -> bool {
        self.binary.uses_point_size
    }

    pub fn uniform_location(&self, name: &str) -> Option<usize> {
        self.binary.uniforms.iter().position(|uniform| uniform.name == name)
    }

    /// Stores float components, `components` per register. Returns false for a bad location.
    pub fn set_uniform_f32(&mut self, location: usize, values: &[f32]) -> bool {
        self.set_uniform_words(location, values.iter().map(|value| value.to_bits()))
    }

    pub fn set_uniform_i32(&mut self, location: usize, values: &[i32]) -> bool {
        self.set_uniform_words(location, values.iter().map(|&value| value as u32))
    }

    pub fn set_uniform_u32(&mut self, location: usize, values: &[u32]) -> bool {
        self.set_uniform_words(location, values.iter().cloned())
    }

    fn set_uniform_words<I>(&mut self, location: usize, words: I) -> bool
                            where I: Iterator<Item = u32> {
        let (info, storage) = match (self.binary.uniforms.get(location),
                                     self.uniforms.get_mut(location)) {
            (Some(info), Some(storage)) => (info, storage),
            _ => return false,
        };
        let components = info.components.max(1).min(4) as usize;
        let capacity = components * info.register_count as usize;
        for (index, word) in words.take(capacity).enumerate() {
            let offset = (index / components) * REGISTER_SIZE + (index % components) * 4;
            storage.data[offset..(offset + 4)].copy_from_slice(&word.to_le_bytes());
        }
        storage.dirty = true;
        true
    }

    /// Forces every uniform to be uploaded on the next apply.
    pub fn dirty_all_uniforms(&mut self) {
        for uniform in &mut self.uniforms {
            uniform.dirty = true;
        }
    }

    pub fn clear_dirty_uniforms(&mut self) {
        for uniform in &mut self.uniforms {
            uniform.dirty = false;
        }
    }

    /// Registers occupied in `stage`'s default uniform block.
    pub fn register_count(&self, stage: ShaderStage) -> u32 {
        self.binary.uniforms.iter().filter_map(|info| {
            stage_register(info, stage).map(|register| register + info.register_count)
        }).max().unwrap_or(0)
    }

    /// Whether any uniform `stage` reads changed since the last upload.
    pub fn stage_uniforms_dirty(&self, stage: ShaderStage) -> bool {
        self.binary.uniforms.iter().zip(self.uniforms.iter()).any(|(info, storage)| {
            storage.dirty && stage_register(info, stage).is_some()
        })
    }

    /// The contents of `stage`'s default uniform block.
    pub fn pack_uniforms(&self, stage: ShaderStage) -> Vec<u8> {
        let mut data = vec![0; self.register_count(stage) as usize * REGISTER_SIZE];
        for (info, storage) in self.binary.uniforms.iter().zip(self.uniforms.iter()) {
            if let Some(register) = stage_register(info, stage) {
                let offset = register as usize * REGISTER_SIZE;
                data[offset..(offset + storage.data.len())].copy_from_slice(&storage.data);
            }
        }
        data
    }

    /// The constant buffer backing `stage`'s default uniform block, created on first use.
    pub fn uniform_storage(&mut self, device: &D, stage: ShaderStage) -> Result<D::Buffer> {
        let byte_width = (self.register_count(stage) as usize * REGISTER_SIZE).max(REGISTER_SIZE);
        let slot = match stage {
            ShaderStage::Pixel => &mut self.pixel_constants,
            ShaderStage::Vertex | ShaderStage::Geometry => &mut self.vertex_constants,
        };
        if let Some(ref buffer) = *slot {
            return Ok(buffer.clone());
        }
        let buffer = device.create_buffer(&BufferDesc {
            byte_width,
            usage: Usage::Dynamic,
            bind_flags: BindFlags::CONSTANT_BUFFER,
            cpu_access: CpuAccessFlags::WRITE,
        }, None)?;
        *slot = Some(buffer.clone());
        Ok(buffer)
    }

    pub fn vertex_executable(&mut self, device: &D) -> Result<D::VertexShader> {
        if let Some(ref shader) = self.vertex_executable {
            return Ok(shader.clone());
        }
        let shader = device.create_vertex_shader(&self.binary.vertex_shader)?;
        debug!("created vertex executable for program {}", self.serial);
        self.vertex_executable = Some(shader.clone());
        Ok(shader)
    }

    pub fn pixel_executable(&mut self, device: &D) -> Result<D::PixelShader> {
        if let Some(ref shader) = self.pixel_executable {
            return Ok(shader.clone());
        }
        let shader = device.create_pixel_shader(&self.binary.pixel_shader)?;
        debug!("created pixel executable for program {}", self.serial);
        self.pixel_executable = Some(shader.clone());
        Ok(shader)
    }

    /// The point sprite expansion shader, if the program has one.
    pub fn point_sprite_executable(&mut self, device: &D) -> Result<Option<D::GeometryShader>> {
        if self.point_sprite_executable.is_none() {
            if let Some(ref bytecode) = self.binary.point_sprite_shader {
                self.point_sprite_executable = Some(device.create_geometry_shader(bytecode)?);
            }
        }
        Ok(self.point_sprite_executable.clone())
    }

    /// The stream output shader, if the program captures any varyings.
    pub fn stream_output_executable(&mut self, device: &D) -> Result<Option<D::GeometryShader>> {
        if self.stream_output_executable.is_none() && !self.binary.stream_output.is_empty() {
            if let Some(ref bytecode) = self.binary.stream_output_shader {
                let shader = device.create_geometry_shader_with_stream_output(
                    bytecode,
                    &self.binary.stream_output)?;
                self.stream_output_executable = Some(shader);
            }
        }
        Ok(self.stream_output_executable.clone())
    }

    /// The texture unit each sampler slot of `stage` reads.
    pub fn samplers(&self, stage: ShaderStage) -> &[Option<u32>] {
        match stage {
            ShaderStage::Vertex => &self.binary.vertex_samplers,
            ShaderStage::Pixel => &self.binary.pixel_samplers,
            ShaderStage::Geometry => &[],
        }
    }

    #[inline]
    pub fn uniform_blocks(&self) -> &[UniformBlockInfo] {
        &self.binary.uniform_blocks
    }
}

fn stage_register(info: &UniformInfo, stage: ShaderStage) -> Option<u32> {
    match stage {
        ShaderStage::Vertex => info.vs_register,
        ShaderStage::Pixel => info.ps_register,
        ShaderStage::Geometry => None,
    }
}
