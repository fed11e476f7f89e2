// tangent/renderer/src/vertex_data.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Translates vertex attribute arrays into native vertex buffer bindings.
//!
//! Attributes whose format the input assembler reads natively, and whose static buffer is
//! suitably aligned, bind that buffer directly. Everything else (client arrays, dynamic
//! buffers, unaligned layouts, formats the hardware lacks, and the current values of disabled
//! arrays) is converted and streamed through a scratch vertex buffer.

use crate::buffer::BufferUsage;
use crate::error::{Error, Result};
use crate::gl::{AttributeData, AttributeType, VertexAttribute};
use crate::resources::ResourceManager;
use crate::streaming_buffer::{StreamingBuffer, INITIAL_VERTEX_BUFFER_SIZE};
use half::f16;
use tangent_gpu::desc::InputElementDesc;
use tangent_gpu::format::NativeFormat;
use tangent_gpu::{BindFlags, Device};

const DEFAULT_CURRENT_VALUE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// One attribute, ready to bind to the input slot of the same index.
pub struct TranslatedAttribute<D> where D: Device {
    pub buffer: D::Buffer,
    pub format: NativeFormat,
    pub stride: u32,
    pub offset: u32,
    pub divisor: u32,
    /// Set when the attribute's own buffer is bound rather than a streamed copy.
    pub direct: bool,
}

impl<D> Clone for TranslatedAttribute<D> where D: Device {
    fn clone(&self) -> TranslatedAttribute<D> {
        TranslatedAttribute {
            buffer: self.buffer.clone(),
            format: self.format,
            stride: self.stride,
            offset: self.offset,
            divisor: self.divisor,
            direct: self.direct,
        }
    }
}

impl<D> TranslatedAttribute<D> where D: Device {
    pub fn input_element(&self, slot: u32) -> InputElementDesc {
        InputElementDesc {
            semantic_index: slot,
            format: self.format,
            input_slot: slot,
            aligned_byte_offset: 0,
            instance_data_step_rate: self.divisor,
        }
    }
}

/// The native format the input assembler can read `attribute` as, if there is one.
pub fn native_vertex_format(attribute: &VertexAttribute) -> Option<NativeFormat> {
    use tangent_gpu::format::NativeFormat as N;
    let (integer, normalized) = (attribute.pure_integer, attribute.normalized);
    let format = match (attribute.attribute_type, attribute.size) {
        (AttributeType::Float, 1) => N::R32Float,
        (AttributeType::Float, 2) => N::R32G32Float,
        (AttributeType::Float, 4) => N::R32G32B32A32Float,
        (AttributeType::HalfFloat, 1) => N::R16Float,
        (AttributeType::HalfFloat, 2) => N::R16G16Float,
        (AttributeType::HalfFloat, 4) => N::R16G16B16A16Float,
        (AttributeType::UnsignedByte, 1) if integer => N::R8Uint,
        (AttributeType::UnsignedByte, 2) if integer => N::R8G8Uint,
        (AttributeType::UnsignedByte, 4) if integer => N::R8G8B8A8Uint,
        (AttributeType::UnsignedByte, 1) if normalized => N::R8Unorm,
        (AttributeType::UnsignedByte, 2) if normalized => N::R8G8Unorm,
        (AttributeType::UnsignedByte, 4) if normalized => N::R8G8B8A8Unorm,
        (AttributeType::Byte, 1) if integer => N::R8Sint,
        (AttributeType::Byte, 2) if integer => N::R8G8Sint,
        (AttributeType::Byte, 4) if integer => N::R8G8B8A8Sint,
        (AttributeType::Byte, 1) if normalized => N::R8Snorm,
        (AttributeType::Byte, 2) if normalized => N::R8G8Snorm,
        (AttributeType::Byte, 4) if normalized => N::R8G8B8A8Snorm,
        (AttributeType::UnsignedShort, 1) if integer => N::R16Uint,
        (AttributeType::UnsignedShort, 2) if integer => N::R16G16Uint,
        (AttributeType::UnsignedShort, 4) if integer => N::R16G16B16A16Uint,
        (AttributeType::UnsignedShort, 1) if normalized => N::R16Unorm,
        (AttributeType::UnsignedShort, 4) if normalized => N::R16G16B16A16Unorm,
        (AttributeType::Short, 1) if integer => N::R16Sint,
        (AttributeType::Short, 2) if integer => N::R16G16Sint,
        (AttributeType::Short, 4) if integer => N::R16G16B16A16Sint,
        (AttributeType::UnsignedInt, 1) if integer => N::R32Uint,
        (AttributeType::UnsignedInt, 2) if integer => N::R32G32Uint,
        (AttributeType::UnsignedInt, 4) if integer => N::R32G32B32A32Uint,
        (AttributeType::Int, 1) if integer => N::R32Sint,
        (AttributeType::Int, 2) if integer => N::R32G32Sint,
        (AttributeType::Int, 4) if integer => N::R32G32B32A32Sint,
        _ => return None,
    };
    Some(format)
}

// The four-component format converted attributes are written in.
fn converted_format(attribute: &VertexAttribute) -> NativeFormat {
    if !attribute.pure_integer {
        return NativeFormat::R32G32B32A32Float;
    }
    match attribute.attribute_type {
        AttributeType::UnsignedByte |
        AttributeType::UnsignedShort |
        AttributeType::UnsignedInt => NativeFormat::R32G32B32A32Uint,
        _ => NativeFormat::R32G32B32A32Sint,
    }
}

const CONVERTED_STRIDE: usize = 16;

/// How many elements of an attribute a draw reads.
fn element_count(attribute: &VertexAttribute, count: u32, instances: u32) -> u32 {
    if attribute.divisor == 0 {
        count
    } else {
        let instances = instances.max(1);
        (instances + attribute.divisor - 1) / attribute.divisor
    }
}

enum Plan {
    Direct { offset: usize },
    Stream { size: usize },
    CurrentValue,
}

pub struct VertexDataManager<D> where D: Device {
    stream: StreamingBuffer<D>,
}

impl<D> VertexDataManager<D> where D: Device {
    pub fn new() -> VertexDataManager<D> {
        VertexDataManager { stream: StreamingBuffer::new(BindFlags::VERTEX_BUFFER) }
    }

    /// Translates every attribute for a draw of `count` vertices starting at `start`, with
    /// `instances` instances (zero for a non-instanced draw).
    pub fn prepare_vertex_data(&mut self,
                               device: &D,
                               resources: &mut ResourceManager<D>,
                               attributes: &[VertexAttribute],
                               current_values: &[[f32; 4]],
                               start: u32,
                               count: u32,
                               instances: u32)
                               -> Result<Vec<TranslatedAttribute<D>>> {
        // Plan every attribute first so the scratch buffer is reserved once and a wrap can't
        // overwrite data streamed earlier in the same draw.
        let mut plans = Vec::with_capacity(attributes.len());
        let mut stream_size = 0;
        for attribute in attributes {
            let plan = plan_attribute(resources, attribute, start, count, instances)?;
            stream_size += match plan {
                Plan::Direct { .. } => 0,
                Plan::Stream { size } => size,
                Plan::CurrentValue => CONVERTED_STRIDE,
            };
            plans.push(plan);
        }
        if stream_size > 0 {
            if self.stream.buffer().is_none() {
                self.stream.reserve(device, stream_size.max(INITIAL_VERTEX_BUFFER_SIZE))?;
            }
            self.stream.reserve(device, stream_size)?;
        }

        let mut translated = Vec::with_capacity(attributes.len());
        for (index, (attribute, plan)) in attributes.iter().zip(plans.into_iter()).enumerate() {
            translated.push(match plan {
                Plan::Direct { offset } => {
                    let id = match attribute.data {
                        AttributeData::Buffer(id) => id,
                        AttributeData::Client(_) => unreachable!(),
                    };
                    let buffer = resources.buffer_mut(id).ok_or_else(missing_buffer)?;
                    let native =
                        buffer.get_buffer(device, BufferUsage::VertexOrTransformFeedback)?;
                    let format = match native_vertex_format(attribute) {
                        Some(format) => format,
                        None => unreachable!(),
                    };
                    TranslatedAttribute {
                        buffer: native,
                        format,
                        stride: attribute.effective_stride() as u32,
                        offset: offset as u32,
                        divisor: attribute.divisor,
                        direct: true,
                    }
                }
                Plan::Stream { .. } => {
                    let elements = element_count(attribute, count, instances) as usize;
                    let first = if attribute.divisor == 0 { start as usize } else { 0 };
                    let converted = {
                        let source = attribute_source(device, resources, attribute)?;
                        convert_attribute(attribute, source, first, elements)?
                    };
                    let (buffer, offset) = self.stream.write(device, &converted)?;
                    TranslatedAttribute {
                        buffer,
                        format: converted_format(attribute),
                        stride: CONVERTED_STRIDE as u32,
                        offset: offset as u32,
                        divisor: attribute.divisor,
                        direct: false,
                    }
                }
                Plan::CurrentValue => {
                    let value =
                        current_values.get(index).cloned().unwrap_or(DEFAULT_CURRENT_VALUE);
                    let mut bytes = Vec::with_capacity(CONVERTED_STRIDE);
                    for component in &value {
                        bytes.extend_from_slice(&component.to_le_bytes());
                    }
                    let (buffer, offset) = self.stream.write(device, &bytes)?;
                    TranslatedAttribute {
                        buffer,
                        format: NativeFormat::R32G32B32A32Float,
                        stride: 0,
                        offset: offset as u32,
                        divisor: 0,
                        direct: false,
                    }
                }
            });
        }
        Ok(translated)
    }
}

fn plan_attribute<D>(resources: &mut ResourceManager<D>,
                     attribute: &VertexAttribute,
                     start: u32,
                     count: u32,
                     instances: u32)
                     -> Result<Plan>
                     where D: Device {
    if !attribute.enabled {
        return Ok(Plan::CurrentValue);
    }
    let elements = element_count(attribute, count, instances) as usize;
    let stream = Plan::Stream { size: elements * CONVERTED_STRIDE };
    let id = match attribute.data {
        AttributeData::Client(_) => return Ok(stream),
        AttributeData::Buffer(id) => id,
    };
    let buffer = resources.buffer_mut(id).ok_or_else(missing_buffer)?;
    let stride = attribute.effective_stride();
    let aligned = attribute.offset % 4 == 0 && stride % 4 == 0;
    if !buffer.supports_direct_binding() || !aligned || native_vertex_format(attribute).is_none() {
        return Ok(stream);
    }
    // Per-vertex data is bound from the first vertex drawn; instanced data from the start.
    let first = if attribute.divisor == 0 { start as usize } else { 0 };
    Ok(Plan::Direct { offset: attribute.offset + first * stride })
}

fn missing_buffer() -> Error {
    Error::Unsupported("vertex attribute refers to a deleted buffer".to_owned())
}

fn attribute_source<'a, D>(device: &D,
                           resources: &'a mut ResourceManager<D>,
                           attribute: &'a VertexAttribute)
                           -> Result<&'a [u8]>
                           where D: Device {
    match attribute.data {
        AttributeData::Client(ref data) => Ok(data),
        AttributeData::Buffer(id) => {
            let buffer = resources.buffer_mut(id).ok_or_else(missing_buffer)?;
            buffer.get_data(device)
        }
    }
}

/// Expands `elements` elements, starting at element `first`, to four 32-bit components each.
/// Missing components read as (0, 0, 0, 1).
pub fn convert_attribute(attribute: &VertexAttribute,
                         source: &[u8],
                         first: usize,
                         elements: usize)
                         -> Result<Vec<u8>> {
    let stride = attribute.effective_stride();
    let component_bytes = attribute.attribute_type.bytes();
    let size = attribute.size as usize;
    let mut output = Vec::with_capacity(elements * CONVERTED_STRIDE);

    for element in 0..elements {
        let start = attribute.offset + (first + element) * stride;
        let end = start + attribute.element_size();
        let data = source.get(start..end).ok_or_else(|| {
            Error::Unsupported("vertex attribute reads past the end of its data".to_owned())
        })?;
        for component in 0..4 {
            let bytes = if component < size {
                let raw = &data[(component * component_bytes)..((component + 1) *
                                                                  component_bytes)];
                if attribute.pure_integer {
                    read_integer(attribute.attribute_type, raw).to_le_bytes()
                } else {
                    read_float(attribute.attribute_type, attribute.normalized, raw).to_le_bytes()
                }
            } else if attribute.pure_integer {
                (if component == 3 { 1u32 } else { 0 }).to_le_bytes()
            } else {
                (if component == 3 { 1.0f32 } else { 0.0 }).to_le_bytes()
            };
            output.extend_from_slice(&bytes);
        }
    }
    Ok(output)
}

fn read_float(attribute_type: AttributeType, normalized: bool, raw: &[u8]) -> f32 {
    match attribute_type {
        AttributeType::Byte => {
            let value = raw[0] as i8 as f32;
            if normalized { (value / 127.0).max(-1.0) } else { value }
        }
        AttributeType::UnsignedByte => {
            let value = raw[0] as f32;
            if normalized { value / 255.0 } else { value }
        }
        AttributeType::Short => {
            let value = i16::from_le_bytes([raw[0], raw[1]]) as f32;
            if normalized { (value / 32767.0).max(-1.0) } else { value }
        }
        AttributeType::UnsignedShort => {
            let value = u16::from_le_bytes([raw[0], raw[1]]) as f32;
            if normalized { value / 65535.0 } else { value }
        }
        AttributeType::Int => {
            let value = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64;
            (if normalized { (value / 2147483647.0).max(-1.0) } else { value }) as f32
        }
        AttributeType::UnsignedInt => {
            let value = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64;
            (if normalized { value / 4294967295.0 } else { value }) as f32
        }
        AttributeType::Float => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        AttributeType::HalfFloat => f16::from_bits(u16::from_le_bytes([raw[0], raw[1]])).to_f32(),
        AttributeType::Fixed => {
            i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32 / 65536.0
        }
    }
}

fn read_integer(attribute_type: AttributeType, raw: &[u8]) -> u32 {
    match attribute_type {
        AttributeType::Byte => raw[0] as i8 as i32 as u32,
        AttributeType::UnsignedByte => raw[0] as u32,
        AttributeType::Short => i16::from_le_bytes([raw[0], raw[1]]) as i32 as u32,
        AttributeType::UnsignedShort => u16::from_le_bytes([raw[0], raw[1]]) as u32,
        AttributeType::Int |
        AttributeType::UnsignedInt |
        AttributeType::Fixed |
        AttributeType::Float => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        AttributeType::HalfFloat => {
            f16::from_bits(u16::from_le_bytes([raw[0], raw[1]])).to_f32() as i32 as u32
        }
    }
}

#[cfg(test)]
mod test {
    use super::{convert_attribute, native_vertex_format, VertexDataManager};
    use crate::buffer::DataUsage;
    use crate::gl::{AttributeData, AttributeType, VertexAttribute};
    use crate::resources::ResourceManager;
    use tangent_gpu::format::NativeFormat;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    fn attribute(attribute_type: AttributeType, size: u32, data: AttributeData)
                 -> VertexAttribute {
        VertexAttribute {
            enabled: true,
            size,
            attribute_type,
            normalized: false,
            pure_integer: false,
            stride: 0,
            offset: 0,
            divisor: 0,
            data,
        }
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes().to_vec()).collect()
    }

    fn read_floats(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks(4).map(|chunk| {
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        }).collect()
    }

    #[test]
    fn test_native_formats() {
        let float2 = attribute(AttributeType::Float, 2, AttributeData::Client(vec![]));
        assert_eq!(native_vertex_format(&float2), Some(NativeFormat::R32G32Float));
        let float3 = attribute(AttributeType::Float, 3, AttributeData::Client(vec![]));
        assert_eq!(native_vertex_format(&float3), None);
        let fixed = attribute(AttributeType::Fixed, 4, AttributeData::Client(vec![]));
        assert_eq!(native_vertex_format(&fixed), None);
        let mut bytes = attribute(AttributeType::UnsignedByte, 4, AttributeData::Client(vec![]));
        assert_eq!(native_vertex_format(&bytes), None);
        bytes.normalized = true;
        assert_eq!(native_vertex_format(&bytes), Some(NativeFormat::R8G8B8A8Unorm));
    }

    #[test]
    fn test_conversion_fills_missing_components() {
        let mut attribute = attribute(AttributeType::UnsignedByte,
                                      3,
                                      AttributeData::Client(vec![]));
        attribute.normalized = true;
        let source = [255, 0, 51, 9, 9, 9];
        let converted = convert_attribute(&attribute, &source, 0, 2).unwrap();
        let values = read_floats(&converted);
        assert_eq!(&values[0..4], &[1.0, 0.0, 0.2, 1.0]);
        assert_eq!(values.len(), 8);
    }

    #[test]
    fn test_conversion_out_of_bounds() {
        let attribute = attribute(AttributeType::Float, 3, AttributeData::Client(vec![]));
        assert!(convert_attribute(&attribute, &floats(&[1.0, 2.0]), 0, 1).is_err());
    }

    #[test]
    fn test_static_buffer_binds_directly_at_start_vertex() {
        let device = device();
        let mut resources = ResourceManager::new();
        let id = resources.create_buffer(65536, true);
        let data = floats(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        resources.buffer_mut(id).unwrap()
                 .set_data(&device, Some(&data), data.len(), DataUsage::Static).unwrap();

        let mut manager = VertexDataManager::new();
        let attributes = [attribute(AttributeType::Float, 2, AttributeData::Buffer(id))];
        let translated = manager.prepare_vertex_data(&device, &mut resources, &attributes, &[], 1,
                                                     2, 0).unwrap();
        assert!(translated[0].direct);
        assert_eq!(translated[0].stride, 8);
        assert_eq!(translated[0].offset, 8);
        assert_eq!(translated[0].format, NativeFormat::R32G32Float);
    }

    #[test]
    fn test_client_data_is_streamed_from_start_vertex() {
        let device = device();
        let mut resources = ResourceManager::new();
        let mut manager = VertexDataManager::new();
        let data = floats(&[0.0, 1.0, 2.0, 3.0]);
        let attributes = [attribute(AttributeType::Float, 1, AttributeData::Client(data))];
        let translated = manager.prepare_vertex_data(&device, &mut resources, &attributes, &[], 2,
                                                     2, 0).unwrap();
        assert!(!translated[0].direct);
        assert_eq!(translated[0].stride, 16);
        let offset = translated[0].offset as usize;
        let contents = translated[0].buffer.contents();
        assert_eq!(read_floats(&contents[offset..(offset + 32)]),
                   vec![2.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_disabled_attribute_uses_current_value() {
        let device = device();
        let mut resources = ResourceManager::new();
        let mut manager = VertexDataManager::new();
        let mut disabled = attribute(AttributeType::Float, 4, AttributeData::Client(vec![]));
        disabled.enabled = false;
        let translated = manager.prepare_vertex_data(&device,
                                                     &mut resources,
                                                     &[disabled],
                                                     &[[0.5, 0.25, 0.0, 1.0]],
                                                     0,
                                                     3,
                                                     0).unwrap();
        assert_eq!(translated[0].stride, 0);
        let offset = translated[0].offset as usize;
        let contents = translated[0].buffer.contents();
        assert_eq!(read_floats(&contents[offset..(offset + 16)]), vec![0.5, 0.25, 0.0, 1.0]);
    }

    #[test]
    fn test_instanced_attribute_reads_per_divisor() {
        let device = device();
        let mut resources = ResourceManager::new();
        let mut manager = VertexDataManager::new();
        let mut instanced = attribute(AttributeType::Float,
                                      1,
                                      AttributeData::Client(floats(&[7.0, 8.0, 9.0])));
        instanced.divisor = 2;
        let translated = manager.prepare_vertex_data(&device,
                                                     &mut resources,
                                                     &[instanced],
                                                     &[],
                                                     100,
                                                     3,
                                                     5).unwrap();
        assert_eq!(translated[0].divisor, 2);
        let offset = translated[0].offset as usize;
        let contents = translated[0].buffer.contents();
        let values = read_floats(&contents[offset..(offset + 48)]);
        assert_eq!(values[0], 7.0);
        assert_eq!(values[4], 8.0);
        assert_eq!(values[8], 9.0);
    }
}
