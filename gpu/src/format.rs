// tangent/gpu/src/format.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Native pixel formats and their texel encodings.

use half::f16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeFormat {
    Unknown,

    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    R8G8Unorm,
    R8G8Snorm,
    R8G8Uint,
    R8G8Sint,
    R8G8B8A8Typeless,
    R8G8B8A8Unorm,
    R8G8B8A8UnormSrgb,
    R8G8B8A8Snorm,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    B8G8R8A8Typeless,
    B8G8R8A8Unorm,
    A8Unorm,
    B5G6R5Unorm,
    B4G4R4A4Unorm,
    B5G5R5A1Unorm,
    R10G10B10A2Unorm,
    R10G10B10A2Uint,

    R16Unorm,
    R16Uint,
    R16Sint,
    R16Float,
    R16G16Uint,
    R16G16Sint,
    R16G16Float,
    R16G16B16A16Unorm,
    R16G16B16A16Uint,
    R16G16B16A16Sint,
    R16G16B16A16Float,

    R32Uint,
    R32Sint,
    R32Float,
    R32G32Uint,
    R32G32Sint,
    R32G32Float,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Float,

    R16Typeless,
    D16Unorm,
    R24G8Typeless,
    D24UnormS8Uint,
    R24UnormX8Typeless,
    X24TypelessG8Uint,
    R32Typeless,
    D32Float,
    R32G8X24Typeless,
    D32FloatS8X24Uint,
    R32FloatX8X24Typeless,
    X32TypelessG8X24Uint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    None,
    Unorm,
    Snorm,
    Uint,
    Sint,
    Float,
    Typeless,
    DepthStencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatInfo {
    pub pixel_bytes: usize,
    pub component_type: ComponentType,
    pub depth_bits: u32,
    pub stencil_bits: u32,
}

/// A clear or texel value, typed by the kind of render target it applies to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorValue {
    Float([f32; 4]),
    Uint([u32; 4]),
    Int([i32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    R,
    G,
    B,
    A,
}

#[derive(Clone, Copy, Debug)]
enum Layout {
    // Byte-aligned channels of equal width, in memory order.
    Aligned(&'static [Channel], u8),
    // Channels packed little-endian into one word, listed from the least significant bit.
    Packed(&'static [(Channel, u8)], u8),
    DepthStencil(DepthLayout),
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DepthLayout {
    D16,
    D24S8,
    D32,
    D32S8X24,
}

const R: &[Channel] = &[Channel::R];
const RG: &[Channel] = &[Channel::R, Channel::G];
const RGBA: &[Channel] = &[Channel::R, Channel::G, Channel::B, Channel::A];
const BGRA: &[Channel] = &[Channel::B, Channel::G, Channel::R, Channel::A];
const A: &[Channel] = &[Channel::A];

const B5G6R5: &[(Channel, u8)] = &[(Channel::B, 5), (Channel::G, 6), (Channel::R, 5)];
const B4G4R4A4: &[(Channel, u8)] =
    &[(Channel::B, 4), (Channel::G, 4), (Channel::R, 4), (Channel::A, 4)];
const B5G5R5A1: &[(Channel, u8)] =
    &[(Channel::B, 5), (Channel::G, 5), (Channel::R, 5), (Channel::A, 1)];
const R10G10B10A2: &[(Channel, u8)] =
    &[(Channel::R, 10), (Channel::G, 10), (Channel::B, 10), (Channel::A, 2)];

impl NativeFormat {
    fn layout(self) -> Layout {
        use self::NativeFormat::*;
        match self {
            Unknown => Layout::None,
            R8Unorm | R8Snorm | R8Uint | R8Sint => Layout::Aligned(R, 1),
            R8G8Unorm | R8G8Snorm | R8G8Uint | R8G8Sint => Layout::Aligned(RG, 1),
            R8G8B8A8Typeless | R8G8B8A8Unorm | R8G8B8A8UnormSrgb | R8G8B8A8Snorm |
            R8G8B8A8Uint | R8G8B8A8Sint => Layout::Aligned(RGBA, 1),
            B8G8R8A8Typeless | B8G8R8A8Unorm => Layout::Aligned(BGRA, 1),
            A8Unorm => Layout::Aligned(A, 1),
            B5G6R5Unorm => Layout::Packed(B5G6R5, 2),
            B4G4R4A4Unorm => Layout::Packed(B4G4R4A4, 2),
            B5G5R5A1Unorm => Layout::Packed(B5G5R5A1, 2),
            R10G10B10A2Unorm | R10G10B10A2Uint => Layout::Packed(R10G10B10A2, 4),
            R16Unorm | R16Uint | R16Sint | R16Float => Layout::Aligned(R, 2),
            R16G16Uint | R16G16Sint | R16G16Float => Layout::Aligned(RG, 2),
            R16G16B16A16Unorm | R16G16B16A16Uint | R16G16B16A16Sint |
            R16G16B16A16Float => Layout::Aligned(RGBA, 2),
            R32Uint | R32Sint | R32Float => Layout::Aligned(R, 4),
            R32G32Uint | R32G32Sint | R32G32Float => Layout::Aligned(RG, 4),
            R32G32B32A32Uint | R32G32B32A32Sint | R32G32B32A32Float => {
                Layout::Aligned(RGBA, 4)
            }
            R16Typeless | D16Unorm => Layout::DepthStencil(DepthLayout::D16),
            R24G8Typeless | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint => {
                Layout::DepthStencil(DepthLayout::D24S8)
            }
            R32Typeless | D32Float => Layout::DepthStencil(DepthLayout::D32),
            R32G8X24Typeless | D32FloatS8X24Uint | R32FloatX8X24Typeless |
            X32TypelessG8X24Uint => Layout::DepthStencil(DepthLayout::D32S8X24),
        }
    }

    pub fn info(self) -> FormatInfo {
        use self::NativeFormat::*;
        let pixel_bytes = match self.layout() {
            Layout::None => 0,
            Layout::Aligned(channels, width) => channels.len() * width as usize,
            Layout::Packed(_, width) => width as usize,
            Layout::DepthStencil(DepthLayout::D16) => 2,
            Layout::DepthStencil(DepthLayout::D24S8) | Layout::DepthStencil(DepthLayout::D32) => 4,
            Layout::DepthStencil(DepthLayout::D32S8X24) => 8,
        };
        let component_type = match self {
            Unknown => ComponentType::None,
            R8Unorm | R8G8Unorm | R8G8B8A8Unorm | R8G8B8A8UnormSrgb | B8G8R8A8Unorm |
            A8Unorm | B5G6R5Unorm | B4G4R4A4Unorm | B5G5R5A1Unorm | R10G10B10A2Unorm |
            R16Unorm | R16G16B16A16Unorm => ComponentType::Unorm,
            R8Snorm | R8G8Snorm | R8G8B8A8Snorm => ComponentType::Snorm,
            R8Uint | R8G8Uint | R8G8B8A8Uint | R10G10B10A2Uint | R16Uint | R16G16Uint |
            R16G16B16A16Uint | R32Uint | R32G32Uint | R32G32B32A32Uint => ComponentType::Uint,
            R8Sint | R8G8Sint | R8G8B8A8Sint | R16Sint | R16G16Sint | R16G16B16A16Sint |
            R32Sint | R32G32Sint | R32G32B32A32Sint => ComponentType::Sint,
            R16Float | R16G16Float | R16G16B16A16Float | R32Float | R32G32Float |
            R32G32B32A32Float => ComponentType::Float,
            R8G8B8A8Typeless | B8G8R8A8Typeless | R16Typeless | R24G8Typeless |
            R32Typeless | R32G8X24Typeless => ComponentType::Typeless,
            D16Unorm | D24UnormS8Uint | R24UnormX8Typeless | X24TypelessG8Uint | D32Float |
            D32FloatS8X24Uint | R32FloatX8X24Typeless |
            X32TypelessG8X24Uint => ComponentType::DepthStencil,
        };
        let (depth_bits, stencil_bits) = match self {
            D16Unorm => (16, 0),
            D24UnormS8Uint => (24, 8),
            D32Float => (32, 0),
            D32FloatS8X24Uint => (32, 8),
            _ => (0, 0),
        };
        FormatInfo { pixel_bytes, component_type, depth_bits, stencil_bits }
    }

    #[inline]
    pub fn pixel_bytes(self) -> usize {
        self.info().pixel_bytes
    }

    /// True for formats whose texels are depth and/or stencil values, including the typeless
    /// and view formats that alias them.
    #[inline]
    pub fn is_depth_stencil_layout(self) -> bool {
        match self.layout() {
            Layout::DepthStencil(_) => true,
            _ => false,
        }
    }

    /// Encodes one texel of a color format. Returns `None` for depth-stencil and unknown
    /// formats.
    pub fn encode_color(self, color: &ColorValue) -> Option<Vec<u8>> {
        let component_type = self.info().component_type;
        match self.layout() {
            Layout::Aligned(channels, width) => {
                let mut texel = Vec::with_capacity(channels.len() * width as usize);
                for &channel in channels {
                    encode_aligned(&mut texel, component_type, width, color, channel);
                }
                Some(texel)
            }
            Layout::Packed(fields, width) => {
                let mut word = 0u32;
                let mut shift = 0;
                for &(channel, bits) in fields {
                    let max = (1u32 << bits) - 1;
                    let value = match (component_type, *color) {
                        (ComponentType::Uint, ColorValue::Uint(values)) => {
                            values[channel as usize].min(max)
                        }
                        _ => unorm(float_channel(color, channel), max),
                    };
                    word |= value << shift;
                    shift += bits;
                }
                Some(word.to_le_bytes()[0..width as usize].to_vec())
            }
            Layout::DepthStencil(_) | Layout::None => None,
        }
    }

    /// Decodes one texel of a color format. Channels the format lacks read as 0 for color and
    /// 1 for alpha.
    pub fn decode_color(self, texel: &[u8]) -> Option<ColorValue> {
        let component_type = self.info().component_type;
        let mut floats = [0.0, 0.0, 0.0, 1.0];
        let mut uints = [0, 0, 0, 1];
        let mut ints = [0, 0, 0, 1];
        match self.layout() {
            Layout::Aligned(channels, width) => {
                for (index, &channel) in channels.iter().enumerate() {
                    let offset = index * width as usize;
                    let bytes = &texel[offset..(offset + width as usize)];
                    let raw = read_raw(bytes);
                    let slot = channel as usize;
                    match component_type {
                        ComponentType::Uint => uints[slot] = raw as u32,
                        ComponentType::Sint => ints[slot] = sign_extend(raw, width),
                        ComponentType::Float => {
                            floats[slot] = if width == 2 {
                                f16::from_bits(raw as u16).to_f32()
                            } else {
                                f32::from_bits(raw as u32)
                            }
                        }
                        ComponentType::Snorm => {
                            let max = ((1u64 << (width * 8 - 1)) - 1) as f32;
                            floats[slot] = (sign_extend(raw, width) as f32 / max).max(-1.0)
                        }
                        _ => {
                            let max = ((1u64 << (width * 8)) - 1) as f32;
                            floats[slot] = raw as f32 / max
                        }
                    }
                }
            }
            Layout::Packed(fields, width) => {
                let word = read_raw(&texel[0..width as usize]) as u32;
                let mut shift = 0;
                for &(channel, bits) in fields {
                    let max = (1u32 << bits) - 1;
                    let value = (word >> shift) & max;
                    uints[channel as usize] = value;
                    floats[channel as usize] = value as f32 / max as f32;
                    shift += bits;
                }
            }
            Layout::DepthStencil(_) | Layout::None => return None,
        }
        Some(match component_type {
            ComponentType::Uint => ColorValue::Uint(uints),
            ComponentType::Sint => ColorValue::Int(ints),
            _ => ColorValue::Float(floats),
        })
    }

    /// Writes the depth and/or stencil part of one texel, leaving the other part untouched.
    pub fn encode_depth_stencil(self,
                                texel: &mut [u8],
                                depth: Option<f32>,
                                stencil: Option<(u8, u8)>) {
        let layout = match self.layout() {
            Layout::DepthStencil(layout) => layout,
            _ => return,
        };
        if let Some(depth) = depth {
            let depth = depth.max(0.0).min(1.0);
            match layout {
                DepthLayout::D16 => {
                    let value = unorm(depth, 0xffff) as u16;
                    texel[0..2].copy_from_slice(&value.to_le_bytes());
                }
                DepthLayout::D24S8 => {
                    let value = unorm(depth, 0x00ff_ffff);
                    let word = (read_raw(&texel[0..4]) as u32 & 0xff00_0000) | value;
                    texel[0..4].copy_from_slice(&word.to_le_bytes());
                }
                DepthLayout::D32 | DepthLayout::D32S8X24 => {
                    texel[0..4].copy_from_slice(&depth.to_bits().to_le_bytes());
                }
            }
        }
        if let Some((stencil, write_mask)) = stencil {
            let offset = match layout {
                DepthLayout::D24S8 => 3,
                DepthLayout::D32S8X24 => 4,
                DepthLayout::D16 | DepthLayout::D32 => return,
            };
            texel[offset] = (texel[offset] & !write_mask) | (stencil & write_mask);
        }
    }

    /// Reads the depth and stencil parts of one texel.
    pub fn decode_depth_stencil(self, texel: &[u8]) -> Option<(f32, u8)> {
        match self.layout() {
            Layout::DepthStencil(DepthLayout::D16) => {
                Some((read_raw(&texel[0..2]) as f32 / 65535.0, 0))
            }
            Layout::DepthStencil(DepthLayout::D24S8) => {
                let word = read_raw(&texel[0..4]) as u32;
                Some(((word & 0x00ff_ffff) as f32 / 16_777_215.0, (word >> 24) as u8))
            }
            Layout::DepthStencil(DepthLayout::D32) => {
                Some((f32::from_bits(read_raw(&texel[0..4]) as u32), 0))
            }
            Layout::DepthStencil(DepthLayout::D32S8X24) => {
                Some((f32::from_bits(read_raw(&texel[0..4]) as u32), texel[4]))
            }
            _ => None,
        }
    }
}

impl ColorValue {
    pub fn to_f32(&self) -> [f32; 4] {
        match *self {
            ColorValue::Float(values) => values,
            ColorValue::Uint(values) => [values[0] as f32, values[1] as f32, values[2] as f32,
                                         values[3] as f32],
            ColorValue::Int(values) => [values[0] as f32, values[1] as f32, values[2] as f32,
                                        values[3] as f32],
        }
    }
}

fn float_channel(color: &ColorValue, channel: Channel) -> f32 {
    color.to_f32()[channel as usize]
}

fn unorm(value: f32, max: u32) -> u32 {
    (value.max(0.0).min(1.0) * max as f32).round() as u32
}

fn read_raw(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for (index, &byte) in bytes.iter().enumerate() {
        value |= (byte as u64) << (index * 8);
    }
    value
}

fn sign_extend(raw: u64, width: u8) -> i32 {
    let shift = 64 - width as u32 * 8;
    ((raw << shift) as i64 >> shift) as i32
}

fn encode_aligned(texel: &mut Vec<u8>,
                  component_type: ComponentType,
                  width: u8,
                  color: &ColorValue,
                  channel: Channel) {
    let slot = channel as usize;
    let bits = width as u32 * 8;
    let raw: u64 = match (component_type, *color) {
        (ComponentType::Uint, ColorValue::Uint(values)) => {
            (values[slot] as u64).min((1u64 << bits) - 1)
        }
        (ComponentType::Sint, ColorValue::Int(values)) => {
            let max = (1i64 << (bits - 1)) - 1;
            let value = (values[slot] as i64).max(-max - 1).min(max);
            value as u64 & ((1u64 << bits) - 1)
        }
        (ComponentType::Float, _) => {
            let value = float_channel(color, channel);
            if width == 2 {
                f16::from_f32(value).to_bits() as u64
            } else {
                value.to_bits() as u64
            }
        }
        (ComponentType::Snorm, _) => {
            let max = ((1u64 << (bits - 1)) - 1) as f32;
            let value = (float_channel(color, channel).max(-1.0).min(1.0) * max).round() as i64;
            value as u64 & ((1u64 << bits) - 1)
        }
        _ => unorm(float_channel(color, channel), ((1u64 << bits) - 1) as u32) as u64,
    };
    texel.extend_from_slice(&raw.to_le_bytes()[0..width as usize]);
}
