// tangent/renderer/src/formats.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Static tables mapping GL internal formats to native texture and view formats, and the
//! conversions between GL client pixel layouts and native texels.

use half::f16;
use tangent_gpu::format::{ColorValue, ComponentType, NativeFormat};
use tangent_gpu::FeatureLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    Rgba8,
    Srgb8Alpha8,
    Rgb8,
    Rgba4,
    Rgb5A1,
    Rgb565,
    Rgb10A2,
    R8,
    Rg8,
    Alpha8,
    Luminance8,
    Luminance8Alpha8,
    Bgra8,
    R16F,
    Rg16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgba32F,
    Rgba8Ui,
    Rgba8I,
    Rgba16Ui,
    Rgba16I,
    Rgba32Ui,
    Rgba32I,
    R32Ui,
    DepthComponent16,
    DepthComponent24,
    DepthComponent32F,
    Depth24Stencil8,
    Depth32FStencil8,
    StencilIndex8,
}

/// A GL client pixel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba,
    Rgb,
    Bgra,
    Alpha,
    Luminance,
    LuminanceAlpha,
    Red,
    Rg,
    RgbaInteger,
    RedInteger,
    DepthComponent,
    DepthStencil,
}

/// A GL client pixel type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    Byte,
    UnsignedShort,
    Short,
    UnsignedInt,
    Int,
    HalfFloat,
    Float,
    UnsignedShort4444,
    UnsignedShort5551,
    UnsignedShort565,
    UnsignedInt2101010Rev,
    UnsignedInt248,
}

/// The native formats backing one internal format at one feature level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureFormat {
    pub texture_format: NativeFormat,
    pub srv_format: NativeFormat,
    pub rtv_format: NativeFormat,
    pub dsv_format: NativeFormat,
    /// Format of the side texture used to emulate channel swizzles.
    pub swizzle_format: NativeFormat,
    /// Set when the native format has channels the GL format lacks, which must read back as
    /// (0, 0, 0, 1) after allocation.
    pub requires_initialization: bool,
}

impl InternalFormat {
    /// The unsized format and type GL reports for this format.
    pub fn format_and_type(self) -> (PixelFormat, PixelType) {
        use self::InternalFormat::*;
        match self {
            Rgba8 | Srgb8Alpha8 => (PixelFormat::Rgba, PixelType::UnsignedByte),
            Rgb8 => (PixelFormat::Rgb, PixelType::UnsignedByte),
            Rgba4 => (PixelFormat::Rgba, PixelType::UnsignedShort4444),
            Rgb5A1 => (PixelFormat::Rgba, PixelType::UnsignedShort5551),
            Rgb565 => (PixelFormat::Rgb, PixelType::UnsignedShort565),
            Rgb10A2 => (PixelFormat::Rgba, PixelType::UnsignedInt2101010Rev),
            R8 => (PixelFormat::Red, PixelType::UnsignedByte),
            Rg8 => (PixelFormat::Rg, PixelType::UnsignedByte),
            Alpha8 => (PixelFormat::Alpha, PixelType::UnsignedByte),
            Luminance8 => (PixelFormat::Luminance, PixelType::UnsignedByte),
            Luminance8Alpha8 => (PixelFormat::LuminanceAlpha, PixelType::UnsignedByte),
            Bgra8 => (PixelFormat::Bgra, PixelType::UnsignedByte),
            R16F => (PixelFormat::Red, PixelType::HalfFloat),
            Rg16F => (PixelFormat::Rg, PixelType::HalfFloat),
            Rgba16F => (PixelFormat::Rgba, PixelType::HalfFloat),
            R32F => (PixelFormat::Red, PixelType::Float),
            Rg32F => (PixelFormat::Rg, PixelType::Float),
            Rgba32F => (PixelFormat::Rgba, PixelType::Float),
            Rgba8Ui => (PixelFormat::RgbaInteger, PixelType::UnsignedByte),
            Rgba8I => (PixelFormat::RgbaInteger, PixelType::Byte),
            Rgba16Ui => (PixelFormat::RgbaInteger, PixelType::UnsignedShort),
            Rgba16I => (PixelFormat::RgbaInteger, PixelType::Short),
            Rgba32Ui => (PixelFormat::RgbaInteger, PixelType::UnsignedInt),
            Rgba32I => (PixelFormat::RgbaInteger, PixelType::Int),
            R32Ui => (PixelFormat::RedInteger, PixelType::UnsignedInt),
            DepthComponent16 => (PixelFormat::DepthComponent, PixelType::UnsignedShort),
            DepthComponent24 => (PixelFormat::DepthComponent, PixelType::UnsignedInt),
            DepthComponent32F => (PixelFormat::DepthComponent, PixelType::Float),
            Depth24Stencil8 | Depth32FStencil8 | StencilIndex8 => {
                (PixelFormat::DepthStencil, PixelType::UnsignedInt248)
            }
        }
    }

    pub fn depth_bits(self) -> u32 {
        match self {
            InternalFormat::DepthComponent16 => 16,
            InternalFormat::DepthComponent24 | InternalFormat::Depth24Stencil8 => 24,
            InternalFormat::DepthComponent32F | InternalFormat::Depth32FStencil8 => 32,
            _ => 0,
        }
    }

    pub fn stencil_bits(self) -> u32 {
        match self {
            InternalFormat::Depth24Stencil8 |
            InternalFormat::Depth32FStencil8 |
            InternalFormat::StencilIndex8 => 8,
            _ => 0,
        }
    }

    #[inline]
    pub fn is_depth_or_stencil(self) -> bool {
        self.depth_bits() > 0 || self.stencil_bits() > 0
    }

    /// Which of red, green, blue, and alpha the format stores.
    pub fn color_channels(self) -> [bool; 4] {
        use self::InternalFormat::*;
        match self {
            Rgb8 | Rgb565 | Luminance8 => [true, true, true, false],
            R8 | R16F | R32F | R32Ui => [true, false, false, false],
            Rg8 | Rg16F | Rg32F => [true, true, false, false],
            Alpha8 => [false, false, false, true],
            DepthComponent16 | DepthComponent24 | DepthComponent32F | Depth24Stencil8 |
            Depth32FStencil8 | StencilIndex8 => [false; 4],
            _ => [true; 4],
        }
    }
}

/// Looks up the native formats for `internal_format` on a device of `feature_level`.
pub fn texture_format(internal_format: InternalFormat, feature_level: FeatureLevel)
                      -> TextureFormat {
    use self::InternalFormat::*;
    use tangent_gpu::format::NativeFormat as N;

    // Sixteen-bit packed color formats need optional hardware support that only the top
    // feature level guarantees.
    let packed_16 = feature_level >= FeatureLevel::Level11_0;
    let level_9_3 = feature_level <= FeatureLevel::Level9_3;

    match internal_format {
        Rgba8 => color(N::R8G8B8A8Unorm),
        Srgb8Alpha8 => color(N::R8G8B8A8UnormSrgb),
        Rgb8 => initialized(color(N::R8G8B8A8Unorm)),
        Rgba4 if packed_16 => color(N::B4G4R4A4Unorm),
        Rgb5A1 if packed_16 => color(N::B5G5R5A1Unorm),
        Rgb565 if packed_16 => color(N::B5G6R5Unorm),
        Rgba4 | Rgb5A1 => color(N::R8G8B8A8Unorm),
        Rgb565 => initialized(color(N::R8G8B8A8Unorm)),
        Rgb10A2 => color(N::R10G10B10A2Unorm),
        R8 => color(N::R8Unorm),
        Rg8 => color(N::R8G8Unorm),
        Alpha8 if !level_9_3 => color(N::A8Unorm),
        Alpha8 => color(N::R8G8B8A8Unorm),
        Luminance8 => initialized(color(N::R8G8B8A8Unorm)),
        Luminance8Alpha8 => color(N::R8G8B8A8Unorm),
        Bgra8 => color(N::B8G8R8A8Unorm),
        R16F => color(N::R16Float),
        Rg16F => color(N::R16G16Float),
        Rgba16F => color(N::R16G16B16A16Float),
        R32F => color(N::R32Float),
        Rg32F => color(N::R32G32Float),
        Rgba32F => color(N::R32G32B32A32Float),
        Rgba8Ui => color(N::R8G8B8A8Uint),
        Rgba8I => color(N::R8G8B8A8Sint),
        Rgba16Ui => color(N::R16G16B16A16Uint),
        Rgba16I => color(N::R16G16B16A16Sint),
        Rgba32Ui => color(N::R32G32B32A32Uint),
        Rgba32I => color(N::R32G32B32A32Sint),
        R32Ui => color(N::R32Uint),

        // Feature level 9_3 cannot sample depth textures, so they get no typeless alias.
        DepthComponent16 if level_9_3 => depth(N::D16Unorm, N::Unknown, N::D16Unorm),
        DepthComponent16 => depth(N::R16Typeless, N::R16Unorm, N::D16Unorm),
        DepthComponent24 | Depth24Stencil8 | StencilIndex8 | DepthComponent32F |
        Depth32FStencil8 if level_9_3 => {
            depth(N::D24UnormS8Uint, N::Unknown, N::D24UnormS8Uint)
        }
        DepthComponent24 | Depth24Stencil8 | StencilIndex8 => {
            depth(N::R24G8Typeless, N::R24UnormX8Typeless, N::D24UnormS8Uint)
        }
        DepthComponent32F => depth(N::R32Typeless, N::R32Float, N::D32Float),
        Depth32FStencil8 => {
            depth(N::R32G8X24Typeless, N::R32FloatX8X24Typeless, N::D32FloatS8X24Uint)
        }
    }
}

fn color(format: NativeFormat) -> TextureFormat {
    TextureFormat {
        texture_format: format,
        srv_format: format,
        rtv_format: format,
        dsv_format: NativeFormat::Unknown,
        swizzle_format: swizzle_format_for(format),
        requires_initialization: false,
    }
}

fn initialized(format: TextureFormat) -> TextureFormat {
    TextureFormat { requires_initialization: true, ..format }
}

fn depth(texture: NativeFormat, srv: NativeFormat, dsv: NativeFormat) -> TextureFormat {
    TextureFormat {
        texture_format: texture,
        srv_format: srv,
        rtv_format: NativeFormat::Unknown,
        dsv_format: dsv,
        swizzle_format: NativeFormat::R32G32B32A32Float,
        requires_initialization: false,
    }
}

// The swizzle side texture must hold every channel of the source at full precision.
fn swizzle_format_for(format: NativeFormat) -> NativeFormat {
    use tangent_gpu::format::NativeFormat as N;
    let info = format.info();
    let channel_bytes = match format {
        N::B5G6R5Unorm | N::B4G4R4A4Unorm | N::B5G5R5A1Unorm | N::A8Unorm => 1,
        N::R10G10B10A2Unorm | N::R10G10B10A2Uint => 2,
        N::R8Unorm | N::R8Snorm | N::R8Uint | N::R8Sint | N::R16Unorm | N::R16Uint |
        N::R16Sint | N::R16Float | N::R32Uint | N::R32Sint | N::R32Float => info.pixel_bytes,
        N::R8G8Unorm | N::R8G8Snorm | N::R8G8Uint | N::R8G8Sint | N::R16G16Uint |
        N::R16G16Sint | N::R16G16Float | N::R32G32Uint | N::R32G32Sint |
        N::R32G32Float => info.pixel_bytes / 2,
        _ => info.pixel_bytes / 4,
    };
    match (info.component_type, channel_bytes) {
        (ComponentType::Uint, 1) => N::R8G8B8A8Uint,
        (ComponentType::Uint, 2) => N::R16G16B16A16Uint,
        (ComponentType::Uint, _) => N::R32G32B32A32Uint,
        (ComponentType::Sint, 1) => N::R8G8B8A8Sint,
        (ComponentType::Sint, 2) => N::R16G16B16A16Sint,
        (ComponentType::Sint, _) => N::R32G32B32A32Sint,
        (ComponentType::Float, 2) => N::R16G16B16A16Float,
        (ComponentType::Float, _) => N::R32G32B32A32Float,
        (ComponentType::Unorm, 1) | (ComponentType::Snorm, 1) => N::R8G8B8A8Unorm,
        (ComponentType::Unorm, _) | (ComponentType::Snorm, _) => N::R16G16B16A16Unorm,
        _ => N::R32G32B32A32Float,
    }
}

/// The GL format and type whose client layout is byte-identical to `format`, if any.
pub fn gl_format_for_native(format: NativeFormat) -> Option<(PixelFormat, PixelType)> {
    use tangent_gpu::format::NativeFormat as N;
    let pair = match format {
        N::R8G8B8A8Unorm | N::R8G8B8A8UnormSrgb => (PixelFormat::Rgba, PixelType::UnsignedByte),
        N::B8G8R8A8Unorm => (PixelFormat::Bgra, PixelType::UnsignedByte),
        N::A8Unorm => (PixelFormat::Alpha, PixelType::UnsignedByte),
        N::R8Unorm => (PixelFormat::Red, PixelType::UnsignedByte),
        N::R8G8Unorm => (PixelFormat::Rg, PixelType::UnsignedByte),
        N::B5G6R5Unorm => (PixelFormat::Rgb, PixelType::UnsignedShort565),
        N::R10G10B10A2Unorm => (PixelFormat::Rgba, PixelType::UnsignedInt2101010Rev),
        N::R16Float => (PixelFormat::Red, PixelType::HalfFloat),
        N::R16G16Float => (PixelFormat::Rg, PixelType::HalfFloat),
        N::R16G16B16A16Float => (PixelFormat::Rgba, PixelType::HalfFloat),
        N::R32Float => (PixelFormat::Red, PixelType::Float),
        N::R32G32Float => (PixelFormat::Rg, PixelType::Float),
        N::R32G32B32A32Float => (PixelFormat::Rgba, PixelType::Float),
        N::R8G8B8A8Uint => (PixelFormat::RgbaInteger, PixelType::UnsignedByte),
        N::R8G8B8A8Sint => (PixelFormat::RgbaInteger, PixelType::Byte),
        N::R16G16B16A16Uint => (PixelFormat::RgbaInteger, PixelType::UnsignedShort),
        N::R16G16B16A16Sint => (PixelFormat::RgbaInteger, PixelType::Short),
        N::R32G32B32A32Uint => (PixelFormat::RgbaInteger, PixelType::UnsignedInt),
        N::R32G32B32A32Sint => (PixelFormat::RgbaInteger, PixelType::Int),
        N::R32Uint => (PixelFormat::RedInteger, PixelType::UnsignedInt),
        _ => return None,
    };
    Some(pair)
}

/// The GL format and type `glReadPixels` prefers for a render target of `format`. Formats
/// with no exact client layout report the closest general-purpose pair.
pub fn implementation_read_format(format: NativeFormat) -> (PixelFormat, PixelType) {
    if let Some(pair) = gl_format_for_native(format) {
        return pair;
    }
    match format.info().component_type {
        ComponentType::Uint => (PixelFormat::RgbaInteger, PixelType::UnsignedInt),
        ComponentType::Sint => (PixelFormat::RgbaInteger, PixelType::Int),
        ComponentType::Float => (PixelFormat::Rgba, PixelType::Float),
        _ => (PixelFormat::Rgba, PixelType::UnsignedByte),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    R,
    G,
    B,
    A,
    // Luminance reads into red, green, and blue, and writes from red.
    L,
}

impl PixelFormat {
    fn slots(self) -> &'static [Slot] {
        match self {
            PixelFormat::Rgba | PixelFormat::RgbaInteger => &[Slot::R, Slot::G, Slot::B, Slot::A],
            PixelFormat::Rgb => &[Slot::R, Slot::G, Slot::B],
            PixelFormat::Bgra => &[Slot::B, Slot::G, Slot::R, Slot::A],
            PixelFormat::Alpha => &[Slot::A],
            PixelFormat::Luminance => &[Slot::L],
            PixelFormat::LuminanceAlpha => &[Slot::L, Slot::A],
            PixelFormat::Red | PixelFormat::RedInteger | PixelFormat::DepthComponent |
            PixelFormat::DepthStencil => &[Slot::R],
            PixelFormat::Rg => &[Slot::R, Slot::G],
        }
    }

    #[inline]
    fn is_integer(self) -> bool {
        self == PixelFormat::RgbaInteger || self == PixelFormat::RedInteger
    }
}

impl PixelType {
    /// Bytes per component, or per pixel for packed types.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            PixelType::UnsignedByte | PixelType::Byte => 1,
            PixelType::UnsignedShort | PixelType::Short | PixelType::HalfFloat |
            PixelType::UnsignedShort4444 | PixelType::UnsignedShort5551 |
            PixelType::UnsignedShort565 => 2,
            PixelType::UnsignedInt | PixelType::Int | PixelType::Float |
            PixelType::UnsignedInt2101010Rev | PixelType::UnsignedInt248 => 4,
        }
    }

    // Fields listed as (slot, shift, bits).
    fn packed_fields(self) -> Option<&'static [(Slot, u32, u32)]> {
        match self {
            PixelType::UnsignedShort4444 => {
                Some(&[(Slot::R, 12, 4), (Slot::G, 8, 4), (Slot::B, 4, 4), (Slot::A, 0, 4)])
            }
            PixelType::UnsignedShort5551 => {
                Some(&[(Slot::R, 11, 5), (Slot::G, 6, 5), (Slot::B, 1, 5), (Slot::A, 0, 1)])
            }
            PixelType::UnsignedShort565 => {
                Some(&[(Slot::R, 11, 5), (Slot::G, 5, 6), (Slot::B, 0, 5)])
            }
            PixelType::UnsignedInt2101010Rev => {
                Some(&[(Slot::R, 0, 10), (Slot::G, 10, 10), (Slot::B, 20, 10), (Slot::A, 30, 2)])
            }
            _ => None,
        }
    }
}

/// Bytes one pixel of `format`/`pixel_type` occupies in client memory.
pub fn pixel_bytes(format: PixelFormat, pixel_type: PixelType) -> usize {
    if pixel_type.packed_fields().is_some() || pixel_type == PixelType::UnsignedInt248 {
        pixel_type.bytes()
    } else {
        format.slots().len() * pixel_type.bytes()
    }
}

/// Bytes between rows of `width` pixels at the given row alignment.
pub fn row_pitch(format: PixelFormat, pixel_type: PixelType, width: u32, alignment: u32)
                 -> usize {
    let alignment = alignment.max(1) as usize;
    let unaligned = pixel_bytes(format, pixel_type) * width as usize;
    (unaligned + alignment - 1) / alignment * alignment
}

fn slot_index(slot: Slot) -> usize {
    match slot {
        Slot::R | Slot::L => 0,
        Slot::G => 1,
        Slot::B => 2,
        Slot::A => 3,
    }
}

fn read_le(bytes: &[u8]) -> u32 {
    bytes.iter().enumerate().fold(0, |value, (index, &byte)| value | (byte as u32) << (index * 8))
}

/// Decodes one client pixel. Missing color channels read as 0 and missing alpha as 1.
pub fn read_gl_pixel(format: PixelFormat, pixel_type: PixelType, data: &[u8]) -> ColorValue {
    let mut floats = [0.0, 0.0, 0.0, 1.0];
    let mut integers = [0i64, 0, 0, 1];

    if let Some(fields) = pixel_type.packed_fields() {
        let word = read_le(&data[0..pixel_type.bytes()]);
        for &(slot, shift, bits) in fields {
            let max = (1u32 << bits) - 1;
            let value = (word >> shift) & max;
            floats[slot_index(slot)] = value as f32 / max as f32;
            integers[slot_index(slot)] = value as i64;
        }
    } else {
        let width = pixel_type.bytes();
        for (index, &slot) in format.slots().iter().enumerate() {
            let bytes = &data[(index * width)..((index + 1) * width)];
            let raw = read_le(bytes);
            let (float, integer) = match pixel_type {
                PixelType::UnsignedByte => (raw as f32 / 255.0, raw as i64),
                PixelType::Byte => {
                    let value = raw as u8 as i8;
                    ((value as f32 / 127.0).max(-1.0), value as i64)
                }
                PixelType::UnsignedShort => (raw as f32 / 65535.0, raw as i64),
                PixelType::Short => {
                    let value = raw as u16 as i16;
                    ((value as f32 / 32767.0).max(-1.0), value as i64)
                }
                PixelType::UnsignedInt | PixelType::UnsignedInt248 => {
                    ((raw as f64 / u32::MAX as f64) as f32, raw as i64)
                }
                PixelType::Int => {
                    let value = raw as i32;
                    ((value as f64 / i32::MAX as f64) as f32, value as i64)
                }
                PixelType::HalfFloat => {
                    let value = f16::from_bits(raw as u16).to_f32();
                    (value, value as i64)
                }
                _ => {
                    let value = f32::from_bits(raw);
                    (value, value as i64)
                }
            };
            if slot == Slot::L {
                for channel in 0..3 {
                    floats[channel] = float;
                    integers[channel] = integer;
                }
            } else {
                floats[slot_index(slot)] = float;
                integers[slot_index(slot)] = integer;
            }
        }
    }

    if format.is_integer() {
        match pixel_type {
            PixelType::Byte | PixelType::Short | PixelType::Int => {
                ColorValue::Int([integers[0] as i32,
                                 integers[1] as i32,
                                 integers[2] as i32,
                                 integers[3] as i32])
            }
            _ => {
                ColorValue::Uint([integers[0] as u32,
                                  integers[1] as u32,
                                  integers[2] as u32,
                                  integers[3] as u32])
            }
        }
    } else {
        ColorValue::Float(floats)
    }
}

/// Encodes one client pixel into `out`, which must hold `pixel_bytes(format, pixel_type)`.
pub fn write_gl_pixel(format: PixelFormat,
                      pixel_type: PixelType,
                      color: &ColorValue,
                      out: &mut [u8]) {
    let floats = color.to_f32();
    let integers: [i64; 4] = match *color {
        ColorValue::Uint(values) => {
            [values[0] as i64, values[1] as i64, values[2] as i64, values[3] as i64]
        }
        ColorValue::Int(values) => {
            [values[0] as i64, values[1] as i64, values[2] as i64, values[3] as i64]
        }
        ColorValue::Float(values) => {
            [values[0] as i64, values[1] as i64, values[2] as i64, values[3] as i64]
        }
    };
    let integer_format = format.is_integer();

    if let Some(fields) = pixel_type.packed_fields() {
        let mut word = 0u32;
        for &(slot, shift, bits) in fields {
            let max = (1u32 << bits) - 1;
            let value = if integer_format {
                integers[slot_index(slot)].max(0).min(max as i64) as u32
            } else {
                (floats[slot_index(slot)].max(0.0).min(1.0) * max as f32).round() as u32
            };
            word |= value << shift;
        }
        let bytes = pixel_type.bytes();
        out[0..bytes].copy_from_slice(&word.to_le_bytes()[0..bytes]);
        return;
    }

    let width = pixel_type.bytes();
    for (index, &slot) in format.slots().iter().enumerate() {
        let float = floats[slot_index(slot)];
        let integer = integers[slot_index(slot)];
        let raw: u32 = match (pixel_type, integer_format) {
            (PixelType::UnsignedByte, true) => integer.max(0).min(0xff) as u32,
            (PixelType::Byte, true) => integer.max(-0x80).min(0x7f) as i8 as u8 as u32,
            (PixelType::UnsignedShort, true) => integer.max(0).min(0xffff) as u32,
            (PixelType::Short, true) => integer.max(-0x8000).min(0x7fff) as i16 as u16 as u32,
            (PixelType::UnsignedInt, true) => integer.max(0).min(u32::MAX as i64) as u32,
            (PixelType::Int, true) => {
                integer.max(i32::MIN as i64).min(i32::MAX as i64) as i32 as u32
            }
            (PixelType::UnsignedByte, false) => {
                (float.max(0.0).min(1.0) * 255.0).round() as u32
            }
            (PixelType::Byte, false) => {
                (float.max(-1.0).min(1.0) * 127.0).round() as i8 as u8 as u32
            }
            (PixelType::UnsignedShort, false) => {
                (float.max(0.0).min(1.0) * 65535.0).round() as u32
            }
            (PixelType::Short, false) => {
                (float.max(-1.0).min(1.0) * 32767.0).round() as i16 as u16 as u32
            }
            (PixelType::UnsignedInt, false) | (PixelType::UnsignedInt248, _) => {
                (float.max(0.0).min(1.0) as f64 * u32::MAX as f64).round() as u32
            }
            (PixelType::Int, false) => {
                (float.max(-1.0).min(1.0) as f64 * i32::MAX as f64).round() as i32 as u32
            }
            (PixelType::HalfFloat, _) => f16::from_f32(float).to_bits() as u32,
            _ => float.to_bits(),
        };
        out[(index * width)..((index + 1) * width)]
            .copy_from_slice(&raw.to_le_bytes()[0..width]);
    }
}

/// How read-back texels are laid out in client memory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackPixelsParams {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    pub output_pitch: usize,
    pub reverse_row_order: bool,
}

/// Converts `height` rows of native texels into client pixels. Rows are copied directly when
/// the client layout matches the native format.
pub fn pack_pixels(params: &PackPixelsParams,
                   source_format: NativeFormat,
                   source: &[u8],
                   source_row_pitch: usize,
                   out: &mut [u8]) {
    let source_pixel_bytes = source_format.pixel_bytes();
    let dest_pixel_bytes = pixel_bytes(params.format, params.pixel_type);
    let direct = gl_format_for_native(source_format) == Some((params.format, params.pixel_type));
    let row_bytes = params.width as usize * dest_pixel_bytes;

    for y in 0..params.height as usize {
        let source_y = if params.reverse_row_order { params.height as usize - 1 - y } else { y };
        let source_row = &source[(source_y * source_row_pitch)..];
        let dest_row = &mut out[(y * params.output_pitch)..];
        if direct {
            dest_row[0..row_bytes].copy_from_slice(&source_row[0..row_bytes]);
            continue;
        }
        for x in 0..params.width as usize {
            let texel = &source_row[(x * source_pixel_bytes)..((x + 1) * source_pixel_bytes)];
            let color = match source_format.decode_color(texel) {
                Some(color) => color,
                None => continue,
            };
            write_gl_pixel(params.format,
                           params.pixel_type,
                           &color,
                           &mut dest_row[(x * dest_pixel_bytes)..((x + 1) * dest_pixel_bytes)]);
        }
    }
}

/// Converts tightly packed client pixels into tightly packed native texels.
pub fn unpack_pixels(format: PixelFormat,
                     pixel_type: PixelType,
                     data: &[u8],
                     texel_count: usize,
                     dest_format: NativeFormat)
                     -> Vec<u8> {
    let source_bytes = pixel_bytes(format, pixel_type);
    if gl_format_for_native(dest_format) == Some((format, pixel_type)) {
        let length = (texel_count * source_bytes).min(data.len());
        return data[0..length].to_vec();
    }
    let dest_bytes = dest_format.pixel_bytes();
    let mut texels = Vec::with_capacity(texel_count * dest_bytes);
    for pixel in data.chunks(source_bytes).take(texel_count) {
        if pixel.len() < source_bytes {
            break;
        }
        let color = read_gl_pixel(format, pixel_type, pixel);
        match dest_format.encode_color(&color) {
            Some(texel) => texels.extend_from_slice(&texel),
            None => texels.extend(std::iter::repeat(0).take(dest_bytes)),
        }
    }
    texels
}

#[cfg(test)]
mod test {
    use super::{gl_format_for_native, pack_pixels, read_gl_pixel, row_pitch, texture_format};
    use super::{unpack_pixels, write_gl_pixel, InternalFormat, PackPixelsParams, PixelFormat};
    use super::PixelType;
    use tangent_gpu::format::{ColorValue, NativeFormat};
    use tangent_gpu::FeatureLevel;

    #[test]
    fn test_formats_without_alpha_are_initialized() {
        let format = texture_format(InternalFormat::Rgb8, FeatureLevel::Level11_0);
        assert_eq!(format.texture_format, NativeFormat::R8G8B8A8Unorm);
        assert!(format.requires_initialization);
        assert!(!texture_format(InternalFormat::Rgba8, FeatureLevel::Level11_0)
                    .requires_initialization);
    }

    #[test]
    fn test_packed_formats_depend_on_feature_level() {
        assert_eq!(texture_format(InternalFormat::Rgb565, FeatureLevel::Level11_0).texture_format,
                   NativeFormat::B5G6R5Unorm);
        let fallback = texture_format(InternalFormat::Rgb565, FeatureLevel::Level10_0);
        assert_eq!(fallback.texture_format, NativeFormat::R8G8B8A8Unorm);
        assert!(fallback.requires_initialization);
    }

    #[test]
    fn test_depth_formats() {
        let format = texture_format(InternalFormat::Depth24Stencil8, FeatureLevel::Level10_1);
        assert_eq!(format.texture_format, NativeFormat::R24G8Typeless);
        assert_eq!(format.srv_format, NativeFormat::R24UnormX8Typeless);
        assert_eq!(format.dsv_format, NativeFormat::D24UnormS8Uint);
        assert_eq!(format.rtv_format, NativeFormat::Unknown);

        let format = texture_format(InternalFormat::DepthComponent32F, FeatureLevel::Level9_3);
        assert_eq!(format.srv_format, NativeFormat::Unknown);
        assert_eq!(format.dsv_format, NativeFormat::D24UnormS8Uint);
    }

    #[test]
    fn test_swizzle_formats_keep_precision() {
        let format = texture_format(InternalFormat::Rgba16F, FeatureLevel::Level11_0);
        assert_eq!(format.swizzle_format, NativeFormat::R16G16B16A16Float);
        let format = texture_format(InternalFormat::R32Ui, FeatureLevel::Level11_0);
        assert_eq!(format.swizzle_format, NativeFormat::R32G32B32A32Uint);
        let format = texture_format(InternalFormat::Rgba8, FeatureLevel::Level11_0);
        assert_eq!(format.swizzle_format, NativeFormat::R8G8B8A8Unorm);
    }

    #[test]
    fn test_gl_packed_565_matches_native() {
        assert_eq!(gl_format_for_native(NativeFormat::B5G6R5Unorm),
                   Some((PixelFormat::Rgb, PixelType::UnsignedShort565)));
        let red = read_gl_pixel(PixelFormat::Rgb, PixelType::UnsignedShort565, &[0x00, 0xf8]);
        assert_eq!(red, ColorValue::Float([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_4444_is_not_native_order() {
        let mut out = [0; 2];
        write_gl_pixel(PixelFormat::Rgba,
                       PixelType::UnsignedShort4444,
                       &ColorValue::Float([1.0, 0.0, 0.0, 0.0]),
                       &mut out);
        assert_eq!(out, [0x00, 0xf0]);
        let native = NativeFormat::B4G4R4A4Unorm.encode_color(&ColorValue::Float([1.0, 0.0, 0.0,
                                                                                  0.0]));
        assert_eq!(native, Some(vec![0x00, 0x0f]));
    }

    #[test]
    fn test_luminance_reads_into_rgb() {
        let color = read_gl_pixel(PixelFormat::LuminanceAlpha, PixelType::UnsignedByte, &[255, 0]);
        assert_eq!(color, ColorValue::Float([1.0, 1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_row_pitch_alignment() {
        assert_eq!(row_pitch(PixelFormat::Rgb, PixelType::UnsignedByte, 3, 4), 12);
        assert_eq!(row_pitch(PixelFormat::Rgb, PixelType::UnsignedByte, 3, 1), 9);
        assert_eq!(row_pitch(PixelFormat::Rgba, PixelType::UnsignedByte, 3, 8), 16);
    }

    #[test]
    fn test_pack_converts_bgra_and_flips() {
        // Two rows of one BGRA texel: blue on top, red below.
        let source = [255, 0, 0, 255, 0, 0, 255, 255];
        let params = PackPixelsParams {
            width: 1,
            height: 2,
            format: PixelFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            output_pitch: 4,
            reverse_row_order: true,
        };
        let mut out = [0; 8];
        pack_pixels(&params, NativeFormat::B8G8R8A8Unorm, &source, 4, &mut out);
        assert_eq!(out, [255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_unpack_luminance_to_rgba() {
        let texels = unpack_pixels(PixelFormat::Luminance,
                                   PixelType::UnsignedByte,
                                   &[0, 255],
                                   2,
                                   NativeFormat::R8G8B8A8Unorm);
        assert_eq!(texels, vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}
