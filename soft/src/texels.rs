// tangent/soft/src/texels.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Byte-level texel operations behind clears, copies, blits, and swizzles.

use crate::{SoftDevice, SoftTexture};
use std::ops::Range;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::{DsvDesc, DsvDimension, NativeBox, RtvDesc, RtvDimension, ScissorRect};
use tangent_gpu::desc::{SrvDesc, SrvDimension, TextureDesc, TextureDimension};
use tangent_gpu::format::ColorValue;
use tangent_gpu::{calc_subresource, mip_extent, BlitKind, BlitParams, ClearFlags};
use tangent_gpu::{ColorWriteMask, DeviceError, SwizzleChannel};

/// Addresses the texels of one subresource.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TexelAddress {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) depth: u32,
    pixel_bytes: usize,
}

impl TexelAddress {
    pub(crate) fn new(desc: &TextureDesc, subresource: u32) -> TexelAddress {
        let level = subresource % desc.mip_levels;
        let depth = match desc.dimension {
            TextureDimension::Texture2D => 1,
            TextureDimension::Texture3D => mip_extent(desc.depth_or_array_size, level),
        };
        TexelAddress {
            width: mip_extent(desc.width, level),
            height: mip_extent(desc.height, level),
            depth,
            pixel_bytes: desc.format.pixel_bytes(),
        }
    }

    #[inline]
    pub(crate) fn row_pitch(&self) -> usize {
        self.width as usize * self.pixel_bytes
    }

    #[inline]
    pub(crate) fn depth_pitch(&self) -> usize {
        self.row_pitch() * self.height as usize
    }

    #[inline]
    fn offset(&self, x: u32, y: u32, z: u32) -> usize {
        z as usize * self.depth_pitch() + y as usize * self.row_pitch() +
            x as usize * self.pixel_bytes
    }

    #[inline]
    fn texel_range(&self, x: u32, y: u32, z: u32) -> Range<usize> {
        let offset = self.offset(x, y, z);
        offset..(offset + self.pixel_bytes)
    }

    // Clips a scissor rectangle to the subresource, as half-open texel ranges.
    fn clip(&self, rect: Option<&ScissorRect>) -> (Range<u32>, Range<u32>) {
        match rect {
            None => (0..self.width, 0..self.height),
            Some(rect) => {
                let clamp = |value: i32, max: u32| value.max(0).min(max as i32) as u32;
                let left = clamp(rect.left, self.width);
                let right = clamp(rect.right, self.width).max(left);
                let top = clamp(rect.top, self.height);
                let bottom = clamp(rect.bottom, self.height).max(top);
                (left..right, top..bottom)
            }
        }
    }
}

/// One subresource written by a view, with the 3D slices it covers.
type Slice = (u32, Range<u32>);

fn render_target_slices(desc: &TextureDesc, dimension: &RtvDimension) -> Vec<Slice> {
    match *dimension {
        RtvDimension::Texture2D { mip_slice } => {
            vec![(calc_subresource(mip_slice, 0, desc.mip_levels), 0..1)]
        }
        RtvDimension::Texture2DMs => vec![(0, 0..1)],
        RtvDimension::Texture2DArray { mip_slice, first_array_slice, array_size } => {
            (first_array_slice..(first_array_slice + array_size)).map(|slice| {
                (calc_subresource(mip_slice, slice, desc.mip_levels), 0..1)
            }).collect()
        }
        RtvDimension::Texture3D { mip_slice, first_w_slice, w_size } => {
            let depth = mip_extent(desc.depth_or_array_size, mip_slice);
            let end = first_w_slice.saturating_add(w_size).min(depth);
            vec![(mip_slice, first_w_slice..end)]
        }
    }
}

fn depth_stencil_slices(desc: &TextureDesc, dimension: &DsvDimension) -> Vec<Slice> {
    match *dimension {
        DsvDimension::Texture2D { mip_slice } => {
            vec![(calc_subresource(mip_slice, 0, desc.mip_levels), 0..1)]
        }
        DsvDimension::Texture2DMs => vec![(0, 0..1)],
        DsvDimension::Texture2DArray { mip_slice, first_array_slice, array_size } => {
            (first_array_slice..(first_array_slice + array_size)).map(|slice| {
                (calc_subresource(mip_slice, slice, desc.mip_levels), 0..1)
            }).collect()
        }
    }
}

fn shader_resource_slices(desc: &TextureDesc, view: &SrvDesc) -> Vec<Slice> {
    let level = view.most_detailed_mip;
    match view.dimension {
        SrvDimension::Texture2D | SrvDimension::Texture2DMs => {
            vec![(calc_subresource(level, view.first_array_slice, desc.mip_levels), 0..1)]
        }
        SrvDimension::Texture2DArray | SrvDimension::TextureCube => {
            let end = (view.first_array_slice + view.array_size).min(desc.array_size());
            (view.first_array_slice..end).map(|slice| {
                (calc_subresource(level, slice, desc.mip_levels), 0..1)
            }).collect()
        }
        SrvDimension::Texture3D => {
            vec![(level, 0..mip_extent(desc.depth_or_array_size, level))]
        }
    }
}

pub(crate) fn clear_color(texture: &SoftTexture,
                          view: &RtvDesc,
                          color: &ColorValue,
                          rect: Option<&ScissorRect>,
                          write_mask: ColorWriteMask) {
    let encoded = match view.format.encode_color(color) {
        Some(encoded) => encoded,
        None => return,
    };
    let mut subresources = texture.subresources.borrow_mut();
    for (subresource, slices) in render_target_slices(&texture.desc, &view.dimension) {
        let address = TexelAddress::new(&texture.desc, subresource);
        let data = &mut subresources[subresource as usize];
        let (columns, rows) = address.clip(rect);
        for z in slices {
            for y in rows.clone() {
                for x in columns.clone() {
                    let range = address.texel_range(x, y, z);
                    if write_mask == ColorWriteMask::ALL {
                        data[range].copy_from_slice(&encoded);
                        continue;
                    }
                    let existing = match view.format.decode_color(&data[range.clone()]) {
                        Some(existing) => existing,
                        None => continue,
                    };
                    let merged = merge_channels(existing, *color, write_mask);
                    if let Some(texel) = view.format.encode_color(&merged) {
                        data[range].copy_from_slice(&texel);
                    }
                }
            }
        }
    }
}

pub(crate) fn clear_depth_stencil(texture: &SoftTexture,
                                  view: &DsvDesc,
                                  flags: ClearFlags,
                                  depth: f32,
                                  stencil: u8,
                                  stencil_write_mask: u8,
                                  rect: Option<&ScissorRect>) {
    let depth = if flags.contains(ClearFlags::DEPTH) { Some(depth) } else { None };
    let stencil = if flags.contains(ClearFlags::STENCIL) {
        Some((stencil, stencil_write_mask))
    } else {
        None
    };
    let mut subresources = texture.subresources.borrow_mut();
    for (subresource, slices) in depth_stencil_slices(&texture.desc, &view.dimension) {
        let address = TexelAddress::new(&texture.desc, subresource);
        let data = &mut subresources[subresource as usize];
        let (columns, rows) = address.clip(rect);
        for z in slices {
            for y in rows.clone() {
                for x in columns.clone() {
                    let range = address.texel_range(x, y, z);
                    view.format.encode_depth_stencil(&mut data[range], depth, stencil);
                }
            }
        }
    }
}

pub(crate) fn write_region(texture: &SoftTexture,
                           subresource: u32,
                           region: Option<&NativeBox>,
                           source: &[u8],
                           row_pitch: usize,
                           depth_pitch: usize) {
    let address = TexelAddress::new(&texture.desc, subresource);
    let region = region.cloned().unwrap_or_else(|| full_box(&address));
    let row_bytes = region.width() as usize * address.pixel_bytes;
    let mut subresources = texture.subresources.borrow_mut();
    let data = &mut subresources[subresource as usize];
    for z in 0..region.depth() {
        for y in 0..region.height() {
            let source_offset = z as usize * depth_pitch + y as usize * row_pitch;
            if source_offset + row_bytes > source.len() {
                return;
            }
            let dest_offset = address.offset(region.left, region.top + y, region.front + z);
            data[dest_offset..(dest_offset + row_bytes)]
                .copy_from_slice(&source[source_offset..(source_offset + row_bytes)]);
        }
    }
}

pub(crate) fn copy_region(dest: &SoftTexture,
                          dest_subresource: u32,
                          dest_origin: [u32; 3],
                          source: &SoftTexture,
                          source_subresource: u32,
                          source_box: Option<&NativeBox>) {
    let source_address = TexelAddress::new(&source.desc, source_subresource);
    let dest_address = TexelAddress::new(&dest.desc, dest_subresource);
    if source_address.pixel_bytes != dest_address.pixel_bytes {
        warn!("skipping copy between incompatible formats {:?} and {:?}",
              source.desc.format,
              dest.desc.format);
        return;
    }
    let source_box = source_box.cloned().unwrap_or_else(|| full_box(&source_address));
    let width = source_box.width().min(dest_address.width.saturating_sub(dest_origin[0]));
    let height = source_box.height().min(dest_address.height.saturating_sub(dest_origin[1]));
    let depth = source_box.depth().min(dest_address.depth.saturating_sub(dest_origin[2]));
    let row_bytes = width as usize * source_address.pixel_bytes;

    // Gather first so copies within one texture do not alias.
    let mut rows = Vec::with_capacity((height * depth) as usize);
    {
        let subresources = source.subresources.borrow();
        let data = &subresources[source_subresource as usize];
        for z in 0..depth {
            for y in 0..height {
                let offset = source_address.offset(source_box.left,
                                                   source_box.top + y,
                                                   source_box.front + z);
                rows.push(data[offset..(offset + row_bytes)].to_vec());
            }
        }
    }

    let mut subresources = dest.subresources.borrow_mut();
    let data = &mut subresources[dest_subresource as usize];
    let mut rows = rows.into_iter();
    for z in 0..depth {
        for y in 0..height {
            if let Some(row) = rows.next() {
                let offset = dest_address.offset(dest_origin[0],
                                                 dest_origin[1] + y,
                                                 dest_origin[2] + z);
                data[offset..(offset + row_bytes)].copy_from_slice(&row);
            }
        }
    }
}

pub(crate) fn blit(params: &BlitParams<SoftDevice>) -> Result<(), DeviceError> {
    match params.kind {
        BlitKind::Color { source, dest, filter: _ } => {
            let (source_subresource, _) = first_slice(shader_resource_slices(&source.texture.desc,
                                                                             &source.desc))?;
            let (dest_subresource, _) =
                first_slice(render_target_slices(&dest.texture.desc, &dest.desc.dimension))?;
            let (source_format, dest_format) = (source.desc.format, dest.desc.format);
            blit_texels(params,
                        &source.texture,
                        source_subresource,
                        &dest.texture,
                        dest_subresource,
                        |source_texel, dest_texel| {
                let color = match source_format.decode_color(source_texel) {
                    Some(color) => color,
                    None => return,
                };
                if let Some(texel) = dest_format.encode_color(&color) {
                    dest_texel.copy_from_slice(&texel);
                }
            });
        }
        BlitKind::Depth { source, dest } => {
            let (source_subresource, _) = first_slice(shader_resource_slices(&source.texture.desc,
                                                                             &source.desc))?;
            let (dest_subresource, _) =
                first_slice(depth_stencil_slices(&dest.texture.desc, &dest.desc.dimension))?;
            let (source_format, dest_format) = (source.texture.desc.format, dest.desc.format);
            blit_texels(params,
                        &source.texture,
                        source_subresource,
                        &dest.texture,
                        dest_subresource,
                        |source_texel, dest_texel| {
                if let Some((depth, _)) = source_format.decode_depth_stencil(source_texel) {
                    dest_format.encode_depth_stencil(dest_texel, Some(depth), None);
                }
            });
        }
        BlitKind::Stencil { source, source_subresource, dest, dest_subresource } |
        BlitKind::DepthStencil { source, source_subresource, dest, dest_subresource } => {
            let copy_depth = match params.kind {
                BlitKind::DepthStencil { .. } => true,
                _ => false,
            };
            let (source_format, dest_format) = (source.desc.format, dest.desc.format);
            blit_texels(params,
                        source,
                        source_subresource,
                        dest,
                        dest_subresource,
                        |source_texel, dest_texel| {
                if let Some((depth, stencil)) = source_format.decode_depth_stencil(source_texel) {
                    let depth = if copy_depth { Some(depth) } else { None };
                    dest_format.encode_depth_stencil(dest_texel, depth, Some((stencil, !0)));
                }
            });
        }
    }
    Ok(())
}

fn first_slice(slices: Vec<Slice>) -> Result<Slice, DeviceError> {
    slices.into_iter().next().ok_or(DeviceError::InvalidArgument("view covers no subresource"))
}

// Maps every destination texel inside the destination area (and scissor) to its nearest
// source texel. Negative area sizes flip the image.
fn blit_texels<F>(params: &BlitParams<SoftDevice>,
                  source: &SoftTexture,
                  source_subresource: u32,
                  dest: &SoftTexture,
                  dest_subresource: u32,
                  mut convert: F)
                  where F: FnMut(&[u8], &mut [u8]) {
    let source_address = TexelAddress::new(&source.desc, source_subresource);
    let dest_address = TexelAddress::new(&dest.desc, dest_subresource);
    let (source_area, dest_area) = (params.source_area, params.dest_area);
    if source_area.is_empty() || dest_area.is_empty() {
        return;
    }
    let dest_bounds = RectI::new(Vector2I::zero(),
                                 Vector2I::new(dest_address.width as i32,
                                               dest_address.height as i32));
    let mut clip = match dest_area.intersection(dest_bounds) {
        Some(clip) => clip,
        None => return,
    };
    if let Some(scissor) = params.scissor {
        clip = match clip.intersection(scissor) {
            Some(clip) => clip,
            None => return,
        };
    }

    let source_data = source.subresources.borrow()[source_subresource as usize].clone();
    let mut subresources = dest.subresources.borrow_mut();
    let dest_data = &mut subresources[dest_subresource as usize];
    for y in clip.min_y()..clip.max_y() {
        let t = (y as f32 + 0.5 - dest_area.y() as f32) / dest_area.height() as f32;
        let source_y = (source_area.y() as f32 + t * source_area.height() as f32).floor() as i32;
        if source_y < 0 || source_y >= source_address.height as i32 {
            continue;
        }
        for x in clip.min_x()..clip.max_x() {
            let s = (x as f32 + 0.5 - dest_area.x() as f32) / dest_area.width() as f32;
            let source_x = (source_area.x() as f32 + s * source_area.width() as f32).floor() as i32;
            if source_x < 0 || source_x >= source_address.width as i32 {
                continue;
            }
            let source_range = source_address.texel_range(source_x as u32, source_y as u32, 0);
            let dest_range = dest_address.texel_range(x as u32, y as u32, 0);
            convert(&source_data[source_range], &mut dest_data[dest_range]);
        }
    }
}

pub(crate) fn swizzle(source: &SoftTexture,
                      source_view: &SrvDesc,
                      dest: &SoftTexture,
                      dest_view: &RtvDesc,
                      size: Vector2I,
                      swizzle: [SwizzleChannel; 4]) {
    let source_slices = shader_resource_slices(&source.desc, source_view);
    let dest_slices = render_target_slices(&dest.desc, &dest_view.dimension);
    let (source_format, dest_format) = (source_view.format, dest_view.format);
    for ((source_subresource, source_z), (dest_subresource, dest_z)) in
            source_slices.into_iter().zip(dest_slices.into_iter()) {
        let source_address = TexelAddress::new(&source.desc, source_subresource);
        let dest_address = TexelAddress::new(&dest.desc, dest_subresource);
        let source_data = source.subresources.borrow()[source_subresource as usize].clone();
        let mut subresources = dest.subresources.borrow_mut();
        let dest_data = &mut subresources[dest_subresource as usize];
        let width = (size.x().max(0) as u32).min(source_address.width).min(dest_address.width);
        let height =
            (size.y().max(0) as u32).min(source_address.height).min(dest_address.height);
        for (source_z, dest_z) in source_z.zip(dest_z) {
            for y in 0..height {
                for x in 0..width {
                    let source_range = source_address.texel_range(x, y, source_z);
                    let color = match source_format.decode_color(&source_data[source_range]) {
                        Some(color) => apply_swizzle(color, swizzle),
                        None => continue,
                    };
                    if let Some(texel) = dest_format.encode_color(&color) {
                        dest_data[dest_address.texel_range(x, y, dest_z)]
                            .copy_from_slice(&texel);
                    }
                }
            }
        }
    }
}

fn full_box(address: &TexelAddress) -> NativeBox {
    NativeBox {
        left: 0,
        top: 0,
        front: 0,
        right: address.width,
        bottom: address.height,
        back: address.depth,
    }
}

fn merge_channels(existing: ColorValue, new: ColorValue, mask: ColorWriteMask) -> ColorValue {
    fn merge<T>(mut existing: [T; 4], new: [T; 4], mask: ColorWriteMask) -> [T; 4]
                where T: Copy {
        for channel in 0..4 {
            if mask.bits() & (1 << channel) != 0 {
                existing[channel] = new[channel];
            }
        }
        existing
    }
    match (existing, new) {
        (ColorValue::Float(existing), ColorValue::Float(new)) => {
            ColorValue::Float(merge(existing, new, mask))
        }
        (ColorValue::Uint(existing), ColorValue::Uint(new)) => {
            ColorValue::Uint(merge(existing, new, mask))
        }
        (ColorValue::Int(existing), ColorValue::Int(new)) => {
            ColorValue::Int(merge(existing, new, mask))
        }
        (_, new) => new,
    }
}

fn apply_swizzle(color: ColorValue, swizzle: [SwizzleChannel; 4]) -> ColorValue {
    fn permute<T>(values: [T; 4], swizzle: [SwizzleChannel; 4], zero: T, one: T) -> [T; 4]
                  where T: Copy {
        let pick = |channel| match channel {
            SwizzleChannel::Red => values[0],
            SwizzleChannel::Green => values[1],
            SwizzleChannel::Blue => values[2],
            SwizzleChannel::Alpha => values[3],
            SwizzleChannel::Zero => zero,
            SwizzleChannel::One => one,
        };
        [pick(swizzle[0]), pick(swizzle[1]), pick(swizzle[2]), pick(swizzle[3])]
    }
    match color {
        ColorValue::Float(values) => ColorValue::Float(permute(values, swizzle, 0.0, 1.0)),
        ColorValue::Uint(values) => ColorValue::Uint(permute(values, swizzle, 0, 1)),
        ColorValue::Int(values) => ColorValue::Int(permute(values, swizzle, 0, 1)),
    }
}

#[cfg(test)]
mod test {
    use super::{apply_swizzle, merge_channels};
    use tangent_gpu::format::ColorValue;
    use tangent_gpu::{ColorWriteMask, SwizzleChannel};

    #[test]
    fn test_masked_merge() {
        let existing = ColorValue::Float([0.25, 0.25, 0.25, 0.25]);
        let new = ColorValue::Float([1.0, 1.0, 1.0, 1.0]);
        let mask = ColorWriteMask::RED | ColorWriteMask::ALPHA;
        assert_eq!(merge_channels(existing, new, mask),
                   ColorValue::Float([1.0, 0.25, 0.25, 1.0]));
    }

    #[test]
    fn test_swizzle_permutation() {
        let color = ColorValue::Uint([1, 2, 3, 4]);
        let swizzle = [SwizzleChannel::Alpha,
                       SwizzleChannel::Blue,
                       SwizzleChannel::Zero,
                       SwizzleChannel::One];
        assert_eq!(apply_swizzle(color, swizzle), ColorValue::Uint([4, 3, 0, 1]));
    }
}
