// tangent/renderer/src/texture_storage.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Native texture memory for one logical texture.
//!
//! One implementation serves every shape; only subresource indexing and view dimensions depend
//! on whether the storage is 2D, a cube map, 3D, or a 2D array. The primary resource is created
//! on first use. Alongside it the storage may hold:
//!
//! * a single-level copy of level zero, sampled instead of the primary resource on devices
//!   that cannot clamp a mipmapped resource to its first level,
//! * a swizzle texture, into which channel-permuted copies of every level are rendered when
//!   sampling needs a swizzle that views can't express.
//!
//! Shader-resource views are cached by (base level, level count, swizzled, level zero), and
//! render targets by image index.

use crate::error::{Error, Result};
use crate::formats::{self, InternalFormat, TextureFormat};
use crate::gl::{SamplerState, SwizzleState};
use crate::render_target::{RenderTarget, RenderTargetViews};
use fxhash::FxHashMap;
use tangent_geometry::rect::RectI;
use tangent_geometry::vector::Vector2I;
use tangent_gpu::desc::{DsvDesc, DsvDimension, NativeBox, RtvDesc, RtvDimension, SrvDesc};
use tangent_gpu::desc::{SrvDimension, TextureDesc, TextureDimension, Usage};
use tangent_gpu::format::{ColorValue, NativeFormat};
use tangent_gpu::{calc_subresource, mip_extent, BindFlags, BlitFilter, BlitKind, BlitParams};
use tangent_gpu::{CpuAccessFlags, Device, ResourceMiscFlags};

const CUBE_FACES: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureShape {
    TwoD,
    Cube,
    ThreeD,
    TwoDArray,
}

/// Addresses one image of a texture. `layer` is the cube face, array slice, or 3D slice, and
/// is zero for 2D textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageIndex {
    pub level: u32,
    pub layer: u32,
}

impl ImageIndex {
    #[inline]
    pub fn level(level: u32) -> ImageIndex {
        ImageIndex { level, layer: 0 }
    }

    #[inline]
    pub fn layer(level: u32, layer: u32) -> ImageIndex {
        ImageIndex { level, layer }
    }
}

/// What to allocate. `width`, `height`, and `depth` describe the native level zero; `depth` is
/// the array size of 2D arrays and is ignored for 2D textures and cube maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageDesc {
    pub shape: TextureShape,
    pub internal_format: InternalFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Zero allocates the full mip chain.
    pub levels: u32,
    /// Native levels hidden from GL, so GL level zero is native level `top_level`.
    pub top_level: u32,
    pub render_target: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SrvKey {
    base_level: u32,
    level_count: u32,
    swizzle: bool,
    level_zero: bool,
}

pub struct TextureStorage<D> where D: Device {
    desc: StorageDesc,
    format: TextureFormat,
    mip_levels: u32,
    level_zero_workaround: bool,

    texture: Option<D::Texture>,
    level_zero_texture: Option<D::Texture>,
    use_level_zero_texture: bool,

    swizzle_texture: Option<D::Texture>,
    swizzle_render_targets: Vec<Option<D::RenderTargetView>>,
    swizzle_sources: Vec<Option<D::ShaderResourceView>>,
    /// The swizzle each level of the swizzle texture currently holds.
    swizzle_cache: Vec<Option<SwizzleState>>,

    srv_cache: FxHashMap<SrvKey, D::ShaderResourceView>,
    render_targets: FxHashMap<ImageIndex, RenderTarget<D>>,
    level_zero_render_targets: FxHashMap<u32, RenderTarget<D>>,
}

impl<D> TextureStorage<D> where D: Device {
    /// Describes the storage without allocating anything.
    pub fn new(device: &D, desc: &StorageDesc, level_zero_workaround: bool) -> TextureStorage<D> {
        let format = formats::texture_format(desc.internal_format, device.feature_level());
        let mut desc = *desc;
        match desc.shape {
            TextureShape::TwoD => desc.depth = 1,
            TextureShape::Cube => desc.depth = CUBE_FACES,
            TextureShape::ThreeD | TextureShape::TwoDArray => desc.depth = desc.depth.max(1),
        }
        let mip_levels = if desc.levels == 0 {
            let mut largest = desc.width.max(desc.height);
            if desc.shape == TextureShape::ThreeD {
                largest = largest.max(desc.depth);
            }
            32 - largest.max(1).leading_zeros()
        } else {
            desc.levels
        };
        TextureStorage {
            desc,
            format,
            mip_levels,
            level_zero_workaround,
            texture: None,
            level_zero_texture: None,
            use_level_zero_texture: false,
            swizzle_texture: None,
            swizzle_render_targets: vec![None; mip_levels as usize],
            swizzle_sources: vec![None; mip_levels as usize],
            swizzle_cache: vec![None; mip_levels as usize],
            srv_cache: FxHashMap::default(),
            render_targets: FxHashMap::default(),
            level_zero_render_targets: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn shape(&self) -> TextureShape {
        self.desc.shape
    }

    #[inline]
    pub fn internal_format(&self) -> InternalFormat {
        self.desc.internal_format
    }

    #[inline]
    pub fn format(&self) -> &TextureFormat {
        &self.format
    }

    #[inline]
    pub fn top_level(&self) -> u32 {
        self.desc.top_level
    }

    /// The number of levels visible to GL.
    #[inline]
    pub fn level_count(&self) -> u32 {
        self.mip_levels - self.desc.top_level
    }

    #[inline]
    pub fn is_render_target(&self) -> bool {
        self.desc.render_target
    }

    /// The size of GL level `level`.
    pub fn level_size(&self, level: u32) -> (u32, u32, u32) {
        let native_level = level + self.desc.top_level;
        let depth = match self.desc.shape {
            TextureShape::ThreeD => mip_extent(self.desc.depth, native_level),
            _ => 1,
        };
        (mip_extent(self.desc.width, native_level),
         mip_extent(self.desc.height, native_level),
         depth)
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        match self.desc.shape {
            TextureShape::TwoD | TextureShape::ThreeD => 1,
            TextureShape::Cube | TextureShape::TwoDArray => self.desc.depth,
        }
    }

    /// The native subresource that holds image `index` of the primary resource.
    pub fn subresource_index(&self, index: ImageIndex) -> u32 {
        let level = index.level + self.desc.top_level;
        match self.desc.shape {
            TextureShape::TwoD | TextureShape::ThreeD => {
                calc_subresource(level, 0, self.mip_levels)
            }
            TextureShape::Cube | TextureShape::TwoDArray => {
                calc_subresource(level, index.layer, self.mip_levels)
            }
        }
    }

    #[inline]
    fn supports_level_zero_texture(&self) -> bool {
        self.level_zero_workaround && self.mip_levels > 1 &&
            (self.desc.shape == TextureShape::TwoD || self.desc.shape == TextureShape::Cube)
    }

    #[inline]
    pub fn uses_level_zero_texture(&self) -> bool {
        self.use_level_zero_texture
    }

    fn bind_flags(&self) -> BindFlags {
        let mut flags = BindFlags::empty();
        if self.format.srv_format != NativeFormat::Unknown {
            flags |= BindFlags::SHADER_RESOURCE;
        }
        if self.desc.render_target {
            if self.format.dsv_format != NativeFormat::Unknown {
                flags |= BindFlags::DEPTH_STENCIL;
            } else if self.format.rtv_format != NativeFormat::Unknown {
                flags |= BindFlags::RENDER_TARGET;
            }
        }
        flags
    }

    fn native_desc(&self, format: NativeFormat, mip_levels: u32, bind_flags: BindFlags)
                   -> TextureDesc {
        let (dimension, depth_or_array_size) = match self.desc.shape {
            TextureShape::ThreeD => (TextureDimension::Texture3D, self.desc.depth),
            _ => (TextureDimension::Texture2D, self.desc.depth),
        };
        TextureDesc {
            dimension,
            width: self.desc.width,
            height: self.desc.height,
            depth_or_array_size,
            mip_levels,
            format,
            sample_count: 1,
            usage: Usage::Default,
            bind_flags,
            cpu_access: CpuAccessFlags::empty(),
            misc_flags: if self.desc.shape == TextureShape::Cube {
                ResourceMiscFlags::TEXTURE_CUBE
            } else {
                ResourceMiscFlags::empty()
            },
        }
    }

    /// Returns the primary resource, allocating it on first use.
    pub fn get_resource(&mut self, device: &D) -> Result<D::Texture> {
        if let Some(ref texture) = self.texture {
            return Ok(texture.clone());
        }
        let desc = self.native_desc(self.format.texture_format, self.mip_levels, self.bind_flags());
        let texture = device.create_texture(&desc)?;
        debug!("allocated {:?} storage {}x{}x{} with {} levels",
               self.desc.shape,
               self.desc.width,
               self.desc.height,
               self.desc.depth,
               self.mip_levels);
        if self.format.requires_initialization && self.desc.render_target &&
                self.format.rtv_format != NativeFormat::Unknown {
            self.texture = Some(texture.clone());
            self.initialize_contents(device)?;
        }
        self.texture = Some(texture.clone());
        Ok(texture)
    }

    // Formats with channels GL doesn't have must read those channels back as opaque.
    fn initialize_contents(&mut self, device: &D) -> Result<()> {
        for level in 0..self.level_count() {
            for layer in 0..self.layer_count() {
                let view = self.get_render_target(device, ImageIndex::layer(level, layer))?
                               .render_target_view()
                               .cloned();
                if let Some(view) = view {
                    let opaque = ColorValue::Float([0.0, 0.0, 0.0, 1.0]);
                    device.clear_render_target_view(&view, &opaque);
                }
            }
        }
        Ok(())
    }

    fn get_level_zero_texture(&mut self, device: &D) -> Result<D::Texture> {
        if let Some(ref texture) = self.level_zero_texture {
            return Ok(texture.clone());
        }
        let desc = self.native_desc(self.format.texture_format, 1, self.bind_flags());
        let texture = device.create_texture(&desc)?;
        debug!("allocated level zero copy of {:?} storage", self.desc.shape);
        self.level_zero_texture = Some(texture.clone());
        Ok(texture)
    }

    fn get_swizzle_texture(&mut self, device: &D) -> Result<D::Texture> {
        if let Some(ref texture) = self.swizzle_texture {
            return Ok(texture.clone());
        }
        let desc = self.native_desc(self.format.swizzle_format,
                                    self.mip_levels,
                                    BindFlags::SHADER_RESOURCE | BindFlags::RENDER_TARGET);
        let texture = device.create_texture(&desc)?;
        debug!("allocated swizzle texture for {:?} storage", self.desc.shape);
        self.swizzle_texture = Some(texture.clone());
        Ok(texture)
    }

    /// Switches sampling and level-zero rendering between the primary resource and the
    /// single-level copy, carrying level zero's contents across.
    pub fn use_level_zero_workaround_texture(&mut self, device: &D, use_level_zero: bool)
                                             -> Result<()> {
        if use_level_zero && self.supports_level_zero_texture() {
            if !self.use_level_zero_texture {
                if let Some(texture) = self.texture.clone() {
                    let level_zero = self.get_level_zero_texture(device)?;
                    for layer in 0..self.layer_count() {
                        device.copy_subresource_region(&level_zero,
                                                       calc_subresource(0, layer, 1),
                                                       0,
                                                       0,
                                                       0,
                                                       &texture,
                                                       calc_subresource(0,
                                                                        layer,
                                                                        self.mip_levels),
                                                       None);
                    }
                }
            }
            self.use_level_zero_texture = true;
        } else {
            if self.use_level_zero_texture {
                if let Some(level_zero) = self.level_zero_texture.clone() {
                    let texture = self.get_resource(device)?;
                    for layer in 0..self.layer_count() {
                        device.copy_subresource_region(&texture,
                                                       calc_subresource(0,
                                                                        layer,
                                                                        self.mip_levels),
                                                       0,
                                                       0,
                                                       0,
                                                       &level_zero,
                                                       calc_subresource(0, layer, 1),
                                                       None);
                    }
                }
            }
            self.use_level_zero_texture = false;
        }
        Ok(())
    }

    fn srv_dimension(&self) -> SrvDimension {
        match self.desc.shape {
            TextureShape::TwoD => SrvDimension::Texture2D,
            TextureShape::Cube => SrvDimension::TextureCube,
            TextureShape::ThreeD => SrvDimension::Texture3D,
            TextureShape::TwoDArray => SrvDimension::Texture2DArray,
        }
    }

    /// Returns a view for sampling with `sampler`. Swizzled views read the swizzle texture,
    /// which `generate_swizzles` must have brought up to date.
    pub fn get_srv(&mut self, device: &D, sampler: &SamplerState) -> Result<D::ShaderResourceView> {
        let base_level = sampler.base_level + self.desc.top_level;
        let available = self.mip_levels.saturating_sub(base_level).max(1);
        let level_count = sampler.level_count().min(available);
        let key = SrvKey {
            base_level,
            level_count,
            swizzle: !sampler.swizzle.is_identity(),
            level_zero: self.use_level_zero_texture,
        };
        if let Some(view) = self.srv_cache.get(&key) {
            return Ok(view.clone());
        }

        let (texture, format, most_detailed_mip, mip_levels) = if key.swizzle {
            (self.get_swizzle_texture(device)?, self.format.swizzle_format, base_level, level_count)
        } else if key.level_zero {
            (self.get_level_zero_texture(device)?, self.format.srv_format, 0, 1)
        } else {
            (self.get_resource(device)?, self.format.srv_format, base_level, level_count)
        };
        let desc = SrvDesc {
            format,
            dimension: self.srv_dimension(),
            most_detailed_mip,
            mip_levels,
            first_array_slice: 0,
            array_size: self.layer_count(),
        };
        let view = device.create_shader_resource_view(&texture, &desc)?;
        self.srv_cache.insert(key, view.clone());
        Ok(view)
    }

    #[inline]
    pub fn srv_cache_len(&self) -> usize {
        self.srv_cache.len()
    }

    /// Renders every level whose swizzle texture contents don't match `swizzle`.
    pub fn generate_swizzles(&mut self, device: &D, swizzle: &SwizzleState) -> Result<()> {
        for level in self.desc.top_level..self.mip_levels {
            if self.swizzle_cache[level as usize] == Some(*swizzle) {
                continue;
            }
            let source = self.swizzle_source(device, level)?;
            let dest = self.swizzle_render_target(device, level)?;
            let size = Vector2I::new(mip_extent(self.desc.width, level) as i32,
                                     mip_extent(self.desc.height, level) as i32);
            device.swizzle(&source, &dest, size, swizzle.channels())?;
            self.swizzle_cache[level as usize] = Some(*swizzle);
        }
        Ok(())
    }

    fn swizzle_source(&mut self, device: &D, level: u32) -> Result<D::ShaderResourceView> {
        if let Some(ref view) = self.swizzle_sources[level as usize] {
            return Ok(view.clone());
        }
        let texture = self.get_resource(device)?;
        let desc = SrvDesc {
            format: self.format.srv_format,
            dimension: match self.desc.shape {
                TextureShape::TwoD => SrvDimension::Texture2D,
                TextureShape::Cube | TextureShape::TwoDArray => SrvDimension::Texture2DArray,
                TextureShape::ThreeD => SrvDimension::Texture3D,
            },
            most_detailed_mip: level,
            mip_levels: 1,
            first_array_slice: 0,
            array_size: self.layer_count(),
        };
        let view = device.create_shader_resource_view(&texture, &desc)?;
        self.swizzle_sources[level as usize] = Some(view.clone());
        Ok(view)
    }

    fn swizzle_render_target(&mut self, device: &D, level: u32)
                             -> Result<D::RenderTargetView> {
        if let Some(ref view) = self.swizzle_render_targets[level as usize] {
            return Ok(view.clone());
        }
        let texture = self.get_swizzle_texture(device)?;
        let dimension = match self.desc.shape {
            TextureShape::TwoD => RtvDimension::Texture2D { mip_slice: level },
            TextureShape::Cube | TextureShape::TwoDArray => {
                RtvDimension::Texture2DArray {
                    mip_slice: level,
                    first_array_slice: 0,
                    array_size: self.layer_count(),
                }
            }
            TextureShape::ThreeD => {
                RtvDimension::Texture3D {
                    mip_slice: level,
                    first_w_slice: 0,
                    w_size: mip_extent(self.desc.depth, level),
                }
            }
        };
        let desc = RtvDesc { format: self.format.swizzle_format, dimension };
        let view = device.create_render_target_view(&texture, &desc)?;
        self.swizzle_render_targets[level as usize] = Some(view.clone());
        Ok(view)
    }

    /// Forgets the swizzle rendered for GL level `level`, after its contents changed.
    pub fn invalidate_swizzle_cache_level(&mut self, level: u32) {
        let level = (level + self.desc.top_level) as usize;
        if level < self.swizzle_cache.len() {
            self.swizzle_cache[level] = None;
        }
    }

    pub fn invalidate_swizzle_cache(&mut self) {
        for swizzle in &mut self.swizzle_cache {
            *swizzle = None;
        }
    }

    /// Returns the render target for image `index`, creating its views on first use.
    pub fn get_render_target(&mut self, device: &D, index: ImageIndex)
                             -> Result<&RenderTarget<D>> {
        if !self.desc.render_target {
            return Err(Error::Unsupported("texture storage is not renderable".to_owned()));
        }
        let use_level_zero = self.use_level_zero_texture && index.level + self.desc.top_level == 0;
        if use_level_zero {
            if !self.level_zero_render_targets.contains_key(&index.layer) {
                let render_target = self.create_render_target(device, index, true)?;
                self.level_zero_render_targets.insert(index.layer, render_target);
            }
            return Ok(&self.level_zero_render_targets[&index.layer]);
        }
        if !self.render_targets.contains_key(&index) {
            let render_target = self.create_render_target(device, index, false)?;
            self.render_targets.insert(index, render_target);
        }
        Ok(&self.render_targets[&index])
    }

    fn create_render_target(&mut self, device: &D, index: ImageIndex, use_level_zero: bool)
                            -> Result<RenderTarget<D>> {
        let (texture, level, mip_levels) = if use_level_zero {
            (self.get_level_zero_texture(device)?, 0, 1)
        } else {
            (self.get_resource(device)?, index.level + self.desc.top_level, self.mip_levels)
        };
        let layer = index.layer;
        let (width, height, _) = self.level_size(index.level);
        let depth_stencil = self.format.dsv_format != NativeFormat::Unknown;

        let mut views = RenderTargetViews {
            render_target_view: None,
            depth_stencil_view: None,
            shader_resource_view: None,
        };
        if self.format.srv_format != NativeFormat::Unknown {
            let (dimension, first_array_slice) = match self.desc.shape {
                TextureShape::TwoD => (SrvDimension::Texture2D, 0),
                TextureShape::Cube | TextureShape::TwoDArray => {
                    (SrvDimension::Texture2DArray, layer)
                }
                TextureShape::ThreeD => (SrvDimension::Texture3D, 0),
            };
            let desc = SrvDesc {
                format: self.format.srv_format,
                dimension,
                most_detailed_mip: level,
                mip_levels: 1,
                first_array_slice,
                array_size: 1,
            };
            views.shader_resource_view = Some(device.create_shader_resource_view(&texture, &desc)?);
        }

        let native_format = if depth_stencil {
            let dimension = match self.desc.shape {
                TextureShape::TwoD => DsvDimension::Texture2D { mip_slice: level },
                TextureShape::Cube | TextureShape::TwoDArray => {
                    DsvDimension::Texture2DArray {
                        mip_slice: level,
                        first_array_slice: layer,
                        array_size: 1,
                    }
                }
                TextureShape::ThreeD => {
                    return Err(Error::Unsupported("3D depth textures are not renderable"
                                                  .to_owned()))
                }
            };
            let desc = DsvDesc { format: self.format.dsv_format, dimension };
            views.depth_stencil_view = Some(device.create_depth_stencil_view(&texture, &desc)?);
            self.format.dsv_format
        } else {
            let dimension = match self.desc.shape {
                TextureShape::TwoD => RtvDimension::Texture2D { mip_slice: level },
                TextureShape::Cube | TextureShape::TwoDArray => {
                    RtvDimension::Texture2DArray {
                        mip_slice: level,
                        first_array_slice: layer,
                        array_size: 1,
                    }
                }
                TextureShape::ThreeD => {
                    RtvDimension::Texture3D { mip_slice: level, first_w_slice: layer, w_size: 1 }
                }
            };
            let desc = RtvDesc { format: self.format.rtv_format, dimension };
            views.render_target_view = Some(device.create_render_target_view(&texture, &desc)?);
            self.format.rtv_format
        };

        let subresource = match self.desc.shape {
            TextureShape::TwoD | TextureShape::ThreeD => calc_subresource(level, 0, mip_levels),
            TextureShape::Cube | TextureShape::TwoDArray => {
                calc_subresource(level, layer, mip_levels)
            }
        };
        debug!("created render target for {:?} level {} layer {}",
               self.desc.shape,
               index.level,
               layer);
        Ok(RenderTarget::from_views(texture,
                                    subresource,
                                    views,
                                    (width, height, 1),
                                    self.desc.internal_format,
                                    native_format,
                                    0))
    }

    /// Uploads tightly packed texels into image `index`.
    pub fn set_data(&mut self,
                    device: &D,
                    index: ImageIndex,
                    region: Option<&NativeBox>,
                    data: &[u8],
                    row_pitch: usize,
                    depth_pitch: usize)
                    -> Result<()> {
        let texture = self.get_resource(device)?;
        let subresource = self.subresource_index(index);
        let region = self.layer_region(index, region);
        device.update_texture(&texture, subresource, region.as_ref(), data, row_pitch, depth_pitch);
        if index.level + self.desc.top_level == 0 {
            if let Some(ref level_zero) = self.level_zero_texture {
                device.update_texture(level_zero,
                                      calc_subresource(0, index.layer, 1),
                                      region.as_ref(),
                                      data,
                                      row_pitch,
                                      depth_pitch);
            }
        }
        self.invalidate_swizzle_cache_level(index.level);
        Ok(())
    }

    // 3D images address their slice through the box rather than the subresource.
    fn layer_region(&self, index: ImageIndex, region: Option<&NativeBox>) -> Option<NativeBox> {
        if self.desc.shape != TextureShape::ThreeD {
            return region.cloned();
        }
        let (width, height, _) = self.level_size(index.level);
        match region {
            Some(region) => Some(*region),
            None => {
                Some(NativeBox {
                    left: 0,
                    top: 0,
                    front: index.layer,
                    right: width,
                    bottom: height,
                    back: index.layer + 1,
                })
            }
        }
    }

    /// Copies every level both storages have into `dest`.
    pub fn copy_to_storage(&mut self, device: &D, dest: &mut TextureStorage<D>) -> Result<()> {
        let source = self.get_resource(device)?;
        let target = dest.get_resource(device)?;
        let levels = self.level_count().min(dest.level_count());
        let layers = self.layer_count().min(dest.layer_count());
        for level in 0..levels {
            if self.level_size(level) != dest.level_size(level) {
                continue;
            }
            for layer in 0..layers {
                let index = ImageIndex::layer(level, layer);
                device.copy_subresource_region(&target,
                                               dest.subresource_index(index),
                                               0,
                                               0,
                                               0,
                                               &source,
                                               self.subresource_index(index),
                                               None);
            }
            dest.invalidate_swizzle_cache_level(level);
        }
        Ok(())
    }

    /// Fills image `dest` by filtering image `source` down to its size.
    pub fn generate_mipmap(&mut self, device: &D, source: ImageIndex, dest: ImageIndex)
                           -> Result<()> {
        let source_target = self.get_render_target(device, source)?.clone();
        let dest_target = self.get_render_target(device, dest)?.clone();
        let (source_view, dest_view) = match (source_target.shader_resource_view(),
                                              dest_target.render_target_view()) {
            (Some(source_view), Some(dest_view)) => (source_view, dest_view),
            _ => {
                return Err(Error::Unsupported("mipmap generation needs a color format"
                                              .to_owned()))
            }
        };
        let source_size = source_target.size();
        let dest_size = dest_target.size();
        device.blit(&BlitParams {
            kind: BlitKind::Color {
                source: source_view,
                dest: dest_view,
                filter: BlitFilter::Linear,
            },
            source_area: RectI::new(Vector2I::zero(), source_size),
            source_size,
            dest_area: RectI::new(Vector2I::zero(), dest_size),
            dest_size,
            scissor: None,
        })?;
        self.invalidate_swizzle_cache_level(dest.level);
        Ok(())
    }
}
