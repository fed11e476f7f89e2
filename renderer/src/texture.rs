// tangent/renderer/src/texture.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GL texture objects.

use crate::error::{Error, Result};
use crate::formats::{self, InternalFormat, PixelFormat, PixelType};
use crate::gl::{SamplerState, TextureId};
use crate::render_target::RenderTarget;
use crate::texture_storage::{ImageIndex, StorageDesc, TextureShape, TextureStorage};
use tangent_gpu::desc::NativeBox;
use tangent_gpu::format::NativeFormat;
use tangent_gpu::Device;

/// Tightly packed client pixels.
#[derive(Clone, Copy, Debug)]
pub struct ClientPixels<'a> {
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    pub data: &'a [u8],
}

pub struct Texture<D> where D: Device {
    id: TextureId,
    shape: TextureShape,
    internal_format: Option<InternalFormat>,
    /// Size of native level zero, as implied by the images defined so far.
    base_size: (u32, u32, u32),
    immutable: bool,
    sampler: SamplerState,
    storage: Option<TextureStorage<D>>,
    level_zero_workaround: bool,
    dirty: bool,
}

impl<D> Texture<D> where D: Device {
    pub fn new(id: TextureId, shape: TextureShape, level_zero_workaround: bool) -> Texture<D> {
        Texture {
            id,
            shape,
            internal_format: None,
            base_size: (0, 0, 0),
            immutable: false,
            sampler: SamplerState::default(),
            storage: None,
            level_zero_workaround,
            dirty: false,
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> TextureShape {
        self.shape
    }

    #[inline]
    pub fn internal_format(&self) -> Option<InternalFormat> {
        self.internal_format
    }

    #[inline]
    pub fn sampler_state(&self) -> &SamplerState {
        &self.sampler
    }

    #[inline]
    pub fn set_sampler_state(&mut self, sampler: SamplerState) {
        self.sampler = sampler;
    }

    #[inline]
    pub fn storage(&self) -> Option<&TextureStorage<D>> {
        self.storage.as_ref()
    }

    #[inline]
    pub fn storage_mut(&mut self) -> Option<&mut TextureStorage<D>> {
        self.storage.as_mut()
    }

    /// Whether the contents changed since the last `clear_dirty`.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Allocates immutable storage with `levels` levels.
    pub fn set_storage(&mut self,
                       device: &D,
                       internal_format: InternalFormat,
                       levels: u32,
                       size: (u32, u32, u32))
                       -> Result<()> {
        let desc = self.storage_desc(device, internal_format, size, levels);
        let mut storage = TextureStorage::new(device, &desc, self.level_zero_workaround);
        storage.get_resource(device)?;
        self.storage = Some(storage);
        self.internal_format = Some(internal_format);
        self.base_size = (desc.width, desc.height, desc.depth);
        self.immutable = true;
        self.dirty = true;
        Ok(())
    }

    fn storage_desc(&self,
                    device: &D,
                    internal_format: InternalFormat,
                    size: (u32, u32, u32),
                    levels: u32)
                    -> StorageDesc {
        let format = formats::texture_format(internal_format, device.feature_level());
        let renderable = format.rtv_format != NativeFormat::Unknown ||
            format.dsv_format != NativeFormat::Unknown;
        StorageDesc {
            shape: self.shape,
            internal_format,
            width: size.0,
            height: size.1,
            depth: size.2,
            levels,
            top_level: 0,
            render_target: renderable,
        }
    }

    /// Defines image `index`. A size or format that disagrees with the current storage
    /// reallocates it, keeping the levels that still fit.
    pub fn set_image(&mut self,
                     device: &D,
                     index: ImageIndex,
                     internal_format: InternalFormat,
                     size: (u32, u32, u32),
                     pixels: Option<ClientPixels>)
                     -> Result<()> {
        if self.immutable {
            return Err(Error::Unsupported("immutable textures can't be redefined".to_owned()));
        }
        let base_size = match self.shape {
            TextureShape::TwoD | TextureShape::Cube => {
                (size.0 << index.level, size.1 << index.level, 1)
            }
            TextureShape::TwoDArray => (size.0 << index.level, size.1 << index.level, size.2),
            TextureShape::ThreeD => {
                (size.0 << index.level, size.1 << index.level, size.2 << index.level)
            }
        };

        let compatible = match self.storage {
            Some(ref storage) => {
                storage.internal_format() == internal_format &&
                    index.level < storage.level_count() &&
                    storage.level_size(index.level).0 == size.0 &&
                    storage.level_size(index.level).1 == size.1
            }
            None => false,
        };
        if !compatible {
            let desc = self.storage_desc(device, internal_format, base_size, 0);
            let mut storage = TextureStorage::new(device, &desc, self.level_zero_workaround);
            if let Some(mut old) = self.storage.take() {
                if old.internal_format() == internal_format {
                    old.copy_to_storage(device, &mut storage)?;
                }
            }
            self.storage = Some(storage);
            self.internal_format = Some(internal_format);
            self.base_size = base_size;
        }

        if let Some(pixels) = pixels {
            let region = NativeBox {
                left: 0,
                top: 0,
                front: 0,
                right: size.0,
                bottom: size.1,
                back: if self.shape == TextureShape::Cube { 1 } else { size.2.max(1) },
            };
            self.upload(device, index, &region, &pixels)?;
        }
        self.dirty = true;
        Ok(())
    }

    /// Replaces the texels of `region` within image `index`. For array textures the box's
    /// front and back select layers.
    pub fn set_sub_image(&mut self,
                         device: &D,
                         index: ImageIndex,
                         region: &NativeBox,
                         pixels: &ClientPixels)
                         -> Result<()> {
        self.upload(device, index, region, pixels)?;
        self.dirty = true;
        Ok(())
    }

    fn upload(&mut self, device: &D, index: ImageIndex, region: &NativeBox, pixels: &ClientPixels)
              -> Result<()> {
        let shape = self.shape;
        let storage = match self.storage {
            Some(ref mut storage) => storage,
            None => return Err(Error::Unsupported("texture has no storage".to_owned())),
        };
        let native_format = storage.format().texture_format;
        let width = region.right.saturating_sub(region.left);
        let height = region.bottom.saturating_sub(region.top);
        let depth = region.back.saturating_sub(region.front).max(1);
        let slice_texels = (width * height) as usize;
        let client_slice_bytes = slice_texels * formats::pixel_bytes(pixels.format,
                                                                     pixels.pixel_type);
        let row_pitch = width as usize * native_format.pixel_bytes();
        let depth_pitch = row_pitch * height as usize;

        match shape {
            TextureShape::TwoDArray => {
                for (slice, layer) in (region.front..(region.front + depth)).enumerate() {
                    let start = (slice * client_slice_bytes).min(pixels.data.len());
                    let texels = formats::unpack_pixels(pixels.format,
                                                        pixels.pixel_type,
                                                        &pixels.data[start..],
                                                        slice_texels,
                                                        native_format);
                    let slice_region = NativeBox { front: 0, back: 1, ..*region };
                    storage.set_data(device,
                                     ImageIndex::layer(index.level, layer),
                                     Some(&slice_region),
                                     &texels,
                                     row_pitch,
                                     depth_pitch)?;
                }
            }
            TextureShape::TwoD | TextureShape::Cube | TextureShape::ThreeD => {
                let texels = formats::unpack_pixels(pixels.format,
                                                    pixels.pixel_type,
                                                    pixels.data,
                                                    slice_texels * depth as usize,
                                                    native_format);
                let region = if shape == TextureShape::ThreeD {
                    *region
                } else {
                    NativeBox { front: 0, back: 1, ..*region }
                };
                storage.set_data(device, index, Some(&region), &texels, row_pitch, depth_pitch)?;
            }
        }
        Ok(())
    }

    /// Returns the view to sample this texture with `sampler`, switching the storage to or
    /// from its level-zero copy and refreshing swizzled levels as needed.
    pub fn get_srv(&mut self, device: &D, sampler: &SamplerState)
                   -> Result<D::ShaderResourceView> {
        let level_zero_workaround = self.level_zero_workaround;
        let storage = match self.storage {
            Some(ref mut storage) => storage,
            None => return Err(Error::Unsupported("texture is incomplete".to_owned())),
        };
        if level_zero_workaround {
            storage.use_level_zero_workaround_texture(device, !sampler.is_mipmapped())?;
        }
        if !sampler.swizzle.is_identity() {
            storage.generate_swizzles(device, &sampler.swizzle)?;
        }
        storage.get_srv(device, sampler)
    }

    pub fn get_render_target(&mut self, device: &D, index: ImageIndex)
                             -> Result<RenderTarget<D>> {
        match self.storage {
            Some(ref mut storage) => Ok(storage.get_render_target(device, index)?.clone()),
            None => Err(Error::Unsupported("texture has no storage".to_owned())),
        }
    }

    /// Marks an image as rendered to, so swizzled copies of it are refreshed before sampling.
    pub fn mark_rendered(&mut self, index: ImageIndex) {
        if let Some(ref mut storage) = self.storage {
            storage.invalidate_swizzle_cache_level(index.level);
        }
        self.dirty = true;
    }

    /// Fills every level below the base level by filtering the level above it.
    pub fn generate_mipmap(&mut self, device: &D) -> Result<()> {
        if self.shape == TextureShape::ThreeD {
            return Err(Error::Unsupported("3D mipmap generation".to_owned()));
        }
        let storage = match self.storage {
            Some(ref mut storage) => storage,
            None => return Err(Error::Unsupported("texture has no storage".to_owned())),
        };
        for level in 1..storage.level_count() {
            for layer in 0..storage.layer_count() {
                storage.generate_mipmap(device,
                                        ImageIndex::layer(level - 1, layer),
                                        ImageIndex::layer(level, layer))?;
            }
        }
        self.dirty = true;
        Ok(())
    }

    #[inline]
    pub fn base_size(&self) -> (u32, u32, u32) {
        self.base_size
    }
}

#[cfg(test)]
mod test {
    use super::{ClientPixels, Texture};
    use crate::formats::{InternalFormat, PixelFormat, PixelType};
    use crate::gl::{FilterMode, SamplerState, TextureId};
    use crate::texture_storage::{ImageIndex, TextureShape};
    use tangent_gpu::desc::NativeBox;
    use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, NativeObject, Platform};
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    fn rgba(data: &[u8]) -> ClientPixels {
        ClientPixels { format: PixelFormat::Rgba, pixel_type: PixelType::UnsignedByte, data }
    }

    #[test]
    fn test_set_image_then_sub_image() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoD, false);
        let black = vec![0u8; 4 * 4 * 4];
        texture.set_image(&device,
                          ImageIndex::level(0),
                          InternalFormat::Rgba8,
                          (4, 4, 1),
                          Some(rgba(&black))).unwrap();
        assert!(texture.is_dirty());
        texture.clear_dirty();

        let white = [255u8; 8];
        let region = NativeBox { left: 1, top: 2, front: 0, right: 3, bottom: 3, back: 1 };
        texture.set_sub_image(&device, ImageIndex::level(0), &region, &rgba(&white)).unwrap();
        assert!(texture.is_dirty());

        let storage = texture.storage_mut().unwrap();
        let contents = storage.get_resource(&device).unwrap().subresource_contents(0);
        assert_eq!(&contents[(2 * 16 + 4)..(2 * 16 + 12)], &white[..]);
        assert_eq!(&contents[(2 * 16)..(2 * 16 + 4)], &[0u8, 0, 0, 0][..]);
    }

    #[test]
    fn test_defining_level_one_implies_base_size() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoD, false);
        texture.set_image(&device, ImageIndex::level(1), InternalFormat::Rgba8, (2, 2, 1), None)
               .unwrap();
        assert_eq!(texture.base_size(), (4, 4, 1));
        assert_eq!(texture.storage().unwrap().level_count(), 3);
    }

    #[test]
    fn test_redefinition_keeps_matching_levels() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoD, false);
        let red = [255u8, 0, 0, 255].repeat(4);
        texture.set_image(&device,
                          ImageIndex::level(1),
                          InternalFormat::Rgba8,
                          (2, 2, 1),
                          Some(rgba(&red))).unwrap();
        let first = texture.storage_mut().unwrap().get_resource(&device).unwrap();
        // A larger level zero forces new storage.
        texture.set_image(&device, ImageIndex::level(0), InternalFormat::Rgba8, (8, 8, 1), None)
               .unwrap();
        let second = texture.storage_mut().unwrap().get_resource(&device).unwrap();
        assert_ne!(first.object_id(), second.object_id());
        texture.set_image(&device, ImageIndex::level(0), InternalFormat::Rgba8, (8, 8, 1), None)
               .unwrap();
        let third = texture.storage_mut().unwrap().get_resource(&device).unwrap();
        assert_eq!(second.object_id(), third.object_id());
    }

    #[test]
    fn test_immutable_storage_rejects_redefinition() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoD, false);
        texture.set_storage(&device, InternalFormat::Rgba8, 1, (4, 4, 1)).unwrap();
        assert!(texture.set_image(&device,
                                  ImageIndex::level(0),
                                  InternalFormat::Rgba8,
                                  (4, 4, 1),
                                  None).is_err());
    }

    #[test]
    fn test_unmipped_sampling_uses_level_zero_copy() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoD, true);
        texture.set_storage(&device, InternalFormat::Rgba8, 3, (4, 4, 1)).unwrap();
        let sampler = SamplerState { min_filter: FilterMode::Nearest, ..SamplerState::default() };
        texture.get_srv(&device, &sampler).unwrap();
        assert!(texture.storage().unwrap().uses_level_zero_texture());
        texture.get_srv(&device, &SamplerState::default()).unwrap();
        assert!(!texture.storage().unwrap().uses_level_zero_texture());
    }

    #[test]
    fn test_array_upload_fills_each_layer() {
        let device = device();
        let mut texture = Texture::new(TextureId(1), TextureShape::TwoDArray, false);
        let mut data = [1u8, 1, 1, 1].repeat(4);
        data.extend([2u8, 2, 2, 2].repeat(4));
        texture.set_image(&device,
                          ImageIndex::level(0),
                          InternalFormat::Rgba8,
                          (2, 2, 2),
                          Some(rgba(&data))).unwrap();
        let storage = texture.storage_mut().unwrap();
        let resource = storage.get_resource(&device).unwrap();
        let second_layer = storage.subresource_index(ImageIndex::layer(0, 1));
        assert_eq!(resource.subresource_contents(second_layer), [2u8; 16].to_vec());
    }
}
