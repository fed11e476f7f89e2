// tangent/renderer/src/resources.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The logical objects GL names refer to.
//!
//! Dropping an object drops every native resource and view it owns.

use crate::buffer::Buffer;
use crate::gl::{BufferId, RenderbufferId, TextureId};
use crate::renderbuffer::Renderbuffer;
use crate::swap_chain::SwapChain;
use crate::texture::Texture;
use crate::texture_storage::TextureShape;
use fxhash::FxHashMap;
use tangent_gpu::Device;

pub struct ResourceManager<D> where D: Device {
    buffers: FxHashMap<BufferId, Buffer<D>>,
    textures: FxHashMap<TextureId, Texture<D>>,
    renderbuffers: FxHashMap<RenderbufferId, Renderbuffer<D>>,
    swap_chain: Option<SwapChain<D>>,
    next_name: u32,
}

impl<D> ResourceManager<D> where D: Device {
    pub fn new() -> ResourceManager<D> {
        ResourceManager {
            buffers: FxHashMap::default(),
            textures: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            swap_chain: None,
            next_name: 1,
        }
    }

    fn next_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    pub fn create_buffer(&mut self, max_uniform_block_size: usize, stream_output_capable: bool)
                         -> BufferId {
        let id = BufferId(self.next_name());
        self.buffers.insert(id, Buffer::new(max_uniform_block_size, stream_output_capable));
        id
    }

    #[inline]
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer<D>> {
        self.buffers.get(&id)
    }

    #[inline]
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer<D>> {
        self.buffers.get_mut(&id)
    }

    pub fn delete_buffer(&mut self, id: BufferId) -> bool {
        self.buffers.remove(&id).is_some()
    }

    /// Creates a texture. Textures made with `level_zero_workaround` sample unmipped reads
    /// from a single-level copy.
    pub fn create_texture(&mut self, shape: TextureShape, level_zero_workaround: bool)
                          -> TextureId {
        let id = TextureId(self.next_name());
        self.textures.insert(id, Texture::new(id, shape, level_zero_workaround));
        id
    }

    #[inline]
    pub fn texture(&self, id: TextureId) -> Option<&Texture<D>> {
        self.textures.get(&id)
    }

    #[inline]
    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture<D>> {
        self.textures.get_mut(&id)
    }

    pub fn delete_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(&id).is_some()
    }

    pub fn create_renderbuffer(&mut self) -> RenderbufferId {
        let id = RenderbufferId(self.next_name());
        self.renderbuffers.insert(id, Renderbuffer::new(id));
        id
    }

    #[inline]
    pub fn renderbuffer(&self, id: RenderbufferId) -> Option<&Renderbuffer<D>> {
        self.renderbuffers.get(&id)
    }

    #[inline]
    pub fn renderbuffer_mut(&mut self, id: RenderbufferId) -> Option<&mut Renderbuffer<D>> {
        self.renderbuffers.get_mut(&id)
    }

    pub fn delete_renderbuffer(&mut self, id: RenderbufferId) -> bool {
        self.renderbuffers.remove(&id).is_some()
    }

    #[inline]
    pub fn set_swap_chain(&mut self, swap_chain: Option<SwapChain<D>>) {
        self.swap_chain = swap_chain;
    }

    #[inline]
    pub fn swap_chain(&self) -> Option<&SwapChain<D>> {
        self.swap_chain.as_ref()
    }

    #[inline]
    pub fn swap_chain_mut(&mut self) -> Option<&mut SwapChain<D>> {
        self.swap_chain.as_mut()
    }

    /// Drops every object. Used after device loss, when their native resources are gone.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.renderbuffers.clear();
        self.swap_chain = None;
    }
}

impl<D> Default for ResourceManager<D> where D: Device {
    #[inline]
    fn default() -> ResourceManager<D> {
        ResourceManager::new()
    }
}
