// tangent/renderer/src/index_data.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Index buffer translation: range computation, 8-bit index widening, and the generated
//! index lists that emulate line loops and triangle fans.

use crate::buffer::{Buffer, BufferUsage};
use crate::error::{Error, Result};
use crate::gl::IndexType;
use crate::streaming_buffer::{StreamingBuffer, INITIAL_INDEX_BUFFER_SIZE};
use fxhash::FxHashMap;
use std::mem;
use tangent_gpu::{BindFlags, Device, IndexFormat};

/// The smallest and largest index a draw reads, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub start: u32,
    pub end: u32,
}

impl IndexRange {
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

pub fn compute_index_range(index_type: IndexType, data: &[u8], count: usize) -> IndexRange {
    let count = count.min(data.len() / index_type.bytes());
    if count == 0 {
        return IndexRange { start: 0, end: 0 };
    }
    let (mut start, mut end) = (!0, 0);
    for index in 0..count {
        let value = index_type.read(data, index);
        start = start.min(value);
        end = end.max(value);
    }
    IndexRange { start, end }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct IndexRangeKey {
    index_type: IndexType,
    offset: usize,
    count: usize,
}

/// Remembers the ranges computed over an element array buffer until it is written.
#[derive(Clone, Debug, Default)]
pub struct IndexRangeCache {
    ranges: FxHashMap<IndexRangeKey, IndexRange>,
}

impl IndexRangeCache {
    #[inline]
    pub fn new() -> IndexRangeCache {
        IndexRangeCache::default()
    }

    pub fn add(&mut self, index_type: IndexType, offset: usize, count: usize, range: IndexRange) {
        self.ranges.insert(IndexRangeKey { index_type, offset, count }, range);
    }

    pub fn find(&self, index_type: IndexType, offset: usize, count: usize) -> Option<IndexRange> {
        self.ranges.get(&IndexRangeKey { index_type, offset, count }).cloned()
    }

    /// Drops every cached range that touches `offset..=(offset + size)`. Both bounds are
    /// inclusive, so a range ending exactly where the write starts is dropped too.
    pub fn invalidate_range(&mut self, offset: usize, size: usize) {
        let invalidate_end = offset + size;
        self.ranges.retain(|key, _| {
            let range_end = key.offset + key.count * key.index_type.bytes();
            invalidate_end < key.offset || offset > range_end
        });
    }

    #[inline]
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Where the vertices of an emulated draw come from.
#[derive(Clone, Copy, Debug)]
pub enum IndexSource<'a> {
    /// Vertices are consecutive, starting at zero.
    Unindexed,
    Indexed { data: &'a [u8], index_type: IndexType },
}

impl<'a> IndexSource<'a> {
    #[inline]
    fn index(&self, position: usize) -> u32 {
        match *self {
            IndexSource::Unindexed => position as u32,
            IndexSource::Indexed { data, index_type } => index_type.read(data, position),
        }
    }
}

const MAX_GENERATED_INDICES: u64 = (u32::max_value() as u64) / (mem::size_of::<u32>() as u64);

/// The indices that draw a line loop of `count` vertices as a line strip: every vertex in
/// order, then the first one again.
pub fn line_loop_indices(source: IndexSource, count: u32) -> Result<Vec<u32>> {
    let index_count = count as u64 + 1;
    if index_count > MAX_GENERATED_INDICES {
        return Err(Error::out_of_memory("too many indices required to emulate a line loop"));
    }
    let mut indices = Vec::with_capacity(index_count as usize);
    for position in 0..(count as usize) {
        indices.push(source.index(position));
    }
    if count > 0 {
        indices.push(source.index(0));
    }
    Ok(indices)
}

/// The indices that draw a triangle fan of `count` vertices as a triangle list.
pub fn triangle_fan_indices(source: IndexSource, count: u32) -> Result<Vec<u32>> {
    let triangle_count = count.saturating_sub(2) as u64;
    if triangle_count * 3 > MAX_GENERATED_INDICES {
        return Err(Error::out_of_memory("too many indices required to emulate a triangle fan"));
    }
    let mut indices = Vec::with_capacity((triangle_count * 3) as usize);
    let center = source.index(0);
    for triangle in 0..(triangle_count as usize) {
        indices.push(center);
        indices.push(source.index(triangle + 1));
        indices.push(source.index(triangle + 2));
    }
    Ok(indices)
}

pub(crate) fn index_bytes(indices: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(indices.len() * 4);
    for index in indices {
        bytes.extend_from_slice(&index.to_le_bytes());
    }
    bytes
}

/// Where the indices of a `draw_elements` call live.
pub enum ElementSource<'a, D> where D: Device {
    Buffer { buffer: &'a mut Buffer<D>, offset: usize },
    Client(&'a [u8]),
}

/// The native index buffer binding for one indexed draw.
pub struct TranslatedIndexData<D> where D: Device {
    pub index_range: IndexRange,
    pub index_type: IndexType,
    pub index_format: IndexFormat,
    pub buffer: D::Buffer,
    /// Byte offset to bind the buffer at.
    pub start_offset: u32,
}

impl<D> Clone for TranslatedIndexData<D> where D: Device {
    fn clone(&self) -> TranslatedIndexData<D> {
        TranslatedIndexData {
            index_range: self.index_range,
            index_type: self.index_type,
            index_format: self.index_format,
            buffer: self.buffer.clone(),
            start_offset: self.start_offset,
        }
    }
}

pub struct IndexDataManager<D> where D: Device {
    short_indices: StreamingBuffer<D>,
    int_indices: StreamingBuffer<D>,
}

impl<D> IndexDataManager<D> where D: Device {
    pub fn new() -> IndexDataManager<D> {
        IndexDataManager {
            short_indices: StreamingBuffer::new(BindFlags::INDEX_BUFFER),
            int_indices: StreamingBuffer::new(BindFlags::INDEX_BUFFER),
        }
    }

    pub fn prepare_index_data(&mut self,
                              device: &D,
                              index_type: IndexType,
                              count: usize,
                              source: ElementSource<D>)
                              -> Result<TranslatedIndexData<D>> {
        // The native API has no 8-bit index format.
        let index_format = match index_type {
            IndexType::UnsignedInt => IndexFormat::Uint32,
            IndexType::UnsignedByte | IndexType::UnsignedShort => IndexFormat::Uint16,
        };
        let byte_count = count * index_type.bytes();

        match source {
            ElementSource::Buffer { buffer, offset } => {
                let aligned = offset % index_type.bytes() == 0;
                let direct = buffer.supports_direct_binding() &&
                    index_type != IndexType::UnsignedByte && aligned;

                let cached_range = buffer.index_range_cache().find(index_type, offset, count);
                let index_range = match cached_range {
                    Some(index_range) => index_range,
                    None => {
                        let index_range = {
                            let data = buffer.get_data(device)?;
                            let data = element_slice(data, offset, byte_count)?;
                            compute_index_range(index_type, data, count)
                        };
                        buffer.index_range_cache().add(index_type, offset, count, index_range);
                        index_range
                    }
                };

                if direct {
                    let native = buffer.get_buffer(device, BufferUsage::Index)?;
                    return Ok(TranslatedIndexData {
                        index_range,
                        index_type,
                        index_format,
                        buffer: native,
                        start_offset: offset as u32,
                    });
                }

                let data = buffer.get_data(device)?;
                let data = element_slice(data, offset, byte_count)?;
                self.stream_indices(device, index_type, index_format, data, count, index_range)
            }
            ElementSource::Client(data) => {
                let data = element_slice(data, 0, byte_count)?;
                let index_range = compute_index_range(index_type, data, count);
                self.stream_indices(device, index_type, index_format, data, count, index_range)
            }
        }
    }

    fn stream_indices(&mut self,
                      device: &D,
                      index_type: IndexType,
                      index_format: IndexFormat,
                      data: &[u8],
                      count: usize,
                      index_range: IndexRange)
                      -> Result<TranslatedIndexData<D>> {
        let stream = match index_format {
            IndexFormat::Uint16 => &mut self.short_indices,
            IndexFormat::Uint32 => &mut self.int_indices,
        };
        if stream.buffer().is_none() {
            stream.reserve(device, INITIAL_INDEX_BUFFER_SIZE)?;
        }

        let (buffer, offset) = if index_type == IndexType::UnsignedByte {
            let mut widened = Vec::with_capacity(count * 2);
            for &index in &data[0..count] {
                widened.extend_from_slice(&(index as u16).to_le_bytes());
            }
            stream.write(device, &widened)?
        } else {
            stream.write(device, data)?
        };

        Ok(TranslatedIndexData {
            index_range,
            index_type,
            index_format,
            buffer,
            start_offset: offset as u32,
        })
    }
}

pub(crate) fn element_slice(data: &[u8], offset: usize, size: usize) -> Result<&[u8]> {
    data.get(offset..(offset + size))
        .ok_or_else(|| Error::Unsupported("index data out of bounds".to_owned()))
}
