// tangent/renderer/src/streaming_buffer.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ring-style scratch buffers for data that is converted or generated per draw.

use crate::error::{Error, Result};
use tangent_gpu::desc::{BufferDesc, Usage};
use tangent_gpu::{BindFlags, CpuAccessFlags, Device};

pub const INITIAL_INDEX_BUFFER_SIZE: usize = 4096 * 4;
pub const INITIAL_VERTEX_BUFFER_SIZE: usize = 1024 * 1024;

/// Appends data at a write cursor. When the data doesn't fit the cursor wraps to the start,
/// and when it can never fit the buffer is replaced by one at least twice as large.
pub struct StreamingBuffer<D> where D: Device {
    bind_flags: BindFlags,
    buffer: Option<D::Buffer>,
    capacity: usize,
    write_position: usize,
}

impl<D> StreamingBuffer<D> where D: Device {
    pub fn new(bind_flags: BindFlags) -> StreamingBuffer<D> {
        StreamingBuffer { bind_flags, buffer: None, capacity: 0, write_position: 0 }
    }

    pub fn reserve(&mut self, device: &D, size: usize) -> Result<()> {
        if size > self.capacity || self.buffer.is_none() {
            let capacity = size.max(self.capacity * 2).max(1);
            let desc = BufferDesc {
                byte_width: capacity,
                usage: Usage::Dynamic,
                bind_flags: self.bind_flags,
                cpu_access: CpuAccessFlags::WRITE,
            };
            let buffer = device.create_buffer(&desc, None)?;
            debug!("growing {:?} streaming buffer to {} bytes", self.bind_flags, capacity);
            self.buffer = Some(buffer);
            self.capacity = capacity;
            self.write_position = 0;
        } else if self.write_position + size > self.capacity {
            self.write_position = 0;
        }
        Ok(())
    }

    /// Writes `data` and returns the buffer and the byte offset it landed at.
    pub fn write(&mut self, device: &D, data: &[u8]) -> Result<(D::Buffer, usize)> {
        self.reserve(device, data.len())?;
        let buffer = match self.buffer {
            Some(ref buffer) => buffer.clone(),
            None => return Err(Error::out_of_memory("streaming buffer has no storage")),
        };
        let offset = self.write_position;
        device.update_buffer(&buffer, offset, data);
        self.write_position += data.len();
        Ok((buffer, offset))
    }

    #[inline]
    pub fn buffer(&self) -> Option<&D::Buffer> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod test {
    use super::StreamingBuffer;
    use tangent_gpu::{BindFlags, CreateDeviceFlags, DriverType, FeatureLevel, NativeObject};
    use tangent_gpu::Platform;
    use tangent_soft::{SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    #[test]
    fn test_writes_append_then_wrap() {
        let device = device();
        let mut buffer = StreamingBuffer::new(BindFlags::INDEX_BUFFER);
        buffer.reserve(&device, 16).unwrap();
        let (first, offset) = buffer.write(&device, &[1; 8]).unwrap();
        assert_eq!(offset, 0);
        let (_, offset) = buffer.write(&device, &[2; 8]).unwrap();
        assert_eq!(offset, 8);
        let (wrapped, offset) = buffer.write(&device, &[3; 8]).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(first.object_id(), wrapped.object_id());
        assert_eq!(wrapped.contents(), [[3; 8], [2; 8]].concat());
    }

    #[test]
    fn test_oversized_write_grows() {
        let device = device();
        let mut buffer = StreamingBuffer::new(BindFlags::VERTEX_BUFFER);
        buffer.reserve(&device, 8).unwrap();
        let (_, offset) = buffer.write(&device, &[0; 20]).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(buffer.capacity(), 20);
        buffer.write(&device, &[0; 24]).unwrap();
        assert_eq!(buffer.capacity(), 40);
    }
}
