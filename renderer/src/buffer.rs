// tangent/renderer/src/buffer.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GL buffer objects backed by one native buffer per binding usage.
//!
//! The native API needs differently-flagged buffers for vertex, index, constant, and CPU
//! access, so each GL buffer keeps a set of storages stamped with data revisions. Writes land
//! in one storage and bump its revision; asking for a storage of another usage copies from the
//! most recent one on demand.

use crate::error::Result;
use crate::index_data::IndexRangeCache;
use std::sync::atomic::{AtomicU64, Ordering};
use tangent_gpu::desc::{BufferDesc, Usage};
use tangent_gpu::{BindFlags, CpuAccessFlags, Device};

/// The system-memory copy is freed after this many native reads without a CPU read.
const SYSTEM_MEMORY_USAGE_LIMIT: u32 = 5;

static NEXT_BUFFER_SERIAL: AtomicU64 = AtomicU64::new(1);

fn next_serial() -> u64 {
    NEXT_BUFFER_SERIAL.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Staging,
    VertexOrTransformFeedback,
    Index,
    Uniform,
    SystemMemory,
}

const BUFFER_USAGE_COUNT: usize = 5;

impl BufferUsage {
    #[inline]
    fn index(self) -> usize {
        match self {
            BufferUsage::Staging => 0,
            BufferUsage::VertexOrTransformFeedback => 1,
            BufferUsage::Index => 2,
            BufferUsage::Uniform => 3,
            BufferUsage::SystemMemory => 4,
        }
    }

    #[inline]
    fn is_mappable(self) -> bool {
        match self {
            BufferUsage::Staging | BufferUsage::SystemMemory => true,
            _ => false,
        }
    }
}

/// The GL usage hint a buffer's data store was specified with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataUsage {
    Static,
    Dynamic,
    Stream,
}

bitflags! {
    pub struct MapAccess: u32 {
        const READ  = 0x01;
        const WRITE = 0x02;
    }
}

struct BufferStorage<D> where D: Device {
    usage: BufferUsage,
    revision: u64,
    size: usize,
    data: StorageData<D>,
}

enum StorageData<D> where D: Device {
    Native(Option<D::Buffer>),
    SystemMemory(Vec<u8>),
}

struct MappedRange {
    offset: usize,
    data: Vec<u8>,
    write: bool,
}

pub struct Buffer<D> where D: Device {
    size: usize,
    data_usage: DataUsage,
    storages: [Option<BufferStorage<D>>; BUFFER_USAGE_COUNT],
    serial: u64,
    read_usage_count: u32,
    mapped: Option<MappedRange>,
    max_uniform_block_size: usize,
    stream_output_capable: bool,
    index_range_cache: IndexRangeCache,
}

impl<D> Buffer<D> where D: Device {
    pub fn new(max_uniform_block_size: usize, stream_output_capable: bool) -> Buffer<D> {
        Buffer {
            size: 0,
            data_usage: DataUsage::Static,
            storages: [None, None, None, None, None],
            serial: next_serial(),
            read_usage_count: 0,
            mapped: None,
            max_uniform_block_size,
            stream_output_capable,
            index_range_cache: IndexRangeCache::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[inline]
    pub fn data_usage(&self) -> DataUsage {
        self.data_usage
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Dynamic data goes through the streaming buffers instead of being bound directly.
    #[inline]
    pub fn supports_direct_binding(&self) -> bool {
        self.data_usage == DataUsage::Static
    }

    #[inline]
    pub fn index_range_cache(&mut self) -> &mut IndexRangeCache {
        &mut self.index_range_cache
    }

    pub fn set_data(&mut self, device: &D, data: Option<&[u8]>, size: usize, usage: DataUsage)
                    -> Result<()> {
        self.data_usage = usage;
        match data {
            Some(data) => self.set_sub_data(device, &data[0..size.min(data.len())], 0)?,
            None => {
                self.size = self.size.max(size);
                self.invalidate_static_data();
            }
        }
        Ok(())
    }

    pub fn set_sub_data(&mut self, device: &D, data: &[u8], offset: usize) -> Result<()> {
        let required_size = offset + data.len();
        if !data.is_empty() {
            let usage = if self.supports_direct_binding() {
                BufferUsage::Staging
            } else {
                BufferUsage::SystemMemory
            };
            let old_size = self.size;
            self.size = self.size.max(required_size);
            if let Err(error) = self.prepare_storage(device, usage) {
                self.size = old_size;
                return Err(error);
            }
            self.write_storage(device, usage, data, offset);
        }
        self.size = self.size.max(required_size);
        self.invalidate_static_data();
        Ok(())
    }

    fn write_storage(&mut self, device: &D, usage: BufferUsage, data: &[u8], offset: usize) {
        if let Some(ref mut storage) = self.storages[usage.index()] {
            match storage.data {
                StorageData::Native(Some(ref buffer)) => device.update_buffer(buffer, offset, data),
                StorageData::Native(None) => unreachable!(),
                StorageData::SystemMemory(ref mut bytes) => {
                    bytes[offset..(offset + data.len())].copy_from_slice(data)
                }
            }
            storage.revision += 1;
        }
    }

    /// Copies `size` bytes from `source` on the device.
    pub fn copy_sub_data(&mut self,
                         device: &D,
                         source: &mut Buffer<D>,
                         source_offset: usize,
                         dest_offset: usize,
                         size: usize)
                         -> Result<()> {
        let source_buffer = source.get_buffer(device, BufferUsage::Staging)?;
        self.copy_into_staging(device, &source_buffer, source_offset, dest_offset, size)
    }

    /// Copies between two ranges of this buffer. The native API forbids overlapping copies
    /// within one resource, so the data is routed through the vertex storage.
    pub fn copy_within(&mut self,
                       device: &D,
                       source_offset: usize,
                       dest_offset: usize,
                       size: usize)
                       -> Result<()> {
        let source_buffer = self.get_buffer(device, BufferUsage::VertexOrTransformFeedback)?;
        self.copy_into_staging(device, &source_buffer, source_offset, dest_offset, size)
    }

    fn copy_into_staging(&mut self,
                         device: &D,
                         source_buffer: &D::Buffer,
                         source_offset: usize,
                         dest_offset: usize,
                         size: usize)
                         -> Result<()> {
        self.size = self.size.max(dest_offset + size);
        let dest_buffer = self.get_buffer(device, BufferUsage::Staging)?;
        device.copy_buffer_region(&dest_buffer, dest_offset, source_buffer, source_offset, size);
        self.bump_revision(BufferUsage::Staging);
        self.invalidate_static_data();
        Ok(())
    }

    /// Maps a range of the buffer for CPU access through the staging storage.
    pub fn map(&mut self, device: &D, offset: usize, length: usize, access: MapAccess)
               -> Result<&mut [u8]> {
        debug_assert!(self.mapped.is_none());
        let staging = self.get_buffer(device, BufferUsage::Staging)?;
        if access.contains(MapAccess::WRITE) {
            self.bump_revision(BufferUsage::Staging);
            self.invalidate_static_data();
        }
        let data = device.read_buffer(&staging, offset, length)?;
        let mapped = self.mapped.get_or_insert(MappedRange {
            offset,
            data,
            write: access.contains(MapAccess::WRITE),
        });
        Ok(mapped.data.as_mut_slice())
    }

    pub fn unmap(&mut self, device: &D) -> Result<()> {
        let mapped = match self.mapped.take() {
            Some(mapped) => mapped,
            None => return Ok(()),
        };
        if mapped.write {
            if let Some(staging) = self.native_buffer(BufferUsage::Staging) {
                device.update_buffer(&staging, mapped.offset, &mapped.data);
            }
        }
        Ok(())
    }

    /// Records that transform feedback wrote into the vertex storage.
    pub fn mark_transform_feedback_usage(&mut self) {
        self.bump_revision(BufferUsage::VertexOrTransformFeedback);
        self.invalidate_static_data();
    }

    /// Returns the CPU copy of the buffer contents.
    pub fn get_data(&mut self, device: &D) -> Result<&[u8]> {
        self.prepare_storage(device, BufferUsage::SystemMemory)?;
        self.read_usage_count = 0;
        let size = self.size;
        match self.storages[BufferUsage::SystemMemory.index()] {
            Some(BufferStorage { data: StorageData::SystemMemory(ref bytes), .. }) => {
                Ok(&bytes[0..size])
            }
            _ => unreachable!(),
        }
    }

    /// Returns an up-to-date native buffer for `usage`.
    pub fn get_buffer(&mut self, device: &D, usage: BufferUsage) -> Result<D::Buffer> {
        debug_assert!(usage != BufferUsage::SystemMemory);
        self.prepare_storage(device, usage)?;
        let buffer = match self.native_buffer(usage) {
            Some(buffer) => buffer,
            None => unreachable!(),
        };
        self.mark_buffer_usage();
        Ok(buffer)
    }

    fn mark_buffer_usage(&mut self) {
        self.read_usage_count += 1;
        if self.read_usage_count <= SYSTEM_MEMORY_USAGE_LIMIT {
            return;
        }
        // Only drop the CPU copy once another storage holds the same data.
        let system_revision = match self.storages[BufferUsage::SystemMemory.index()] {
            Some(ref storage) => storage.revision,
            None => return,
        };
        let covered = self.storages.iter().flatten().any(|storage| {
            storage.usage != BufferUsage::SystemMemory && storage.revision >= system_revision
        });
        if covered {
            debug!("freeing system memory copy of buffer {}", self.serial);
            self.storages[BufferUsage::SystemMemory.index()] = None;
        }
    }

    fn native_buffer(&self, usage: BufferUsage) -> Option<D::Buffer> {
        match self.storages[usage.index()] {
            Some(BufferStorage { data: StorageData::Native(Some(ref buffer)), .. }) => {
                Some(buffer.clone())
            }
            _ => None,
        }
    }

    fn bump_revision(&mut self, usage: BufferUsage) {
        if let Some(ref mut storage) = self.storages[usage.index()] {
            storage.revision += 1;
        }
    }

    fn invalidate_static_data(&mut self) {
        self.index_range_cache.clear();
    }

    fn take_storage(&mut self, usage: BufferUsage) -> BufferStorage<D> {
        match self.storages[usage.index()].take() {
            Some(storage) => storage,
            None => BufferStorage::new(usage),
        }
    }

    fn put_storage(&mut self, storage: BufferStorage<D>) {
        let index = storage.usage.index();
        self.storages[index] = Some(storage);
    }

    fn latest_usage(&self) -> Option<BufferUsage> {
        let mut latest: Option<&BufferStorage<D>> = None;
        for storage in self.storages.iter().flatten() {
            if latest.map_or(true, |latest| storage.revision > latest.revision) {
                latest = Some(storage);
            }
        }
        latest.map(|storage| storage.usage)
    }

    /// Creates the storage for `usage` if needed, grows it to the buffer size, and brings its
    /// contents up to the latest revision.
    fn prepare_storage(&mut self, device: &D, usage: BufferUsage) -> Result<()> {
        let mut storage = self.take_storage(usage);
        let result = self.sync_storage(device, &mut storage);
        self.put_storage(storage);
        result
    }

    fn sync_storage(&mut self, device: &D, storage: &mut BufferStorage<D>) -> Result<()> {
        let mut recreated = false;
        let width = self.storage_width(storage.usage, self.size);
        if storage.size < width || storage.is_unallocated() {
            recreated = !storage.is_system_memory();
            self.resize_storage(device, storage, self.size, true)?;
        }

        let latest = self.latest_usage().and_then(|latest_usage| {
            let revision = self.storages[latest_usage.index()].as_ref()?.revision;
            Some((latest_usage, revision))
        });
        if let Some((latest_usage, latest_revision)) = latest {
            if latest_revision > storage.revision {
                // GPU-only storages can't be mapped, so copies between them and the CPU copy
                // go through staging.
                let mut source_usage = latest_usage;
                if latest_usage != BufferUsage::Staging && storage.usage != BufferUsage::Staging &&
                        (!latest_usage.is_mappable() || !storage.usage.is_mappable()) {
                    let mut staging = self.take_storage(BufferUsage::Staging);
                    let result = self.copy_storage(device, &mut staging, latest_usage);
                    staging.revision = latest_revision;
                    self.put_storage(staging);
                    result?;
                    source_usage = BufferUsage::Staging;
                }

                recreated |= self.copy_storage(device, storage, source_usage)?;
                storage.revision = latest_revision;
            }
        }

        if recreated {
            self.serial = next_serial();
        }
        Ok(())
    }

    /// Copies the whole of the storage for `source_usage` into `dest`. Returns true if the
    /// destination's native buffer had to be recreated.
    fn copy_storage(&self, device: &D, dest: &mut BufferStorage<D>, source_usage: BufferUsage)
                    -> Result<bool> {
        let source = match self.storages[source_usage.index()] {
            Some(ref source) => source,
            None => return Ok(false),
        };
        let recreated = dest.is_unallocated() || dest.size < self.storage_width(dest.usage,
                                                                                source.size);
        if recreated {
            self.resize_storage(device, dest, source.size, false)?;
        }

        let size = source.size.min(dest.size);
        match (&mut dest.data, &source.data) {
            (StorageData::Native(Some(dest_buffer)), StorageData::Native(Some(source_buffer))) => {
                device.copy_buffer_region(dest_buffer, 0, source_buffer, 0, size)
            }
            (StorageData::Native(Some(dest_buffer)), StorageData::SystemMemory(bytes)) => {
                device.update_buffer(dest_buffer, 0, &bytes[0..size.min(bytes.len())])
            }
            (StorageData::SystemMemory(bytes), StorageData::Native(Some(source_buffer))) => {
                debug_assert_eq!(source.usage, BufferUsage::Staging);
                let data = device.read_buffer(source_buffer, 0, size)?;
                bytes[0..size].copy_from_slice(&data);
            }
            (StorageData::SystemMemory(dest_bytes), StorageData::SystemMemory(source_bytes)) => {
                dest_bytes[0..size].copy_from_slice(&source_bytes[0..size])
            }
            _ => {}
        }
        Ok(recreated)
    }

    fn resize_storage(&self,
                      device: &D,
                      storage: &mut BufferStorage<D>,
                      size: usize,
                      preserve_data: bool)
                      -> Result<()> {
        let width = self.storage_width(storage.usage, size);
        match storage.data {
            StorageData::SystemMemory(ref mut bytes) => {
                if !preserve_data {
                    bytes.clear();
                }
                bytes.resize(width, 0);
            }
            StorageData::Native(ref mut native) => {
                let desc = self.native_desc(storage.usage, width);
                let new_buffer = device.create_buffer(&desc, None)?;
                debug!("resizing {:?} storage of buffer {} to {} bytes",
                       storage.usage,
                       self.serial,
                       width);
                if let (Some(old_buffer), true) = (native.as_ref(), preserve_data) {
                    device.copy_buffer_region(&new_buffer, 0, old_buffer, 0, storage.size);
                }
                *native = Some(new_buffer);
            }
        }
        storage.size = width;
        Ok(())
    }

    fn storage_width(&self, usage: BufferUsage, size: usize) -> usize {
        match usage {
            BufferUsage::SystemMemory => size,
            // Constant buffers hold whole 16-byte registers, and data past the maximum block
            // size is never visible to shaders.
            BufferUsage::Uniform => round_up_16(size.max(1)).min(self.max_uniform_block_size),
            _ => size.max(1),
        }
    }

    fn native_desc(&self, usage: BufferUsage, byte_width: usize) -> BufferDesc {
        match usage {
            BufferUsage::Staging => BufferDesc {
                byte_width,
                usage: Usage::Staging,
                bind_flags: BindFlags::empty(),
                cpu_access: CpuAccessFlags::READ | CpuAccessFlags::WRITE,
            },
            BufferUsage::VertexOrTransformFeedback => {
                let mut bind_flags = BindFlags::VERTEX_BUFFER;
                if self.stream_output_capable {
                    bind_flags |= BindFlags::STREAM_OUTPUT;
                }
                BufferDesc {
                    byte_width,
                    usage: Usage::Default,
                    bind_flags,
                    cpu_access: CpuAccessFlags::empty(),
                }
            }
            BufferUsage::Index => BufferDesc {
                byte_width,
                usage: Usage::Default,
                bind_flags: BindFlags::INDEX_BUFFER,
                cpu_access: CpuAccessFlags::empty(),
            },
            BufferUsage::Uniform => BufferDesc {
                byte_width,
                usage: Usage::Dynamic,
                bind_flags: BindFlags::CONSTANT_BUFFER,
                cpu_access: CpuAccessFlags::WRITE,
            },
            BufferUsage::SystemMemory => unreachable!(),
        }
    }
}

impl<D> BufferStorage<D> where D: Device {
    fn new(usage: BufferUsage) -> BufferStorage<D> {
        let data = match usage {
            BufferUsage::SystemMemory => StorageData::SystemMemory(vec![]),
            _ => StorageData::Native(None),
        };
        BufferStorage { usage, revision: 0, size: 0, data }
    }

    #[inline]
    fn is_system_memory(&self) -> bool {
        self.usage == BufferUsage::SystemMemory
    }

    #[inline]
    fn is_unallocated(&self) -> bool {
        match self.data {
            StorageData::Native(None) => true,
            _ => false,
        }
    }
}

#[inline]
pub(crate) fn round_up_16(value: usize) -> usize {
    (value + 15) & !15
}

#[cfg(test)]
mod test {
    use super::{Buffer, BufferUsage, DataUsage, MapAccess};
    use tangent_gpu::{CreateDeviceFlags, Device, DriverType, FeatureLevel, NativeObject};
    use tangent_gpu::Platform;
    use tangent_soft::{Call, SoftDevice, SoftPlatform};

    fn device() -> SoftDevice {
        let mut platform = SoftPlatform::default();
        platform.load_libraries().unwrap();
        platform.create_device(DriverType::Hardware,
                               CreateDeviceFlags::empty(),
                               &[FeatureLevel::Level11_0]).unwrap()
    }

    fn buffer() -> Buffer<SoftDevice> {
        Buffer::new(65536, true)
    }

    #[test]
    fn test_static_data_reaches_vertex_storage() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[1, 2, 3, 4, 5, 6]), 6, DataUsage::Static).unwrap();
        let vertex = buffer.get_buffer(&device, BufferUsage::VertexOrTransformFeedback).unwrap();
        assert_eq!(&vertex.contents()[0..6], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.size(), 6);
    }

    #[test]
    fn test_dynamic_data_goes_through_system_memory() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[9; 8]), 8, DataUsage::Dynamic).unwrap();
        assert!(!buffer.supports_direct_binding());
        assert_eq!(device.count_calls(|call| match call {
            Call::CreateBuffer { .. } => true,
            _ => false,
        }), 0);
        assert_eq!(buffer.get_data(&device).unwrap(), &[9; 8]);
        let index = buffer.get_buffer(&device, BufferUsage::Index).unwrap();
        assert_eq!(index.contents(), vec![9; 8]);
    }

    #[test]
    fn test_sub_data_preserves_prefix() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[1, 1, 1, 1]), 4, DataUsage::Static).unwrap();
        buffer.set_sub_data(&device, &[2, 2, 2, 2], 4).unwrap();
        assert_eq!(buffer.size(), 8);
        assert_eq!(buffer.get_data(&device).unwrap(), &[1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_uniform_storage_is_rounded_and_capped() {
        let device = device();
        let mut buffer: Buffer<SoftDevice> = Buffer::new(32, true);
        buffer.set_data(&device, Some(&[7; 20]), 20, DataUsage::Static).unwrap();
        let uniform = buffer.get_buffer(&device, BufferUsage::Uniform).unwrap();
        assert_eq!(uniform.desc().byte_width, 32);

        buffer.set_data(&device, Some(&[7; 40]), 40, DataUsage::Static).unwrap();
        let uniform = buffer.get_buffer(&device, BufferUsage::Uniform).unwrap();
        assert_eq!(uniform.desc().byte_width, 32);
    }

    #[test]
    fn test_recreating_storage_changes_serial() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[0; 4]), 4, DataUsage::Static).unwrap();
        let first = buffer.get_buffer(&device, BufferUsage::Index).unwrap();
        let serial = buffer.serial();
        buffer.set_sub_data(&device, &[1; 4], 4).unwrap();
        let second = buffer.get_buffer(&device, BufferUsage::Index).unwrap();
        assert_ne!(first.object_id(), second.object_id());
        assert_ne!(buffer.serial(), serial);
    }

    #[test]
    fn test_system_memory_freed_after_repeated_native_reads() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[3; 4]), 4, DataUsage::Dynamic).unwrap();
        for _ in 0..6 {
            buffer.get_buffer(&device, BufferUsage::VertexOrTransformFeedback).unwrap();
        }
        assert!(buffer.storages[BufferUsage::SystemMemory.index()].is_none());
        // The data survives in the native storages.
        assert_eq!(buffer.get_data(&device).unwrap(), &[3; 4]);
    }

    #[test]
    fn test_map_write_round_trips() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[0; 4]), 4, DataUsage::Static).unwrap();
        {
            let mapped = buffer.map(&device, 1, 2, MapAccess::WRITE).unwrap();
            mapped.copy_from_slice(&[5, 6]);
        }
        buffer.unmap(&device).unwrap();
        assert_eq!(buffer.get_data(&device).unwrap(), &[0, 5, 6, 0]);
    }

    #[test]
    fn test_copy_between_buffers() {
        let device = device();
        let mut source = buffer();
        source.set_data(&device, Some(&[1, 2, 3, 4]), 4, DataUsage::Static).unwrap();
        let mut dest = buffer();
        dest.set_data(&device, Some(&[0; 4]), 4, DataUsage::Static).unwrap();
        dest.copy_sub_data(&device, &mut source, 2, 0, 2).unwrap();
        assert_eq!(dest.get_data(&device).unwrap(), &[3, 4, 0, 0]);
    }

    #[test]
    fn test_allocation_failure_is_out_of_memory() {
        let device = device();
        let mut buffer = buffer();
        buffer.set_data(&device, Some(&[0; 4]), 4, DataUsage::Dynamic).unwrap();
        device.fail_allocations_after(0);
        match buffer.get_buffer(&device, BufferUsage::Index) {
            Err(crate::Error::OutOfMemory(_)) => {}
            other => panic!("unexpected {:?}", other.map(|buffer| buffer.object_id())),
        }
        device.stop_failing_allocations();
        assert!(buffer.get_buffer(&device, BufferUsage::Index).is_ok());
        assert_eq!(device.read_buffer(&buffer.get_buffer(&device, BufferUsage::Staging)
                                             .unwrap(), 0, 4).unwrap(),
                   vec![0; 4]);
    }
}
