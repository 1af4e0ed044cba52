//! CPU context: tensor bytes live in host memory.

use crate::backend::{check_copy_len, check_device_type, Context, DeviceStorage};
use crate::device::{DeviceOption, DeviceType};
use crate::error::Error;

/// Marker context for host memory. Copies are plain `memcpy`s and there is no
/// queued work to wait for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuContext;

/// Zero-initialized host bytes, 8-byte aligned so that any fixed-width
/// element type can be viewed in place.
#[derive(Clone, PartialEq, Eq)]
pub struct CpuBuffer {
    words: Vec<u64>,
    len: usize,
}

impl CpuBuffer {
    pub fn zeroed(nbytes: usize) -> Self {
        Self {
            words: vec![0u64; nbytes.div_ceil(8)],
            len: nbytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }
}

impl DeviceStorage for CpuBuffer {
    fn len_bytes(&self) -> usize {
        self.len
    }
}

impl std::fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CpuBuffer(len={})", self.len)
    }
}

impl Context for CpuContext {
    type Buffer = CpuBuffer;

    const DEVICE_TYPE: DeviceType = DeviceType::Cpu;
    const HOST_RESIDENT: bool = true;

    fn new(option: &DeviceOption) -> Result<Self, Error> {
        check_device_type(option, DeviceType::Cpu)?;
        Ok(CpuContext)
    }

    fn device_id(&self) -> u32 {
        0
    }

    fn switch_to_device(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn alloc(&self, nbytes: usize) -> Result<Self::Buffer, Error> {
        Ok(CpuBuffer::zeroed(nbytes))
    }

    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<(), Error> {
        check_copy_len("CpuContext::copy_to_host", dst.len(), src.len)?;
        dst.copy_from_slice(&src.as_bytes()[..dst.len()]);
        Ok(())
    }

    fn copy_from_host(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<(), Error> {
        check_copy_len("CpuContext::copy_from_host", src.len(), dst.len)?;
        dst.as_bytes_mut()[..src.len()].copy_from_slice(src);
        Ok(())
    }

    fn finish_device_computation(&self) -> Result<(), Error> {
        Ok(())
    }
}
