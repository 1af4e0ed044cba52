//! Device context trait definition and module structure.
//!
//! A [`Context`] owns the knowledge of where tensor bytes live and how they
//! cross the host boundary. Fetch and feed are written once, generically over
//! this trait, and instantiated per device.

use crate::device::{DeviceOption, DeviceType};
use crate::error::Error;
use std::fmt::Debug;

pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;

pub type CpuTensor = crate::tensor::Tensor<cpu::CpuContext>;
#[cfg(feature = "cuda")]
pub type CudaTensor = crate::tensor::Tensor<cuda::CudaContext>;

/// Raw byte storage owned by a tensor on some device.
pub trait DeviceStorage: Debug + Send {
    /// Number of usable bytes in the allocation.
    fn len_bytes(&self) -> usize;
}

pub trait Context: Sized + Debug + Send + 'static {
    type Buffer: DeviceStorage;

    /// Device type this context serves. Its code keys the feeder registry.
    const DEVICE_TYPE: DeviceType;

    /// Whether tensors of this context may hold byte-string elements.
    const HOST_RESIDENT: bool;

    /// Creates a context for the device named by `option`.
    /// Fails when the option names a different device type.
    fn new(option: &DeviceOption) -> Result<Self, Error>;

    fn device_id(&self) -> u32;

    /// Makes this context's device current for the calling thread.
    fn switch_to_device(&mut self) -> Result<(), Error>;

    /// Allocates `nbytes` of zeroed storage on this context's device.
    fn alloc(&self, nbytes: usize) -> Result<Self::Buffer, Error>;

    /// Copies the first `dst.len()` bytes of `src` into host memory.
    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<(), Error>;

    /// Copies `src` into the first `src.len()` bytes of `dst`.
    fn copy_from_host(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<(), Error>;

    /// Blocks until all queued work on this context has completed.
    fn finish_device_computation(&self) -> Result<(), Error>;
}

/// Fails unless `option` names `expected`.
pub(crate) fn check_device_type(option: &DeviceOption, expected: DeviceType) -> Result<(), Error> {
    if option.device_type != expected.code() {
        return Err(Error::InvalidOperation(format!(
            "{} context cannot be created for device option {}",
            expected, option
        )));
    }
    Ok(())
}

/// Bounds check shared by the copy paths of every context.
pub(crate) fn check_copy_len(op: &str, requested: usize, available: usize) -> Result<(), Error> {
    if requested > available {
        return Err(Error::InternalLogicError(format!(
            "{}: copying {} bytes but the device buffer holds {}",
            op, requested, available
        )));
    }
    Ok(())
}
