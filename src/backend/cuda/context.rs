// CUDA device management using cust
// Handles driver initialization, one context + stream per device, and the
// bridge-facing `CudaContext`.

use crate::backend::cuda::storage::CudaBuffer;
use crate::backend::{check_copy_len, check_device_type, Context as DeviceContext};
use crate::device::{DeviceOption, DeviceType};
use crate::error::Error;
use cust::context::{Context, CurrentContext};
use cust::device::Device;
use cust::memory::{CopyDestination, DeviceBuffer};
use cust::stream::{Stream, StreamFlags};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

/// Driver context and stream for one GPU.
pub struct CudaDevice {
    pub(crate) _context: Context,
    #[allow(dead_code)]
    device: Device,
    stream: Stream,
    device_id: u32,
}

lazy_static! {
    static ref CUDA_DEVICES: Mutex<HashMap<u32, Arc<CudaDevice>>> = Mutex::new(HashMap::new());
    static ref CUDA_INIT: Once = Once::new();
}

impl CudaDevice {
    fn new(device_id: u32) -> Result<Self, Error> {
        let device = Device::get_device(device_id).map_err(|e| Error::CudaError(e.to_string()))?;
        let context = Context::new(device).map_err(|e| Error::CudaError(e.to_string()))?;
        let stream =
            Stream::new(StreamFlags::DEFAULT, None).map_err(|e| Error::CudaError(e.to_string()))?;
        debug_println!("Created CUDA context for device {}", device_id);
        Ok(Self {
            _context: context,
            device,
            stream,
            device_id,
        })
    }

    pub fn get_stream(&self) -> &Stream {
        &self.stream
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

impl Drop for CudaDevice {
    fn drop(&mut self) {
        debug_println!("Dropping CudaDevice {}", self.device_id);
    }
}

/// Initializes the driver (once) and the context for `device_id` (once per
/// device). Later calls return the cached device.
pub fn init_context(device_id: u32) -> Result<Arc<CudaDevice>, Error> {
    let mut init_result = Ok(());
    CUDA_INIT.call_once(|| {
        init_result = cust::init(cust::CudaFlags::empty()).map_err(Error::from);
    });
    init_result?;

    let mut devices = CUDA_DEVICES
        .lock()
        .map_err(|_| Error::InternalLogicError("CUDA device table mutex was poisoned".to_string()))?;
    if let Some(existing) = devices.get(&device_id) {
        return Ok(existing.clone());
    }
    debug_println!("Initializing CUDA context for device {}...", device_id);
    let device = Arc::new(CudaDevice::new(device_id)?);
    devices.insert(device_id, device.clone());
    Ok(device)
}

pub fn get_global_context(device_id: u32) -> Result<Arc<CudaDevice>, Error> {
    let devices = CUDA_DEVICES
        .lock()
        .map_err(|_| Error::InternalLogicError("CUDA device table mutex was poisoned".to_string()))?;

    match devices.get(&device_id) {
        Some(device) => Ok(device.clone()),
        None => Err(Error::CudaError(format!(
            "CUDA context for device {} not initialized. Call init_context first.",
            device_id
        ))),
    }
}

/// Bridge context for tensors resident on a CUDA device.
#[derive(Clone)]
pub struct CudaContext {
    device: Arc<CudaDevice>,
}

impl std::fmt::Debug for CudaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CudaContext(device={})", self.device.device_id)
    }
}

impl DeviceContext for CudaContext {
    type Buffer = CudaBuffer;

    const DEVICE_TYPE: DeviceType = DeviceType::Cuda;
    const HOST_RESIDENT: bool = false;

    fn new(option: &DeviceOption) -> Result<Self, Error> {
        check_device_type(option, DeviceType::Cuda)?;
        Ok(Self {
            device: init_context(option.device_id)?,
        })
    }

    fn device_id(&self) -> u32 {
        self.device.device_id
    }

    fn switch_to_device(&mut self) -> Result<(), Error> {
        CurrentContext::set_current(&self.device._context)?;
        Ok(())
    }

    fn alloc(&self, nbytes: usize) -> Result<Self::Buffer, Error> {
        // Zero-byte device allocations are rejected by the driver
        let data = DeviceBuffer::<u8>::zeroed(nbytes.max(1))?;
        Ok(CudaBuffer::from_device_buffer(data, nbytes))
    }

    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<(), Error> {
        check_copy_len("CudaContext::copy_to_host", dst.len(), src.len())?;
        if dst.is_empty() {
            return Ok(());
        }
        let len = dst.len();
        src.data().index(0..len).copy_to(dst)?;
        Ok(())
    }

    fn copy_from_host(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<(), Error> {
        check_copy_len("CudaContext::copy_from_host", src.len(), dst.len())?;
        if src.is_empty() {
            return Ok(());
        }
        dst.data_mut().index(0..src.len()).copy_from(src)?;
        Ok(())
    }

    fn finish_device_computation(&self) -> Result<(), Error> {
        self.device.stream.synchronize()?;
        Ok(())
    }
}
