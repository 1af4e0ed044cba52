use super::BlobFetcher;
use crate::backend::{Context, DeviceStorage};
use crate::blob::Blob;
use crate::error::Error;
use crate::host::{Host, HostArray, HostDType, HostObject};
use crate::tensor::Tensor;
use crate::type_map::tensor_type_to_host;
use std::marker::PhantomData;

/// Fetches `Tensor<C>` payloads.
pub struct TensorFetcher<C: Context> {
    _context: PhantomData<fn() -> C>,
}

impl<C: Context> TensorFetcher<C> {
    pub fn new() -> Self {
        Self {
            _context: PhantomData,
        }
    }
}

impl<C: Context> Default for TensorFetcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> BlobFetcher for TensorFetcher<C> {
    fn fetch(&self, host: &Host, blob: &Blob) -> Result<HostArray, Error> {
        fetch_tensor(host, blob.get::<Tensor<C>>()?)
    }
}

/// Copies `tensor` into a new host array owned by the caller.
///
/// Fixed-width data is always copied, even for tensors already in host
/// memory, and the copy is complete before this returns.
pub fn fetch_tensor<C: Context>(host: &Host, tensor: &Tensor<C>) -> Result<HostArray, Error> {
    let size = tensor
        .size()
        .ok_or_else(|| Error::Precondition("Trying to fetch uninitialized tensor".to_string()))?;
    let meta = tensor.meta();
    let dtype = tensor_type_to_host(&meta);
    if !dtype.is_valid() {
        return Err(Error::UnsupportedTensorType { name: meta.name() });
    }
    debug_println!("Fetching {} tensor of shape {:?} as {}", meta, tensor.dims(), dtype);

    if dtype == HostDType::OBJECT {
        let values = tensor.strings()?;
        // Dropping the partial vector releases every object made so far
        let mut objects: Vec<HostObject> = Vec::with_capacity(size);
        for (index, value) in values.iter().enumerate() {
            match host.new_bytes(value) {
                Ok(object) => objects.push(object),
                Err(e) => {
                    debug_println!("Rolling back {} string objects: {}", objects.len(), e);
                    drop(objects);
                    return Err(Error::HostAllocation(format!(
                        "Failed to allocate string {} of {} for array of strings: {}",
                        index, size, e
                    )));
                }
            }
        }
        return host.object_array(tensor.dims(), objects);
    }

    let buffer = tensor.raw_data()?;
    let nbytes = tensor.nbytes();
    if buffer.len_bytes() < nbytes {
        return Err(Error::InternalLogicError(format!(
            "Tensor storage holds {} bytes, {} expected",
            buffer.len_bytes(),
            nbytes
        )));
    }
    // The copy may run on a thread that has never used this device
    let mut context = C::new(&tensor.device_option())?;
    context.switch_to_device()?;
    let mut staging = vec![0u8; nbytes];
    context.copy_to_host(buffer, &mut staging)?;
    context.finish_device_computation()?;
    host.array_from_raw_bytes(dtype, tensor.dims(), &staging)
}
