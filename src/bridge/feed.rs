use super::BlobFeeder;
use crate::backend::Context;
use crate::blob::Blob;
use crate::device::DeviceOption;
use crate::error::Error;
use crate::host::{ContiguousArray, Host, HostArrayView};
use crate::meta::{ByteString, TypeMeta};
use crate::tensor::Tensor;
use crate::type_map::host_type_to_tensor;
use crate::util::nbytes_for;
use std::marker::PhantomData;

/// Feeds host arrays into `Tensor<C>` payloads.
pub struct TensorFeeder<C: Context> {
    _context: PhantomData<fn() -> C>,
}

impl<C: Context> TensorFeeder<C> {
    pub fn new() -> Self {
        Self {
            _context: PhantomData,
        }
    }
}

impl<C: Context> Default for TensorFeeder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> BlobFeeder for TensorFeeder<C> {
    fn feed(
        &self,
        host: &Host,
        option: &DeviceOption,
        array: HostArrayView<'_>,
        blob: &mut Blob,
    ) -> Result<(), Error> {
        // The blob is only touched once the dtype and device checks pass
        let prepared = PreparedFeed::<C>::new(host, option, array)?;
        prepared.write_into(blob.get_mutable::<Tensor<C>>()?)
    }
}

/// Copies `array` into `tensor`, resizing it to the array's shape.
pub fn feed_tensor<C: Context>(
    host: &Host,
    option: &DeviceOption,
    array: HostArrayView<'_>,
    tensor: &mut Tensor<C>,
) -> Result<(), Error> {
    PreparedFeed::<C>::new(host, option, array)?.write_into(tensor)
}

/// A validated feed source: a contiguous array, its tensor element type and
/// a context already switched to the target device.
struct PreparedFeed<'a, C: Context> {
    // Released when the feed finishes, whatever the outcome
    contiguous: ContiguousArray<'a>,
    meta: TypeMeta,
    context: C,
}

impl<'a, C: Context> PreparedFeed<'a, C> {
    fn new(host: &Host, option: &DeviceOption, array: HostArrayView<'a>) -> Result<Self, Error> {
        let contiguous = array.as_contiguous(host)?;
        let meta = host_type_to_tensor(array.dtype());
        if !meta.is_defined() {
            return Err(Error::UnsupportedHostType {
                code: array.dtype().code(),
            });
        }
        debug_println!("Feeding {} array of shape {:?} to {}", array.dtype(), array.shape(), option);

        let mut context = C::new(option)?;
        context.switch_to_device()?;
        Ok(Self {
            contiguous,
            meta,
            context,
        })
    }

    fn write_into(self, tensor: &mut Tensor<C>) -> Result<(), Error> {
        let array = self.contiguous.view();
        tensor.resize(array.shape())?;

        if self.meta.is_string() {
            let objects = array.objects().ok_or_else(|| {
                Error::InternalLogicError(format!("{} array carries no object storage", array.dtype()))
            })?;
            let mut values: Vec<ByteString> = Vec::with_capacity(objects.len());
            for object in objects.iter() {
                let bytes = object.as_bytes().ok_or_else(|| {
                    Error::ObjectExtraction(format!(
                        "Unsupported host object type passed into array: {}",
                        object.type_name()
                    ))
                })?;
                values.push(bytes.to_vec());
            }
            tensor.set_strings(values)?;
        } else {
            let bytes = array.as_bytes().ok_or_else(|| {
                Error::InternalLogicError(format!("{} array is not addressable as bytes", array.dtype()))
            })?;
            let expected = nbytes_for(array.len(), self.meta.itemsize())?;
            if bytes.len() != expected {
                return Err(Error::InternalLogicError(format!(
                    "{} array of shape {:?} spans {} bytes, {} expected",
                    array.dtype(),
                    array.shape(),
                    bytes.len(),
                    expected
                )));
            }
            let buffer = tensor.raw_mutable_data(self.meta, &self.context)?;
            self.context.copy_from_host(bytes, buffer)?;
        }

        self.context.finish_device_computation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuTensor;

    #[test]
    fn test_feed_tensor_directly() -> Result<(), Error> {
        let host = Host::new();
        let array = host.array_from_vec(&[3], vec![1i16, -2, 3])?;
        let mut tensor = CpuTensor::new();
        feed_tensor(&host, &DeviceOption::cpu(), array.view(), &mut tensor)?;
        assert_eq!(tensor.dims(), &[3]);
        assert_eq!(tensor.data::<i16>()?, &[1, -2, 3]);
        Ok(())
    }

    #[test]
    fn test_rejected_dtype_leaves_blob_alone() -> Result<(), Error> {
        let host = Host::new();
        let array = host.array_from_vec(&[2], vec![1u32, 2])?;
        let mut blob = Blob::new();
        blob.set(7u8);
        let result = TensorFeeder::<crate::backend::cpu::CpuContext>::new().feed(
            &host,
            &DeviceOption::cpu(),
            array.view(),
            &mut blob,
        );
        assert!(matches!(result, Err(Error::UnsupportedHostType { code: 6 })));
        assert!(blob.is::<u8>());
        Ok(())
    }

    #[test]
    fn test_wrong_device_for_context() -> Result<(), Error> {
        let host = Host::new();
        let array = host.array_from_vec(&[1], vec![1.0f32])?;
        let mut tensor = CpuTensor::new();
        let result = feed_tensor(&host, &DeviceOption::cuda(0), array.view(), &mut tensor);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
        assert!(!tensor.is_initialized());
        Ok(())
    }
}
