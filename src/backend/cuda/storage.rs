use crate::backend::DeviceStorage;
use cust::memory::DeviceBuffer;

/// Device bytes backing a CUDA tensor.
///
/// The underlying allocation may be one byte larger than `len` when `len` is
/// zero; only the first `len` bytes are ever read or written.
pub struct CudaBuffer {
    data: DeviceBuffer<u8>,
    len: usize,
}

impl CudaBuffer {
    pub fn from_device_buffer(data: DeviceBuffer<u8>, len: usize) -> Self {
        Self { data, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &DeviceBuffer<u8> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DeviceBuffer<u8> {
        &mut self.data
    }

    pub fn as_ptr(&self) -> cust::memory::DevicePointer<u8> {
        self.data.as_device_ptr()
    }
}

impl DeviceStorage for CudaBuffer {
    fn len_bytes(&self) -> usize {
        self.len
    }
}

impl std::fmt::Debug for CudaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CudaBuffer(len={}, ptr={:?})",
            self.len,
            self.data.as_device_ptr()
        )
    }
}
