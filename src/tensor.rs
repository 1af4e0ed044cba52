use crate::backend::cpu::CpuContext;
use crate::backend::{Context, DeviceStorage};
use crate::device::DeviceOption;
use crate::error::Error;
use crate::meta::{ByteString, PodElement, TypeMeta};
use crate::util::{nbytes_for, size_from_dims};
use std::marker::PhantomData;

pub(crate) enum Storage<B> {
    Empty,
    Bytes(B),
    Strings(Vec<ByteString>),
}

/// A type-erased, resizable N-dimensional buffer bound to a device context.
///
/// A freshly constructed tensor is *uninitialized*: it has no shape and
/// [`size`](Tensor::size) returns `None`. [`resize`](Tensor::resize) gives it a
/// shape; storage is then allocated lazily by the first mutable access, which
/// also fixes the element type.
///
/// # Example
/// ```rust
/// use tensor_bridge::{CpuTensor, TypeMeta};
///
/// fn main() -> Result<(), tensor_bridge::Error> {
///     let mut tensor = CpuTensor::new();
///     assert_eq!(tensor.size(), None);
///
///     tensor.resize(&[2, 2])?;
///     tensor.mutable_data::<i32>()?.copy_from_slice(&[1, 2, 3, 4]);
///     assert_eq!(tensor.meta(), TypeMeta::of::<i32>());
///     assert_eq!(tensor.data::<i32>()?, &[1, 2, 3, 4]);
///     Ok(())
/// }
/// ```
pub struct Tensor<C: Context> {
    dims: Vec<usize>,
    size: Option<usize>,
    meta: TypeMeta,
    pub(crate) storage: Storage<C::Buffer>,
    // Bytes (or elements, for strings) the current storage can hold
    capacity: usize,
    device_id: u32,
    _context: PhantomData<fn() -> C>,
}

impl<C: Context> Default for Tensor<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> Tensor<C> {
    pub fn new() -> Self {
        Self {
            dims: Vec::new(),
            size: None,
            meta: TypeMeta::undefined(),
            storage: Storage::Empty,
            capacity: 0,
            device_id: 0,
            _context: PhantomData,
        }
    }

    pub fn with_dims(dims: &[usize]) -> Result<Self, Error> {
        let mut tensor = Self::new();
        tensor.resize(dims)?;
        Ok(tensor)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element count, or `None` if the tensor was never given a shape.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn is_initialized(&self) -> bool {
        self.size.is_some()
    }

    pub fn meta(&self) -> TypeMeta {
        self.meta
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn device_option(&self) -> DeviceOption {
        DeviceOption::new(C::DEVICE_TYPE.code(), self.device_id)
    }

    /// Bytes of element data. Zero for uninitialized or untyped tensors.
    pub fn nbytes(&self) -> usize {
        self.size.unwrap_or(0) * self.meta.itemsize()
    }

    /// True when storage matching the current shape and type is allocated.
    pub fn has_storage(&self) -> bool {
        !matches!(self.storage, Storage::Empty)
    }

    /// Changes the shape. Storage is kept when it is large enough for the new
    /// element count and released otherwise; the next mutable access
    /// reallocates it.
    pub fn resize(&mut self, dims: &[usize]) -> Result<(), Error> {
        let new_size = size_from_dims(dims)?;
        // The byte count must stay addressable for the current element type
        let new_nbytes = nbytes_for(new_size, self.meta.itemsize())?;
        let fits = match &self.storage {
            Storage::Empty => true,
            Storage::Bytes(_) => new_nbytes <= self.capacity,
            Storage::Strings(_) => new_size <= self.capacity,
        };
        if !fits {
            debug_println!(
                "Resize {:?} -> {:?} exceeds capacity {}, releasing storage",
                self.dims,
                dims,
                self.capacity
            );
            self.storage = Storage::Empty;
            self.capacity = 0;
        }
        if let Storage::Strings(values) = &mut self.storage {
            values.truncate(new_size);
            values.resize(new_size, ByteString::new());
        }
        self.dims = dims.to_vec();
        self.size = Some(new_size);
        Ok(())
    }

    /// Returns the tensor to its uninitialized state, dropping any payload and
    /// forgetting its element type.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Raw bytes of a fixed-width tensor.
    pub fn raw_data(&self) -> Result<&C::Buffer, Error> {
        match &self.storage {
            Storage::Bytes(buffer) => Ok(buffer),
            Storage::Strings(_) => Err(Error::InvalidOperation(
                "Raw data of a string tensor is not addressable as bytes".to_string(),
            )),
            Storage::Empty => Err(Error::Precondition(format!(
                "Tensor of shape {:?} has no allocated storage",
                self.dims
            ))),
        }
    }

    /// Mutable raw bytes for elements of type `meta`, allocating on `context`
    /// when the tensor has no storage, holds another type or lives on another
    /// device. Either change drops the previous payload.
    pub fn raw_mutable_data(&mut self, meta: TypeMeta, context: &C) -> Result<&mut C::Buffer, Error> {
        let size = self.size.ok_or_else(|| {
            Error::Precondition("Tensor must be resized before its data is written".to_string())
        })?;
        if !meta.is_defined() || meta.is_string() {
            return Err(Error::InvalidOperation(format!(
                "Cannot allocate raw bytes for element type {}",
                meta
            )));
        }
        let reusable = self.meta == meta
            && self.device_id == context.device_id()
            && matches!(self.storage, Storage::Bytes(_));
        if !reusable {
            let nbytes = nbytes_for(size, meta.itemsize())?;
            let buffer = context.alloc(nbytes)?;
            self.capacity = buffer.len_bytes();
            self.storage = Storage::Bytes(buffer);
            self.meta = meta;
            self.device_id = context.device_id();
        }
        match &mut self.storage {
            Storage::Bytes(buffer) => Ok(buffer),
            _ => Err(Error::InternalLogicError(
                "Byte storage missing right after allocation".to_string(),
            )),
        }
    }

    /// Byte-string elements of a string tensor.
    pub fn strings(&self) -> Result<&[ByteString], Error> {
        match &self.storage {
            Storage::Strings(values) if self.meta.is_string() => Ok(values),
            _ => Err(Error::TypeMismatch {
                requested: TypeMeta::of::<ByteString>().name(),
                actual: self.meta.name(),
            }),
        }
    }

    /// Mutable byte-string elements, allocating empty strings when the tensor
    /// holds no strings yet.
    pub fn mutable_strings(&mut self) -> Result<&mut [ByteString], Error> {
        let size = self.size.ok_or_else(|| {
            Error::Precondition("Tensor must be resized before its data is written".to_string())
        })?;
        if !matches!(self.storage, Storage::Strings(_)) {
            self.set_strings(vec![ByteString::new(); size])?;
        }
        match &mut self.storage {
            Storage::Strings(values) => Ok(values),
            _ => Err(Error::InternalLogicError(
                "String storage missing right after allocation".to_string(),
            )),
        }
    }

    /// Replaces the payload with `values`, which must match the current
    /// element count. The element type becomes byte string.
    pub fn set_strings(&mut self, values: Vec<ByteString>) -> Result<(), Error> {
        if !C::HOST_RESIDENT {
            return Err(Error::InvalidOperation(format!(
                "{} tensors cannot hold string elements",
                C::DEVICE_TYPE
            )));
        }
        let size = self.size.ok_or_else(|| {
            Error::Precondition("Tensor must be resized before its data is written".to_string())
        })?;
        if values.len() != size {
            return Err(Error::ShapeMismatch {
                expected: self.dims.clone(),
                actual: vec![values.len()],
            });
        }
        self.capacity = values.len();
        self.storage = Storage::Strings(values);
        self.meta = TypeMeta::of::<ByteString>();
        Ok(())
    }
}

impl Tensor<CpuContext> {
    /// Creates a host tensor of shape `dims` holding `data`.
    pub fn from_vec<T: PodElement>(dims: &[usize], data: Vec<T>) -> Result<Self, Error> {
        let mut tensor = Self::with_dims(dims)?;
        let expected = tensor.size.unwrap_or(0);
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: dims.to_vec(),
                actual: vec![data.len()],
            });
        }
        tensor.mutable_data::<T>()?.copy_from_slice(&data);
        Ok(tensor)
    }

    /// Creates a host string tensor of shape `dims`.
    pub fn from_strings(dims: &[usize], values: Vec<ByteString>) -> Result<Self, Error> {
        let mut tensor = Self::with_dims(dims)?;
        tensor.set_strings(values)?;
        Ok(tensor)
    }

    /// Typed view of the elements. Fails if the tensor holds another type.
    pub fn data<T: PodElement>(&self) -> Result<&[T], Error> {
        if !self.meta.matches::<T>() {
            return Err(Error::TypeMismatch {
                requested: T::META.name(),
                actual: self.meta.name(),
            });
        }
        let nbytes = self.nbytes();
        let bytes = &self.raw_data()?.as_bytes()[..nbytes];
        bytemuck::checked::try_cast_slice(bytes).map_err(|e| {
            Error::InternalLogicError(format!("Invalid {} storage: {:?}", T::META.name(), e))
        })
    }

    /// Mutable typed view of the elements, (re)allocating zeroed storage when
    /// the tensor holds no data or data of another type.
    pub fn mutable_data<T: PodElement>(&mut self) -> Result<&mut [T], Error> {
        let nbytes = nbytes_for(self.size.unwrap_or(0), T::META.itemsize())?;
        let buffer = self.raw_mutable_data(T::META, &CpuContext)?;
        bytemuck::checked::try_cast_slice_mut(&mut buffer.as_bytes_mut()[..nbytes]).map_err(|e| {
            Error::InternalLogicError(format!("Invalid {} storage: {:?}", T::META.name(), e))
        })
    }

    pub fn to_vec<T: PodElement>(&self) -> Result<Vec<T>, Error> {
        Ok(self.data::<T>()?.to_vec())
    }
}
