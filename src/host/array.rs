use super::{HeapStats, Host, HostDType, HostObject};
use crate::error::Error;
use half::f16;
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Element storage of a host array, one variant per storable element kind.
#[derive(Clone, Debug)]
pub enum HostData {
    Bool(ArrayD<bool>),
    Int8(ArrayD<i8>),
    UInt8(ArrayD<u8>),
    Int16(ArrayD<i16>),
    UInt16(ArrayD<u16>),
    Int32(ArrayD<i32>),
    UInt32(ArrayD<u32>),
    Int64(ArrayD<i64>),
    UInt64(ArrayD<u64>),
    Float16(ArrayD<f16>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Object(ArrayD<HostObject>),
}

// Expands `$body` once per variant with `$a` bound to the inner array.
macro_rules! each_variant {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            HostData::Bool($a) => $body,
            HostData::Int8($a) => $body,
            HostData::UInt8($a) => $body,
            HostData::Int16($a) => $body,
            HostData::UInt16($a) => $body,
            HostData::Int32($a) => $body,
            HostData::UInt32($a) => $body,
            HostData::Int64($a) => $body,
            HostData::UInt64($a) => $body,
            HostData::Float16($a) => $body,
            HostData::Float32($a) => $body,
            HostData::Float64($a) => $body,
            HostData::Object($a) => $body,
        }
    };
}

impl HostData {
    /// The dtype a host would report for this storage.
    pub fn natural_dtype(&self) -> HostDType {
        match self {
            HostData::Bool(_) => HostDType::BOOL,
            HostData::Int8(_) => HostDType::BYTE,
            HostData::UInt8(_) => HostDType::UBYTE,
            HostData::Int16(_) => HostDType::SHORT,
            HostData::UInt16(_) => HostDType::USHORT,
            HostData::Int32(_) => HostDType::INT,
            HostData::UInt32(_) => HostDType::UINT,
            HostData::Int64(_) => HostDType::LONGLONG,
            HostData::UInt64(_) => HostDType::ULONGLONG,
            HostData::Float16(_) => HostDType::HALF,
            HostData::Float32(_) => HostDType::FLOAT,
            HostData::Float64(_) => HostDType::DOUBLE,
            HostData::Object(_) => HostDType::OBJECT,
        }
    }

    /// Whether `dtype` may label this storage. 64-bit storage can also be
    /// labelled with the platform `long` codes.
    pub fn accepts(&self, dtype: HostDType) -> bool {
        match self {
            HostData::Int64(_) => dtype == HostDType::LONGLONG || dtype == HostDType::LONG,
            HostData::UInt64(_) => dtype == HostDType::ULONGLONG || dtype == HostDType::ULONG,
            other => other.natural_dtype() == dtype,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_variant!(self, a => a.shape())
    }

    pub fn len(&self) -> usize {
        each_variant!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_standard_layout(&self) -> bool {
        each_variant!(self, a => a.is_standard_layout())
    }

    /// Contiguous element bytes of a fixed-width array. `None` for object
    /// arrays and for arrays that are not in standard layout.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostData::Bool(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Int8(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::UInt8(a) => a.as_slice(),
            HostData::Int16(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::UInt16(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Int32(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::UInt32(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Int64(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::UInt64(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Float16(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Float32(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Float64(a) => a.as_slice().map(bytemuck::cast_slice),
            HostData::Object(_) => None,
        }
    }

    /// Copy of the data in standard (row-major) layout.
    pub fn to_standard_layout(&self) -> HostData {
        match self {
            HostData::Bool(a) => HostData::Bool(a.as_standard_layout().into_owned()),
            HostData::Int8(a) => HostData::Int8(a.as_standard_layout().into_owned()),
            HostData::UInt8(a) => HostData::UInt8(a.as_standard_layout().into_owned()),
            HostData::Int16(a) => HostData::Int16(a.as_standard_layout().into_owned()),
            HostData::UInt16(a) => HostData::UInt16(a.as_standard_layout().into_owned()),
            HostData::Int32(a) => HostData::Int32(a.as_standard_layout().into_owned()),
            HostData::UInt32(a) => HostData::UInt32(a.as_standard_layout().into_owned()),
            HostData::Int64(a) => HostData::Int64(a.as_standard_layout().into_owned()),
            HostData::UInt64(a) => HostData::UInt64(a.as_standard_layout().into_owned()),
            HostData::Float16(a) => HostData::Float16(a.as_standard_layout().into_owned()),
            HostData::Float32(a) => HostData::Float32(a.as_standard_layout().into_owned()),
            HostData::Float64(a) => HostData::Float64(a.as_standard_layout().into_owned()),
            HostData::Object(a) => HostData::Object(a.as_standard_layout().into_owned()),
        }
    }

    /// Decodes `bytes` as `dtype` elements laid out row-major in `shape`.
    pub fn from_raw_bytes(dtype: HostDType, shape: &[usize], bytes: &[u8]) -> Result<Self, Error> {
        let itemsize = dtype
            .itemsize()
            .ok_or(Error::UnsupportedHostType { code: dtype.code() })?;
        let count = crate::util::size_from_dims(shape)?;
        if crate::util::nbytes_for(count, itemsize)? != bytes.len() {
            return Err(Error::ShapeError(format!(
                "{} bytes cannot fill a {} array of shape {:?}",
                bytes.len(),
                dtype,
                shape
            )));
        }
        fn shaped<T>(shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>, Error> {
            ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::ShapeError(e.to_string()))
        }
        let data = match dtype {
            HostDType::BOOL => HostData::Bool(shaped(shape, bytes.iter().map(|&b| b != 0).collect())?),
            HostDType::BYTE => HostData::Int8(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::UBYTE => HostData::UInt8(shaped(shape, bytes.to_vec())?),
            HostDType::SHORT => HostData::Int16(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::USHORT => HostData::UInt16(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::INT => HostData::Int32(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::UINT => HostData::UInt32(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::LONG | HostDType::LONGLONG => {
                HostData::Int64(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?)
            }
            HostDType::ULONG | HostDType::ULONGLONG => {
                HostData::UInt64(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?)
            }
            HostDType::HALF => HostData::Float16(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::FLOAT => HostData::Float32(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            HostDType::DOUBLE => HostData::Float64(shaped(shape, bytemuck::pod_collect_to_vec(bytes))?),
            other => return Err(Error::UnsupportedHostType { code: other.code() }),
        };
        Ok(data)
    }
}

/// Rust element types a host array can hold.
pub trait HostElement: Clone + 'static {
    const DTYPE: HostDType;

    fn wrap(array: ArrayD<Self>) -> HostData;

    fn unwrap_ref(data: &HostData) -> Option<&ArrayD<Self>>;
}

macro_rules! host_elements {
    ($($ty:ty => $variant:ident, $dtype:ident);* $(;)?) => {
        $(
            impl HostElement for $ty {
                const DTYPE: HostDType = HostDType::$dtype;

                fn wrap(array: ArrayD<Self>) -> HostData {
                    HostData::$variant(array)
                }

                fn unwrap_ref(data: &HostData) -> Option<&ArrayD<Self>> {
                    match data {
                        HostData::$variant(a) => Some(a),
                        _ => None,
                    }
                }
            }
        )*
    };
}

host_elements! {
    bool => Bool, BOOL;
    i8 => Int8, BYTE;
    u8 => UInt8, UBYTE;
    i16 => Int16, SHORT;
    u16 => UInt16, USHORT;
    i32 => Int32, INT;
    u32 => UInt32, UINT;
    i64 => Int64, LONGLONG;
    u64 => UInt64, ULONGLONG;
    f16 => Float16, HALF;
    f32 => Float32, FLOAT;
    f64 => Float64, DOUBLE;
    HostObject => Object, OBJECT;
}

struct ArrayCell {
    dtype: HostDType,
    data: HostData,
    heap: Arc<HeapStats>,
}

impl Drop for ArrayCell {
    fn drop(&mut self) {
        self.heap.arrays.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owned, reference-counted host array handle.
#[derive(Clone)]
pub struct HostArray {
    inner: Arc<ArrayCell>,
}

impl HostArray {
    // Callers have already counted the allocation against `heap`.
    pub(super) fn counted(dtype: HostDType, data: HostData, heap: Arc<HeapStats>) -> Self {
        Self {
            inner: Arc::new(ArrayCell { dtype, data, heap }),
        }
    }

    pub fn view(&self) -> HostArrayView<'_> {
        HostArrayView { cell: &*self.inner }
    }

    pub fn dtype(&self) -> HostDType {
        self.inner.dtype
    }

    pub fn shape(&self) -> &[usize] {
        self.inner.data.shape()
    }

    pub fn data(&self) -> &HostData {
        &self.inner.data
    }

    pub fn as_array<T: HostElement>(&self) -> Option<&ArrayD<T>> {
        T::unwrap_ref(&self.inner.data)
    }

    /// Elements in row-major order, or `None` if the array holds another type.
    pub fn to_vec<T: HostElement>(&self) -> Option<Vec<T>> {
        self.as_array::<T>().map(|a| a.iter().cloned().collect())
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

/// Borrowed host array, the input side of a feed.
#[derive(Clone, Copy)]
pub struct HostArrayView<'a> {
    cell: &'a ArrayCell,
}

impl<'a> HostArrayView<'a> {
    pub fn dtype(&self) -> HostDType {
        self.cell.dtype
    }

    pub fn shape(&self) -> &'a [usize] {
        self.cell.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.cell.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_c_contiguous(&self) -> bool {
        self.cell.data.is_standard_layout()
    }

    pub fn data(&self) -> &'a HostData {
        &self.cell.data
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        self.cell.data.as_bytes()
    }

    pub fn objects(&self) -> Option<&'a ArrayD<HostObject>> {
        HostObject::unwrap_ref(&self.cell.data)
    }

    /// Borrows the array when it is already C-contiguous, otherwise makes a
    /// contiguous copy on `host`. The copy lives as long as the guard.
    pub fn as_contiguous(&self, host: &Host) -> Result<ContiguousArray<'a>, Error> {
        if self.is_c_contiguous() {
            return Ok(ContiguousArray::Borrowed(*self));
        }
        debug_println!("Copying non-contiguous {} array of shape {:?}", self.dtype(), self.shape());
        let copy = host.wrap_as(self.dtype(), self.cell.data.to_standard_layout())?;
        Ok(ContiguousArray::Copied(copy))
    }
}

impl fmt::Debug for HostArrayView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("dtype", &self.dtype())
            .field("shape", &self.shape())
            .field("c_contiguous", &self.is_c_contiguous())
            .finish()
    }
}

/// A C-contiguous host array, either the caller's own or a temporary copy
/// that is released when the guard drops.
pub enum ContiguousArray<'a> {
    Borrowed(HostArrayView<'a>),
    Copied(HostArray),
}

impl ContiguousArray<'_> {
    pub fn view(&self) -> HostArrayView<'_> {
        match self {
            ContiguousArray::Borrowed(view) => *view,
            ContiguousArray::Copied(array) => array.view(),
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, ContiguousArray::Copied(_))
    }
}
