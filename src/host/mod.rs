//! In-crate model of the host runtime the bridge talks to.
//!
//! The host owns reference-counted objects and N-dimensional arrays and
//! keeps live-allocation counters for both, so tests can observe that fetch
//! and feed release everything they create on every path. A host may be
//! given an object limit, after which object allocation fails the way a real
//! interpreter fails under memory pressure.

mod array;
mod dtype;
mod object;

pub use array::{ContiguousArray, HostArray, HostArrayView, HostData, HostElement};
pub use dtype::HostDType;
pub use object::{HostObject, HostValue};

use crate::error::Error;
use ndarray::{ArrayD, IxDyn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct HeapStats {
    objects: AtomicUsize,
    arrays: AtomicUsize,
}

/// Allocation handle of the host runtime. Clones share counters.
#[derive(Debug, Clone, Default)]
pub struct Host {
    heap: Arc<HeapStats>,
    object_limit: Option<usize>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose object allocations fail once `limit` objects are live.
    pub fn with_object_limit(limit: usize) -> Self {
        Self {
            heap: Arc::default(),
            object_limit: Some(limit),
        }
    }

    pub fn live_objects(&self) -> usize {
        self.heap.objects.load(Ordering::SeqCst)
    }

    pub fn live_arrays(&self) -> usize {
        self.heap.arrays.load(Ordering::SeqCst)
    }

    fn alloc_object(&self, value: HostValue) -> Result<HostObject, Error> {
        let limit = self.object_limit.unwrap_or(usize::MAX);
        self.heap
            .objects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < limit).then_some(live + 1)
            })
            .map_err(|live| {
                Error::HostAllocation(format!(
                    "Cannot allocate a {} object: {} of {} objects live",
                    value.type_name(),
                    live,
                    limit
                ))
            })?;
        Ok(HostObject::counted(value, self.heap.clone()))
    }

    pub fn new_bytes(&self, bytes: &[u8]) -> Result<HostObject, Error> {
        self.alloc_object(HostValue::Bytes(bytes.to_vec()))
    }

    pub fn new_str(&self, value: &str) -> Result<HostObject, Error> {
        self.alloc_object(HostValue::Str(value.to_string()))
    }

    pub fn new_int(&self, value: i64) -> Result<HostObject, Error> {
        self.alloc_object(HostValue::Int(value))
    }

    pub fn new_float(&self, value: f64) -> Result<HostObject, Error> {
        self.alloc_object(HostValue::Float(value))
    }

    pub fn none(&self) -> Result<HostObject, Error> {
        self.alloc_object(HostValue::None)
    }

    /// Wraps `data` in a new array labelled with its natural dtype.
    pub fn wrap(&self, data: HostData) -> HostArray {
        let dtype = data.natural_dtype();
        self.heap.arrays.fetch_add(1, Ordering::SeqCst);
        HostArray::counted(dtype, data, self.heap.clone())
    }

    /// Wraps `data` under an explicit dtype code, e.g. `LONG` for `i64` data.
    pub fn wrap_as(&self, dtype: HostDType, data: HostData) -> Result<HostArray, Error> {
        if !data.accepts(dtype) {
            return Err(Error::InvalidOperation(format!(
                "Host data of dtype {} cannot be labelled {}",
                data.natural_dtype(),
                dtype
            )));
        }
        self.heap.arrays.fetch_add(1, Ordering::SeqCst);
        Ok(HostArray::counted(dtype, data, self.heap.clone()))
    }

    /// Creates an array of shape `shape` from row-major `values`.
    pub fn array_from_vec<T: HostElement>(&self, shape: &[usize], values: Vec<T>) -> Result<HostArray, Error> {
        let actual_len = values.len();
        let array = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![actual_len],
        })?;
        Ok(self.wrap(T::wrap(array)))
    }

    pub fn object_array(&self, shape: &[usize], objects: Vec<HostObject>) -> Result<HostArray, Error> {
        self.array_from_vec(shape, objects)
    }

    /// Creates a `dtype` array of shape `shape` from raw native-endian bytes.
    pub fn array_from_raw_bytes(&self, dtype: HostDType, shape: &[usize], bytes: &[u8]) -> Result<HostArray, Error> {
        let data = HostData::from_raw_bytes(dtype, shape, bytes)?;
        self.wrap_as(dtype, data)
    }
}
