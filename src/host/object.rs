use super::HeapStats;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Payload of a host object.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    None,
    Bytes(Vec<u8>),
    Str(String),
    Int(i64),
    Float(f64),
}

impl HostValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::None => "NoneType",
            HostValue::Bytes(_) => "bytes",
            HostValue::Str(_) => "str",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
        }
    }
}

struct ObjectCell {
    value: HostValue,
    heap: Arc<HeapStats>,
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        self.heap.objects.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reference-counted host object. Clones share the value; the host's live
/// object count drops when the last clone goes away.
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<ObjectCell>,
}

impl HostObject {
    // Callers have already counted the allocation against `heap`.
    pub(super) fn counted(value: HostValue, heap: Arc<HeapStats>) -> Self {
        Self {
            inner: Arc::new(ObjectCell { value, heap }),
        }
    }

    pub fn value(&self) -> &HostValue {
        &self.inner.value
    }

    /// The object's bytes when it is a `Bytes` object.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner.value {
            HostValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.value.type_name()
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        self.inner.value == other.inner.value
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.inner.value)
    }
}
