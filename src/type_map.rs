//! Translation between tensor element types and host dtype codes.
//!
//! The two universes overlap only partially. Both lookups are total and
//! report "no counterpart" through a sentinel instead of guessing a
//! neighbouring type.

use crate::host::HostDType;
use crate::meta::{TypeMeta, TypeTag};
use half::f16;

/// Host dtype for a tensor element type, or [`HostDType::UNSUPPORTED`].
///
/// `uint32` and `uint64` tensors have no host counterpart.
pub fn tensor_type_to_host(meta: &TypeMeta) -> HostDType {
    match meta.id() {
        TypeTag::BOOL => HostDType::BOOL,
        TypeTag::INT8 => HostDType::BYTE,
        TypeTag::UINT8 => HostDType::UBYTE,
        TypeTag::INT16 => HostDType::SHORT,
        TypeTag::UINT16 => HostDType::USHORT,
        TypeTag::INT32 => HostDType::INT,
        TypeTag::INT64 => HostDType::LONGLONG,
        TypeTag::FLOAT16 => HostDType::HALF,
        TypeTag::FLOAT32 => HostDType::FLOAT,
        TypeTag::FLOAT64 => HostDType::DOUBLE,
        TypeTag::STRING => HostDType::OBJECT,
        _ => HostDType::UNSUPPORTED,
    }
}

/// Tensor element type for a host dtype, or [`TypeMeta::undefined`].
///
/// `LONG` maps to `int64`, as on LP64 hosts.
pub fn host_type_to_tensor(dtype: HostDType) -> TypeMeta {
    match dtype {
        HostDType::BOOL => TypeMeta::of::<bool>(),
        HostDType::BYTE => TypeMeta::of::<i8>(),
        HostDType::UBYTE => TypeMeta::of::<u8>(),
        HostDType::SHORT => TypeMeta::of::<i16>(),
        HostDType::USHORT => TypeMeta::of::<u16>(),
        HostDType::INT => TypeMeta::of::<i32>(),
        HostDType::LONG | HostDType::LONGLONG => TypeMeta::of::<i64>(),
        HostDType::HALF => TypeMeta::of::<f16>(),
        HostDType::FLOAT => TypeMeta::of::<f32>(),
        HostDType::DOUBLE => TypeMeta::of::<f64>(),
        HostDType::OBJECT => TypeMeta::of::<crate::meta::ByteString>(),
        _ => TypeMeta::undefined(),
    }
}
