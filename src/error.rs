use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape error: {0}")]
    ShapeError(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A documented precondition of an operation does not hold.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Operator {op} expects {expected} {kind}, got {actual}")]
    InvalidArity {
        op: String,
        kind: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("This tensor's data type is not supported: {name}.")]
    UnsupportedTensorType { name: &'static str },

    #[error("This host array data type is not supported: {code}.")]
    UnsupportedHostType { code: i32 },

    #[error("Object extraction failed: {0}")]
    ObjectExtraction(String),

    #[error("Host allocation failed: {0}")]
    HostAllocation(String),

    #[error("Type mismatch: tensor holds {actual}, requested {requested}")]
    TypeMismatch {
        requested: &'static str,
        actual: &'static str,
    },

    #[error("Blob type mismatch: expected {expected}, blob holds {actual}")]
    BlobTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Duplicate registration of key {0} in {1}")]
    DuplicateRegistration(String, &'static str),

    #[error("No feeder registered for device type {0}")]
    UnsupportedDevice(i32),

    #[error("No fetcher registered for blob type {0}")]
    UnsupportedBlobType(&'static str),

    #[error("Operator type {0} is not registered")]
    UnknownOperator(String),

    #[error("No gradient registered for operator type {0}")]
    NoGradient(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    CudaError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[cfg(feature = "serialization")]
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Gradient check failed at index {at_index}: max relative error {max_rel_error:.3e} (absolute {max_abs_error:.3e})")]
    GradientCheckError {
        analytical: Vec<f32>,
        numerical: Vec<f32>,
        max_rel_error: f32,
        max_abs_error: f32,
        at_index: usize,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Internal logic error: {0}")]
    InternalLogicError(String),
}

#[cfg(feature = "cuda")]
impl From<cust::error::CudaError> for Error {
    fn from(err: cust::error::CudaError) -> Self {
        Error::CudaError(err.to_string())
    }
}
