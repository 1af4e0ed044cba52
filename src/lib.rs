//! A tensor bridge between type-erased device tensors and host arrays, plus the
//! transposed-convolution operator declarations that ride on it.
//!
//! This library provides:
//! - A bidirectional table between tensor element types and host dtype codes
//! - Fetch (tensor → host array) and feed (host array → tensor) with CPU and
//!   CUDA copy paths, including variable-length byte-string elements
//! - Process-wide fetcher/feeder registries that backends can extend
//! - `ConvTranspose` / `ConvTransposeGradient` schemas, gradient wiring and CPU kernels
//!
//! # Features
//! - `cuda` - Enables CUDA tensors and the CUDA feeder/fetcher (requires CUDA toolkit)
//! - `serialization` - serde support for `DeviceOption` and `OperatorDef`
//! - `debug_logs` - Prints debug traces from registries, contexts and the bridge
//!
//! # Example
//! ```rust
//! use tensor_bridge::{bridge, Blob, CpuTensor, DeviceOption, Host};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Host::new();
//!     let input = host.array_from_vec(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
//!
//!     // Feed the host array into a blob as a CPU tensor
//!     let mut blob = Blob::new();
//!     bridge::feed_blob(&host, &DeviceOption::cpu(), input.view(), &mut blob)?;
//!     assert_eq!(blob.get::<CpuTensor>()?.dims(), &[2, 3]);
//!
//!     // Fetch it back out as a new host array
//!     let output = bridge::fetch_blob(&host, &blob)?;
//!     assert_eq!(output.to_vec::<f32>(), Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
//!     Ok(())
//! }
//! ```

// --- Central debug_println macro definition ---
/// Conditional logging macro. Prints if 'debug_logs' feature is enabled.
#[cfg(feature = "debug_logs")]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        ::std::println!("[DEBUG {}] {}", module_path!(), ::std::format_args!($($arg)*))
    };
}

/// Conditional logging macro (disabled version). Does nothing.
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod blob;
pub mod bridge;
pub mod device;
pub mod error;
pub mod graph;
pub mod host;
pub mod meta;
pub mod ops;
pub mod registry;
pub mod tensor;
mod tensor_debug_impl;
pub mod type_map;
pub mod util;

// Shared helpers for integration tests and benches
pub mod test_utils;

// Re-export the public types for easier use by consumers of the library
pub use backend::cpu::CpuContext;
#[cfg(feature = "cuda")]
pub use backend::cuda::CudaContext;
pub use backend::Context;
pub use backend::CpuTensor;
#[cfg(feature = "cuda")]
pub use backend::CudaTensor;
pub use blob::Blob;
pub use bridge::{BlobFeeder, BlobFetcher};
pub use device::{DeviceOption, DeviceType};
pub use error::Error;
pub use graph::{ArgValue, Argument, OperatorDef};
pub use host::{Host, HostArray, HostArrayView, HostDType, HostObject, HostValue};
pub use meta::{ByteString, Element, PodElement, TypeMeta, TypeTag};
pub use tensor::Tensor;
pub use type_map::{host_type_to_tensor, tensor_type_to_host};
