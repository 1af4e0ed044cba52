mod context;
mod storage;

pub use context::{get_global_context, init_context, CudaContext, CudaDevice};
pub use storage::CudaBuffer;

// Define CudaTensor type alias here for convenience
pub type CudaTensor = crate::tensor::Tensor<CudaContext>;
