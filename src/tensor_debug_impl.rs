use crate::backend::Context;
use crate::tensor::{Storage, Tensor};
use std::fmt;

impl<C: Context> fmt::Debug for Tensor<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let storage = match &self.storage {
            Storage::Empty => "<none>".to_string(),
            Storage::Bytes(buffer) => format!("{:?}", buffer),
            Storage::Strings(values) => format!("<{} strings>", values.len()),
        };
        f.debug_struct("Tensor")
            .field("device", &self.device_option())
            .field("dims", &self.dims())
            .field("size", &self.size())
            .field("meta", &self.meta().name())
            .field("storage", &storage)
            .finish()
    }
}
