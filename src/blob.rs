//! A type-erased container holding at most one payload.

use crate::error::Error;
use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Holds one payload of any `Send` type, typically a [`Tensor`](crate::Tensor).
///
/// Storing a value of a different type drops the previous payload.
#[derive(Default)]
pub struct Blob {
    payload: Option<Box<dyn Any + Send>>,
    type_name: &'static str,
}

impl Blob {
    pub fn new() -> Self {
        Self {
            payload: None,
            type_name: "nothing",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| p.is::<T>())
    }

    /// `TypeId` of the current payload. This is the fetcher registry key.
    pub fn payload_type_id(&self) -> Option<TypeId> {
        self.payload.as_ref().map(|p| (**p).type_id())
    }

    pub fn type_name(&self) -> &'static str {
        if self.payload.is_some() {
            self.type_name
        } else {
            "nothing"
        }
    }

    pub fn get<T: Any>(&self) -> Result<&T, Error> {
        self.payload
            .as_ref()
            .and_then(|p| p.downcast_ref::<T>())
            .ok_or_else(|| Error::BlobTypeMismatch {
                expected: type_name::<T>(),
                actual: self.type_name(),
            })
    }

    /// Mutable access to a `T` payload, replacing whatever the blob held
    /// with `T::default()` when it is not a `T`.
    pub fn get_mutable<T: Any + Send + Default>(&mut self) -> Result<&mut T, Error> {
        if !self.is::<T>() {
            debug_println!(
                "Blob payload {} replaced by a new {}",
                self.type_name(),
                type_name::<T>()
            );
            self.set(T::default());
        }
        let actual = self.type_name();
        self.payload
            .as_mut()
            .and_then(|p| p.downcast_mut::<T>())
            .ok_or_else(|| Error::BlobTypeMismatch {
                expected: type_name::<T>(),
                actual,
            })
    }

    /// Stores `value`, dropping the previous payload.
    pub fn set<T: Any + Send>(&mut self, value: T) {
        self.payload = Some(Box::new(value));
        self.type_name = type_name::<T>();
    }

    /// Removes and returns the payload, leaving the blob empty.
    pub fn take(&mut self) -> Option<Box<dyn Any + Send>> {
        self.type_name = "nothing";
        self.payload.take()
    }

    pub fn reset(&mut self) {
        drop(self.take());
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({})", self.type_name())
    }
}
