//! Fetch and feed between blobs and host arrays.
//!
//! Fetchers are looked up by the `TypeId` of the blob payload, feeders by the
//! device-type code of the target [`DeviceOption`]. Both registries start with
//! the tensor handlers for every context this build supports and can be
//! extended by other backends.
//!
//! # Example
//! ```rust
//! use tensor_bridge::{bridge, Blob, DeviceOption, Host};
//!
//! fn main() -> Result<(), tensor_bridge::Error> {
//!     let host = Host::new();
//!     let words = vec![host.new_bytes(b"alpha")?, host.new_bytes(b"\x00\xff")?];
//!     let array = host.object_array(&[2], words)?;
//!
//!     let mut blob = Blob::new();
//!     let feeder = bridge::create_feeder(0).expect("cpu feeder is built in");
//!     feeder.feed(&host, &DeviceOption::cpu(), array.view(), &mut blob)?;
//!
//!     let fetched = bridge::fetch_blob(&host, &blob)?;
//!     let objects = fetched.to_vec::<tensor_bridge::HostObject>().unwrap_or_default();
//!     assert_eq!(objects[1].as_bytes(), Some(&b"\x00\xff"[..]));
//!     Ok(())
//! }
//! ```

mod feed;
mod fetch;

pub use feed::{feed_tensor, TensorFeeder};
pub use fetch::{fetch_tensor, TensorFetcher};

use crate::backend::CpuTensor;
#[cfg(feature = "cuda")]
use crate::backend::CudaTensor;
use crate::blob::Blob;
use crate::device::{DeviceOption, DeviceType};
use crate::error::Error;
use crate::host::{Host, HostArray, HostArrayView};
use crate::registry::{self, TypedRegistry};
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::sync::RwLock;

/// Copies a blob's payload out into a new host array.
pub trait BlobFetcher: Send + Sync {
    fn fetch(&self, host: &Host, blob: &Blob) -> Result<HostArray, Error>;
}

/// Copies a host array into a blob, placing it on the device `option` names.
pub trait BlobFeeder: Send + Sync {
    fn feed(
        &self,
        host: &Host,
        option: &DeviceOption,
        array: HostArrayView<'_>,
        blob: &mut Blob,
    ) -> Result<(), Error>;
}

pub type FetcherCreator = fn() -> Box<dyn BlobFetcher>;
pub type FeederCreator = fn() -> Box<dyn BlobFeeder>;

fn cpu_tensor_fetcher() -> Box<dyn BlobFetcher> {
    Box::new(TensorFetcher::<crate::backend::cpu::CpuContext>::new())
}

fn cpu_tensor_feeder() -> Box<dyn BlobFeeder> {
    Box::new(TensorFeeder::<crate::backend::cpu::CpuContext>::new())
}

#[cfg(feature = "cuda")]
fn cuda_tensor_fetcher() -> Box<dyn BlobFetcher> {
    Box::new(TensorFetcher::<crate::backend::cuda::CudaContext>::new())
}

#[cfg(feature = "cuda")]
fn cuda_tensor_feeder() -> Box<dyn BlobFeeder> {
    Box::new(TensorFeeder::<crate::backend::cuda::CudaContext>::new())
}

fn builtin_fetchers() -> Vec<(TypeId, FetcherCreator)> {
    vec![
        (TypeId::of::<CpuTensor>(), cpu_tensor_fetcher as FetcherCreator),
        #[cfg(feature = "cuda")]
        (TypeId::of::<CudaTensor>(), cuda_tensor_fetcher as FetcherCreator),
    ]
}

fn builtin_feeders() -> Vec<(i32, FeederCreator)> {
    vec![
        (DeviceType::Cpu.code(), cpu_tensor_feeder as FeederCreator),
        #[cfg(feature = "cuda")]
        (DeviceType::Cuda.code(), cuda_tensor_feeder as FeederCreator),
    ]
}

lazy_static! {
    static ref FETCHERS: RwLock<TypedRegistry<TypeId, FetcherCreator>> =
        RwLock::new(TypedRegistry::from_entries("BlobFetcherRegistry", builtin_fetchers()));
    static ref FEEDERS: RwLock<TypedRegistry<i32, FeederCreator>> =
        RwLock::new(TypedRegistry::from_entries("BlobFeederRegistry", builtin_feeders()));
}

/// A fresh fetcher for blobs whose payload has type id `payload`.
pub fn create_fetcher(payload: TypeId) -> Option<Box<dyn BlobFetcher>> {
    registry::read(&FETCHERS).get(&payload).map(|create| create())
}

/// A fresh feeder for the device-type code `device_type`.
pub fn create_feeder(device_type: i32) -> Option<Box<dyn BlobFeeder>> {
    registry::read(&FEEDERS).get(&device_type).map(|create| create())
}

/// Registers a fetcher for blobs holding a `P`.
pub fn register_blob_fetcher<P: Any>(creator: FetcherCreator) -> Result<(), Error> {
    registry::write(&FETCHERS).register(TypeId::of::<P>(), creator)
}

pub fn register_blob_feeder(device_type: i32, creator: FeederCreator) -> Result<(), Error> {
    registry::write(&FEEDERS).register(device_type, creator)
}

pub fn has_fetcher(payload: TypeId) -> bool {
    registry::read(&FETCHERS).contains(&payload)
}

pub fn has_feeder(device_type: i32) -> bool {
    registry::read(&FEEDERS).contains(&device_type)
}

/// Fetches whatever `blob` holds through the registered fetcher.
pub fn fetch_blob(host: &Host, blob: &Blob) -> Result<HostArray, Error> {
    let fetcher = blob
        .payload_type_id()
        .and_then(create_fetcher)
        .ok_or(Error::UnsupportedBlobType(blob.type_name()))?;
    fetcher.fetch(host, blob)
}

/// Feeds `array` into `blob` on the device `option` names.
pub fn feed_blob(
    host: &Host,
    option: &DeviceOption,
    array: HostArrayView<'_>,
    blob: &mut Blob,
) -> Result<(), Error> {
    let feeder = create_feeder(option.device_type).ok_or(Error::UnsupportedDevice(option.device_type))?;
    feeder.feed(host, option, array, blob)
}
