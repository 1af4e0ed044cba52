#![cfg(feature = "cuda")]

use serial_test::serial;
use std::sync::Arc;
use tensor_bridge::backend::cuda::{get_global_context, init_context};
use tensor_bridge::{bridge, Blob, CudaTensor, DeviceOption, Error, Host, TypeMeta};

#[test]
#[serial]
fn test_cuda_round_trip() -> Result<(), Error> {
    let host = Host::new();
    let values = vec![1.0f32, -2.0, 3.5, 0.0, 8.25, -1.0];
    let input = host.array_from_vec(&[3, 2], values.clone())?;

    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cuda(0), input.view(), &mut blob)?;
    let tensor = blob.get::<CudaTensor>()?;
    assert_eq!(tensor.dims(), &[3, 2]);
    assert_eq!(tensor.meta(), TypeMeta::of::<f32>());
    assert_eq!(tensor.device_option(), DeviceOption::cuda(0));

    let fetched = bridge::fetch_blob(&host, &blob)?;
    assert_eq!(fetched.shape(), &[3, 2]);
    assert_eq!(fetched.to_vec::<f32>(), Some(values));
    Ok(())
}

#[test]
#[serial]
fn test_cuda_round_trip_integers() -> Result<(), Error> {
    let host = Host::new();
    let input = host.array_from_vec(&[4], vec![i64::MIN, -1, 0, i64::MAX])?;
    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cuda(0), input.view(), &mut blob)?;
    let fetched = bridge::fetch_blob(&host, &blob)?;
    assert_eq!(fetched.to_vec::<i64>(), Some(vec![i64::MIN, -1, 0, i64::MAX]));
    Ok(())
}

#[test]
#[serial]
fn test_cuda_rejects_strings() -> Result<(), Error> {
    let host = Host::new();
    let array = host.object_array(&[1], vec![host.new_bytes(b"device")?])?;
    let mut blob = Blob::new();
    let result = bridge::feed_blob(&host, &DeviceOption::cuda(0), array.view(), &mut blob);
    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    drop(array);
    assert_eq!(host.live_objects(), 0);
    Ok(())
}

#[test]
#[serial]
fn test_context_table_reuses_devices() -> Result<(), Error> {
    let first = init_context(0)?;
    let second = get_global_context(0)?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.device_id(), 0);
    Ok(())
}

#[test]
#[serial]
fn test_fetch_on_another_thread() -> Result<(), Error> {
    let host = Host::new();
    let input = host.array_from_vec(&[4], vec![0.5f32, 1.5, 2.5, 3.5])?;
    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cuda(0), input.view(), &mut blob)?;

    // The fetching thread has never made the device context current
    let fetcher_host = host.clone();
    let fetched = std::thread::spawn(move || {
        bridge::fetch_blob(&fetcher_host, &blob).map(|array| array.to_vec::<f32>())
    })
    .join()
    .expect("fetch thread panicked")?;
    assert_eq!(fetched, Some(vec![0.5, 1.5, 2.5, 3.5]));
    Ok(())
}
