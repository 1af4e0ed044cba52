use half::f16;
use ndarray::{ArrayD, IxDyn};
use rand::prelude::*;
use tensor_bridge::host::HostData;
use tensor_bridge::{
    bridge, Blob, ByteString, CpuTensor, DeviceOption, Error, Host, HostDType, HostObject, PodElement, TypeMeta,
};

fn fetch_then_feed(host: &Host, tensor: CpuTensor) -> Result<(CpuTensor, CpuTensor), Error> {
    let mut source = Blob::new();
    source.set(tensor);
    let fetched = bridge::fetch_blob(host, &source)?;

    let mut target = Blob::new();
    bridge::feed_blob(host, &DeviceOption::cpu(), fetched.view(), &mut target)?;

    let original = source.take().and_then(|p| p.downcast::<CpuTensor>().ok());
    let fed = target.take().and_then(|p| p.downcast::<CpuTensor>().ok());
    match (original, fed) {
        (Some(original), Some(fed)) => Ok((*original, *fed)),
        _ => Err(Error::InternalLogicError("blob lost its tensor".to_string())),
    }
}

fn assert_byte_identical(a: &CpuTensor, b: &CpuTensor) -> Result<(), Error> {
    assert_eq!(a.dims(), b.dims());
    assert_eq!(a.meta(), b.meta());
    assert_eq!(
        &a.raw_data()?.as_bytes()[..a.nbytes()],
        &b.raw_data()?.as_bytes()[..b.nbytes()]
    );
    Ok(())
}

fn round_trip<T: PodElement>(host: &Host, dims: &[usize], values: Vec<T>) -> Result<(), Error> {
    let (original, fed) = fetch_then_feed(host, CpuTensor::from_vec(dims, values)?)?;
    assert_byte_identical(&original, &fed)
}

#[test]
fn test_feed_2x3_float_scenario() -> Result<(), Error> {
    let host = Host::new();
    let input = host.array_from_vec(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), input.view(), &mut blob)?;

    let tensor = blob.get::<CpuTensor>()?;
    assert_eq!(tensor.dims(), &[2, 3]);
    assert_eq!(tensor.meta(), TypeMeta::of::<f32>());
    let expected = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    for (i, value) in tensor.data::<f32>()?.iter().enumerate() {
        assert_eq!(*value, expected[i]);
    }
    Ok(())
}

#[test]
fn test_pod_round_trips_are_byte_identical() -> Result<(), Error> {
    let host = Host::new();
    let mut rng = rand::rng();

    let floats: Vec<f32> = (0..24).map(|_| rng.random::<f32>() * 10.0 - 5.0).collect();
    round_trip(&host, &[2, 3, 4], floats)?;
    let doubles: Vec<f64> = (0..6).map(|_| rng.random::<f64>()).collect();
    round_trip(&host, &[6], doubles)?;
    let halves: Vec<f16> = (0..8).map(|_| f16::from_f32(rng.random::<f32>())).collect();
    round_trip(&host, &[2, 2, 2], halves)?;

    round_trip(&host, &[3], vec![-128i8, 0, 127])?;
    round_trip(&host, &[2, 2], vec![0u8, 1, 254, 255])?;
    round_trip(&host, &[2], vec![i16::MIN, i16::MAX])?;
    round_trip(&host, &[2], vec![0u16, u16::MAX])?;
    let ints: Vec<i32> = (0..10).map(|_| rng.random::<i32>()).collect();
    round_trip(&host, &[5, 2], ints)?;
    round_trip(&host, &[1, 3], vec![i64::MIN, 0, i64::MAX])?;
    round_trip(&host, &[4], vec![true, false, false, true])?;

    // Scalars and empty tensors keep their shapes
    round_trip(&host, &[], vec![42.5f32])?;
    round_trip(&host, &[0, 3], Vec::<f32>::new())?;

    assert_eq!(host.live_arrays(), 0);
    Ok(())
}

#[test]
fn test_fetch_returns_independent_copy() -> Result<(), Error> {
    let host = Host::new();
    let mut blob = Blob::new();
    blob.set(CpuTensor::from_vec(&[3], vec![1i32, 2, 3])?);

    let fetched = bridge::fetch_blob(&host, &blob)?;
    assert_eq!(fetched.dtype(), HostDType::INT);
    assert_eq!(fetched.ref_count(), 1);
    blob.get_mutable::<CpuTensor>()?.mutable_data::<i32>()?[0] = 100;
    assert_eq!(fetched.to_vec::<i32>(), Some(vec![1, 2, 3]));
    Ok(())
}

#[test]
fn test_fetch_uninitialized_tensor_fails() {
    let host = Host::new();
    let mut blob = Blob::new();
    blob.set(CpuTensor::new());
    let result = bridge::fetch_blob(&host, &blob);
    assert!(matches!(
        result,
        Err(Error::Precondition(ref msg)) if msg.contains("uninitialized")
    ));
}

#[test]
fn test_fetch_unsupported_type_allocates_nothing() -> Result<(), Error> {
    let host = Host::new();
    for tensor in [
        CpuTensor::from_vec(&[2], vec![1u32, 2])?,
        CpuTensor::from_vec(&[2], vec![1u64, 2])?,
    ] {
        let mut blob = Blob::new();
        blob.set(tensor);
        let err = bridge::fetch_blob(&host, &blob).err();
        assert!(matches!(err, Some(Error::UnsupportedTensorType { .. })));
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("not supported"), "{}", message);
    }
    assert_eq!(host.live_arrays(), 0);
    assert_eq!(host.live_objects(), 0);
    Ok(())
}

#[test]
fn test_string_round_trip() -> Result<(), Error> {
    let host = Host::new();
    let values: Vec<ByteString> = vec![b"".to_vec(), b"hello".to_vec(), vec![0, 159, 146, 150], b"x".to_vec()];
    let mut blob = Blob::new();
    blob.set(CpuTensor::from_strings(&[2, 2], values.clone())?);

    let fetched = bridge::fetch_blob(&host, &blob)?;
    assert_eq!(fetched.dtype(), HostDType::OBJECT);
    assert_eq!(fetched.shape(), &[2, 2]);
    assert_eq!(host.live_objects(), 4);
    let objects = fetched.to_vec::<HostObject>().unwrap_or_default();
    let bytes: Vec<ByteString> = objects.iter().filter_map(|o| o.as_bytes().map(<[u8]>::to_vec)).collect();
    assert_eq!(bytes, values);
    drop(objects);

    let mut target = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), fetched.view(), &mut target)?;
    let fed = target.get::<CpuTensor>()?;
    assert_eq!(fed.dims(), &[2, 2]);
    assert_eq!(fed.strings()?, values.as_slice());

    drop(fetched);
    assert_eq!(host.live_objects(), 0);
    assert_eq!(host.live_arrays(), 0);
    Ok(())
}

#[test]
fn test_string_fetch_allocation_failure_rolls_back() -> Result<(), Error> {
    let host = Host::with_object_limit(2);
    let mut blob = Blob::new();
    blob.set(CpuTensor::from_strings(
        &[3],
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
    )?);

    let result = bridge::fetch_blob(&host, &blob);
    assert!(matches!(result, Err(Error::HostAllocation(_))));
    assert_eq!(host.live_objects(), 0);
    assert_eq!(host.live_arrays(), 0);
    Ok(())
}

#[test]
fn test_failed_object_extraction_leaks_nothing() -> Result<(), Error> {
    let host = Host::new();
    let objects = vec![host.new_bytes(b"ok")?, host.new_int(7)?, host.new_bytes(b"never read")?];
    let array = host.object_array(&[3], objects)?;

    let mut blob = Blob::new();
    blob.set(CpuTensor::from_strings(&[1], vec![b"previous".to_vec()])?);
    let result = bridge::feed_blob(&host, &DeviceOption::cpu(), array.view(), &mut blob);
    match result {
        Err(Error::ObjectExtraction(msg)) => assert!(msg.contains("int"), "{}", msg),
        other => panic!("expected an extraction error, got {:?}", other),
    }

    // Only the array still references its objects
    let held = array.as_array::<HostObject>().map(|a| a.iter().map(HostObject::ref_count).collect::<Vec<_>>());
    assert_eq!(held, Some(vec![1, 1, 1]));
    assert_eq!(host.live_arrays(), 1);

    // The tensor was resized but not populated by the failed feed
    let tensor = blob.get::<CpuTensor>()?;
    assert_eq!(tensor.dims(), &[3]);
    assert!(!tensor.has_storage());

    drop(array);
    assert_eq!(host.live_objects(), 0);
    assert_eq!(host.live_arrays(), 0);
    Ok(())
}

#[test]
fn test_non_contiguous_feed_matches_contiguous_feed() -> Result<(), Error> {
    let host = Host::new();
    let base = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
        .map_err(|e| Error::ShapeError(e.to_string()))?;
    let transposed = host.wrap(HostData::Float64(base.clone().reversed_axes()));
    let contiguous = host.wrap(HostData::Float64(base.reversed_axes().as_standard_layout().into_owned()));
    assert!(!transposed.view().is_c_contiguous());
    assert!(contiguous.view().is_c_contiguous());

    let mut from_transposed = Blob::new();
    let mut from_contiguous = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), transposed.view(), &mut from_transposed)?;
    bridge::feed_blob(&host, &DeviceOption::cpu(), contiguous.view(), &mut from_contiguous)?;

    let a = from_transposed.get::<CpuTensor>()?;
    let b = from_contiguous.get::<CpuTensor>()?;
    assert_eq!(a.dims(), &[3, 2]);
    assert_eq!(a.data::<f64>()?, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    assert_byte_identical(a, b)?;

    // The temporary contiguous copy is gone
    assert_eq!(host.live_arrays(), 2);
    Ok(())
}

#[test]
fn test_feed_long_array_as_int64() -> Result<(), Error> {
    let host = Host::new();
    let data = HostData::Int64(
        ArrayD::from_shape_vec(IxDyn(&[2]), vec![-5i64, 5]).map_err(|e| Error::ShapeError(e.to_string()))?,
    );
    let array = host.wrap_as(HostDType::LONG, data)?;
    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), array.view(), &mut blob)?;
    assert_eq!(blob.get::<CpuTensor>()?.data::<i64>()?, &[-5, 5]);
    Ok(())
}

#[test]
fn test_feed_unsupported_host_dtype() -> Result<(), Error> {
    let host = Host::new();
    let array = host.array_from_vec(&[2], vec![1u64, 2])?;
    let mut blob = Blob::new();
    let result = bridge::feed_blob(&host, &DeviceOption::cpu(), array.view(), &mut blob);
    assert!(matches!(result, Err(Error::UnsupportedHostType { code: 10 })));
    assert!(blob.is_empty());
    Ok(())
}

#[test]
fn test_feed_replaces_other_payload_and_reuses_tensor() -> Result<(), Error> {
    let host = Host::new();
    let mut blob = Blob::new();
    blob.set(String::from("not a tensor"));

    let first = host.array_from_vec(&[4], vec![1u8, 2, 3, 4])?;
    bridge::feed_blob(&host, &DeviceOption::cpu(), first.view(), &mut blob)?;
    assert!(blob.is::<CpuTensor>());

    // A second feed of another type retypes the same tensor
    let second = host.array_from_vec(&[2], vec![0.25f32, 0.5])?;
    bridge::feed_blob(&host, &DeviceOption::cpu(), second.view(), &mut blob)?;
    let tensor = blob.get::<CpuTensor>()?;
    assert_eq!(tensor.meta(), TypeMeta::of::<f32>());
    assert_eq!(tensor.data::<f32>()?, &[0.25, 0.5]);
    Ok(())
}

#[test]
fn test_concurrent_feed_and_fetch_on_separate_blobs() -> Result<(), Error> {
    let host = Host::new();
    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let host = host.clone();
            std::thread::spawn(move || -> Result<(), Error> {
                for round in 0..16 {
                    let values: Vec<i32> = (0..12).map(|i| worker * 1000 + round * 100 + i).collect();
                    let input = host.array_from_vec(&[3, 4], values.clone())?;
                    let mut blob = Blob::new();
                    bridge::feed_blob(&host, &DeviceOption::cpu(), input.view(), &mut blob)?;

                    let fetched = bridge::fetch_blob(&host, &blob)?;
                    assert_eq!(fetched.shape(), &[3, 4]);
                    assert_eq!(fetched.to_vec::<i32>(), Some(values));
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread panicked")?;
    }
    assert_eq!(host.live_arrays(), 0);
    Ok(())
}
