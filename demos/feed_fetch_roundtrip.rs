use std::error::Error;
use tensor_bridge::{bridge, Blob, CpuTensor, DeviceOption, Host, HostObject};

fn main() -> Result<(), Box<dyn Error>> {
    let host = Host::new();

    // Feed a 2x3 float array into a blob
    let input = host.array_from_vec(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let mut blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), input.view(), &mut blob)?;

    let tensor = blob.get::<CpuTensor>()?;
    println!("Fed tensor: {:?}", tensor);

    // Fetch it back as an independent host array
    let output = bridge::fetch_blob(&host, &blob)?;
    println!("Fetched {} array of shape {:?}: {:?}", output.dtype(), output.shape(), output.to_vec::<f32>());

    // Strings travel as arrays of byte objects
    let words = ["conv", "transpose", ""]
        .iter()
        .map(|w| host.new_bytes(w.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    let word_array = host.object_array(&[3], words)?;
    let mut word_blob = Blob::new();
    bridge::feed_blob(&host, &DeviceOption::cpu(), word_array.view(), &mut word_blob)?;

    let fetched_words = bridge::fetch_blob(&host, &word_blob)?;
    for object in fetched_words.to_vec::<HostObject>().unwrap_or_default() {
        println!("  {:?}", object.as_bytes().map(String::from_utf8_lossy));
    }

    // Element types without a host analogue are rejected
    let mut unsigned = Blob::new();
    unsigned.set(CpuTensor::from_vec(&[2], vec![1u32, 2])?);
    match bridge::fetch_blob(&host, &unsigned) {
        Ok(_) => println!("uint32 fetch unexpectedly succeeded"),
        Err(e) => println!("uint32 fetch rejected: {}", e),
    }

    drop((input, output, word_array, fetched_words));
    println!(
        "Live host objects: {}, live host arrays: {}",
        host.live_objects(),
        host.live_arrays()
    );
    Ok(())
}
