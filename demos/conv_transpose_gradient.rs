use std::error::Error;
use tensor_bridge::ops::{default_output_gradients, get_gradient_for_op};
use tensor_bridge::test_utils::{ramp, run_cpu_operator};
use tensor_bridge::{Argument, CpuTensor, DeviceOption, OperatorDef};

fn main() -> Result<(), Box<dyn Error>> {
    // Upsample a 1x1x3x3 input by 2 with a 4x4 kernel
    let forward = OperatorDef::new("ConvTranspose", &["X", "W", "b"], &["Y"])
        .with_name("upsample")
        .with_arg(Argument::int("kernel", 4))
        .with_arg(Argument::int("stride", 2))
        .with_arg(Argument::int("pad", 1))
        .with_device_option(DeviceOption::cpu());
    println!("Forward: {}", forward);

    let x = CpuTensor::from_vec(&[1, 1, 3, 3], ramp(9, 1.0))?;
    let w = CpuTensor::from_vec(&[1, 2, 4, 4], ramp(32, 0.1))?;
    let b = CpuTensor::from_vec(&[2], vec![0.0f32, 1.0])?;
    let y = run_cpu_operator(&forward, &[&x, &w, &b], 1)?.remove(0);
    println!("Y shape: {:?}", y.dims());

    // Build the backward op the gradient registry wires for it
    let g_output = default_output_gradients(&forward);
    let meta = get_gradient_for_op(&forward, &g_output)?;
    for def in &meta.ops {
        println!("Backward: {}", def);
    }
    println!("Input gradients: {:?}", meta.g_input);

    // Backpropagate a gradient of ones
    let dy = CpuTensor::from_vec(y.dims(), vec![1.0f32; y.size().unwrap_or(0)])?;
    let grads = run_cpu_operator(&meta.ops[0], &[&x, &w, &dy], meta.ops[0].outputs.len())?;
    for (name, grad) in meta.ops[0].outputs.iter().zip(grads.iter()) {
        println!("{} {:?}: {:?}", name, grad.dims(), grad.data::<f32>()?);
    }
    Ok(())
}
