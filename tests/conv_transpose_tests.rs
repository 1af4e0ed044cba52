use approx::assert_abs_diff_eq;
use tensor_bridge::ops::{self, gradient_name};
use tensor_bridge::test_utils::{assert_tensor_close, check_gradient, ramp, run_cpu_operator};
use tensor_bridge::{ArgValue, Argument, CpuTensor, DeviceOption, Error, OperatorDef};

fn forward_def() -> OperatorDef {
    OperatorDef::new("ConvTranspose", &["X", "W", "b"], &["Y"])
        .with_name("deconv1")
        .with_arg(Argument::int("kernel", 3))
        .with_arg(Argument::int("stride", 2))
        .with_arg(Argument::int("pad", 1))
        .with_arg(Argument::int("adj", 1))
}

// X [1, 2, 3, 3], W [2, 3, 3, 3], b [3] -> Y [1, 3, 6, 6]
fn forward_inputs() -> Result<Vec<CpuTensor>, Error> {
    Ok(vec![
        CpuTensor::from_vec(&[1, 2, 3, 3], ramp(18, 0.3))?,
        CpuTensor::from_vec(&[2, 3, 3, 3], ramp(54, 0.1))?,
        CpuTensor::from_vec(&[3], vec![0.5f32, -0.25, 1.0])?,
    ])
}

// Weighting that makes the loss depend on every output position differently
fn loss_weights() -> Vec<f32> {
    ramp(108, 0.05)
}

fn weighted_loss(inputs: &[&CpuTensor]) -> Result<f32, Error> {
    let outputs = run_cpu_operator(&forward_def(), inputs, 1)?;
    let weights = loss_weights();
    Ok(outputs[0]
        .data::<f32>()?
        .iter()
        .zip(weights.iter())
        .map(|(y, w)| y * w)
        .sum())
}

fn backward(with_input_grad: bool) -> Result<Vec<CpuTensor>, Error> {
    let forward = forward_def();
    let meta = ops::get_gradient_for_op(&forward, &["Y_grad".to_string()])?;
    let mut def = meta.ops[0].clone();
    if !with_input_grad {
        def.outputs.truncate(2);
    }
    let inputs = forward_inputs()?;
    let grad_output = CpuTensor::from_vec(&[1, 3, 6, 6], loss_weights())?;
    run_cpu_operator(&def, &[&inputs[0], &inputs[1], &grad_output], def.outputs.len())
}

#[test]
fn test_gradient_wiring() -> Result<(), Error> {
    let forward = OperatorDef::new("ConvTranspose", &["X", "W", "b"], &["Y"])
        .with_arg(Argument::int("kernel", 2))
        .with_arg(Argument::ints("pads", &[0, 0, 0, 0]))
        .with_device_option(DeviceOption::cpu())
        .with_engine("REFERENCE");
    let meta = ops::get_gradient_for_op(&forward, &["Y_grad".to_string()])?;

    assert_eq!(meta.ops.len(), 1);
    let grad = &meta.ops[0];
    assert_eq!(grad.op_type, "ConvTransposeGradient");
    assert_eq!(grad.inputs, vec!["X", "W", "Y_grad"]);
    assert_eq!(grad.outputs, vec!["W_grad", "b_grad", "X_grad"]);
    assert_eq!(grad.arg("kernel"), Some(&ArgValue::Int(2)));
    assert!(grad.has_arg("pads"));
    assert_eq!(grad.device_option, Some(DeviceOption::cpu()));
    assert_eq!(grad.engine, "REFERENCE");
    assert!(grad.is_gradient_op);
    assert_eq!(
        meta.g_input,
        vec![
            Some("X_grad".to_string()),
            Some("W_grad".to_string()),
            Some("b_grad".to_string())
        ]
    );

    // The forward def is left as it was
    assert_eq!(forward.inputs, vec!["X", "W", "b"]);
    assert!(!forward.is_gradient_op);
    Ok(())
}

#[test]
fn test_gradient_wiring_uses_default_names() -> Result<(), Error> {
    let forward = forward_def();
    let meta = ops::get_gradient_for_op(&forward, &ops::default_output_gradients(&forward))?;
    assert_eq!(meta.ops[0].inputs[2], gradient_name("Y"));
    Ok(())
}

#[test]
fn test_gradient_requires_three_inputs() {
    let forward = OperatorDef::new("ConvTranspose", &["X", "W"], &["Y"]).with_arg(Argument::int("kernel", 2));
    let result = ops::get_gradient_for_op(&forward, &["Y_grad".to_string()]);
    assert!(matches!(result, Err(Error::Precondition(_))));
}

#[test]
fn test_gradient_for_unknown_op() {
    let def = OperatorDef::new("NotAnOperator", &["a"], &["b"]);
    let result = ops::get_gradient_for_op(&def, &["b_grad".to_string()]);
    assert!(matches!(result, Err(Error::NoGradient(ref op)) if op == "NotAnOperator"));
}

#[test]
fn test_schema_arity() {
    let forward = ops::schema("ConvTranspose").expect("ConvTranspose schema is built in");
    assert_eq!(forward.input_range(), 3..=3);
    assert_eq!(forward.output_range(), 1..=1);
    assert_eq!(forward.input_doc(1).map(|d| d.name.as_str()), Some("filter"));
    assert!(forward.verify(&forward_def()).is_ok());
    assert!(matches!(
        forward.verify(&OperatorDef::new("ConvTranspose", &["X", "W", "b", "extra"], &["Y"])),
        Err(Error::InvalidArity { kind: "inputs", actual: 4, .. })
    ));

    let backward = ops::schema("ConvTransposeGradient").expect("gradient schema is built in");
    assert_eq!(backward.input_range(), 3..=3);
    assert_eq!(backward.output_range(), 2..=3);
    for outputs in [&["dW", "db"][..], &["dW", "db", "dX"][..]] {
        assert!(backward.verify(&OperatorDef::new("ConvTransposeGradient", &["X", "W", "dY"], outputs)).is_ok());
    }
    assert!(matches!(
        backward.verify(&OperatorDef::new("ConvTransposeGradient", &["X", "W", "dY"], &["dW"])),
        Err(Error::InvalidArity { kind: "outputs", actual: 1, .. })
    ));
}

#[test]
fn test_forward_output_shape_and_bias() -> Result<(), Error> {
    let def = OperatorDef::new("ConvTranspose", &["X", "W", "b"], &["Y"]).with_arg(Argument::int("kernel", 2));
    let x = CpuTensor::from_vec(&[1, 1, 2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?;
    let w = CpuTensor::from_vec(&[1, 1, 2, 2], vec![1.0f32; 4])?;
    let b = CpuTensor::from_vec(&[1], vec![0.5f32])?;
    let outputs = run_cpu_operator(&def, &[&x, &w, &b], 1)?;

    assert_eq!(outputs[0].dims(), &[1, 1, 3, 3]);
    assert_tensor_close(
        &outputs[0],
        &[1.5, 3.5, 2.5, 4.5, 10.5, 6.5, 3.5, 7.5, 4.5],
        1e-6,
    );

    let outputs = run_cpu_operator(&forward_def(), &forward_inputs()?.iter().collect::<Vec<_>>(), 1)?;
    assert_eq!(outputs[0].dims(), &[1, 3, 6, 6]);
    Ok(())
}

#[test]
fn test_forward_rejects_mismatched_filter() -> Result<(), Error> {
    let inputs = forward_inputs()?;
    let wrong_filter = CpuTensor::from_vec(&[3, 3, 3, 3], ramp(81, 0.1))?;
    let result = run_cpu_operator(&forward_def(), &[&inputs[0], &wrong_filter, &inputs[2]], 1);
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn test_gradient_op_without_input_gradient() -> Result<(), Error> {
    let with_dx = backward(true)?;
    let without_dx = backward(false)?;
    assert_eq!(with_dx.len(), 3);
    assert_eq!(without_dx.len(), 2);
    assert_eq!(with_dx[2].dims(), &[1, 2, 3, 3]);
    for i in 0..2 {
        assert_eq!(with_dx[i].dims(), without_dx[i].dims());
        assert_tensor_close(&without_dx[i], with_dx[i].data::<f32>()?, 1e-6);
    }
    Ok(())
}

#[test]
fn test_bias_gradient_sums_output_gradient_per_channel() -> Result<(), Error> {
    let grads = backward(false)?;
    let weights = loss_weights();
    let db = grads[1].data::<f32>()?;
    assert_eq!(grads[1].dims(), &[3]);
    for (m, value) in db.iter().enumerate() {
        let expected: f32 = weights[m * 36..(m + 1) * 36].iter().sum();
        assert_abs_diff_eq!(*value, expected, epsilon = 1e-4);
    }
    Ok(())
}

#[test]
fn test_gradients_match_finite_differences() -> Result<(), Error> {
    let grads = backward(true)?;
    let inputs = forward_inputs()?;

    // The loss is linear in each input, so a large step only shrinks rounding
    // error
    check_gradient(weighted_loss, &inputs, 0, grads[2].data::<f32>()?, 0.5, 1e-2)?;
    check_gradient(weighted_loss, &inputs, 1, grads[0].data::<f32>()?, 0.5, 1e-2)?;
    check_gradient(weighted_loss, &inputs, 2, grads[1].data::<f32>()?, 0.5, 1e-2)?;
    Ok(())
}

#[test]
fn test_gradient_check_reports_mismatch() -> Result<(), Error> {
    let inputs = forward_inputs()?;
    let wrong = vec![0.0f32; 3];
    let result = check_gradient(weighted_loss, &inputs, 2, &wrong, 1e-2, 1e-2);
    assert!(matches!(result, Err(Error::GradientCheckError { .. })));
    Ok(())
}
