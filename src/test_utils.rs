//! Helpers shared by integration tests, demos and benches.

use crate::backend::CpuTensor;
use crate::error::Error;
use crate::graph::OperatorDef;
use crate::ops::create_operator;

/// Runs the CPU operator for `def` on `inputs`, returning `num_outputs`
/// freshly created output tensors.
pub fn run_cpu_operator(def: &OperatorDef, inputs: &[&CpuTensor], num_outputs: usize) -> Result<Vec<CpuTensor>, Error> {
    let op = create_operator(def)?;
    let mut outputs: Vec<CpuTensor> = (0..num_outputs).map(|_| CpuTensor::new()).collect();
    op.run(inputs, &mut outputs)?;
    Ok(outputs)
}

/// Checks an analytical gradient against central finite differences.
///
/// `loss` maps the full input list to a scalar. Element `i` of input
/// `input_idx` is perturbed by `±epsilon` in turn and the numerical
/// derivative compared with `analytical[i]`.
///
/// # Returns
/// * `Ok(())` if every element agrees within `tolerance` (relative, or
///   absolute for values near zero).
/// * `Err(Error::GradientCheckError)` describing the worst element otherwise.
pub fn check_gradient<F>(
    loss: F,
    inputs: &[CpuTensor],
    input_idx: usize,
    analytical: &[f32],
    epsilon: f32,
    tolerance: f32,
) -> Result<(), Error>
where
    F: Fn(&[&CpuTensor]) -> Result<f32, Error>,
{
    if input_idx >= inputs.len() {
        return Err(Error::InvalidOperation(format!(
            "input_idx ({}) is out of bounds for inputs slice (len {})",
            input_idx,
            inputs.len()
        )));
    }
    let numerical = numerical_gradient(&loss, inputs, input_idx, epsilon)?;
    compare_gradients(analytical, &numerical, tolerance)
}

fn numerical_gradient<F>(loss: &F, inputs: &[CpuTensor], input_idx: usize, epsilon: f32) -> Result<Vec<f32>, Error>
where
    F: Fn(&[&CpuTensor]) -> Result<f32, Error>,
{
    let target = &inputs[input_idx];
    let original = target.to_vec::<f32>()?;
    let mut gradient = vec![0.0f32; original.len()];

    let evaluate = |perturbed: &CpuTensor| -> Result<f32, Error> {
        let refs: Vec<&CpuTensor> = inputs
            .iter()
            .enumerate()
            .map(|(i, t)| if i == input_idx { perturbed } else { t })
            .collect();
        loss(&refs)
    };

    for (i, slot) in gradient.iter_mut().enumerate() {
        let mut plus = original.clone();
        plus[i] += epsilon;
        let loss_plus = evaluate(&CpuTensor::from_vec(target.dims(), plus)?)?;

        let mut minus = original.clone();
        minus[i] -= epsilon;
        let loss_minus = evaluate(&CpuTensor::from_vec(target.dims(), minus)?)?;

        *slot = (loss_plus - loss_minus) / (2.0 * epsilon);
    }
    Ok(gradient)
}

fn compare_gradients(analytical: &[f32], numerical: &[f32], tolerance: f32) -> Result<(), Error> {
    if analytical.len() != numerical.len() {
        return Err(Error::InternalLogicError(format!(
            "Gradient size mismatch: analytical size={}, numerical size={}",
            analytical.len(),
            numerical.len()
        )));
    }

    let mut max_rel_err = 0.0;
    let mut max_abs_err = 0.0;
    let mut max_err_idx = 0;

    for (i, (a, n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let abs_err = (a - n).abs();
        let rel_err = if a.abs() > 1e-3 && n.abs() > 1e-3 {
            abs_err / a.abs().max(n.abs())
        } else {
            abs_err
        };

        if rel_err > max_rel_err {
            max_rel_err = rel_err;
            max_abs_err = abs_err;
            max_err_idx = i;
        }
    }

    if max_rel_err <= tolerance {
        Ok(())
    } else {
        Err(Error::GradientCheckError {
            analytical: analytical.to_vec(),
            numerical: numerical.to_vec(),
            max_rel_error: max_rel_err,
            max_abs_error: max_abs_err,
            at_index: max_err_idx,
        })
    }
}

/// Asserts that `tensor` holds f32 values within `tol` of `expected`.
pub fn assert_tensor_close(tensor: &CpuTensor, expected: &[f32], tol: f32) {
    let data = tensor.data::<f32>().unwrap();
    assert_eq!(data.len(), expected.len(), "Tensor lengths don't match");
    for (i, (a_val, b_val)) in data.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a_val - b_val).abs() < tol,
            "Values at index {i} aren't close enough: a={a_val}, b={b_val}, diff={}, tol={tol}",
            (a_val - b_val).abs()
        );
    }
}

/// Deterministic, non-trivial f32 data for tests and benches.
pub fn ramp(len: usize, scale: f32) -> Vec<f32> {
    (0..len)
        .map(|i| ((i * 7 + 3) % 11) as f32 * scale - 5.0 * scale)
        .collect()
}
