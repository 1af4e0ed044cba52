// src/ops/cpu_backward.rs
//! CPU backward kernels (f32, NCHW).

use super::conv_transpose::ConvTransposeArgs;
use super::cpu_ops::conv_transpose_output_shape;
use crate::error::Error;
use ndarray::{Array1, Array4, ArrayView4, Axis};

/// Gradients of a transposed convolution.
pub struct ConvTransposeGrads {
    pub filter: Array4<f32>,
    pub bias: Array1<f32>,
    /// Present only when requested.
    pub input: Option<Array4<f32>>,
}

/// Backward pass of [`conv_transpose`](super::cpu_ops::conv_transpose).
///
/// `grad_output` must have exactly the forward output shape. The data
/// gradient is computed only when `with_input_grad` is set.
pub fn conv_transpose_backward(
    input: ArrayView4<f32>,
    filter: ArrayView4<f32>,
    grad_output: ArrayView4<f32>,
    args: &ConvTransposeArgs,
    with_input_grad: bool,
) -> Result<ConvTransposeGrads, Error> {
    let output_shape = conv_transpose_output_shape(input.shape(), filter.shape(), args)?;
    if grad_output.shape() != &output_shape[..] {
        return Err(Error::ShapeMismatch {
            expected: output_shape.to_vec(),
            actual: grad_output.shape().to_vec(),
        });
    }
    let [batch_size, out_channels, output_height, output_width] = output_shape;
    let (_, in_channels, input_height, input_width) = input.dim();

    let mut grad_filter = Array4::<f32>::zeros(filter.raw_dim());
    let mut grad_input = if with_input_grad {
        Some(Array4::<f32>::zeros(input.raw_dim()))
    } else {
        None
    };

    for n in 0..batch_size {
        for in_c in 0..in_channels {
            for h_in in 0..input_height {
                for w_in in 0..input_width {
                    let input_val = input[[n, in_c, h_in, w_in]];
                    let mut acc = 0.0f32;
                    for kh in 0..args.kernel_h {
                        let h_out = (h_in * args.stride_h + kh) as isize - args.pad_t as isize;
                        if h_out < 0 || h_out >= output_height as isize {
                            continue;
                        }
                        for kw in 0..args.kernel_w {
                            let w_out = (w_in * args.stride_w + kw) as isize - args.pad_l as isize;
                            if w_out < 0 || w_out >= output_width as isize {
                                continue;
                            }
                            for out_c in 0..out_channels {
                                let grad_val = grad_output[[n, out_c, h_out as usize, w_out as usize]];
                                grad_filter[[in_c, out_c, kh, kw]] += input_val * grad_val;
                                acc += filter[[in_c, out_c, kh, kw]] * grad_val;
                            }
                        }
                    }
                    if let Some(grad_input) = grad_input.as_mut() {
                        grad_input[[n, in_c, h_in, w_in]] = acc;
                    }
                }
            }
        }
    }

    // dBias sums dY over batch and spatial positions
    let grad_bias = grad_output
        .sum_axis(Axis(3))
        .sum_axis(Axis(2))
        .sum_axis(Axis(0));

    Ok(ConvTransposeGrads {
        filter: grad_filter,
        bias: grad_bias,
        input: grad_input,
    })
}
