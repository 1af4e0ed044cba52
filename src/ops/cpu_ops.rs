// src/ops/cpu_ops.rs
//! CPU forward kernels (f32, NCHW).

use super::conv_transpose::ConvTransposeArgs;
use crate::error::Error;
use ndarray::{Array4, ArrayView1, ArrayView4};

/// Shape of the transposed-convolution output for an `[N, C, H, W]` input and
/// a `[C, M, kH, kW]` filter, after validating both against `args`.
pub fn conv_transpose_output_shape(
    input_shape: &[usize],
    filter_shape: &[usize],
    args: &ConvTransposeArgs,
) -> Result<[usize; 4], Error> {
    if input_shape.len() != 4 {
        return Err(Error::ShapeError(format!(
            "ConvTranspose expects 4D input (NCHW), got {}D",
            input_shape.len()
        )));
    }
    if filter_shape.len() != 4 {
        return Err(Error::ShapeError(format!(
            "ConvTranspose expects 4D filter (C x M x kH x kW), got {}D",
            filter_shape.len()
        )));
    }
    let (batch_size, in_channels, input_height, input_width) =
        (input_shape[0], input_shape[1], input_shape[2], input_shape[3]);
    let out_channels = filter_shape[1];
    if filter_shape[0] != in_channels {
        return Err(Error::ShapeMismatch {
            expected: vec![in_channels, out_channels, args.kernel_h, args.kernel_w],
            actual: filter_shape.to_vec(),
        });
    }
    if filter_shape[2] != args.kernel_h || filter_shape[3] != args.kernel_w {
        return Err(Error::ShapeError(format!(
            "Filter spatial size {}x{} does not match kernel {}x{}",
            filter_shape[2], filter_shape[3], args.kernel_h, args.kernel_w
        )));
    }
    let output_height = args.output_height(input_height)?;
    let output_width = args.output_width(input_width)?;
    Ok([batch_size, out_channels, output_height, output_width])
}

/// Transposed 2D convolution.
///
/// Every input pixel `X[n, c, h, w]` scatters `X * F[c, m, kh, kw]` into
/// `Y[n, m, h * stride_h + kh - pad_t, w * stride_w + kw - pad_l]`; positions
/// falling outside the output are cropped. The bias is added per output
/// channel.
pub fn conv_transpose(
    input: ArrayView4<f32>,
    filter: ArrayView4<f32>,
    bias: ArrayView1<f32>,
    args: &ConvTransposeArgs,
) -> Result<Array4<f32>, Error> {
    let output_shape = conv_transpose_output_shape(input.shape(), filter.shape(), args)?;
    let [batch_size, out_channels, output_height, output_width] = output_shape;
    if bias.len() != out_channels {
        return Err(Error::ShapeMismatch {
            expected: vec![out_channels],
            actual: vec![bias.len()],
        });
    }
    let (_, in_channels, input_height, input_width) = input.dim();

    let mut output = Array4::<f32>::zeros(output_shape);
    for n in 0..batch_size {
        for in_c in 0..in_channels {
            for h_in in 0..input_height {
                for w_in in 0..input_width {
                    let input_val = input[[n, in_c, h_in, w_in]];
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
                                output[[n, out_c, h_out as usize, w_out as usize]] +=
                                    input_val * filter[[in_c, out_c, kh, kw]];
                            }
                        }
                    }
                }
            }
        }
    }

    // Add bias
    for n in 0..batch_size {
        for out_c in 0..out_channels {
            let b = bias[out_c];
            output
                .slice_mut(ndarray::s![n, out_c, .., ..])
                .mapv_inplace(|v| v + b);
        }
    }
    Ok(output)
}
