//! The `ConvTranspose` operator family: arguments, schemas, gradient wiring
//! and the CPU operators.

use super::cpu_backward::conv_transpose_backward;
use super::cpu_ops::conv_transpose;
use super::gradient::{single_gradient_def, GradientMaker, GradientWiring};
use super::schema::OpSchema;
use super::{check_io_count, write_output, Operator};
use crate::backend::CpuTensor;
use crate::error::Error;
use crate::graph::OperatorDef;
use ndarray::{ArrayView1, ArrayView4};

/// Geometry of a transposed convolution, read from operator arguments.
///
/// Each dimension can be given jointly (`kernel`, `stride`, `pad`, `adj`) or
/// per side (`kernel_h`/`kernel_w`, `stride_h`/`stride_w`,
/// `pad_t`/`pad_l`/`pad_b`/`pad_r`, `adj_h`/`adj_w`). Strides default to 1,
/// pads and adjustments to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvTransposeArgs {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_t: usize,
    pub pad_l: usize,
    pub pad_b: usize,
    pub pad_r: usize,
    pub adj_h: usize,
    pub adj_w: usize,
}

fn non_negative(def: &OperatorDef, name: &str, value: i64) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::InvalidArgument {
        name: name.to_string(),
        reason: format!("{} must be non-negative, got {}", def.display_name(), value),
    })
}

// Reads `joint` when present, otherwise each of `sides` (falling back to
// `default` when given).
fn read_dims<const N: usize>(
    def: &OperatorDef,
    joint: &str,
    sides: [&str; N],
    default: Option<usize>,
) -> Result<[usize; N], Error> {
    if let Some(value) = def.get_int(joint)? {
        let value = non_negative(def, joint, value)?;
        return Ok([value; N]);
    }
    let mut dims = [0usize; N];
    for (dim, side) in dims.iter_mut().zip(sides) {
        *dim = match (def.get_int(side)?, default) {
            (Some(value), _) => non_negative(def, side, value)?,
            (None, Some(default)) => default,
            (None, None) => return Err(Error::MissingArgument(format!("{} (or {})", joint, side))),
        };
    }
    Ok(dims)
}

impl ConvTransposeArgs {
    pub fn from_def(def: &OperatorDef) -> Result<Self, Error> {
        let [kernel_h, kernel_w] = read_dims(def, "kernel", ["kernel_h", "kernel_w"], None)?;
        let [stride_h, stride_w] = read_dims(def, "stride", ["stride_h", "stride_w"], Some(1))?;
        let [pad_t, pad_l, pad_b, pad_r] = read_dims(def, "pad", ["pad_t", "pad_l", "pad_b", "pad_r"], Some(0))?;
        let [adj_h, adj_w] = read_dims(def, "adj", ["adj_h", "adj_w"], Some(0))?;
        let args = Self {
            kernel_h,
            kernel_w,
            stride_h,
            stride_w,
            pad_t,
            pad_l,
            pad_b,
            pad_r,
            adj_h,
            adj_w,
        };
        args.validate()?;
        Ok(args)
    }

    fn validate(&self) -> Result<(), Error> {
        let invalid = |name: &str, reason: String| Error::InvalidArgument {
            name: name.to_string(),
            reason,
        };
        if self.kernel_h == 0 || self.kernel_w == 0 {
            return Err(invalid("kernel", format!("must be positive, got {}x{}", self.kernel_h, self.kernel_w)));
        }
        if self.stride_h == 0 || self.stride_w == 0 {
            return Err(invalid("stride", format!("must be positive, got {}x{}", self.stride_h, self.stride_w)));
        }
        if self.adj_h >= self.stride_h || self.adj_w >= self.stride_w {
            return Err(invalid(
                "adj",
                format!(
                    "{}x{} must be smaller than stride {}x{}",
                    self.adj_h, self.adj_w, self.stride_h, self.stride_w
                ),
            ));
        }
        Ok(())
    }

    /// `(in - 1) * stride + kernel + adj - pad_before - pad_after`, failing
    /// when the result is not positive.
    fn output_size(input: usize, kernel: usize, stride: usize, adj: usize, pads: (usize, usize)) -> Result<usize, Error> {
        let grown = input
            .checked_sub(1)
            .map(|steps| steps * stride + kernel + adj)
            .unwrap_or(0);
        match grown.checked_sub(pads.0 + pads.1) {
            Some(size) if size > 0 => Ok(size),
            _ => Err(Error::ShapeError(format!(
                "ConvTranspose output size is not positive for input {}, kernel {}, stride {}, adj {}, pads {:?}",
                input, kernel, stride, adj, pads
            ))),
        }
    }

    pub fn output_height(&self, input_height: usize) -> Result<usize, Error> {
        Self::output_size(input_height, self.kernel_h, self.stride_h, self.adj_h, (self.pad_t, self.pad_b))
    }

    pub fn output_width(&self, input_width: usize) -> Result<usize, Error> {
        Self::output_size(input_width, self.kernel_w, self.stride_w, self.adj_w, (self.pad_l, self.pad_r))
    }
}

pub(crate) fn schemas() -> Vec<OpSchema> {
    vec![
        OpSchema::new("ConvTranspose")
            .num_inputs(3)
            .num_outputs(1)
            .set_doc(
                "Transposed 2D convolution. Every input pixel scatters a copy of the \
                 filter, scaled by the pixel value, into the output; overlapping \
                 contributions add up and the bias is added per output channel. The \
                 output size follows from the kernel, stride, pad and adj arguments.",
            )
            .input(
                0,
                "X",
                "Input of shape (N x C x H x W): batch size, channels, height and width.",
            )
            .input(
                1,
                "filter",
                "Filter of shape (C x M x kH x kW), where M is the number of output \
                 channels and kH, kW the kernel size.",
            )
            .input(2, "bias", "1D bias of size M, added to every output pixel of its channel.")
            .output(
                0,
                "Y",
                "Output of shape (N x M x H' x W') with \
                 H' = (H - 1) * stride_h + kH + adj_h - pad_t - pad_b, and W' likewise.",
            ),
        OpSchema::new("ConvTransposeGradient")
            .num_inputs(3)
            .num_outputs_range(2, 3)
            .input(0, "X", "Forward input.")
            .input(1, "filter", "Forward filter.")
            .input(2, "dY", "Gradient of the forward output.")
            .output(0, "dfilter", "Gradient of the filter.")
            .output(1, "dbias", "Gradient of the bias.")
            .output(2, "dX", "Gradient of the input; computed only when this output is requested."),
    ]
}

/// Wires `ConvTranspose(X, filter, bias) -> Y` to
/// `ConvTransposeGradient(X, filter, dY) -> (dfilter, dbias, dX)`.
pub struct ConvTransposeGradientMaker;

impl GradientMaker for ConvTransposeGradientMaker {
    fn get_gradient_defs(&self, wiring: &mut GradientWiring<'_>) -> Result<Vec<OperatorDef>, Error> {
        let def = wiring.def();
        if def.inputs.len() != 3 {
            return Err(Error::Precondition(format!(
                "ConvTranspose gradient needs exactly 3 inputs, {} has {}",
                def.display_name(),
                def.inputs.len()
            )));
        }
        let inputs = vec![wiring.input(0)?, wiring.input(1)?, wiring.grad_output(0)?];
        let outputs = vec![wiring.grad_input(1)?, wiring.grad_input(2)?, wiring.grad_input(0)?];
        Ok(single_gradient_def(def, "ConvTransposeGradient", "", inputs, outputs))
    }
}

pub(crate) fn conv_transpose_gradient_maker() -> Box<dyn GradientMaker> {
    Box::new(ConvTransposeGradientMaker)
}

fn view4<'a>(tensor: &'a CpuTensor, role: &str) -> Result<ArrayView4<'a, f32>, Error> {
    let dims = tensor.dims();
    if dims.len() != 4 {
        return Err(Error::ShapeError(format!(
            "ConvTranspose expects a 4D {}, got shape {:?}",
            role, dims
        )));
    }
    ArrayView4::from_shape((dims[0], dims[1], dims[2], dims[3]), tensor.data::<f32>()?)
        .map_err(|e| Error::ShapeError(format!("{}: {}", role, e)))
}

fn view1<'a>(tensor: &'a CpuTensor, role: &str) -> Result<ArrayView1<'a, f32>, Error> {
    let dims = tensor.dims();
    if dims.len() != 1 {
        return Err(Error::ShapeError(format!(
            "ConvTranspose expects a 1D {}, got shape {:?}",
            role, dims
        )));
    }
    ArrayView1::from_shape(dims[0], tensor.data::<f32>()?)
        .map_err(|e| Error::ShapeError(format!("{}: {}", role, e)))
}

/// CPU `ConvTranspose`, f32 NCHW.
pub struct ConvTransposeOp {
    def: OperatorDef,
    args: ConvTransposeArgs,
}

impl ConvTransposeOp {
    pub fn new(def: &OperatorDef) -> Result<Self, Error> {
        Ok(Self {
            def: def.clone(),
            args: ConvTransposeArgs::from_def(def)?,
        })
    }
}

impl Operator for ConvTransposeOp {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, inputs: &[&CpuTensor], outputs: &mut [CpuTensor]) -> Result<(), Error> {
        check_io_count(&self.def, inputs.len(), 3..=3, outputs.len(), 1..=1)?;
        let output = conv_transpose(
            view4(inputs[0], "input")?,
            view4(inputs[1], "filter")?,
            view1(inputs[2], "bias")?,
            &self.args,
        )?;
        write_output(&mut outputs[0], output.view().into_dyn())
    }
}

/// CPU `ConvTransposeGradient`, f32 NCHW. Computes the data gradient only
/// when a third output is present.
pub struct ConvTransposeGradientOp {
    def: OperatorDef,
    args: ConvTransposeArgs,
}

impl ConvTransposeGradientOp {
    pub fn new(def: &OperatorDef) -> Result<Self, Error> {
        Ok(Self {
            def: def.clone(),
            args: ConvTransposeArgs::from_def(def)?,
        })
    }
}

impl Operator for ConvTransposeGradientOp {
    fn def(&self) -> &OperatorDef {
        &self.def
    }

    fn run(&self, inputs: &[&CpuTensor], outputs: &mut [CpuTensor]) -> Result<(), Error> {
        check_io_count(&self.def, inputs.len(), 3..=3, outputs.len(), 2..=3)?;
        let grads = conv_transpose_backward(
            view4(inputs[0], "input")?,
            view4(inputs[1], "filter")?,
            view4(inputs[2], "output gradient")?,
            &self.args,
            outputs.len() == 3,
        )?;
        write_output(&mut outputs[0], grads.filter.view().into_dyn())?;
        write_output(&mut outputs[1], grads.bias.view().into_dyn())?;
        if let Some(grad_input) = grads.input {
            write_output(&mut outputs[2], grad_input.view().into_dyn())?;
        }
        Ok(())
    }
}

pub(crate) fn create_conv_transpose(def: &OperatorDef) -> Result<Box<dyn Operator>, Error> {
    Ok(Box::new(ConvTransposeOp::new(def)?))
}

pub(crate) fn create_conv_transpose_gradient(def: &OperatorDef) -> Result<Box<dyn Operator>, Error> {
    Ok(Box::new(ConvTransposeGradientOp::new(def)?))
}
