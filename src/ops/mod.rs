//! Operator schemas, gradient makers and CPU operators.

pub mod conv_transpose;
pub mod cpu_backward;
pub mod cpu_ops;
pub mod gradient;
pub mod schema;

pub use conv_transpose::{ConvTransposeArgs, ConvTransposeGradientMaker, ConvTransposeGradientOp, ConvTransposeOp};
pub use gradient::{
    default_output_gradients, get_gradient_for_op, gradient_name, register_gradient, single_gradient_def,
    GradientMaker, GradientMakerCreator, GradientOpsMeta, GradientWiring,
};
pub use schema::{register_schema, schema, OpSchema, SlotDoc};

use crate::backend::CpuTensor;
use crate::error::Error;
use crate::graph::OperatorDef;
use crate::registry::{self, TypedRegistry};
use lazy_static::lazy_static;
use ndarray::ArrayViewD;
use std::ops::RangeInclusive;
use std::sync::RwLock;

/// A runnable CPU operator built from an [`OperatorDef`].
pub trait Operator: Send {
    fn def(&self) -> &OperatorDef;

    /// Reads `inputs` and writes `outputs`, resizing them as needed.
    fn run(&self, inputs: &[&CpuTensor], outputs: &mut [CpuTensor]) -> Result<(), Error>;
}

pub type OperatorCreator = fn(&OperatorDef) -> Result<Box<dyn Operator>, Error>;

fn builtin_operators() -> Vec<(String, OperatorCreator)> {
    vec![
        (
            "ConvTranspose".to_string(),
            conv_transpose::create_conv_transpose as OperatorCreator,
        ),
        (
            "ConvTransposeGradient".to_string(),
            conv_transpose::create_conv_transpose_gradient as OperatorCreator,
        ),
    ]
}

lazy_static! {
    static ref CPU_OPERATORS: RwLock<TypedRegistry<String, OperatorCreator>> =
        RwLock::new(TypedRegistry::from_entries("CpuOperatorRegistry", builtin_operators()));
}

pub fn register_cpu_operator(op_type: &str, creator: OperatorCreator) -> Result<(), Error> {
    registry::write(&CPU_OPERATORS).register(op_type.to_string(), creator)
}

pub fn has_cpu_operator(op_type: &str) -> bool {
    registry::read(&CPU_OPERATORS).contains(&op_type.to_string())
}

/// Verifies `def` against its schema (when one is registered) and builds the
/// CPU operator for it.
pub fn create_operator(def: &OperatorDef) -> Result<Box<dyn Operator>, Error> {
    if let Some(schema) = schema::schema(&def.op_type) {
        schema.verify(def)?;
    }
    let creator = registry::read(&CPU_OPERATORS)
        .get(&def.op_type)
        .ok_or_else(|| Error::UnknownOperator(def.op_type.clone()))?;
    debug_println!("Creating CPU operator for {}", def);
    creator(def)
}

/// Checks the tensor counts handed to [`Operator::run`].
pub(crate) fn check_io_count(
    def: &OperatorDef,
    inputs: usize,
    expected_inputs: RangeInclusive<usize>,
    outputs: usize,
    expected_outputs: RangeInclusive<usize>,
) -> Result<(), Error> {
    for (kind, actual, expected) in [
        ("inputs", inputs, expected_inputs),
        ("outputs", outputs, expected_outputs),
    ] {
        if !expected.contains(&actual) {
            let expected = if expected.start() == expected.end() {
                expected.start().to_string()
            } else {
                format!("{} to {}", expected.start(), expected.end())
            };
            return Err(Error::InvalidArity {
                op: def.display_name().to_string(),
                kind,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Resizes `tensor` to the shape of `values` and copies them in row-major
/// order.
pub(crate) fn write_output(tensor: &mut CpuTensor, values: ArrayViewD<f32>) -> Result<(), Error> {
    tensor.resize(values.shape())?;
    let data = tensor.mutable_data::<f32>()?;
    for (dst, src) in data.iter_mut().zip(values.iter()) {
        *dst = *src;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Argument;

    #[test]
    fn test_unknown_operator() {
        let def = OperatorDef::new("NoSuchOperator", &[], &[]);
        assert!(matches!(
            create_operator(&def),
            Err(Error::UnknownOperator(ref op)) if op == "NoSuchOperator"
        ));
    }

    #[test]
    fn test_create_verifies_schema() {
        let def = OperatorDef::new("ConvTranspose", &["X", "W"], &["Y"]).with_arg(Argument::int("kernel", 2));
        assert!(matches!(
            create_operator(&def),
            Err(Error::InvalidArity { kind: "inputs", actual: 2, .. })
        ));
    }

    #[test]
    fn test_write_output_reuses_tensor() -> Result<(), Error> {
        let mut tensor = CpuTensor::from_vec(&[4], vec![9.0f32; 4])?;
        let values = ndarray::arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
        write_output(&mut tensor, values.view().into_dyn())?;
        assert_eq!(tensor.dims(), &[2, 2]);
        assert_eq!(tensor.data::<f32>()?, &[1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }
}
