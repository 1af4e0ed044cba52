//! Gradient makers: rewrite a forward invocation into the invocations that
//! compute its input gradients.

use crate::error::Error;
use crate::graph::OperatorDef;
use crate::registry::{self, TypedRegistry};
use lazy_static::lazy_static;
use std::sync::RwLock;

/// Name of the gradient blob of `name`.
pub fn gradient_name(name: &str) -> String {
    format!("{}_grad", name)
}

/// Default output gradient names for `def`: one `<output>_grad` per output.
pub fn default_output_gradients(def: &OperatorDef) -> Vec<String> {
    def.outputs.iter().map(|o| gradient_name(o)).collect()
}

/// Slot names available to a gradient maker while it builds its defs.
///
/// `input`/`output` name the forward blobs, `grad_output` the incoming
/// gradients, and `grad_input` names (and records) the gradient a backward
/// def will produce for a forward input.
pub struct GradientWiring<'a> {
    def: &'a OperatorDef,
    g_output: &'a [String],
    g_input: Vec<Option<String>>,
}

impl<'a> GradientWiring<'a> {
    pub fn new(def: &'a OperatorDef, g_output: &'a [String]) -> Self {
        Self {
            def,
            g_output,
            g_input: vec![None; def.inputs.len()],
        }
    }

    pub fn def(&self) -> &'a OperatorDef {
        self.def
    }

    pub fn input(&self, index: usize) -> Result<String, Error> {
        slot(self.def, "input", &self.def.inputs, index)
    }

    pub fn output(&self, index: usize) -> Result<String, Error> {
        slot(self.def, "output", &self.def.outputs, index)
    }

    pub fn grad_output(&self, index: usize) -> Result<String, Error> {
        slot(self.def, "output gradient", self.g_output, index)
    }

    pub fn grad_input(&mut self, index: usize) -> Result<String, Error> {
        let name = gradient_name(&self.input(index)?);
        self.g_input[index] = Some(name.clone());
        Ok(name)
    }

    fn into_g_input(self) -> Vec<Option<String>> {
        self.g_input
    }
}

fn slot(def: &OperatorDef, kind: &str, names: &[String], index: usize) -> Result<String, Error> {
    names.get(index).cloned().ok_or_else(|| {
        Error::Precondition(format!(
            "{} has no {} {} ({} available)",
            def.display_name(),
            kind,
            index,
            names.len()
        ))
    })
}

/// One backward def that inherits the forward def's arguments, device option
/// and engine.
pub fn single_gradient_def(
    forward: &OperatorDef,
    op_type: &str,
    name: &str,
    inputs: Vec<String>,
    outputs: Vec<String>,
) -> Vec<OperatorDef> {
    vec![OperatorDef {
        op_type: op_type.to_string(),
        name: name.to_string(),
        inputs,
        outputs,
        args: forward.args.clone(),
        device_option: forward.device_option,
        engine: forward.engine.clone(),
        is_gradient_op: true,
    }]
}

pub trait GradientMaker: Send + Sync {
    fn get_gradient_defs(&self, wiring: &mut GradientWiring<'_>) -> Result<Vec<OperatorDef>, Error>;
}

/// Backward defs plus, per forward input, the name of its gradient blob
/// (`None` for inputs that receive no gradient).
#[derive(Debug, Clone, PartialEq)]
pub struct GradientOpsMeta {
    pub ops: Vec<OperatorDef>,
    pub g_input: Vec<Option<String>>,
}

pub type GradientMakerCreator = fn() -> Box<dyn GradientMaker>;

fn builtin_gradients() -> Vec<(String, GradientMakerCreator)> {
    vec![(
        "ConvTranspose".to_string(),
        super::conv_transpose::conv_transpose_gradient_maker as GradientMakerCreator,
    )]
}

lazy_static! {
    static ref GRADIENTS: RwLock<TypedRegistry<String, GradientMakerCreator>> =
        RwLock::new(TypedRegistry::from_entries("GradientRegistry", builtin_gradients()));
}

pub fn register_gradient(op_type: &str, creator: GradientMakerCreator) -> Result<(), Error> {
    registry::write(&GRADIENTS).register(op_type.to_string(), creator)
}

pub fn has_gradient(op_type: &str) -> bool {
    registry::read(&GRADIENTS).contains(&op_type.to_string())
}

/// Runs the gradient maker registered for `def.op_type`. `def` is not
/// modified.
pub fn get_gradient_for_op(def: &OperatorDef, g_output: &[String]) -> Result<GradientOpsMeta, Error> {
    let creator = registry::read(&GRADIENTS)
        .get(&def.op_type)
        .ok_or_else(|| Error::NoGradient(def.op_type.clone()))?;
    if g_output.len() != def.outputs.len() {
        return Err(Error::Precondition(format!(
            "{} has {} outputs but {} output gradients were given",
            def.display_name(),
            def.outputs.len(),
            g_output.len()
        )));
    }
    let maker = creator();
    let mut wiring = GradientWiring::new(def, g_output);
    let ops = maker.get_gradient_defs(&mut wiring)?;
    debug_println!("{} produced {} gradient defs", def.display_name(), ops.len());
    Ok(GradientOpsMeta {
        ops,
        g_input: wiring.into_g_input(),
    })
}
