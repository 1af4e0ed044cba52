use crate::error::Error;
use crate::graph::OperatorDef;
use crate::registry::{self, TypedRegistry};
use lazy_static::lazy_static;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};

/// Documentation of one input or output slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDoc {
    pub name: String,
    pub doc: String,
}

/// Static description of an operator type: how many inputs and outputs an
/// invocation may carry, plus user-facing documentation.
///
/// # Example
/// ```rust
/// use tensor_bridge::ops::OpSchema;
/// use tensor_bridge::OperatorDef;
///
/// let schema = OpSchema::new("Scale").num_inputs(1).num_outputs_range(1, 2);
/// assert!(schema.verify(&OperatorDef::new("Scale", &["X"], &["Y"])).is_ok());
/// assert!(schema.verify(&OperatorDef::new("Scale", &["X", "Z"], &["Y"])).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OpSchema {
    name: String,
    inputs: RangeInclusive<usize>,
    outputs: RangeInclusive<usize>,
    doc: Option<String>,
    input_docs: Vec<Option<SlotDoc>>,
    output_docs: Vec<Option<SlotDoc>>,
}

impl OpSchema {
    /// A schema accepting any number of inputs and outputs.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: 0..=usize::MAX,
            outputs: 0..=usize::MAX,
            doc: None,
            input_docs: Vec::new(),
            output_docs: Vec::new(),
        }
    }

    pub fn num_inputs(self, n: usize) -> Self {
        self.num_inputs_range(n, n)
    }

    pub fn num_inputs_range(mut self, min: usize, max: usize) -> Self {
        self.inputs = min..=max;
        self
    }

    pub fn num_outputs(self, n: usize) -> Self {
        self.num_outputs_range(n, n)
    }

    pub fn num_outputs_range(mut self, min: usize, max: usize) -> Self {
        self.outputs = min..=max;
        self
    }

    pub fn set_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.trim().to_string());
        self
    }

    pub fn input(mut self, index: usize, name: &str, doc: &str) -> Self {
        set_slot(&mut self.input_docs, index, name, doc);
        self
    }

    pub fn output(mut self, index: usize, name: &str, doc: &str) -> Self {
        set_slot(&mut self.output_docs, index, name, doc);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn input_doc(&self, index: usize) -> Option<&SlotDoc> {
        self.input_docs.get(index).and_then(Option::as_ref)
    }

    pub fn output_doc(&self, index: usize) -> Option<&SlotDoc> {
        self.output_docs.get(index).and_then(Option::as_ref)
    }

    pub fn input_range(&self) -> RangeInclusive<usize> {
        self.inputs.clone()
    }

    pub fn output_range(&self) -> RangeInclusive<usize> {
        self.outputs.clone()
    }

    /// Checks the input and output counts of `def` against this schema.
    pub fn verify(&self, def: &OperatorDef) -> Result<(), Error> {
        check_arity(&self.name, "inputs", &self.inputs, def.inputs.len())?;
        check_arity(&self.name, "outputs", &self.outputs, def.outputs.len())
    }
}

fn set_slot(slots: &mut Vec<Option<SlotDoc>>, index: usize, name: &str, doc: &str) {
    if slots.len() <= index {
        slots.resize(index + 1, None);
    }
    slots[index] = Some(SlotDoc {
        name: name.to_string(),
        doc: doc.to_string(),
    });
}

fn describe(range: &RangeInclusive<usize>) -> String {
    match (*range.start(), *range.end()) {
        (min, max) if min == max => min.to_string(),
        (min, usize::MAX) => format!("at least {}", min),
        (min, max) => format!("{} to {}", min, max),
    }
}

fn check_arity(op: &str, kind: &'static str, range: &RangeInclusive<usize>, actual: usize) -> Result<(), Error> {
    if range.contains(&actual) {
        return Ok(());
    }
    Err(Error::InvalidArity {
        op: op.to_string(),
        kind,
        expected: describe(range),
        actual,
    })
}

impl fmt::Display for OpSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}: {} inputs, {} outputs",
            self.name,
            describe(&self.inputs),
            describe(&self.outputs)
        )?;
        if let Some(doc) = &self.doc {
            writeln!(f, "{}", doc)?;
        }
        for (i, slot) in self.input_docs.iter().enumerate() {
            if let Some(slot) = slot {
                writeln!(f, "  input {} ({}): {}", i, slot.name, slot.doc)?;
            }
        }
        for (i, slot) in self.output_docs.iter().enumerate() {
            if let Some(slot) = slot {
                writeln!(f, "  output {} ({}): {}", i, slot.name, slot.doc)?;
            }
        }
        Ok(())
    }
}

fn builtin_schemas() -> Vec<(String, Arc<OpSchema>)> {
    super::conv_transpose::schemas()
        .into_iter()
        .map(|schema| (schema.name().to_string(), Arc::new(schema)))
        .collect()
}

lazy_static! {
    static ref SCHEMAS: RwLock<TypedRegistry<String, Arc<OpSchema>>> =
        RwLock::new(TypedRegistry::from_entries("OpSchemaRegistry", builtin_schemas()));
}

/// The schema registered for `op_type`.
pub fn schema(op_type: &str) -> Option<Arc<OpSchema>> {
    registry::read(&SCHEMAS).get(&op_type.to_string())
}

pub fn register_schema(schema: OpSchema) -> Result<(), Error> {
    let name = schema.name().to_string();
    registry::write(&SCHEMAS).register(name, Arc::new(schema))
}
